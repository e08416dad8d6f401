use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use findoc_analyzer::{
    config::Config,
    models::{normalize_query, AppState},
    routes::create_router,
    storage::StagingArea,
    utils::init_logger,
    Pipeline,
};

#[derive(Parser)]
#[command(name = "findoc-analyzer")]
#[command(about = "Multi-agent analysis of financial PDF reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API (default)
    Serve {
        /// Bind address, overrides HOST
        #[arg(long)]
        host: Option<String>,

        /// Port, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyze a local PDF once and print the result
    Analyze {
        /// Path to the financial document
        file: PathBuf,

        /// Question to answer about the document
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Missing credentials stop the process before anything binds
    let mut config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);

    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config, pipeline).await
        }
        Command::Analyze { file, query } => {
            let query = normalize_query(query.as_deref());
            let outcome = pipeline.run(&query, &file).await?;
            info!(run_id = %outcome.run_id, stages = outcome.stages.len(), "Analysis complete");
            println!("{}", outcome.result);
            Ok(())
        }
    }
}

async fn serve(config: Config, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let state = AppState {
        pipeline,
        staging: StagingArea::new(&config.storage.staging_dir),
    };
    let app = create_router(state, &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
