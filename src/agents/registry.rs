//! The fixed four-stage agent/task table.

use std::fmt;

use serde::Serialize;

use crate::agents::{AgentSpec, Capability, TaskSpec};
use crate::types::{AppError, AppResult};

const MAX_ITERATIONS: u32 = 5;
const MAX_RPM: u32 = 10;

/// Position of a stage in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Verification,
    Analysis,
    Investment,
    Risk,
}

impl StageKind {
    pub const ORDER: [StageKind; 4] = [
        StageKind::Verification,
        StageKind::Analysis,
        StageKind::Investment,
        StageKind::Risk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Verification => "Verification",
            StageKind::Analysis => "Analysis",
            StageKind::Investment => "Investment",
            StageKind::Risk => "Risk",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One (agent, task) pair
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    pub agent: AgentSpec,
    pub task: TaskSpec,
}

/// Immutable, ordered stage table shared by every run
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    stages: Vec<Stage>,
}

impl AgentRegistry {
    /// Build a registry, rejecting tables that break the pipeline's invariants.
    pub fn new(stages: Vec<Stage>) -> AppResult<Self> {
        let kinds: Vec<StageKind> = stages.iter().map(|s| s.kind).collect();
        if kinds != StageKind::ORDER {
            return Err(AppError::Configuration(format!(
                "stages must run in the order {:?}, got {:?}",
                StageKind::ORDER,
                kinds
            )));
        }

        for stage in &stages {
            if let Some(missing) = stage
                .task
                .capabilities
                .iter()
                .find(|c| !stage.agent.can(**c))
            {
                return Err(AppError::Configuration(format!(
                    "{} task needs '{}' but agent '{}' lacks it",
                    stage.kind, missing, stage.agent.role
                )));
            }
        }

        Ok(Self { stages })
    }

    /// The verifier / analyst / advisor / risk assessor table.
    pub fn financial_analysis() -> AppResult<Self> {
        let stages = vec![
            Stage {
                kind: StageKind::Verification,
                agent: verifier(),
                task: verification_task(),
            },
            Stage {
                kind: StageKind::Analysis,
                agent: financial_analyst(),
                task: analysis_task(),
            },
            Stage {
                kind: StageKind::Investment,
                agent: investment_advisor(),
                task: investment_task(),
            },
            Stage {
                kind: StageKind::Risk,
                agent: risk_assessor(),
                task: risk_task(),
            },
        ];

        Self::new(stages)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

fn verifier() -> AgentSpec {
    AgentSpec::new(
        "Financial Document Verification Specialist",
        "Verify that uploaded documents are valid financial documents and extract key metadata such as \
         document type, reporting period, and issuing entity.",
        "You are a compliance and document verification specialist with deep expertise in financial \
         reporting standards (GAAP, IFRS). You carefully inspect documents to confirm they are genuine \
         financial reports, checking for standard sections like income statements, balance sheets, \
         cash flow statements, and notes to financial statements. You flag any anomalies or missing \
         sections and provide a clear verification summary.",
        vec![Capability::DocumentRead],
    )
    .with_max_iterations(MAX_ITERATIONS)
    .with_max_rpm(MAX_RPM)
}

fn financial_analyst() -> AgentSpec {
    AgentSpec::new(
        "Senior Financial Analyst",
        "Analyze financial documents thoroughly and provide accurate, data-driven insights for the \
         user's query: {query}",
        "You are a seasoned financial analyst with over 15 years of experience in corporate finance, \
         equity research, and investment banking. You hold a CFA charter and have a strong track record \
         of evaluating financial statements, identifying key financial metrics, and providing actionable \
         investment insights. You rely strictly on data from the provided documents and reputable sources. \
         You never fabricate data or make unsubstantiated claims.",
        vec![Capability::DocumentRead, Capability::Search],
    )
    .with_max_iterations(MAX_ITERATIONS)
    .with_max_rpm(MAX_RPM)
}

fn investment_advisor() -> AgentSpec {
    AgentSpec::new(
        "Investment Strategy Advisor",
        "Provide well-reasoned investment recommendations based on the financial analysis, \
         aligned with sound portfolio management principles and the user's query: {query}",
        "You are a certified investment advisor with expertise in portfolio construction, asset allocation, \
         and risk-adjusted returns. You base your recommendations on fundamental analysis, valuation metrics, \
         and current market conditions. You always consider the investor's risk tolerance and time horizon. \
         You provide balanced advice that includes both opportunities and risks, and you never recommend \
         products without transparent disclosure of fees and risks.",
        vec![Capability::DocumentRead, Capability::Search],
    )
    .with_max_iterations(MAX_ITERATIONS)
    .with_max_rpm(MAX_RPM)
}

fn risk_assessor() -> AgentSpec {
    AgentSpec::new(
        "Financial Risk Assessment Analyst",
        "Conduct a thorough risk assessment of the financial position described in the document, \
         identifying key risk factors, their potential impact, and mitigation strategies.",
        "You are a risk management professional with expertise in market risk, credit risk, liquidity risk, \
         and operational risk. You use established risk frameworks (VaR, stress testing, scenario analysis) \
         to evaluate financial positions. You provide balanced risk assessments that quantify exposure where \
         possible and suggest practical mitigation strategies. You never downplay or exaggerate risks.",
        vec![Capability::DocumentRead, Capability::Search],
    )
    .with_max_iterations(MAX_ITERATIONS)
    .with_max_rpm(MAX_RPM)
}

fn verification_task() -> TaskSpec {
    TaskSpec::new(
        "Read the financial document at the provided file path using the read_document action.\n\
         Verify that it is a legitimate financial document (e.g., quarterly report, annual report, \
         earnings release, financial statement).\n\
         Identify and extract:\n\
         - Document type (10-K, 10-Q, earnings release, etc.)\n\
         - Reporting entity / company name\n\
         - Reporting period\n\
         - Key sections present (income statement, balance sheet, cash flow, etc.)\n\
         If the document is not a financial report, clearly state that and explain why.",
        "A verification summary including:\n\
         - Whether the document is a valid financial report (Yes/No)\n\
         - Document type and reporting entity\n\
         - Reporting period covered\n\
         - List of key financial sections identified\n\
         - Any anomalies or missing sections noted",
        vec![Capability::DocumentRead],
    )
}

fn analysis_task() -> TaskSpec {
    TaskSpec::new(
        "Analyze the financial document thoroughly to address the user's query: {query}\n\
         Use the read_document action to extract data from the document.\n\
         Focus on:\n\
         - Key financial metrics (revenue, net income, EPS, margins, cash flow)\n\
         - Year-over-year and quarter-over-quarter trends\n\
         - Notable items, one-time charges, or unusual entries\n\
         - Industry context using the search action for current market data\n\
         Base all analysis strictly on the document data and verified external sources.",
        "A detailed financial analysis report containing:\n\
         - Executive summary of financial performance\n\
         - Key financial metrics with actual figures from the document\n\
         - Trend analysis (YoY / QoQ comparisons)\n\
         - Notable findings and their implications\n\
         - Relevant market context from verified sources with proper citations",
        vec![Capability::DocumentRead, Capability::Search],
    )
}

fn investment_task() -> TaskSpec {
    TaskSpec::new(
        "Based on the financial analysis, provide investment recommendations for the user's query: {query}\n\
         Consider:\n\
         - Valuation metrics (P/E, P/B, EV/EBITDA) relative to industry peers\n\
         - Growth trajectory and sustainability of earnings\n\
         - Competitive position and market dynamics\n\
         - Balance sheet strength and capital allocation strategy\n\
         Provide balanced recommendations that include both bull and bear cases.",
        "An investment analysis report including:\n\
         - Investment thesis (bull case and bear case)\n\
         - Key valuation metrics and peer comparison\n\
         - Growth drivers and potential headwinds\n\
         - Recommended investment action with rationale\n\
         - Important caveats and disclaimers",
        vec![Capability::DocumentRead, Capability::Search],
    )
}

fn risk_task() -> TaskSpec {
    TaskSpec::new(
        "Conduct a comprehensive risk assessment based on the financial document.\n\
         Address the user's query: {query}\n\
         Evaluate:\n\
         - Financial risks (leverage, liquidity, solvency ratios)\n\
         - Market risks (sensitivity to macro conditions, currency, interest rates)\n\
         - Operational risks (supply chain, concentration, regulatory)\n\
         - Company-specific risks identified in the document\n\
         Quantify risks where possible using data from the document.",
        "A structured risk assessment including:\n\
         - Risk summary with overall risk rating (Low / Medium / High)\n\
         - Financial risk analysis with key ratios\n\
         - Market and operational risk factors\n\
         - Risk mitigation strategies observed or recommended\n\
         - Comparison to industry risk benchmarks where available",
        vec![Capability::DocumentRead, Capability::Search],
    )
}
