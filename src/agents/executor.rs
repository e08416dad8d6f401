//! Agent Executor
//!
//! Runs one task as a bounded reason/act loop. Every iteration waits on the
//! agent's rate limiter and makes one LLM call. The model answers with a
//! JSON object that either requests an action (`read_document`, `search`) or
//! carries the final answer; action results are fed back as observations.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agents::{Capability, Stage, StageKind};
use crate::llm::LLM;
use crate::search::{format_hits, SearchProvider};
use crate::types::{AppError, AppResult, LLMMessage};

/// Output of one completed stage
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub stage: StageKind,
    pub agent_role: String,
    pub output: String,
    pub iterations: u32,
    pub tool_calls: u32,
    pub search_degraded: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything a stage can see about the current run
pub struct RunContext<'a> {
    pub query: &'a str,
    pub document_path: &'a Path,
    pub document_text: &'a str,
    /// Outputs of the stages that already completed, in order
    pub prior: &'a [TaskOutput],
}

/// What the model asked for in one reply
#[derive(Debug, Clone, PartialEq)]
enum AgentAction {
    UseTool { name: String, input: String },
    FinalAnswer(String),
}

#[derive(Debug, Deserialize)]
struct RawReply {
    action: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
    final_answer: Option<serde_json::Value>,
}

pub struct AgentExecutor {
    llm: LLM,
    search: Arc<dyn SearchProvider>,
    max_document_chars: usize,
}

impl AgentExecutor {
    pub fn new(llm: LLM, search: Arc<dyn SearchProvider>, max_document_chars: usize) -> Self {
        Self {
            llm,
            search,
            max_document_chars,
        }
    }

    pub async fn execute(&self, stage: &Stage, run: &RunContext<'_>) -> AppResult<TaskOutput> {
        let started_at = Utc::now();
        let agent = &stage.agent;
        let max_iterations = agent.max_iterations.max(1);

        info!(
            stage = %stage.kind,
            role = %agent.role,
            prior_outputs = run.prior.len(),
            "Starting task"
        );

        let system = Self::system_prompt(stage, run.query);
        let mut messages = vec![LLMMessage::user(Self::task_prompt(stage, run))];
        let mut tool_calls = 0;
        let mut search_degraded = false;

        for iteration in 1..=max_iterations {
            let last = iteration == max_iterations;
            if last && iteration > 1 {
                messages.push(LLMMessage::user(
                    "You have reached the maximum number of steps. Do not request any more actions. \
                     Respond now with {\"final_answer\": \"...\"} using what you have gathered.",
                ));
            }

            agent.throttle().await;
            let response = self
                .llm
                .complete(&system, messages.clone())
                .await
                .map_err(|e| AppError::orchestration(stage.kind, e.to_string()))?;

            debug!(
                stage = %stage.kind,
                iteration,
                tokens = response.usage.total_tokens,
                "Agent replied"
            );

            match parse_agent_reply(&response.content) {
                AgentAction::FinalAnswer(answer) => {
                    if answer.trim().is_empty() {
                        return Err(AppError::orchestration(
                            stage.kind,
                            "agent returned an empty final answer",
                        ));
                    }

                    info!(stage = %stage.kind, iteration, tool_calls, "Task complete");
                    return Ok(TaskOutput {
                        stage: stage.kind,
                        agent_role: agent.role.clone(),
                        output: answer.trim().to_string(),
                        iterations: iteration,
                        tool_calls,
                        search_degraded,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
                AgentAction::UseTool { name, input } => {
                    if last {
                        break;
                    }

                    tool_calls += 1;
                    let observation = match Capability::from_tool_name(&name) {
                        Some(capability) if agent.can(capability) => {
                            info!(stage = %stage.kind, iteration, tool = %capability, "Invoking capability");
                            match capability {
                                Capability::DocumentRead => self.read_document(run),
                                Capability::Search => {
                                    let (text, degraded) = self.search(stage.kind, &input, run.query).await;
                                    search_degraded |= degraded;
                                    text
                                }
                            }
                        }
                        Some(capability) => {
                            warn!(stage = %stage.kind, tool = %capability, "Capability not permitted");
                            format!(
                                "The action '{}' is not available to you. Available actions: {}.",
                                capability,
                                Self::action_list(stage)
                            )
                        }
                        None => format!(
                            "Unknown action '{}'. Available actions: {}.",
                            name,
                            Self::action_list(stage)
                        ),
                    };

                    messages.push(LLMMessage::assistant(response.content));
                    messages.push(LLMMessage::user(format!("Observation:\n{}", observation)));
                }
            }
        }

        Err(AppError::orchestration(
            stage.kind,
            format!("agent gave no final answer within {} iterations", max_iterations),
        ))
    }

    fn read_document(&self, run: &RunContext<'_>) -> String {
        let text = run.document_text;
        match text.char_indices().nth(self.max_document_chars) {
            Some((cut, _)) => format!(
                "{}\n[document truncated after {} characters]",
                &text[..cut],
                self.max_document_chars
            ),
            None => text.to_string(),
        }
    }

    /// Search failures degrade to an observation; the stage carries on.
    async fn search(&self, stage: StageKind, input: &str, query: &str) -> (String, bool) {
        let search_query = if input.trim().is_empty() { query } else { input.trim() };

        match self.search.search(search_query).await {
            Ok(hits) => (format_hits(search_query, &hits), false),
            Err(e) => {
                let err = AppError::from(e);
                warn!(stage = %stage, error = %err, "Continuing without search context");
                (
                    format!(
                        "Web search is unavailable ({}). Continue using the document and earlier findings.",
                        err
                    ),
                    true,
                )
            }
        }
    }

    fn action_list(stage: &Stage) -> String {
        if stage.agent.capabilities.is_empty() {
            return "none".to_string();
        }
        stage
            .agent
            .capabilities
            .iter()
            .map(|c| c.tool_name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn system_prompt(stage: &Stage, query: &str) -> String {
        let agent = &stage.agent;
        let mut prompt = format!(
            "You are {role}.\n{backstory}\n\nYour personal goal is: {goal}\n\n",
            role = agent.role,
            backstory = agent.backstory,
            goal = agent.goal_for(query),
        );

        if agent.capabilities.is_empty() {
            prompt.push_str("You have no actions available; answer from the context you are given.\n\n");
        } else {
            prompt.push_str("You can use these actions:\n");
            for capability in &agent.capabilities {
                prompt.push_str(&format!("- {}: {}\n", capability.tool_name(), capability.description()));
            }
            prompt.push('\n');
        }

        prompt.push_str(
            "Respond with exactly one JSON object and nothing else.\n\
             To use an action: {\"action\": \"<action name>\", \"input\": \"<action input>\"}\n\
             When you are done: {\"final_answer\": \"<your complete answer>\"}",
        );
        prompt
    }

    fn task_prompt(stage: &Stage, run: &RunContext<'_>) -> String {
        let mut prompt = format!(
            "Current task: {description}\n\n\
             Document reference: {path}\n\
             User query: {query}\n\n\
             This is the expected criteria for your final answer:\n{expected}\n",
            description = stage.task.description_for(run.query),
            path = run.document_path.display(),
            query = run.query,
            expected = stage.task.expected_output,
        );

        if !run.prior.is_empty() {
            prompt.push_str("\nContext from earlier stages:\n");
            for output in run.prior {
                prompt.push_str(&format!(
                    "\n### {} ({})\n{}\n",
                    output.stage, output.agent_role, output.output
                ));
            }
        }

        prompt.push_str("\nBegin! Work through the task and return your final answer.");
        prompt
    }
}

/// Interpret a model reply; anything that is not the JSON protocol is a final answer.
fn parse_agent_reply(content: &str) -> AgentAction {
    let json_str = if content.contains("```json") {
        content
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(content)
            .trim()
    } else if content.contains("```") {
        content.split("```").nth(1).unwrap_or(content).trim()
    } else {
        content.trim()
    };

    let raw: RawReply = match serde_json::from_str(json_str) {
        Ok(raw) => raw,
        Err(_) => return AgentAction::FinalAnswer(content.trim().to_string()),
    };

    if let Some(answer) = raw.final_answer {
        return AgentAction::FinalAnswer(value_to_text(answer));
    }

    match raw.action {
        Some(name) => AgentAction::UseTool {
            name,
            input: raw.input.map(value_to_text).unwrap_or_default(),
        },
        None => AgentAction::FinalAnswer(content.trim().to_string()),
    }
}

fn value_to_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}
