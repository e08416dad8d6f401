//! Agent System
//!
//! Four role-played agents analyze an uploaded financial report in a fixed
//! order, each one reading the findings of the agents before it:
//!
//! ```text
//! Uploaded PDF + query
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Verifier    │  → Is this a genuine financial report?
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Analyst     │  → Metrics, trends, market context
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │  Advisor     │  → Bull/bear thesis and recommendation
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │ Risk Assessor│  → Risk rating and mitigations
//! └──────────────┘
//!      │
//!      ▼
//!   Analysis
//! ```
//!
//! Agents and tasks are immutable descriptors built once at startup
//! ([`registry::AgentRegistry`]); [`executor::AgentExecutor`] runs one task.

pub mod executor;
pub mod registry;

pub use executor::{AgentExecutor, RunContext, TaskOutput};
pub use registry::{AgentRegistry, Stage, StageKind};

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};

/// An external action an agent may be permitted to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    DocumentRead,
    Search,
}

impl Capability {
    /// Name the model uses to request this action
    pub fn tool_name(&self) -> &'static str {
        match self {
            Capability::DocumentRead => "read_document",
            Capability::Search => "search",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "read_document" | "read financial document" => Some(Capability::DocumentRead),
            "search" | "web_search" => Some(Capability::Search),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::DocumentRead => {
                "returns the full text of the uploaded financial document. The input is ignored."
            }
            Capability::Search => {
                "searches the web for current market, industry and company information. The input is the search query."
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Static role descriptor driving one stage of the pipeline
#[derive(Clone)]
pub struct AgentSpec {
    pub role: String,
    /// May contain `{query}`
    pub goal: String,
    pub backstory: String,
    pub capabilities: Vec<Capability>,
    pub max_iterations: u32,
    pub max_rpm: u32,
    pub allow_delegation: bool,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("max_iterations", &self.max_iterations)
            .field("max_rpm", &self.max_rpm)
            .field("allow_delegation", &self.allow_delegation)
            .finish_non_exhaustive()
    }
}

impl AgentSpec {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        capabilities: Vec<Capability>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            capabilities,
            max_iterations: 5,
            max_rpm: 0,
            allow_delegation: false,
            limiter: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Cap LLM calls for this agent; 0 disables the throttle.
    pub fn with_max_rpm(mut self, max_rpm: u32) -> Self {
        self.max_rpm = max_rpm;
        self.limiter = NonZeroU32::new(max_rpm)
            .map(|rpm| Arc::new(RateLimiter::direct(Quota::per_minute(rpm))));
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn goal_for(&self, query: &str) -> String {
        render_template(&self.goal, query)
    }

    /// Wait until this agent may make another LLM call.
    pub async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Work instruction bound to exactly one agent
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// May contain `{query}`
    pub description: String,
    pub expected_output: String,
    pub capabilities: Vec<Capability>,
    pub async_execution: bool,
}

impl TaskSpec {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        capabilities: Vec<Capability>,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            capabilities,
            async_execution: false,
        }
    }

    pub fn description_for(&self, query: &str) -> String {
        render_template(&self.description, query)
    }
}

/// Substitute the `{query}` placeholder.
pub fn render_template(template: &str, query: &str) -> String {
    template.replace("{query}", query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_round_trip() {
        for capability in [Capability::DocumentRead, Capability::Search] {
            assert_eq!(Capability::from_tool_name(capability.tool_name()), Some(capability));
        }
        assert_eq!(Capability::from_tool_name("Read Financial Document"), Some(Capability::DocumentRead));
        assert_eq!(Capability::from_tool_name("delete_files"), None);
    }

    #[test]
    fn test_goal_template() {
        let agent = AgentSpec::new(
            "Analyst",
            "Answer the user's query: {query}",
            "Experienced.",
            vec![Capability::DocumentRead],
        );
        assert_eq!(agent.goal_for("What is the revenue?"), "Answer the user's query: What is the revenue?");
        assert!(agent.can(Capability::DocumentRead));
        assert!(!agent.can(Capability::Search));
    }

    #[test]
    fn test_max_rpm_builds_limiter() {
        let agent = AgentSpec::new("a", "g", "b", vec![]).with_max_rpm(10);
        assert!(agent.limiter.is_some());
        let agent = agent.with_max_rpm(0);
        assert!(agent.limiter.is_none());
    }

    #[tokio::test]
    async fn test_throttle_allows_burst_up_to_quota() {
        let agent = AgentSpec::new("a", "g", "b", vec![]).with_max_rpm(3);
        let started = std::time::Instant::now();
        for _ in 0..3 {
            agent.throttle().await;
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }
}
