//! ReportFlow core abstractions built directly on top of `graph_flow`.
//!
//! This crate describes a three-agent research crew (Research Analyst,
//! Data Analyst, Report Writer) as a linear task graph, runs it through
//! an OpenAI-compatible completion provider, and formats the structured
//! report for display.

mod agents;
mod analyze;
mod config;
mod crew;
mod error;
mod format;
mod provider;
mod schema;
mod tasks;

pub use agents::{
    AgentSpec, TaskSpec, ANALYSIS_TASK, ANALYST, REPORT_TASK, RESEARCHER, RESEARCH_TASK, WRITER,
};
pub use analyze::{analyze_topic, EMPTY_TOPIC_MESSAGE, ERROR_PREFIX};
pub use config::{require_env, LlmConfig, API_KEY_ENV, BASE_URL_ENV, MODEL_ENV};
pub use crew::{run_crew, CrewOptions, CrewOutput};
pub use error::ReportFlowError;
pub use format::format_report;
pub use provider::{CompletionProvider, CompletionRequest, OpenAiProvider};
pub use schema::{
    Finding, Importance, Priority, PriorityOutOfRange, Recommendation, ResearchReport,
};
