use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use tracing::{debug, info, instrument, warn};

use crate::agents::{ANALYSIS_TASK, ANALYST, REPORT_TASK, RESEARCHER, RESEARCH_TASK, WRITER};
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::schema::ResearchReport;

const REPORT_JSON_INSTRUCTIONS: &str = "\n\nRespond with a single JSON object and nothing else, shaped as:\n\
{\"executive_summary\": string, \"findings\": [{\"title\": string, \"description\": string, \"importance\": \"high\" | \"medium\" | \"low\"}], \
\"recommendations\": [{\"action\": string, \"rationale\": string, \"priority\": integer between 1 and 5}], \"conclusion\": string}";

/// Provider failures do not abort the graph; they are parked in the context
/// and the run ends early so the caller sees a single failure path.
async fn record_failure(context: &Context, task_id: &str, error: impl ToString) -> TaskResult {
    let message = error.to_string();
    warn!(task_id, error = %message, "pipeline stage failed");
    context.set("pipeline.error", message).await;
    TaskResult::new(
        Some(format!("{task_id} stage failed")),
        NextAction::End,
    )
}

pub struct ResearchTask {
    provider: Arc<dyn CompletionProvider>,
}

impl ResearchTask {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Task for ResearchTask {
    fn id(&self) -> &str {
        RESEARCHER.id
    }

    #[instrument(name = "task.research", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let topic: String = context.get("topic").await.unwrap_or_default();

        info!(%topic, "researcher gathering information");

        let request = CompletionRequest {
            system: RESEARCHER.system_prompt(&topic),
            user: RESEARCH_TASK.user_prompt(&topic, &[]),
        };

        let notes = match self.provider.complete(request).await {
            Ok(notes) => notes,
            Err(err) => return Ok(record_failure(&context, self.id(), err).await),
        };

        debug!(chars = notes.len(), "research task populated context");
        context.set("research.notes", &notes).await;

        Ok(TaskResult::new(
            Some(format!("Research completed for \"{topic}\"")),
            NextAction::ContinueAndExecute,
        ))
    }
}

pub struct AnalysisTask {
    provider: Arc<dyn CompletionProvider>,
}

impl AnalysisTask {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Task for AnalysisTask {
    fn id(&self) -> &str {
        ANALYST.id
    }

    #[instrument(name = "task.analysis", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let topic: String = context.get("topic").await.unwrap_or_default();
        let notes: String = context.get("research.notes").await.unwrap_or_default();

        debug!(notes_chars = notes.len(), "analyst synthesizing research");

        let request = CompletionRequest {
            system: ANALYST.system_prompt(&topic),
            user: ANALYSIS_TASK.user_prompt(&topic, &[("Research notes", notes.as_str())]),
        };

        let insights = match self.provider.complete(request).await {
            Ok(insights) => insights,
            Err(err) => return Ok(record_failure(&context, self.id(), err).await),
        };

        info!(chars = insights.len(), "analyst produced insights");
        context.set("analysis.insights", &insights).await;

        Ok(TaskResult::new(
            Some("Analysis prepared".to_string()),
            NextAction::ContinueAndExecute,
        ))
    }
}

pub struct ReportTask {
    provider: Arc<dyn CompletionProvider>,
}

impl ReportTask {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Task for ReportTask {
    fn id(&self) -> &str {
        WRITER.id
    }

    #[instrument(name = "task.report", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let topic: String = context.get("topic").await.unwrap_or_default();
        let notes: String = context.get("research.notes").await.unwrap_or_default();
        let insights: String = context.get("analysis.insights").await.unwrap_or_default();

        let mut user = REPORT_TASK.user_prompt(
            &topic,
            &[
                ("Research notes", notes.as_str()),
                ("Analysis", insights.as_str()),
            ],
        );
        user.push_str(REPORT_JSON_INSTRUCTIONS);

        let request = CompletionRequest {
            system: WRITER.system_prompt(&topic),
            user,
        };

        let reply = match self.provider.complete(request).await {
            Ok(reply) => reply,
            Err(err) => return Ok(record_failure(&context, self.id(), err).await),
        };

        context.set("report.raw", &reply).await;

        match parse_report(&reply) {
            Some(report) => {
                info!(
                    findings = report.findings.len(),
                    recommendations = report.recommendations.len(),
                    "report task produced structured output"
                );
                context.set("report.structured", &report).await;
            }
            None => {
                warn!("report output did not match the schema; keeping raw text");
            }
        }

        Ok(TaskResult::new(
            Some("Report compiled".to_string()),
            NextAction::End,
        ))
    }
}

/// Best-effort schema parse: strip a Markdown code fence if present, then
/// fall back to the outermost brace span. A miss is not an error, the raw
/// text stands in for the report.
fn parse_report(reply: &str) -> Option<ResearchReport> {
    let candidate = strip_code_fence(reply);
    if let Ok(report) = serde_json::from_str(candidate) {
        return Some(report);
    }

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&candidate[start..=end]).ok()
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.rfind("```")
        .map(|fence| rest[..fence].trim())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_JSON: &str = r#"{
        "executive_summary": "S",
        "findings": [{"title": "X", "description": "D", "importance": "high"}],
        "recommendations": [{"action": "A", "rationale": "R", "priority": 3}],
        "conclusion": "C"
    }"#;

    #[test]
    fn parses_bare_json() {
        let report = parse_report(REPORT_JSON).unwrap();
        assert_eq!(report.executive_summary, "S");
        assert_eq!(report.findings[0].title, "X");
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{REPORT_JSON}\n```");
        assert!(parse_report(&fenced).is_some());
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let chatty = format!("Here is the report you asked for:\n{REPORT_JSON}\nLet me know!");
        assert!(parse_report(&chatty).is_some());
    }

    #[test]
    fn rejects_out_of_schema_payloads() {
        assert!(parse_report("plain prose, no json at all").is_none());
        let bad_priority = REPORT_JSON.replace("\"priority\": 3", "\"priority\": 7");
        assert!(parse_report(&bad_priority).is_none());
    }
}
