use std::sync::Arc;

use tracing::{error, info};

use crate::crew::{run_crew, CrewOptions};
use crate::format::format_report;
use crate::provider::CompletionProvider;

pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a topic to research.";
pub const ERROR_PREFIX: &str = "Error during analysis:";

/// Outermost entry point: guard the topic, run the crew, format the result.
/// Every pipeline failure collapses to a single user-facing error string and
/// partial results are discarded.
pub async fn analyze_topic(provider: Arc<dyn CompletionProvider>, topic: &str) -> String {
    if topic.trim().is_empty() {
        return EMPTY_TOPIC_MESSAGE.to_string();
    }

    match run_crew(CrewOptions::new(topic, provider)).await {
        Ok(output) => {
            info!(structured = output.structured.is_some(), "analysis completed");
            format_report(topic, &output)
        }
        Err(err) => {
            error!(error = %err, "analysis failed");
            format!("{ERROR_PREFIX} {err}")
        }
    }
}
