use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::response::sse::Event;
use dashmap::DashMap;
use reportflow_core::{format_report, run_crew, CompletionProvider, CrewOptions, ERROR_PREFIX};
use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{self as stream, Stream, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;

/// Static status text shown while the crew runs. It does not track real
/// step completion; the whole pipeline is one blocking call.
pub const PROCESSING_MESSAGE: &str = "## Processing...\n\n\
The multi-agent crew is analyzing your topic. This typically takes 1-3 minutes.\n\n\
**Current Status:**\n\
1. Research Analyst - Gathering comprehensive information...\n\
2. Data Analyst - (waiting)\n\
3. Report Writer - (waiting)\n\n\
Please wait...";

#[derive(Clone)]
pub struct AppState {
    analysis_service: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(config: &AppConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let service = AnalysisService::new(provider, config.max_concurrency);
        Self {
            analysis_service: Arc::new(service),
        }
    }

    pub fn analysis_service(&self) -> Arc<AnalysisService> {
        self.analysis_service.clone()
    }

    pub fn metrics(&self) -> AnalysisMetrics {
        self.analysis_service.metrics()
    }
}

pub struct AnalysisService {
    provider: Arc<dyn CompletionProvider>,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    analyses: Arc<DashMap<String, AnalysisRecord>>,
    streams: Arc<DashMap<String, broadcast::Sender<AnalysisEvent>>>,
}

impl AnalysisService {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            provider,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            analyses: Arc::new(DashMap::new()),
            streams: Arc::new(DashMap::new()),
        }
    }

    /// Spawn one crew run. Returns immediately with the analysis id; the
    /// caller observes progress via `status` or the SSE stream.
    pub fn start_analysis(&self, topic: String) -> String {
        let analysis_id = Uuid::new_v4().to_string();

        let (sender, _rx) = broadcast::channel(8);
        self.streams.insert(analysis_id.clone(), sender.clone());
        self.analyses
            .insert(analysis_id.clone(), AnalysisRecord::Running);
        let _ = sender.send(AnalysisEvent::processing());

        let provider = self.provider.clone();
        let semaphore = self.semaphore.clone();
        let analyses = self.analyses.clone();
        let streams = self.streams.clone();
        let id_for_task = analysis_id.clone();

        tokio::spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    let event = AnalysisEvent::error(&err);
                    let _ = sender.send(event.clone());
                    analyses.insert(
                        id_for_task.clone(),
                        AnalysisRecord::Failed {
                            error: format!("{ERROR_PREFIX} {err}"),
                            event,
                        },
                    );
                    streams.remove(&id_for_task);
                    return;
                }
            };

            let result = run_crew(CrewOptions::new(&topic, provider)).await;
            drop(permit);

            match result {
                Ok(output) => {
                    info!(analysis_id = %id_for_task, "analysis completed");
                    let report = format_report(&topic, &output);
                    let event = AnalysisEvent::completed(&report);
                    analyses.insert(
                        id_for_task.clone(),
                        AnalysisRecord::Completed {
                            report,
                            event: event.clone(),
                        },
                    );
                    let _ = sender.send(event);
                }
                Err(err) => {
                    error!(analysis_id = %id_for_task, error = %err, "analysis failed");
                    let event = AnalysisEvent::error(&err);
                    analyses.insert(
                        id_for_task.clone(),
                        AnalysisRecord::Failed {
                            error: format!("{ERROR_PREFIX} {err}"),
                            event: event.clone(),
                        },
                    );
                    let _ = sender.send(event);
                }
            }

            streams.remove(&id_for_task);
        });

        analysis_id
    }

    pub fn status(&self, analysis_id: &str) -> Option<AnalysisStatus> {
        self.analyses
            .get(analysis_id)
            .map(|record| match record.value() {
                AnalysisRecord::Running => AnalysisStatus {
                    analysis_id: analysis_id.to_string(),
                    state: AnalysisState::Running,
                    report: None,
                    error: None,
                },
                AnalysisRecord::Completed { report, .. } => AnalysisStatus {
                    analysis_id: analysis_id.to_string(),
                    state: AnalysisState::Completed,
                    report: Some(report.clone()),
                    error: None,
                },
                AnalysisRecord::Failed { error, .. } => AnalysisStatus {
                    analysis_id: analysis_id.to_string(),
                    state: AnalysisState::Failed,
                    report: None,
                    error: Some(error.clone()),
                },
            })
    }

    /// Finished runs replay their final event; running ones replay the static
    /// processing message, then forward live events.
    pub fn event_stream(&self, analysis_id: &str) -> Option<SseStream> {
        if let Some(stream) = self.terminal_replay(analysis_id) {
            return Some(stream);
        }

        if let Some(sender) = self.streams.get(analysis_id) {
            let rx = sender.subscribe();
            let live = BroadcastStream::new(rx).filter_map(|event| match event {
                Ok(event) => Some(Result::<Event, Infallible>::Ok(event.into_sse_event())),
                Err(err) => {
                    warn!(error = %err, "analysis event stream closed");
                    None
                }
            });
            let opening = stream::iter(vec![Result::<Event, Infallible>::Ok(
                AnalysisEvent::processing().into_sse_event(),
            )]);
            return Some(Box::pin(opening.chain(live)) as SseStream);
        }

        // The run may have finished between the two lookups, taking its
        // stream entry with it. Check the records once more before 404ing.
        self.terminal_replay(analysis_id)
    }

    fn terminal_replay(&self, analysis_id: &str) -> Option<SseStream> {
        let record = self.analyses.get(analysis_id)?;
        match record.value() {
            AnalysisRecord::Completed { event, .. } | AnalysisRecord::Failed { event, .. } => {
                let event = event.clone().into_sse_event();
                let stream = stream::iter(vec![Result::<Event, Infallible>::Ok(event)]);
                Some(Box::pin(stream) as SseStream)
            }
            AnalysisRecord::Running => None,
        }
    }

    pub fn metrics(&self) -> AnalysisMetrics {
        let running = self
            .analyses
            .iter()
            .filter(|entry| matches!(entry.value(), AnalysisRecord::Running))
            .count();

        AnalysisMetrics {
            max_concurrency: self.max_concurrency,
            available_permits: self.semaphore.available_permits(),
            running_analyses: running,
            total_analyses: self.analyses.len(),
        }
    }
}

pub type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

#[derive(Debug)]
pub enum AnalysisRecord {
    Running,
    Completed {
        report: String,
        event: AnalysisEvent,
    },
    Failed {
        error: String,
        event: AnalysisEvent,
    },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisStatus {
    pub analysis_id: String,
    pub state: AnalysisState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct AnalysisMetrics {
    pub max_concurrency: usize,
    pub available_permits: usize,
    pub running_analyses: usize,
    pub total_analyses: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisEvent {
    pub kind: AnalysisEventKind,
    pub message: String,
}

impl AnalysisEvent {
    pub fn processing() -> Self {
        Self {
            kind: AnalysisEventKind::Processing,
            message: PROCESSING_MESSAGE.to_string(),
        }
    }

    pub fn completed(report: &str) -> Self {
        Self {
            kind: AnalysisEventKind::Completed,
            message: report.to_string(),
        }
    }

    pub fn error(error: &impl std::fmt::Display) -> Self {
        Self {
            kind: AnalysisEventKind::Error,
            message: format!("{ERROR_PREFIX} {error}"),
        }
    }

    pub fn into_sse_event(self) -> Event {
        let data = serde_json::to_string(&self).unwrap_or_else(|_| {
            serde_json::json!({
                "kind": AnalysisEventKind::Error,
                "message": "failed to serialize analysis event",
            })
            .to_string()
        });

        Event::default().event(self.kind.as_str()).data(data)
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisEventKind {
    Processing,
    Completed,
    Error,
}

impl AnalysisEventKind {
    fn as_str(&self) -> &'static str {
        match self {
            AnalysisEventKind::Processing => "processing",
            AnalysisEventKind::Completed => "completed",
            AnalysisEventKind::Error => "error",
        }
    }
}
