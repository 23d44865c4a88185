use std::sync::Arc;

use anyhow::{anyhow, Result};
use graph_flow::{
    ExecutionStatus, FlowRunner, GraphBuilder, InMemorySessionStorage, Session, SessionStorage,
    Task,
};
use uuid::Uuid;

use crate::provider::CompletionProvider;
use crate::schema::ResearchReport;
use crate::tasks::{AnalysisTask, ReportTask, ResearchTask};

/// What the engine hands back: a schema-conforming report when the writer's
/// output validated, otherwise just the raw model text.
#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub structured: Option<ResearchReport>,
    pub raw: String,
}

struct CrewTasks {
    research: Arc<ResearchTask>,
    analysis: Arc<AnalysisTask>,
    report: Arc<ReportTask>,
}

fn build_graph(provider: Arc<dyn CompletionProvider>) -> (Arc<graph_flow::Graph>, CrewTasks) {
    let tasks = CrewTasks {
        research: Arc::new(ResearchTask::new(provider.clone())),
        analysis: Arc::new(AnalysisTask::new(provider.clone())),
        report: Arc::new(ReportTask::new(provider)),
    };

    let builder = GraphBuilder::new("reportflow_crew")
        .add_task(tasks.research.clone())
        .add_task(tasks.analysis.clone())
        .add_task(tasks.report.clone())
        .add_edge(tasks.research.id(), tasks.analysis.id())
        .add_edge(tasks.analysis.id(), tasks.report.id())
        .set_start_task(tasks.research.id());

    (Arc::new(builder.build()), tasks)
}

/// Options for one crew run.
pub struct CrewOptions<'a> {
    pub topic: &'a str,
    pub session_id: Option<String>,
    pub provider: Arc<dyn CompletionProvider>,
}

impl<'a> CrewOptions<'a> {
    pub fn new(topic: &'a str, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            topic,
            session_id: None,
            provider,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Run the research -> analysis -> report pipeline to completion. One
/// blocking await; no cancellation, timeout, or partial results.
pub async fn run_crew(options: CrewOptions<'_>) -> Result<CrewOutput> {
    let (graph, tasks) = build_graph(options.provider.clone());

    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = FlowRunner::new(graph, storage.clone());

    let session_id = options
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let session = Session::new_from_task(session_id.clone(), tasks.research.id());
    session.context.set("topic", options.topic.to_string()).await;

    storage
        .save(session)
        .await
        .map_err(|err| anyhow!("failed to persist session: {err}"))?;

    loop {
        let result = runner
            .run(&session_id)
            .await
            .map_err(|err| anyhow!("graph execution failure: {err}"))?;

        match result.status {
            ExecutionStatus::Completed => break,
            ExecutionStatus::WaitingForInput => continue,
            ExecutionStatus::Error(message) => return Err(anyhow!(message)),
        }
    }

    let session = storage
        .get(&session_id)
        .await
        .map_err(|err| anyhow!("failed to reload session: {err}"))?
        .ok_or_else(|| anyhow!("session missing after execution"))?;

    if let Some(error) = session.context.get::<String>("pipeline.error").await {
        return Err(anyhow!(error));
    }

    let structured = session.context.get::<ResearchReport>("report.structured").await;
    let raw: String = session.context.get("report.raw").await.unwrap_or_default();

    Ok(CrewOutput { structured, raw })
}
