use async_trait::async_trait;
use chrono::{DateTime, Utc};
use netgrid_core::Row;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Declarative query handed to the dataset service; building and transport
/// are the service's problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDescriptor {
    pub search: String,
    pub fields: Vec<String>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub max_rows: usize,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query was cancelled")]
    Cancelled,
    #[error("query failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait QueryService: Send + Sync {
    async fn run(&self, query: &QueryDescriptor) -> Result<Vec<Row>, QueryError>;
}

/// Outcome of one dispatched query, tagged with the dispatch generation so
/// the consumer can discard stale responses.
#[derive(Debug)]
pub struct QueryOutcome {
    pub generation: u64,
    pub result: Result<Vec<Row>, QueryError>,
}

/// Dispatches queries with last-request-wins semantics: issuing a new query
/// aborts the in-flight task and bumps the generation, so a slow response
/// from an earlier dispatch can never overwrite newer graph state.
pub struct QueryRunner {
    service: Arc<dyn QueryService>,
    outcomes: mpsc::Sender<QueryOutcome>,
    inflight: Option<JoinHandle<()>>,
    generation: u64,
}

impl QueryRunner {
    pub fn new(service: Arc<dyn QueryService>, outcomes: mpsc::Sender<QueryOutcome>) -> Self {
        Self {
            service,
            outcomes,
            inflight: None,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn dispatch(&mut self, query: QueryDescriptor) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
        self.generation += 1;
        let generation = self.generation;
        tracing::debug!(generation, search = %query.search, "dispatching query");

        let service = Arc::clone(&self.service);
        let outcomes = self.outcomes.clone();
        self.inflight = Some(tokio::spawn(async move {
            let result = service.run(&query).await;
            if outcomes
                .send(QueryOutcome { generation, result })
                .await
                .is_err()
            {
                tracing::warn!(generation, "query outcome receiver dropped");
            }
        }));
    }

    /// Abort the in-flight query, if any; any response already racing back
    /// becomes stale.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
        self.generation += 1;
    }
}

impl Drop for QueryRunner {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}
