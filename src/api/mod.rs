//! HTTP surface: one grading endpoint plus a health check.

pub mod error;
pub mod routes;

use std::sync::{Arc, Mutex};

use tokio::task::AbortHandle;

use crate::config::GraderConfig;
use crate::grading::{GradingPipeline, VisionClient};

pub use error::ApiError;
pub use routes::router;

/// Shared per-process state for the API handlers.
///
/// `inflight` tracks the current submission's task so a newer
/// submission can abort and supersede it (last-submitted-wins).
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<GradingPipeline>,
    inflight: Arc<Mutex<Option<AbortHandle>>>,
}

impl ApiContext {
    pub fn new(client: Arc<dyn VisionClient>, config: &GraderConfig) -> Self {
        Self {
            pipeline: Arc::new(GradingPipeline::new(client, config)),
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a new in-flight submission, aborting any previous one.
    pub(crate) fn supersede(&self, handle: AbortHandle) {
        let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
            tracing::debug!("Aborted superseded grading submission");
        }
    }
}
