//! Background execution of approved promotions.
//!
//! The queue and the HTTP handler share [`PromotionService::execute_promotion`];
//! the worker simply drains promotion ids and logs the outcome of each run.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::service::PromotionService;
use crate::types::PromotionId;

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

/// Default number of pending executions the queue buffers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Execution queue is full")]
    Full,

    #[error("Execution queue is closed")]
    Closed,
}

/// Sending half of the execution queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExecutionQueue {
    sender: mpsc::Sender<PromotionId>,
}

impl ExecutionQueue {
    /// Create a queue and the worker that drains it.
    pub fn new(service: Arc<PromotionService>, capacity: usize) -> (Self, ExecutionWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, ExecutionWorker { receiver, service })
    }

    /// Create a queue and spawn its worker on the current runtime.
    pub fn start(service: Arc<PromotionService>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (queue, worker) = Self::new(service, capacity);
        let handle = tokio::spawn(worker.run());
        (queue, handle)
    }

    /// Schedule `id` for execution without waiting for it.
    pub fn enqueue(&self, id: PromotionId) -> Result<(), QueueError> {
        self.sender.try_send(id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

/// Receiving half of the execution queue.
pub struct ExecutionWorker {
    receiver: mpsc::Receiver<PromotionId>,
    service: Arc<PromotionService>,
}

impl ExecutionWorker {
    /// Execute queued promotions one at a time until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(id) = self.receiver.recv().await {
            match self.service.execute_promotion(&id).await {
                Ok(request) => info!(
                    promotion_id = %id,
                    status = %request.status(),
                    "Queued promotion finished"
                ),
                Err(e) => warn!(
                    promotion_id = %id,
                    error = %e,
                    "Queued promotion could not be executed"
                ),
            }
        }
        info!("Execution queue closed, worker stopping");
    }
}
