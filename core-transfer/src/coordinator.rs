//! # Batch Coordinator
//!
//! Drives the transport client over a task list on a background task.
//!
//! ## Overview
//!
//! One coordinator serves one device connection. Starting a batch spawns a
//! worker, returns a [`BatchHandle`] immediately, and reports progress
//! through the event bus; the final [`BatchReport`] resolves through the
//! handle's completion channel. The initiating thread is never blocked and
//! nothing is thrown across the background/foreground boundary.
//!
//! ## Semantics
//!
//! - Tasks are processed, and outcomes reported, in caller order.
//! - Cancellation is cooperative and checked only at task boundaries: a task
//!   already mid-transfer finishes, the remaining queue is abandoned, and
//!   results accumulated so far are kept.
//! - A fresh transport session is created per batch and not reused across
//!   unrelated operations.
//! - Per-task failures never abort the batch.

use std::sync::Arc;

use bridge_traits::device::DeviceDriver;
use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
use core_runtime::TransferConfig;
use core_transport::{TransferOutcome, TransportClient};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batch::{BatchId, BatchReport};
use crate::digest;
use crate::error::{Result, TransferError};
use crate::task::TransferTask;

/// Tracks the batch currently running on this coordinator.
struct ActiveBatch {
    batch_id: BatchId,
    token: CancellationToken,
}

/// Handle to a running batch.
pub struct BatchHandle {
    pub batch_id: BatchId,
    token: CancellationToken,
    receiver: oneshot::Receiver<BatchReport>,
}

impl BatchHandle {
    /// Requests cooperative cancellation; the worker stops at the next task
    /// boundary.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for the batch to finish and returns its report.
    pub async fn wait(self) -> Result<BatchReport> {
        self.receiver.await.map_err(|_| TransferError::WorkerLost)
    }
}

/// Coordinates transfer batches for one device connection.
pub struct BatchCoordinator {
    event_bus: Arc<EventBus>,
    active: Arc<Mutex<Option<ActiveBatch>>>,
}

impl BatchCoordinator {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts a batch on a background task.
    ///
    /// Creates a fresh transport session over `driver` with the per-book
    /// timeout from `config`, verifies the device is ready, and rejects the
    /// start when another batch is already running — one session carries one
    /// exchange at a time, so overlapping batches would interleave protocol
    /// calls.
    pub async fn start(
        &self,
        driver: Arc<dyn DeviceDriver>,
        config: &TransferConfig,
        tasks: Vec<TransferTask>,
    ) -> Result<BatchHandle> {
        config.validate()?;

        if tasks.is_empty() {
            return Err(TransferError::EmptyBatch);
        }

        let client = Arc::new(TransportClient::new(driver, config.timeout_secs));
        client.ensure_ready()?;

        let batch_id = BatchId::new();
        let token = CancellationToken::new();

        {
            let mut active = self.active.lock().await;
            if active.is_some() {
                return Err(TransferError::BatchInProgress);
            }
            *active = Some(ActiveBatch {
                batch_id,
                token: token.clone(),
            });
        }

        let total = tasks.len() as u64;
        self.event_bus
            .emit(CoreEvent::Transfer(TransferEvent::Started {
                batch_id: batch_id.to_string(),
                total,
            }))
            .ok();

        let (sender, receiver) = oneshot::channel();
        let event_bus = Arc::clone(&self.event_bus);
        let active = Arc::clone(&self.active);
        let worker_token = token.clone();

        tokio::spawn(async move {
            let report = run_batch(batch_id, tasks, client, &event_bus, &worker_token).await;

            {
                let mut active = active.lock().await;
                *active = None;
            }

            // The caller may have dropped the handle; the report is then
            // observable through events only.
            let _ = sender.send(report);
        });

        info!(%batch_id, total, "started transfer batch");

        Ok(BatchHandle {
            batch_id,
            token,
            receiver,
        })
    }

    /// Requests cancellation of a running batch by ID.
    pub async fn cancel(&self, batch_id: BatchId) -> Result<()> {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(batch) if batch.batch_id == batch_id => {
                batch.token.cancel();
                info!(%batch_id, "cancellation requested");
                Ok(())
            }
            _ => Err(TransferError::BatchNotFound {
                batch_id: batch_id.to_string(),
            }),
        }
    }

    /// Whether a batch is currently running.
    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }
}

fn emit_progress(
    event_bus: &EventBus,
    batch_id: &BatchId,
    current: u64,
    total: u64,
    message: String,
) {
    event_bus
        .emit(CoreEvent::Transfer(TransferEvent::Progress {
            batch_id: batch_id.to_string(),
            current,
            total,
            message,
        }))
        .ok();
}

/// The batch loop. Runs on the worker task.
async fn run_batch(
    batch_id: BatchId,
    tasks: Vec<TransferTask>,
    client: Arc<TransportClient>,
    event_bus: &EventBus,
    token: &CancellationToken,
) -> BatchReport {
    let total = tasks.len() as u64;
    let mut report = BatchReport::new(batch_id);

    for (index, task) in tasks.into_iter().enumerate() {
        if token.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let current = index as u64;
        info!(title = %task.title, "processing transfer task");

        // Hash on the worker, with the metadata copied rather than mutated:
        // enqueued task metadata stays frozen.
        let mut metadata = task.metadata.clone();
        if task.verify_hash {
            emit_progress(
                event_bus,
                &batch_id,
                current,
                total,
                format!("Hashing ({}/{}): {}", index + 1, total, task.title),
            );
            match digest::file_md5(&task.path).await {
                Ok(hash) => metadata = metadata.with_content_hash(hash),
                Err(e) => {
                    warn!(title = %task.title, error = %e, "hash computation failed")
                }
            }
        }

        emit_progress(
            event_bus,
            &batch_id,
            current,
            total,
            format!("Sending ({}/{}): {}", index + 1, total, task.title),
        );

        match client
            .send_one(&task.path, &task.filename, &task.title, &metadata)
            .await
        {
            TransferOutcome::Delivered { lpath } => {
                report.succeeded.push(task.title);
                report.staged.push((lpath, metadata));
            }
            TransferOutcome::DeliveredUnplaced => {
                report.succeeded.push(task.title);
            }
            TransferOutcome::Failed { reason } => {
                report.failed.push((task.title, reason));
            }
        }
    }

    report.error_reports = client.take_error_reports();

    emit_progress(
        event_bus,
        &batch_id,
        total,
        total,
        "Transfer complete".to_string(),
    );

    if report.cancelled {
        event_bus
            .emit(CoreEvent::Transfer(TransferEvent::Cancelled {
                batch_id: batch_id.to_string(),
                completed: report.total_processed(),
            }))
            .ok();
    } else {
        event_bus
            .emit(CoreEvent::Transfer(TransferEvent::Completed {
                batch_id: batch_id.to_string(),
                succeeded: report.succeeded.len() as u64,
                failed: report.failed.len() as u64,
            }))
            .ok();
    }

    report
}
