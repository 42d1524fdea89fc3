//! Bounded background queue for best-effort remote writes.
//!
//! Jobs run in order on a single named worker thread. Each job reports its
//! outcome through the completion callback. Dropping the queue closes the
//! channel, lets the worker drain what is already queued and joins it.

use std::{
    sync::mpsc::{self, Receiver, SyncSender, TrySendError},
    thread::{self, JoinHandle},
};

use crate::{infra::error::AppError, usecases::contracts::StoreError};

const SYNC_QUEUE_FULL: &str = "SYNC_QUEUE_FULL";
const SYNC_QUEUE_WORKER_PANICKED: &str = "SYNC_QUEUE_WORKER_PANICKED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Succeeded,
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("sync queue is full")]
    Full,
    #[error("sync queue is closed")]
    Closed,
}

pub struct SyncQueue<J: Send + 'static> {
    name: &'static str,
    tx: Option<SyncSender<J>>,
    worker: Option<JoinHandle<()>>,
}

impl<J: Send + 'static> SyncQueue<J> {
    pub fn start<H, C>(
        name: &'static str,
        capacity: usize,
        handler: H,
        on_complete: C,
    ) -> Result<Self, AppError>
    where
        H: Fn(&J) -> Result<(), StoreError> + Send + 'static,
        C: Fn(&J, SyncOutcome) + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<J>(capacity.max(1));
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || run_worker(rx, handler, on_complete))
            .map_err(|source| AppError::WorkerSpawn { name, source })?;

        Ok(Self {
            name,
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queues `job` without blocking the caller.
    pub fn enqueue(&self, job: J) -> Result<(), EnqueueError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(EnqueueError::Closed);
        };

        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    code = SYNC_QUEUE_FULL,
                    queue = self.name,
                    "background sync job dropped: queue full"
                );
                Err(EnqueueError::Full)
            }
            Err(TrySendError::Disconnected(_)) => Err(EnqueueError::Closed),
        }
    }
}

impl<J: Send + 'static> Drop for SyncQueue<J> {
    fn drop(&mut self) {
        drop(self.tx.take());

        if let Some(worker) = self.worker.take() {
            if let Err(error) = worker.join() {
                tracing::warn!(
                    code = SYNC_QUEUE_WORKER_PANICKED,
                    queue = self.name,
                    error = ?error,
                    "background sync worker panicked on shutdown"
                );
            }
        }
    }
}

fn run_worker<J, H, C>(rx: Receiver<J>, handler: H, on_complete: C)
where
    H: Fn(&J) -> Result<(), StoreError>,
    C: Fn(&J, SyncOutcome),
{
    for job in rx {
        let outcome = match handler(&job) {
            Ok(()) => SyncOutcome::Succeeded,
            Err(error) => SyncOutcome::Failed(error),
        };
        on_complete(&job, outcome);
    }
}
