//! Bounded worker pool running fan-out tasks detached from requests.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{FanOutContext, FanOutEngine, FanOutReport, FanOutTask};
use crate::config::FanOutSettings;
use crate::server::metrics::{record_fanout_duration, record_fanout_rejected, record_fanout_run};

/// Where triggers hand off fan-out work.
///
/// Submission never blocks and never fails the caller. A task that can't be
/// queued is dropped with a warning.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait FanOutQueue: Send + Sync {
    /// Returns false if the task was dropped.
    fn submit(&self, task: FanOutTask) -> bool;
}

pub struct FanOutWorkerPool {
    sender: mpsc::Sender<FanOutTask>,
    shutdown_token: CancellationToken,
}

impl FanOutWorkerPool {
    /// Spawns the dispatcher. The returned handle completes once the dispatcher
    /// has stopped and every running task has finished.
    pub fn start(
        engine: Arc<FanOutEngine>,
        settings: FanOutSettings,
        shutdown_token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        info!(
            "Starting fan-out pool with {} workers and queue capacity {}",
            settings.workers, settings.queue_capacity
        );
        let handle = tokio::spawn(dispatch_loop(
            receiver,
            engine,
            settings,
            shutdown_token.clone(),
        ));
        (
            Self {
                sender,
                shutdown_token,
            },
            handle,
        )
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

impl FanOutQueue for FanOutWorkerPool {
    fn submit(&self, task: FanOutTask) -> bool {
        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(task)) => {
                warn!("Fan-out queue full, dropping {:?}", task);
                record_fanout_rejected(task.kind(), "queue_full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                warn!("Fan-out pool stopped, dropping {:?}", task);
                record_fanout_rejected(task.kind(), "closed");
                false
            }
        }
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<FanOutTask>,
    engine: Arc<FanOutEngine>,
    settings: FanOutSettings,
    shutdown_token: CancellationToken,
) {
    let workers = Arc::new(Semaphore::new(settings.workers.max(1)));
    let mut running = JoinSet::new();

    loop {
        let task = tokio::select! {
            _ = shutdown_token.cancelled() => break,
            task = receiver.recv() => match task {
                Some(task) => task,
                None => break,
            },
        };

        let permit = tokio::select! {
            _ = shutdown_token.cancelled() => {
                drop_on_shutdown(&task);
                break;
            }
            permit = workers.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    drop_on_shutdown(&task);
                    break;
                }
            },
        };

        let engine = engine.clone();
        let timeout = task.deadline(&settings);
        let task_token = shutdown_token.child_token();
        running.spawn(async move {
            run_task(engine, task, timeout, task_token).await;
            drop(permit);
        });

        while running.try_join_next().is_some() {}
    }

    receiver.close();
    let mut dropped = 0;
    while let Ok(task) = receiver.try_recv() {
        drop_on_shutdown(&task);
        dropped += 1;
    }
    if dropped > 0 {
        warn!("Fan-out dispatcher dropped {} queued tasks on shutdown", dropped);
    }
    if !running.is_empty() {
        info!(
            "Fan-out dispatcher stopping, waiting for {} running tasks",
            running.len()
        );
    }
    while running.join_next().await.is_some() {}
    info!("Fan-out dispatcher stopped");
}

fn drop_on_shutdown(task: &FanOutTask) {
    warn!("Fan-out pool shutting down, dropping {:?}", task);
    record_fanout_rejected(task.kind(), "shutdown");
}

/// Runs one task on the blocking pool under its own deadline.
/// Errors are logged and counted, never propagated.
pub(crate) async fn run_task(
    engine: Arc<FanOutEngine>,
    task: FanOutTask,
    timeout: Duration,
    cancellation_token: CancellationToken,
) -> Option<FanOutReport> {
    let kind = task.kind();
    let start = Instant::now();
    let ctx = FanOutContext::new(timeout, cancellation_token.clone());
    let blocking = tokio::task::spawn_blocking(move || engine.execute(&task, &ctx));

    let report = match tokio::time::timeout(timeout, blocking).await {
        Ok(Ok(Ok(report))) => {
            let outcome = if report.failed > 0 { "partial" } else { "ok" };
            record_fanout_run(kind, outcome);
            debug!("Fan-out {} finished: {:?}", kind, report);
            Some(report)
        }
        Ok(Ok(Err(err))) => {
            record_fanout_run(kind, err.outcome());
            warn!("Fan-out {} aborted: {}", kind, err);
            None
        }
        Ok(Err(join_err)) => {
            record_fanout_run(kind, "panicked");
            error!("Fan-out {} task panicked: {}", kind, join_err);
            None
        }
        Err(_) => {
            // Stops the engine at its next checkpoint
            cancellation_token.cancel();
            record_fanout_run(kind, "timeout");
            warn!("Fan-out {} exceeded {:?}", kind, timeout);
            None
        }
    };
    record_fanout_duration(kind, start.elapsed());
    report
}
