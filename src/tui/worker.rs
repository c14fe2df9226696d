//! Background worker thread for dashboard runs.
//!
//! The TUI never blocks on the network: it sends `WorkerCommand`s over an
//! `mpsc` channel and polls for `WorkerResponse`s between key events.
//! Every request takes a fresh id from the shared `RunTracker`; responses for
//! anything but the newest id are dropped on both sides of the channel.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::app::pipeline::{self, PipelineContext, RunError, RunOutput};
use crate::app::tracker::RunTracker;
use crate::data::{SeriesRegistry, SeriesSource};
use crate::domain::RunParams;
use crate::error::AppError;
use crate::metrics::stress::StressThresholds;

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Run { run_id: u64, params: RunParams },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug)]
pub enum WorkerResponse {
    Finished { run_id: u64, output: Box<RunOutput> },
    Failed { run_id: u64, error: RunError },
}

impl WorkerResponse {
    pub fn run_id(&self) -> u64 {
        match self {
            WorkerResponse::Finished { run_id, .. } | WorkerResponse::Failed { run_id, .. } => *run_id,
        }
    }
}

/// What the worker thread owns for its whole life.
pub struct WorkerContext {
    pub registry: SeriesRegistry,
    pub thresholds: StressThresholds,
    pub source: Box<dyn SeriesSource>,
}

/// TUI-side handle: submit requests, poll for the newest result.
pub struct Worker {
    tx: Sender<WorkerCommand>,
    rx: Receiver<WorkerResponse>,
    tracker: Arc<RunTracker>,
    _handle: JoinHandle<()>,
}

impl Worker {
    pub fn spawn(ctx: WorkerContext) -> Result<Self, AppError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let tracker = Arc::new(RunTracker::new());
        let worker_tracker = Arc::clone(&tracker);

        let handle = thread::Builder::new()
            .name("fedbs-worker".into())
            .spawn(move || worker_loop(ctx, cmd_rx, resp_tx, worker_tracker))
            .map_err(|e| AppError::new(4, format!("Failed to spawn worker thread: {e}")))?;

        Ok(Self {
            tx: cmd_tx,
            rx: resp_rx,
            tracker,
            _handle: handle,
        })
    }

    /// Start a new run, superseding whatever is in flight. Returns its id.
    pub fn request(&self, params: RunParams) -> Result<u64, AppError> {
        let run_id = self.tracker.begin();
        self.tx
            .send(WorkerCommand::Run { run_id, params })
            .map_err(|_| AppError::new(4, "Worker thread has stopped."))?;
        Ok(run_id)
    }

    /// Supersede whatever is in flight without starting a new run.
    pub fn cancel(&self) {
        self.tracker.begin();
    }

    pub fn is_current(&self, run_id: u64) -> bool {
        self.tracker.is_current(run_id)
    }

    /// Non-blocking: the newest pending response for the current run, if any.
    pub fn poll(&self) -> Option<WorkerResponse> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(resp) if self.tracker.is_current(resp.run_id()) => latest = Some(resp),
                Ok(resp) => {
                    tracing::debug!(run_id = resp.run_id(), "discarding stale worker response");
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        latest
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // A fetch may still be waiting on the network; do not join.
        let _ = self.tx.send(WorkerCommand::Shutdown);
    }
}

fn worker_loop(
    ctx: WorkerContext,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    tracker: Arc<RunTracker>,
) {
    let pipeline_ctx = PipelineContext {
        registry: &ctx.registry,
        source: ctx.source.as_ref(),
        thresholds: &ctx.thresholds,
    };

    while let Ok(cmd) = rx.recv() {
        let Some((run_id, params)) = newest_run(cmd, &rx) else {
            break;
        };

        let ticket = tracker.ticket(run_id);
        let response = match pipeline::run_latest(&pipeline_ctx, &params, &ticket) {
            Ok(output) => WorkerResponse::Finished {
                run_id,
                output: Box::new(output),
            },
            Err(RunError::Superseded) => continue,
            Err(error) => WorkerResponse::Failed { run_id, error },
        };

        if tx.send(response).is_err() {
            break;
        }
    }
    tracing::debug!("worker thread exiting");
}

/// Collapse queued commands so only the most recent run is executed.
/// Returns `None` on shutdown.
fn newest_run(first: WorkerCommand, rx: &Receiver<WorkerCommand>) -> Option<(u64, RunParams)> {
    let mut pending = match first {
        WorkerCommand::Run { run_id, params } => (run_id, params),
        WorkerCommand::Shutdown => return None,
    };
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            WorkerCommand::Run { run_id, params } => pending = (run_id, params),
            WorkerCommand::Shutdown => return None,
        }
    }
    Some(pending)
}
