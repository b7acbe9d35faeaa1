use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::runner::{BatchSummary, ExtractionResult};

/// Channel the batch worker publishes on
pub type EventSender = mpsc::UnboundedSender<BatchEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BatchEvent>;

/// Immutable notifications from the batch worker to the presentation layer
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A candidate file was probed during planning
    Scanning {
        current: usize,
        total: usize,
        path: PathBuf,
    },
    /// Planning finished
    Planned { jobs: usize, skipped: usize },
    /// A job is about to run
    JobStarted {
        current: usize,
        total: usize,
        path: PathBuf,
    },
    /// A job ended, successfully or not
    JobFinished(ProgressSnapshot),
    /// The batch is over
    Finished(BatchSummary),
}

/// Progress after one job
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// 1-based position of the finished job
    pub current: usize,
    pub total: usize,
    /// Time since the batch started running jobs
    pub elapsed: Duration,
    /// None until at least one job has finished
    pub remaining: Option<Duration>,
    pub result: ExtractionResult,
}

/// Send without caring whether anyone is still listening
pub(crate) fn emit(events: Option<&EventSender>, event: BatchEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Running-average estimate of the time left
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 {
        return None;
    }
    let remaining_jobs = total.saturating_sub(completed) as u32;
    let average = elapsed / completed as u32;
    Some(average * remaining_jobs)
}

/// Stop request shared between the presentation layer and the worker.
///
/// Only checked between files, so a running ffmpeg is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
