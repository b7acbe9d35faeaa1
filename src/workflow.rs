use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, SubexError};
use crate::media::{MediaFactory, MediaProbeTrait, SubtitleExtractorTrait};
use crate::planner::{BatchPlan, BatchPlanner, BatchRequest};
use crate::progress::{emit, BatchEvent, CancelFlag, EventReceiver};
use crate::runner::{BatchRunner, BatchSummary};
use crate::subtitle::SubtitleStream;

/// A batch running on its own task
pub struct BatchHandle {
    pub events: EventReceiver,
    pub cancel: CancelFlag,
    task: JoinHandle<Result<BatchSummary>>,
}

impl BatchHandle {
    /// Stop the worker at its next await point; a running tool is killed
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the worker to finish
    pub async fn wait(self) -> Result<BatchSummary> {
        self.task.await.map_err(|e| {
            if e.is_cancelled() {
                SubexError::Worker("batch aborted".to_string())
            } else {
                SubexError::Worker(e.to_string())
            }
        })?
    }
}

pub struct Workflow {
    config: Config,
    probe: Arc<dyn MediaProbeTrait>,
    extractor: Arc<dyn SubtitleExtractorTrait>,
}

impl Workflow {
    /// Build the ffmpeg-backed workflow, failing early if either tool is missing
    pub async fn new(config: Config) -> Result<Self> {
        let probe = MediaFactory::create_probe(&config.tools);
        let extractor = MediaFactory::create_extractor(&config.tools);

        // Check dependencies
        probe.check_availability().await?;
        extractor.check_availability().await?;

        Ok(Self::with_tools(config, probe, extractor))
    }

    pub fn with_tools(
        config: Config,
        probe: Arc<dyn MediaProbeTrait>,
        extractor: Arc<dyn SubtitleExtractorTrait>,
    ) -> Self {
        Self {
            config,
            probe,
            extractor,
        }
    }

    fn planner(&self) -> BatchPlanner {
        BatchPlanner::new(self.probe.clone(), self.config.extraction.video_extensions.clone())
    }

    /// Plan without extracting anything
    pub async fn plan(&self, request: &BatchRequest) -> Result<BatchPlan> {
        self.planner().plan(request, None, &CancelFlag::new()).await
    }

    /// Subtitle streams of a single file
    pub async fn probe_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<SubtitleStream>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SubexError::FileNotFound(path.display().to_string()));
        }
        self.probe.probe(path).await
    }

    /// Version lines of the prober and the converter
    pub async fn tool_versions(&self) -> Result<(String, String)> {
        Ok((self.probe.version_info().await?, self.extractor.version_info().await?))
    }

    /// Plan and run the batch on a separate task.
    ///
    /// Progress arrives on `handle.events`; the last event is
    /// [`BatchEvent::Finished`] unless planning itself fails.
    pub fn start(&self, request: BatchRequest) -> BatchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();

        let planner = self.planner();
        let runner = BatchRunner::new(self.extractor.clone(), request.overwrite);
        let worker_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            info!(
                "Starting batch in {} for language '{}' as {}",
                request.root.display(),
                request.language,
                request.format
            );
            let plan = planner.plan(&request, Some(&tx), &worker_cancel).await?;
            let summary = runner.run(plan, Some(&tx), &worker_cancel).await;
            info!(
                "Batch finished: {} extracted, {} skipped, {} failed",
                summary.succeeded, summary.skipped, summary.failed
            );
            emit(Some(&tx), BatchEvent::Finished(summary.clone()));
            Ok(summary)
        });

        BatchHandle {
            events: rx,
            cancel,
            task,
        }
    }
}
