//! Sequential execution of a [`BatchPlan`].

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::media::SubtitleExtractorTrait;
use crate::planner::{BatchPlan, ExtractionJob, SkippedFile};
use crate::progress::{
    emit, estimate_remaining, BatchEvent, CancelFlag, EventSender, ProgressSnapshot,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JobStatus {
    Succeeded,
    Failed { reason: String },
    /// Not started because a stop was requested
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub job: ExtractionJob,
    pub status: JobStatus,
    pub elapsed: Duration,
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Per-file line for the log view
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Extracted { path: PathBuf, output: PathBuf },
    Skipped { path: PathBuf, reason: String },
    Failed { path: PathBuf, reason: String },
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted { path, output } => {
                write!(f, "EXTRACTED {} -> {}", path.display(), output.display())
            }
            Self::Skipped { path, reason } => write!(f, "SKIPPED   {} ({})", path.display(), reason),
            Self::Failed { path, reason } => write!(f, "FAILED    {} ({})", path.display(), reason),
        }
    }
}

/// Totals for one batch run.
///
/// `succeeded + failed + skipped == total_files` always holds; jobs that
/// were never started because of a cancel count as skipped.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub started_at: DateTime<Local>,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub results: Vec<ExtractionResult>,
    pub skipped_files: Vec<SkippedFile>,
}

impl BatchSummary {
    fn new(
        plan: BatchPlan,
        results: Vec<ExtractionResult>,
        started_at: DateTime<Local>,
        elapsed: Duration,
        cancelled: bool,
    ) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.status, JobStatus::Failed { .. }))
            .count();
        let not_started = results
            .iter()
            .filter(|r| r.status == JobStatus::Cancelled)
            .count();

        Self {
            batch_id: Uuid::new_v4(),
            started_at,
            total_files: plan.total_files,
            succeeded,
            failed,
            skipped: plan.skipped.len() + not_started,
            cancelled,
            elapsed,
            results,
            skipped_files: plan.skipped,
        }
    }

    /// Write the summary as pretty-printed JSON
    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// One line per candidate file: skips from planning first, then jobs in run order
    pub fn outcomes(&self) -> Vec<FileOutcome> {
        let skipped = self.skipped_files.iter().map(|s| FileOutcome::Skipped {
            path: s.video.path.clone(),
            reason: s.reason.to_string(),
        });
        let ran = self.results.iter().map(|r| {
            let path = r.job.video.path.clone();
            match &r.status {
                JobStatus::Succeeded => FileOutcome::Extracted {
                    path,
                    output: r.job.output_path.clone(),
                },
                JobStatus::Failed { reason } => FileOutcome::Failed {
                    path,
                    reason: reason.clone(),
                },
                JobStatus::Cancelled => FileOutcome::Skipped {
                    path,
                    reason: "cancelled".to_string(),
                },
            }
        });
        skipped.chain(ran).collect()
    }
}

/// Runs jobs one after another against a single extractor
pub struct BatchRunner {
    extractor: Arc<dyn SubtitleExtractorTrait>,
    overwrite: bool,
}

impl BatchRunner {
    pub fn new(extractor: Arc<dyn SubtitleExtractorTrait>, overwrite: bool) -> Self {
        Self { extractor, overwrite }
    }

    pub async fn run(
        &self,
        mut plan: BatchPlan,
        events: Option<&EventSender>,
        cancel: &CancelFlag,
    ) -> BatchSummary {
        let started_at = Local::now();
        let batch_start = Instant::now();
        let jobs = std::mem::take(&mut plan.jobs);
        let total = jobs.len();
        let mut results = Vec::with_capacity(total);

        info!("Running {} extraction job(s)", total);

        for (i, job) in jobs.into_iter().enumerate() {
            if cancel.is_cancelled() {
                results.push(ExtractionResult {
                    job,
                    status: JobStatus::Cancelled,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            emit(events, BatchEvent::JobStarted {
                current: i + 1,
                total,
                path: job.video.path.clone(),
            });

            let job_start = Instant::now();
            let status = match self.extractor.extract(&job, self.overwrite).await {
                Ok(()) => {
                    info!(
                        "Extracted {} subtitle [{}] from {}",
                        job.format,
                        job.language,
                        job.video.path.display()
                    );
                    JobStatus::Succeeded
                }
                Err(e) => {
                    warn!("{}", e);
                    JobStatus::Failed { reason: e.to_string() }
                }
            };

            let result = ExtractionResult {
                job,
                status,
                elapsed: job_start.elapsed(),
            };

            let elapsed = batch_start.elapsed();
            emit(events, BatchEvent::JobFinished(ProgressSnapshot {
                current: i + 1,
                total,
                elapsed,
                remaining: estimate_remaining(elapsed, i + 1, total),
                result: result.clone(),
            }));
            results.push(result);
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            info!("Batch cancelled; completed results are kept");
        }

        BatchSummary::new(plan, results, started_at, batch_start.elapsed(), cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubexError;
    use crate::language::LanguageCode;
    use crate::media::MockSubtitleExtractorTrait;
    use crate::planner::{SkipReason, VideoFile};
    use crate::subtitle::{SubtitleFormat, SubtitleStream};
    use std::path::Path;

    fn job(name: &str) -> ExtractionJob {
        let stream = SubtitleStream::new(0, "heb", "subrip");
        let path = PathBuf::from("/videos").join(name);
        ExtractionJob {
            video: VideoFile {
                path: path.clone(),
                depth: 0,
                streams: vec![stream.clone()],
            },
            stream,
            format: SubtitleFormat::Srt,
            language: LanguageCode::iso639("heb").unwrap(),
            output_path: path.with_extension("heb.srt"),
        }
    }

    fn skipped(name: &str) -> SkippedFile {
        SkippedFile {
            video: VideoFile {
                path: PathBuf::from("/videos").join(name),
                depth: 0,
                streams: Vec::new(),
            },
            reason: SkipReason::NoMatchingStream,
        }
    }

    fn plan(jobs: Vec<ExtractionJob>, skipped: Vec<SkippedFile>) -> BatchPlan {
        BatchPlan {
            total_files: jobs.len() + skipped.len(),
            jobs,
            skipped,
        }
    }

    /// Extractor double that fails for files whose name starts with "d"
    fn extractor() -> Arc<dyn SubtitleExtractorTrait> {
        let mut mock = MockSubtitleExtractorTrait::new();
        mock.expect_extract().returning(|job, _| {
            let name = job.video.path.file_name().unwrap().to_string_lossy().to_string();
            if name.starts_with('d') {
                Err(SubexError::Extraction {
                    path: job.video.path.clone(),
                    detail: "ffmpeg exited with exit status: 1: Invalid argument".to_string(),
                })
            } else {
                Ok(())
            }
        });
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let runner = BatchRunner::new(extractor(), false);
        let summary = runner
            .run(plan(vec![job("a.mkv"), job("d.mkv"), job("e.mkv")], vec![]), None, &CancelFlag::new())
            .await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results.len(), 3);
        match &summary.results[1].status {
            JobStatus::Failed { reason } => assert!(reason.contains("Invalid argument")),
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(summary.results[2].is_success());
    }

    #[tokio::test]
    async fn test_summary_counts_add_up() {
        let runner = BatchRunner::new(extractor(), false);
        let summary = runner
            .run(
                plan(vec![job("a.mkv"), job("d.mkv")], vec![skipped("c.mp4"), skipped("x.avi")]),
                None,
                &CancelFlag::new(),
            )
            .await;

        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.succeeded + summary.failed + summary.skipped, summary.total_files);
        assert!(!summary.cancelled);

        let outcomes = summary.outcomes();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[0].to_string().starts_with("SKIPPED"));
        assert!(outcomes[2].to_string().starts_with("EXTRACTED"));
        assert!(outcomes[3].to_string().starts_with("FAILED"));
    }

    #[tokio::test]
    async fn test_progress_snapshots() {
        let runner = BatchRunner::new(extractor(), false);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        runner
            .run(plan(vec![job("a.mkv"), job("b.mkv")], vec![]), Some(&tx), &CancelFlag::new())
            .await;
        drop(tx);

        let mut finished = Vec::new();
        while let Some(event) = rx.recv().await {
            if let BatchEvent::JobFinished(snapshot) = event {
                finished.push(snapshot);
            }
        }

        assert_eq!(finished.len(), 2);
        assert_eq!((finished[0].current, finished[0].total), (1, 2));
        assert!(finished[0].remaining.is_some());
        assert_eq!(finished[1].remaining, Some(Duration::ZERO));
        assert!(finished[1].result.job.video.path.ends_with("b.mkv"));
    }

    #[tokio::test]
    async fn test_cancel_keeps_completed_results() {
        let cancel = CancelFlag::new();
        let flag = cancel.clone();

        let mut mock = MockSubtitleExtractorTrait::new();
        mock.expect_extract().times(1).returning(move |_, _| {
            flag.cancel();
            Ok(())
        });

        let runner = BatchRunner::new(Arc::new(mock), false);
        let summary = runner
            .run(plan(vec![job("a.mkv"), job("b.mkv"), job("c.mkv")], vec![]), None, &cancel)
            .await;

        assert!(summary.cancelled);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.results[2].status, JobStatus::Cancelled);
        assert_eq!(summary.succeeded + summary.failed + summary.skipped, summary.total_files);
    }

    #[tokio::test]
    async fn test_overwrite_is_passed_through() {
        let mut mock = MockSubtitleExtractorTrait::new();
        mock.expect_extract()
            .withf(|job, overwrite| *overwrite && job.video.path == Path::new("/videos/a.mkv"))
            .times(1)
            .returning(|_, _| Ok(()));

        let runner = BatchRunner::new(Arc::new(mock), true);
        let summary = runner.run(plan(vec![job("a.mkv")], vec![]), None, &CancelFlag::new()).await;
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BatchRunner::new(extractor(), false);
        let summary = runner
            .run(plan(vec![job("a.mkv"), job("d.mkv")], vec![skipped("c.mp4")]), None, &CancelFlag::new())
            .await;

        let path = dir.path().join("report.json");
        summary.write_report(&path).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["total_files"], 3);
        assert_eq!(report["succeeded"], 1);
        assert_eq!(report["failed"], 1);
        assert_eq!(report["skipped"], 1);
        assert_eq!(report["batch_id"], summary.batch_id.to_string());

        let err = summary.write_report(dir.path().join("missing").join("r.json")).unwrap_err();
        assert!(matches!(err, SubexError::Io(_)));
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let runner = BatchRunner::new(Arc::new(MockSubtitleExtractorTrait::new()), false);
        let summary = runner.run(plan(vec![], vec![skipped("c.mp4")]), None, &CancelFlag::new()).await;
        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.results.is_empty());
    }
}
