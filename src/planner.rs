//! Turns a directory selection into an ordered list of extraction jobs.
//!
//! Every candidate video ends up either as exactly one [`ExtractionJob`] or
//! as one [`SkippedFile`]; a probe failure on one file never stops the scan.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::has_video_extension;
use crate::error::{Result, SubexError};
use crate::language::LanguageCode;
use crate::media::MediaProbeTrait;
use crate::progress::{emit, BatchEvent, CancelFlag, EventSender};
use crate::subtitle::{output_path_for, SubtitleFormat, SubtitleStream};

/// A candidate video and what the prober found in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoFile {
    pub path: PathBuf,
    /// Directories between the scan root and the file (0 = directly in root)
    pub depth: usize,
    pub streams: Vec<SubtitleStream>,
}

/// One stream of one file going to one output file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionJob {
    pub video: VideoFile,
    pub stream: SubtitleStream,
    pub format: SubtitleFormat,
    pub language: LanguageCode,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    NoMatchingStream,
    ProbeFailed(String),
    OutputExists(PathBuf),
    DuplicateOutput(PathBuf),
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchingStream => write!(f, "no matching language"),
            Self::ProbeFailed(detail) => write!(f, "probe failed: {}", detail),
            Self::OutputExists(path) => write!(f, "{} already exists", path.display()),
            Self::DuplicateOutput(path) => {
                write!(f, "{} is already written by another file", path.display())
            }
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub video: VideoFile,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchPlan {
    pub jobs: Vec<ExtractionJob>,
    pub skipped: Vec<SkippedFile>,
    /// Candidate videos found by the scan
    pub total_files: usize,
}

/// What the user asked for
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub root: PathBuf,
    /// Directories to scan, relative to `root` or absolute inside it.
    /// Empty means the root itself.
    pub subdirectories: Vec<PathBuf>,
    pub language: LanguageCode,
    pub format: SubtitleFormat,
    /// Flat output directory; None writes next to each video
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
}

/// A directory under the root that holds video somewhere below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdirectoryEntry {
    pub path: PathBuf,
    /// 1 for direct children of the root
    pub depth: usize,
    /// Videos directly inside this directory
    pub video_count: usize,
}

/// Lowest-index stream whose language matches.
///
/// Containers may carry several tracks in the same language (forced, SDH,
/// commentary); the first one in stream order is taken.
pub fn select_stream<'a>(
    streams: &'a [SubtitleStream],
    language: &LanguageCode,
) -> Option<&'a SubtitleStream> {
    streams
        .iter()
        .filter(|stream| language.matches(&stream.language))
        .min_by_key(|stream| stream.index)
}

fn relative_depth(root: &Path, dir: &Path) -> usize {
    dir.strip_prefix(root)
        .map(|rel| rel.components().count())
        .unwrap_or(0)
}

fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let canonical = std::fs::canonicalize(path).map_err(|e| {
        SubexError::InvalidSelection(format!("{}: {}", path.display(), e))
    })?;
    if !canonical.is_dir() {
        return Err(SubexError::InvalidSelection(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(canonical)
}

/// List directories below `root` containing video files at any depth
pub fn discover_subdirectories(root: &Path, extensions: &[String]) -> Result<Vec<SubdirectoryEntry>> {
    let root = canonical_dir(root)?;
    let mut found: BTreeMap<PathBuf, SubdirectoryEntry> = BTreeMap::new();

    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !has_video_extension(entry.path(), extensions) {
            continue;
        }
        let Some(parent) = entry.path().parent() else {
            continue;
        };

        for (level, dir) in parent.ancestors().enumerate() {
            if dir == root || !dir.starts_with(&root) {
                break;
            }
            let record = found.entry(dir.to_path_buf()).or_insert_with(|| SubdirectoryEntry {
                path: dir.to_path_buf(),
                depth: relative_depth(&root, dir),
                video_count: 0,
            });
            if level == 0 {
                record.video_count += 1;
            }
        }
    }

    Ok(found.into_values().collect())
}

/// Walks the selection and probes each candidate
pub struct BatchPlanner {
    probe: Arc<dyn MediaProbeTrait>,
    video_extensions: Vec<String>,
}

impl BatchPlanner {
    pub fn new(probe: Arc<dyn MediaProbeTrait>, video_extensions: Vec<String>) -> Self {
        Self {
            probe,
            video_extensions,
        }
    }

    /// Resolve the selection and list candidate videos in walk order,
    /// each file at most once.
    pub fn collect_video_files(&self, root: &Path, selected: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let root = canonical_dir(root)?;

        let mut directories = Vec::new();
        if selected.is_empty() {
            directories.push(root.clone());
        }
        for dir in selected {
            let resolved = canonical_dir(&root.join(dir))?;
            if !resolved.starts_with(&root) {
                return Err(SubexError::InvalidSelection(format!(
                    "{} is outside {}",
                    dir.display(),
                    root.display()
                )));
            }
            directories.push(resolved);
        }

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for dir in &directories {
            for entry in WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file()
                    && has_video_extension(entry.path(), &self.video_extensions)
                    && seen.insert(entry.path().to_path_buf())
                {
                    files.push(entry.into_path());
                }
            }
        }

        info!("Found {} video files in {} directories", files.len(), directories.len());
        Ok(files)
    }

    /// Probe every candidate and decide job or skip for each
    pub async fn plan(
        &self,
        request: &BatchRequest,
        events: Option<&EventSender>,
        cancel: &CancelFlag,
    ) -> Result<BatchPlan> {
        let root = canonical_dir(&request.root)?;
        let candidates = self.collect_video_files(&root, &request.subdirectories)?;
        let total = candidates.len();

        let mut plan = BatchPlan {
            total_files: total,
            ..BatchPlan::default()
        };
        let mut claimed_outputs = HashSet::new();

        for (i, path) in candidates.into_iter().enumerate() {
            let depth = path
                .parent()
                .map(|dir| relative_depth(&root, dir))
                .unwrap_or(0);

            if cancel.is_cancelled() {
                plan.skipped.push(SkippedFile {
                    video: VideoFile { path, depth, streams: Vec::new() },
                    reason: SkipReason::Cancelled,
                });
                continue;
            }

            emit(events, BatchEvent::Scanning {
                current: i + 1,
                total,
                path: path.clone(),
            });

            let streams = match self.probe.probe(&path).await {
                Ok(streams) => streams,
                Err(e) => {
                    warn!("{}", e);
                    plan.skipped.push(SkippedFile {
                        video: VideoFile { path, depth, streams: Vec::new() },
                        reason: SkipReason::ProbeFailed(e.to_string()),
                    });
                    continue;
                }
            };

            let video = VideoFile { path, depth, streams };
            let Some(stream) = select_stream(&video.streams, &request.language).cloned() else {
                debug!("No '{}' subtitle stream in {}", request.language, video.path.display());
                plan.skipped.push(SkippedFile {
                    video,
                    reason: SkipReason::NoMatchingStream,
                });
                continue;
            };

            let output_path = output_path_for(
                &video.path,
                request.output_dir.as_deref(),
                &request.language,
                request.format,
            )?;

            if !claimed_outputs.insert(output_path.clone()) {
                plan.skipped.push(SkippedFile {
                    video,
                    reason: SkipReason::DuplicateOutput(output_path),
                });
                continue;
            }
            if !request.overwrite && output_path.exists() {
                plan.skipped.push(SkippedFile {
                    video,
                    reason: SkipReason::OutputExists(output_path),
                });
                continue;
            }

            debug!(
                "Planned stream {} ({}) of {}",
                stream.index,
                stream.codec_name,
                video.path.display()
            );
            plan.jobs.push(ExtractionJob {
                video,
                stream,
                format: request.format,
                language: request.language.clone(),
                output_path,
            });
        }

        info!(
            "Planned {} extraction(s), {} file(s) skipped",
            plan.jobs.len(),
            plan.skipped.len()
        );
        emit(events, BatchEvent::Planned {
            jobs: plan.jobs.len(),
            skipped: plan.skipped.len(),
        });
        Ok(plan)
    }
}
