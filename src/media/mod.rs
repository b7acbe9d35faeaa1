// External media tool layer
//
// Everything that touches ffprobe or ffmpeg lives here:
// - Commands: argument builders and subprocess execution
// - Probe: subtitle stream listing via ffprobe
// - Extractor: single stream extraction via ffmpeg
//
// The batch code only sees the two traits below, so tests can swap in mocks.

pub mod commands;
pub mod extractor;
pub mod probe;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use extractor::*;
pub use probe::*;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::planner::ExtractionJob;
use crate::subtitle::SubtitleStream;

/// Lists the subtitle streams of a video file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbeTrait: Send + Sync {
    /// Subtitle streams in ascending index order
    async fn probe(&self, video_path: &Path) -> Result<Vec<SubtitleStream>>;

    /// Fail with `ToolNotFound` when the prober cannot be run
    async fn check_availability(&self) -> Result<()>;

    /// First line of the prober's version output
    async fn version_info(&self) -> Result<String>;
}

/// Writes one subtitle stream to a standalone file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleExtractorTrait: Send + Sync {
    /// Succeeds only when the job's output file exists afterwards
    async fn extract(&self, job: &ExtractionJob, overwrite: bool) -> Result<()>;

    /// Fail with `ToolNotFound` when the converter cannot be run
    async fn check_availability(&self) -> Result<()>;

    /// First line of the converter's version output
    async fn version_info(&self) -> Result<String>;
}

/// Factory for the ffmpeg-based implementations
pub struct MediaFactory;

impl MediaFactory {
    pub fn create_probe(config: &ToolsConfig) -> Arc<dyn MediaProbeTrait> {
        Arc::new(FfprobeProbe::new(config.clone()))
    }

    pub fn create_extractor(config: &ToolsConfig) -> Arc<dyn SubtitleExtractorTrait> {
        Arc::new(FfmpegExtractor::new(config.clone()))
    }
}

/// First non-empty line of a version banner
pub(crate) fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Unknown version")
        .to_string()
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable `sh` script standing in for ffprobe or ffmpeg.
    pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\nffmpeg version 6.1\nbuilt with gcc"), "ffmpeg version 6.1");
        assert_eq!(first_line(""), "Unknown version");
    }
}
