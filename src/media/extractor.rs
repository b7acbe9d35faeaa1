use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{first_line, MediaCommandBuilder, SubtitleExtractorTrait};
use crate::config::ToolsConfig;
use crate::error::{Result, SubexError};
use crate::planner::ExtractionJob;

/// ffmpeg-backed subtitle extractor
pub struct FfmpegExtractor {
    config: ToolsConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegExtractor {
    pub fn new(config: ToolsConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffprobe_path, &config.ffmpeg_path);
        Self {
            config,
            command_builder,
        }
    }
}

/// Prefix well-known ffmpeg failures with a short explanation
pub fn describe_failure(stderr: &str) -> String {
    let stderr = stderr.trim();
    let hint = if stderr.contains("Unknown encoder") {
        Some("unsupported output format")
    } else if stderr.contains("only possible from text to text or bitmap to bitmap") {
        Some("format mismatch between source stream and output format")
    } else if stderr.contains("already exists") {
        Some("output file already exists")
    } else {
        None
    };

    match (hint, stderr.is_empty()) {
        (Some(hint), _) => format!("{}: {}", hint, stderr),
        (None, true) => "no diagnostic output".to_string(),
        (None, false) => stderr.to_string(),
    }
}

#[async_trait]
impl SubtitleExtractorTrait for FfmpegExtractor {
    async fn extract(&self, job: &ExtractionJob, overwrite: bool) -> Result<()> {
        let video_path = job.video.path.as_path();
        let extraction_error = |detail: String| SubexError::Extraction {
            path: video_path.to_path_buf(),
            detail,
        };

        if let Some(parent) = job.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let command = self.command_builder.extract_subtitle(
            video_path,
            job.stream.index,
            job.format,
            job.output_path.as_path(),
            overwrite,
        );

        let output = command.execute().await.map_err(|e| {
            extraction_error(format!("failed to execute {}: {}", self.config.ffmpeg_path, e))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(extraction_error(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                describe_failure(&stderr)
            )));
        }

        if !stderr.trim().is_empty() {
            debug!("ffmpeg warnings for {}: {}", video_path.display(), stderr.trim());
        }

        if fs::metadata(&job.output_path).await.is_err() {
            return Err(extraction_error(format!(
                "ffmpeg reported success but {} was not produced",
                job.output_path.display()
            )));
        }

        debug!(
            "Stream {} of {} written to {}",
            job.stream.index,
            video_path.display(),
            job.output_path.display()
        );
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self
            .command_builder
            .extractor_version()
            .execute()
            .await
            .map_err(|e| SubexError::ToolNotFound {
                tool: self.config.ffmpeg_path.clone(),
                detail: e.to_string(),
            })?;

        if output.status.success() {
            info!("ffmpeg is available");
            Ok(())
        } else {
            Err(SubexError::ToolNotFound {
                tool: self.config.ffmpeg_path.clone(),
                detail: "version check failed".to_string(),
            })
        }
    }

    async fn version_info(&self) -> Result<String> {
        let output = self
            .command_builder
            .extractor_version()
            .execute()
            .await
            .map_err(|e| SubexError::ToolNotFound {
                tool: self.config.ffmpeg_path.clone(),
                detail: e.to_string(),
            })?;
        Ok(first_line(&String::from_utf8_lossy(&output.stdout)))
    }
}
