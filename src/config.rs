use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SubexError};
use crate::language::LanguageCode;
use crate::subtitle::SubtitleFormat;

/// Default config file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "subex.toml";

fn default_video_extensions() -> Vec<String> {
    ["mkv", "mp4", "avi", "mov", "wmv", "flv", "webm"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tools: ToolsConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the stream prober binary
    pub ffprobe_path: String,
    /// Path to the converter binary
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Language used when none is given on the command line
    #[serde(default)]
    pub language: LanguageCode,
    /// Output subtitle format
    #[serde(default)]
    pub format: SubtitleFormat,
    /// Replace subtitle files that already exist
    #[serde(default)]
    pub overwrite: bool,
    /// Write every subtitle here instead of next to its video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// File extensions treated as video (case-insensitive, without the dot)
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig {
                ffprobe_path: "ffprobe".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
            },
            extraction: ExtractionConfig {
                language: LanguageCode::default(),
                format: SubtitleFormat::Srt,
                overwrite: false,
                output_dir: None,
                video_extensions: default_video_extensions(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubexError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubexError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubexError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

/// Whether `path` has one of `extensions`, ignoring case
pub(crate) fn has_video_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
