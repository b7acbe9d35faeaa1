use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SubexError};
use crate::language::{LanguageCode, UNDEFINED_LANGUAGE};

/// Output formats understood by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubtitleFormat {
    /// SubRip Text
    Srt,
    /// DVD Subtitles (.idx/.sub pair)
    VobSub,
    /// Advanced SubStation Alpha
    Ass,
    /// Web Video Text Tracks
    WebVtt,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 4] = [Self::Srt, Self::VobSub, Self::Ass, Self::WebVtt];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::VobSub => "idx",
            Self::Ass => "ass",
            Self::WebVtt => "vtt",
        }
    }

    /// Codec name passed to ffmpeg's `-c:s`
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::VobSub => "dvdsub",
            Self::Ass => "ass",
            Self::WebVtt => "webvtt",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Srt => "SubRip Text",
            Self::VobSub => "DVD Subtitles",
            Self::Ass => "Advanced SubStation Alpha",
            Self::WebVtt => "Web Video Text Tracks",
        }
    }
}

impl Default for SubtitleFormat {
    fn default() -> Self {
        Self::Srt
    }
}

impl FromStr for SubtitleFormat {
    type Err = SubexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "srt" | "subrip" => Ok(Self::Srt),
            "vobsub" | "idx" => Ok(Self::VobSub),
            "ass" => Ok(Self::Ass),
            "webvtt" | "vtt" => Ok(Self::WebVtt),
            _ => Err(SubexError::UnsupportedFormat(format!(
                "'{}'. Valid formats: srt, vobsub, ass, webvtt",
                s
            ))),
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Srt => "SRT",
            Self::VobSub => "VobSub",
            Self::Ass => "ASS",
            Self::WebVtt => "WebVTT",
        };
        f.write_str(name)
    }
}

/// One embedded subtitle track as reported by the prober
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStream {
    /// Absolute stream index inside the container
    pub index: u32,
    /// Language tag, "und" when the container has none
    pub language: String,
    pub codec_name: String,
    pub title: Option<String>,
}

impl SubtitleStream {
    pub fn new<S: Into<String>>(index: u32, language: S, codec_name: S) -> Self {
        let language = language.into();
        Self {
            index,
            language: if language.trim().is_empty() {
                UNDEFINED_LANGUAGE.to_string()
            } else {
                language
            },
            codec_name: codec_name.into(),
            title: None,
        }
    }
}

/// `<stem>.<lang>.<ext>` inside `output_dir`, or next to the video when no
/// output directory is given.
pub fn output_path_for(
    video_path: &Path,
    output_dir: Option<&Path>,
    language: &LanguageCode,
    format: SubtitleFormat,
) -> Result<PathBuf> {
    let stem = video_path
        .file_stem()
        .ok_or_else(|| SubexError::Config(format!("Invalid video filename: {}", video_path.display())))?
        .to_string_lossy();

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => video_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    Ok(dir.join(format!("{}.{}.{}", stem, language, format.extension())))
}
