use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::{first_line, MediaCommandBuilder, MediaProbeTrait};
use crate::config::ToolsConfig;
use crate::error::{Result, SubexError};
use crate::subtitle::SubtitleStream;

/// ffprobe JSON output, reduced to what the batch needs
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_name: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl FfprobeStream {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    fn into_subtitle_stream(self) -> SubtitleStream {
        let language = self.tag("language").unwrap_or("").to_string();
        let title = self.tag("title").map(str::to_string).filter(|t| !t.is_empty());
        let codec = self.codec_name.clone().unwrap_or_else(|| "unknown".to_string());

        let mut stream = SubtitleStream::new(self.index, language, codec);
        stream.title = title;
        stream
    }
}

/// Turn ffprobe's `-print_format json` output into streams sorted by index
pub fn parse_probe_output(json: &str) -> serde_json::Result<Vec<SubtitleStream>> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    let mut streams: Vec<SubtitleStream> = output
        .streams
        .into_iter()
        .map(FfprobeStream::into_subtitle_stream)
        .collect();
    streams.sort_by_key(|s| s.index);
    Ok(streams)
}

/// ffprobe-backed stream prober
pub struct FfprobeProbe {
    config: ToolsConfig,
    command_builder: MediaCommandBuilder,
}

impl FfprobeProbe {
    pub fn new(config: ToolsConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffprobe_path, &config.ffmpeg_path);
        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProbeTrait for FfprobeProbe {
    async fn probe(&self, video_path: &Path) -> Result<Vec<SubtitleStream>> {
        let probe_error = |detail: String| SubexError::Probe {
            path: video_path.to_path_buf(),
            detail,
        };

        let output = self
            .command_builder
            .probe_subtitles(video_path)
            .execute()
            .await
            .map_err(|e| probe_error(format!("failed to execute {}: {}", self.config.ffprobe_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_error(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let streams = parse_probe_output(&stdout)
            .map_err(|e| probe_error(format!("unreadable ffprobe output: {}", e)))?;

        debug!("{}: {} subtitle stream(s)", video_path.display(), streams.len());
        Ok(streams)
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self
            .command_builder
            .probe_version()
            .execute()
            .await
            .map_err(|e| SubexError::ToolNotFound {
                tool: self.config.ffprobe_path.clone(),
                detail: e.to_string(),
            })?;

        if output.status.success() {
            info!("ffprobe is available");
            Ok(())
        } else {
            Err(SubexError::ToolNotFound {
                tool: self.config.ffprobe_path.clone(),
                detail: "version check failed".to_string(),
            })
        }
    }

    async fn version_info(&self) -> Result<String> {
        let output = self
            .command_builder
            .probe_version()
            .execute()
            .await
            .map_err(|e| SubexError::ToolNotFound {
                tool: self.config.ffprobe_path.clone(),
                detail: e.to_string(),
            })?;
        Ok(first_line(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 3,
                "codec_name": "subrip",
                "codec_type": "subtitle",
                "tags": { "language": "heb", "title": "Hebrew Forced" }
            },
            {
                "index": 2,
                "codec_name": "ass",
                "codec_type": "subtitle",
                "tags": { "LANGUAGE": "eng" }
            },
            {
                "index": 4,
                "codec_type": "subtitle"
            }
        ]
    }"#;

    #[test]
    fn test_parse_sorts_by_index() {
        let streams = parse_probe_output(SAMPLE).unwrap();
        let indices: Vec<u32> = streams.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[test]
    fn test_parse_tags_and_defaults() {
        let streams = parse_probe_output(SAMPLE).unwrap();
        assert_eq!(streams[0].language, "eng");
        assert_eq!(streams[0].codec_name, "ass");
        assert_eq!(streams[1].title.as_deref(), Some("Hebrew Forced"));
        assert_eq!(streams[2].language, "und");
        assert_eq!(streams[2].codec_name, "unknown");
    }

    #[test]
    fn test_parse_without_streams_key() {
        assert!(parse_probe_output("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_probe_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let probe = FfprobeProbe::new(ToolsConfig {
            ffprobe_path: "/nonexistent/bin/ffprobe".to_string(),
            ffmpeg_path: "/nonexistent/bin/ffmpeg".to_string(),
        });

        let err = probe.check_availability().await.unwrap_err();
        assert!(matches!(err, SubexError::ToolNotFound { .. }));

        let err = probe.probe(Path::new("a.mkv")).await.unwrap_err();
        assert!(matches!(err, SubexError::Probe { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_with_stand_in_tool() {
        use crate::media::test_support::fake_tool;

        let dir = tempfile::tempdir().unwrap();
        let script = format!("cat <<'EOF'\n{}\nEOF", SAMPLE);
        let ffprobe = fake_tool(dir.path(), "ffprobe", &script);

        let probe = FfprobeProbe::new(ToolsConfig {
            ffprobe_path: ffprobe.to_string_lossy().to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        });

        let streams = probe.probe(Path::new("movie.mkv")).await.unwrap();
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[1].language, "heb");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_video_name_reaches_tool() {
        use crate::media::test_support::fake_tool;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join(OsStr::from_bytes(b"caf\xe9.mkv"));
        std::fs::write(&video, b"").unwrap();

        let script = format!(
            "for last; do :; done\n[ -f \"$last\" ] || {{ echo \"$last: No such file or directory\" >&2; exit 1; }}\ncat <<'EOF'\n{}\nEOF",
            SAMPLE
        );
        let ffprobe = fake_tool(dir.path(), "ffprobe", &script);

        let probe = FfprobeProbe::new(ToolsConfig {
            ffprobe_path: ffprobe.to_string_lossy().to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        });

        let streams = probe.probe(&video).await.unwrap();
        assert_eq!(streams.len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_failure_carries_stderr() {
        use crate::media::test_support::fake_tool;

        let dir = tempfile::tempdir().unwrap();
        let ffprobe = fake_tool(
            dir.path(),
            "ffprobe",
            "echo 'Invalid data found when processing input' >&2\nexit 1",
        );

        let probe = FfprobeProbe::new(ToolsConfig {
            ffprobe_path: ffprobe.to_string_lossy().to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        });

        match probe.probe(Path::new("broken.mkv")).await.unwrap_err() {
            SubexError::Probe { path, detail } => {
                assert_eq!(path, Path::new("broken.mkv"));
                assert!(detail.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
