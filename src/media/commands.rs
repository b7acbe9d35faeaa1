use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

use crate::subtitle::SubtitleFormat;

/// Abstract media tool invocation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<OsString>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media tool command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Add input file, passed to the tool byte for byte
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref())
    }

    /// Add output file (or any trailing path argument)
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref())
    }

    /// Overwrite (`-y`) or refuse to overwrite (`-n`) the output
    pub fn overwrite(self, overwrite: bool) -> Self {
        self.arg(if overwrite { "-y" } else { "-n" })
    }

    pub fn log_level<S: AsRef<OsStr>>(self, level: S) -> Self {
        self.arg("-loglevel").arg(level)
    }

    /// Map a single stream of the first input by absolute index
    pub fn map_stream(self, index: u32) -> Self {
        self.arg("-map").arg(format!("0:{}", index))
    }

    /// Set subtitle codec
    pub fn subtitle_codec<S: AsRef<OsStr>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    /// Run the command to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; callers decide what the exit
    /// status means for their tool.
    pub async fn execute(&self) -> std::io::Result<Output> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
    }
}

/// Builder for the two tool invocations the batch needs
pub struct MediaCommandBuilder {
    ffprobe_path: String,
    ffmpeg_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffprobe_path: S1, ffmpeg_path: S2) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Build subtitle stream listing command
    pub fn probe_subtitles<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Subtitle stream probe")
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .args(["-select_streams", "s"])
            .output(video_path)
    }

    /// Build subtitle extraction command
    pub fn extract_subtitle<P: AsRef<Path>>(
        &self,
        video_path: P,
        stream_index: u32,
        format: SubtitleFormat,
        output_path: P,
        overwrite: bool,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("{} subtitle extraction", format))
            .arg("-hide_banner")
            .log_level("warning")
            .overwrite(overwrite)
            .input(video_path)
            .map_stream(stream_index)
            .subtitle_codec(format.ffmpeg_codec())
            .output(output_path)
    }

    /// Build version check command for the prober
    pub fn probe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "ffprobe version check").arg("-version")
    }

    /// Build version check command for the converter
    pub fn extractor_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "ffmpeg version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_command_arguments() {
        let builder = MediaCommandBuilder::new("ffprobe", "ffmpeg");
        let cmd = builder.probe_subtitles("/videos/a.mkv");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(
            cmd.args,
            vec![
                "-v", "error", "-print_format", "json", "-show_streams",
                "-select_streams", "s", "/videos/a.mkv",
            ]
        );
    }

    #[test]
    fn test_extract_command_arguments() {
        let builder = MediaCommandBuilder::new("ffprobe", "/usr/bin/ffmpeg");
        let cmd = builder.extract_subtitle(
            Path::new("/videos/a.mkv"),
            3,
            SubtitleFormat::WebVtt,
            Path::new("/subs/a.eng.vtt"),
            false,
        );
        assert_eq!(cmd.binary_path, "/usr/bin/ffmpeg");
        assert_eq!(
            cmd.args,
            vec![
                "-hide_banner", "-loglevel", "warning", "-n", "-i", "/videos/a.mkv",
                "-map", "0:3", "-c:s", "webvtt", "/subs/a.eng.vtt",
            ]
        );
    }

    #[test]
    fn test_overwrite_flag() {
        let builder = MediaCommandBuilder::new("ffprobe", "ffmpeg");
        let cmd = builder.extract_subtitle(
            Path::new("a.mkv"),
            0,
            SubtitleFormat::Srt,
            Path::new("a.eng.srt"),
            true,
        );
        assert!(cmd.args.contains(&OsString::from("-y")));
        assert!(!cmd.args.contains(&OsString::from("-n")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_are_kept_verbatim() {
        use std::os::unix::ffi::OsStrExt;

        let video = Path::new(OsStr::from_bytes(b"/videos/caf\xe9.mkv"));
        let output = Path::new(OsStr::from_bytes(b"/subs/caf\xe9.eng.srt"));
        let builder = MediaCommandBuilder::new("ffprobe", "ffmpeg");

        let probe = builder.probe_subtitles(video);
        assert_eq!(probe.args.last().map(OsString::as_os_str), Some(video.as_os_str()));

        let extract = builder.extract_subtitle(video, 1, SubtitleFormat::Srt, output, false);
        assert!(extract.args.iter().any(|arg| arg.as_os_str() == video.as_os_str()));
        assert_eq!(extract.args.last().map(OsString::as_os_str), Some(output.as_os_str()));
    }
}
