use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::language::LanguageCode;
use crate::planner::BatchRequest;
use crate::subtitle::SubtitleFormat;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract subtitles from every video under a directory
    Extract {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Write a JSON report of the batch to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show what would be extracted without running ffmpeg
    Scan {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// List subdirectories that contain video files
    Subdirs {
        /// Root directory
        root: PathBuf,
    },

    /// List the subtitle streams of a single video file
    Probe {
        /// Video file
        input: PathBuf,
    },

    /// Verify that ffprobe and ffmpeg can be run
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination (default: subex.toml)
        path: Option<PathBuf>,
    },

    /// List language presets
    Languages,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SelectionArgs {
    /// Root directory containing video files
    pub root: PathBuf,

    /// Subdirectory to scan, relative to the root (repeatable; default: the whole root)
    #[arg(short = 's', long = "subdir")]
    pub subdirs: Vec<PathBuf>,

    /// Three-letter language code (e.g. eng, heb, und)
    #[arg(short, long, conflicts_with = "custom_language")]
    pub language: Option<String>,

    /// Language tag that is not a three-letter code, matched as typed
    #[arg(long)]
    pub custom_language: Option<String>,

    /// Output format: srt, vobsub, ass, webvtt
    #[arg(short, long)]
    pub format: Option<String>,

    /// Write all subtitles to this directory instead of next to each video
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Replace existing subtitle files
    #[arg(long)]
    pub overwrite: bool,
}

impl SelectionArgs {
    /// Merge command-line choices over the configured defaults
    pub fn to_request(&self, config: &Config) -> Result<BatchRequest> {
        let language = match (&self.language, &self.custom_language) {
            (Some(code), _) => LanguageCode::iso639(code)?,
            (None, Some(custom)) => LanguageCode::custom(custom)?,
            (None, None) => config.extraction.language.clone(),
        };

        let format = match &self.format {
            Some(format) => format.parse::<SubtitleFormat>()?,
            None => config.extraction.format,
        };

        Ok(BatchRequest {
            root: self.root.clone(),
            subdirectories: self.subdirs.clone(),
            language,
            format,
            output_dir: self
                .output_dir
                .clone()
                .or_else(|| config.extraction.output_dir.clone()),
            overwrite: self.overwrite || config.extraction.overwrite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    fn selection(args: Args) -> SelectionArgs {
        match args.command {
            Commands::Extract { selection, .. } | Commands::Scan { selection } => selection,
            _ => panic!("expected a selection command"),
        }
    }

    #[test]
    fn test_defaults_come_from_config() {
        let args = selection(parse(&["subex", "extract", "/videos"]));
        let request = args.to_request(&Config::default()).unwrap();
        assert_eq!(request.language.as_str(), "eng");
        assert_eq!(request.format, SubtitleFormat::Srt);
        assert!(request.subdirectories.is_empty());
        assert!(!request.overwrite);
    }

    #[test]
    fn test_flags_override_config() {
        let args = selection(parse(&[
            "subex", "scan", "/videos", "-s", "season1", "--subdir", "season2",
            "-l", "HEB", "-f", "webvtt", "-o", "/subs", "--overwrite",
        ]));
        let request = args.to_request(&Config::default()).unwrap();
        assert_eq!(request.language, LanguageCode::Iso639("heb".to_string()));
        assert_eq!(request.format, SubtitleFormat::WebVtt);
        assert_eq!(request.subdirectories, vec![PathBuf::from("season1"), PathBuf::from("season2")]);
        assert_eq!(request.output_dir, Some(PathBuf::from("/subs")));
        assert!(request.overwrite);
    }

    #[test]
    fn test_custom_language() {
        let args = selection(parse(&["subex", "extract", "/videos", "--custom-language", "pt-BR"]));
        let request = args.to_request(&Config::default()).unwrap();
        assert_eq!(request.language, LanguageCode::Custom("pt-BR".to_string()));
    }

    #[test]
    fn test_language_and_custom_conflict() {
        assert!(Args::try_parse_from([
            "subex", "extract", "/videos", "-l", "eng", "--custom-language", "x",
        ])
        .is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let args = selection(parse(&["subex", "extract", "/videos", "-l", "english"]));
        tokio_test::assert_err!(args.to_request(&Config::default()));

        let args = selection(parse(&["subex", "extract", "/videos", "-f", "pgs"]));
        tokio_test::assert_err!(args.to_request(&Config::default()));

        let args = selection(parse(&["subex", "extract", "/videos", "-f", "ASS"]));
        tokio_test::assert_ok!(args.to_request(&Config::default()));
    }
}
