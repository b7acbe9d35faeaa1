//! Subex - Batch Subtitle Extraction
//!
//! Scans a directory tree for video files, probes their embedded subtitle
//! streams with ffprobe and extracts the stream matching a requested
//! language to standalone files with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod media;
pub mod planner;
pub mod progress;
pub mod runner;
pub mod subtitle;
pub mod workflow;
