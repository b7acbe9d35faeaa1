use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{tool} not found: {detail}")]
    ToolNotFound { tool: String, detail: String },

    #[error("Failed to probe {}: {detail}", path.display())]
    Probe { path: PathBuf, detail: String },

    #[error("Failed to extract subtitle from {}: {detail}", path.display())]
    Extraction { path: PathBuf, detail: String },

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid directory selection: {0}")]
    InvalidSelection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Batch worker stopped: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, SubexError>;
