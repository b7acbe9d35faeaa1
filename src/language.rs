//! Language selection for subtitle streams.
//!
//! Stream tags coming out of ffprobe are ISO 639-2 codes ("eng", "heb") or
//! "und" when the container carries no tag. Users pick one of the presets or
//! type their own code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SubexError};

/// Tag reported for streams without a language.
pub const UNDEFINED_LANGUAGE: &str = "und";

/// Presets offered to the user, with display names.
pub const LANGUAGE_PRESETS: &[(&str, &str)] = &[
    ("eng", "English"),
    ("heb", "Hebrew"),
    ("und", "Undefined"),
];

/// A validated language selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LanguageCode {
    /// Three ASCII letters, stored lowercase
    Iso639(String),
    /// Free-form user code, matched as typed (case-insensitive)
    Custom(String),
}

impl LanguageCode {
    /// Parse a three-letter code.
    pub fn iso639(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self::Iso639(code.to_ascii_lowercase()))
        } else {
            Err(SubexError::InvalidLanguage(format!(
                "'{}' is not a three-letter language code",
                code
            )))
        }
    }

    /// Wrap a user-entered code that does not have to follow ISO 639-2.
    pub fn custom(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SubexError::InvalidLanguage(
                "custom language code must not be empty".to_string(),
            ));
        }
        if code.chars().any(|c| c.is_whitespace() || std::path::is_separator(c)) {
            return Err(SubexError::InvalidLanguage(format!(
                "custom language code '{}' contains whitespace or path separators",
                code
            )));
        }
        Ok(Self::Custom(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Iso639(code) | Self::Custom(code) => code,
        }
    }

    /// Exact, case-insensitive comparison with a stream's language tag.
    pub fn matches(&self, tag: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(tag.trim())
    }

    /// Display name for presets, falling back to the code itself.
    pub fn display_name(&self) -> &str {
        match LANGUAGE_PRESETS.iter().find(|(code, _)| self.matches(code)) {
            Some((_, name)) => *name,
            None => self.as_str(),
        }
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self::Iso639("eng".to_string())
    }
}

impl FromStr for LanguageCode {
    type Err = SubexError;

    /// Three-letter codes become `Iso639`, anything else must be requested
    /// explicitly through [`LanguageCode::custom`].
    fn from_str(s: &str) -> Result<Self> {
        Self::iso639(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = SubexError;

    fn try_from(value: String) -> Result<Self> {
        Self::iso639(&value).or_else(|_| Self::custom(&value))
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
