//! Validated text primitives shared across the intake crates.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("text must contain at least one non-whitespace character")]
    Blank,
}

/// Trimmed text that is never blank.
///
/// Filename parts, media types and the backend address use this so a blank value is rejected
/// (or replaced by a fallback) at construction rather than discovered later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// # Errors
    ///
    /// Returns `TextError::Blank` if `input` is empty after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        match input.as_ref().trim() {
            "" => Err(TextError::Blank),
            text => Ok(Self(text.to_owned())),
        }
    }

    /// Like [`NonEmptyText::new`], substituting `fallback` for blank input.
    pub fn or_fallback(input: impl AsRef<str>, fallback: &'static str) -> Self {
        Self::new(input).unwrap_or_else(|_| Self(fallback.trim().to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyText {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyText> for String {
    fn from(text: NonEmptyText) -> Self {
        text.0
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
