//! Input validation for submitted claim text

use thiserror::Error;

/// Default upper bound on claim length, in characters
pub const DEFAULT_MAX_CLAIM_CHARS: usize = 800;

/// Reasons a submitted claim is rejected before reaching the pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Nothing but whitespace
    #[error("Claim text is empty")]
    Empty,

    /// Longer than the configured limit
    #[error("Claim text too long: {len} chars (max: {max})")]
    TooLong {
        /// Submitted length in characters
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Only digits and numeric punctuation
    #[error("Claim text must contain words, not only numbers")]
    NumericOnly,
}

/// Claim text that passed input validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimText(String);

impl ClaimText {
    /// Validate raw input
    ///
    /// # Examples
    ///
    /// ```
    /// use veritas_domain::{ClaimText, InputError};
    ///
    /// assert!(ClaimText::parse("The Eiffel Tower is in Paris", 800).is_ok());
    /// assert_eq!(ClaimText::parse("12345", 800), Err(InputError::NumericOnly));
    /// ```
    pub fn parse(raw: &str, max_chars: usize) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::Empty);
        }

        let len = trimmed.chars().count();
        if len > max_chars {
            return Err(InputError::TooLong { len, max: max_chars });
        }

        if is_numeric_only(trimmed) {
            return Err(InputError::NumericOnly);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the validated text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the validated text
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn is_numeric_only(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | ',' | '+' | '-'))
}
