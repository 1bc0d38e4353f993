use thiserror::Error;

/// Errors raised while parsing versions, ranges and requirements.
///
/// Every variant names the full offending text and the byte position inside
/// it where parsing stopped, so callers can point at the exact character.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid version \"{text}\" at position {position}: {reason}")]
    InvalidVersion {
        text: String,
        position: usize,
        reason: String,
    },

    #[error("malformed range \"{text}\" at position {position}: {reason}")]
    MalformedRange {
        text: String,
        position: usize,
        reason: String,
    },

    #[error("malformed requirement \"{text}\" at position {position}: {reason}")]
    MalformedRequirement {
        text: String,
        position: usize,
        reason: String,
    },
}

impl ParseError {
    /// The text that failed to parse
    pub fn text(&self) -> &str {
        match self {
            ParseError::InvalidVersion { text, .. }
            | ParseError::MalformedRange { text, .. }
            | ParseError::MalformedRequirement { text, .. } => text,
        }
    }

    /// Byte offset of the offending character
    pub fn position(&self) -> usize {
        match self {
            ParseError::InvalidVersion { position, .. }
            | ParseError::MalformedRange { position, .. }
            | ParseError::MalformedRequirement { position, .. } => *position,
        }
    }

    pub(crate) fn range(text: &str, position: usize, reason: impl Into<String>) -> Self {
        ParseError::MalformedRange {
            text: text.to_string(),
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn requirement(text: &str, position: usize, reason: impl Into<String>) -> Self {
        ParseError::MalformedRequirement {
            text: text.to_string(),
            position,
            reason: reason.into(),
        }
    }
}
