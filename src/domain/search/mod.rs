//! Search domain — free-text query resolution to instrument identifiers.

#[cfg(feature = "http")]
pub mod client;

use crate::error::SdkError;

/// A validated, trimmed search query. Blank input never reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(raw: &str) -> Result<Self, SdkError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SdkError::Validation("search query is empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
