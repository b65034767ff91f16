// src/error.rs
//! Error taxonomy for source handling and startup validation.
//!
//! Transient network failures keep a source pending, structural mapping
//! failures discard it for good, configuration failures abort startup.
//! Anything else is carried through `Other` unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SniperError {
    /// The source did not answer within its configured timeout.
    #[error("fetching has timed out")]
    Timeout,

    /// Connection could not be established.
    #[error("source not available: {0}")]
    Unavailable(String),

    /// Declared params absent from the live sample. All of them, not just the first.
    #[error("the following params dont exist: {}", .0.join(", "))]
    Mapping(Vec<String>),

    #[error("empty reply")]
    EmptySample,

    /// Nested containers never produced a sequence.
    #[error("no candidate sequence within {0} levels of nesting")]
    Unwrap(usize),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SniperResult<T> = Result<T, SniperError>;

impl SniperError {
    pub fn config(msg: impl Into<String>) -> Self {
        SniperError::Config(msg.into())
    }

    /// Timeout or connectivity failure: retry on a later cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, SniperError::Timeout | SniperError::Unavailable(_))
    }

    /// The source can never work as configured.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SniperError::Mapping(_) | SniperError::EmptySample | SniperError::Unwrap(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_error_names_every_missing_param() {
        let e = SniperError::Mapping(vec!["iv".into(), "lat".into()]);
        assert_eq!(e.to_string(), "the following params dont exist: iv, lat");
        assert!(e.is_structural());
        assert!(!e.is_transient());
    }

    #[test]
    fn network_failures_are_transient() {
        assert!(SniperError::Timeout.is_transient());
        assert!(SniperError::Unavailable("refused".into()).is_transient());
        assert!(!SniperError::config("bad mode").is_transient());
    }
}
