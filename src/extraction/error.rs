//! Extraction error types
//!
//! Two layers: `StrategyError` is what an individual strategy reports (typed
//! at the library seam, never surfaced to callers), and `ExtractionError` is
//! the classified aggregate the rest of the crate sees.

use thiserror::Error;

/// Typed outcome of a single failed strategy attempt.
///
/// Strategies map their library's errors to one of these variants at the
/// seam, so the chain can classify aggregates without parsing error text.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// The call succeeded but produced no usable text
    #[error("no text extracted")]
    Empty,

    /// The document requires a password to decrypt
    #[error("document is password protected: {0}")]
    PasswordProtected(String),

    /// The document is structurally damaged or not what it claims to be
    #[error("document is corrupted: {0}")]
    Corrupted(String),

    /// Anything else: parser bug, panic, timeout
    #[error("{0}")]
    Unknown(String),
}

/// One recorded failure inside the fallback chain
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub strategy: &'static str,
    pub error: StrategyError,
}

/// Classified extraction failure surfaced to callers.
///
/// Raw library messages stay in the logs; only the classification crosses
/// the component boundary.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Empty buffer or signature mismatch, detected before any strategy ran
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Every strategy agreed the document is encrypted
    #[error("document is password protected")]
    PasswordProtected,

    /// The document could not be parsed by any strategy
    #[error("document is corrupted or damaged")]
    Corrupted,

    /// All strategies failed for reasons that need investigation
    #[error("text extraction failed")]
    Failed,
}

impl ExtractionError {
    /// Classify a set of failed attempts by priority:
    /// password protection outranks corruption outranks everything else.
    pub fn classify(attempts: &[FailedAttempt]) -> Self {
        if attempts
            .iter()
            .any(|a| matches!(a.error, StrategyError::PasswordProtected(_)))
        {
            ExtractionError::PasswordProtected
        } else if attempts
            .iter()
            .any(|a| matches!(a.error, StrategyError::Corrupted(_)))
        {
            ExtractionError::Corrupted
        } else {
            ExtractionError::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(strategy: &'static str, error: StrategyError) -> FailedAttempt {
        FailedAttempt { strategy, error }
    }

    #[test]
    fn password_outranks_corruption() {
        let attempts = vec![
            attempt("a", StrategyError::Corrupted("bad xref".into())),
            attempt("b", StrategyError::PasswordProtected("encrypted".into())),
            attempt("c", StrategyError::Unknown("boom".into())),
        ];
        assert!(matches!(
            ExtractionError::classify(&attempts),
            ExtractionError::PasswordProtected
        ));
    }

    #[test]
    fn corruption_outranks_unknown() {
        let attempts = vec![
            attempt("a", StrategyError::Unknown("boom".into())),
            attempt("b", StrategyError::Corrupted("damaged".into())),
        ];
        assert!(matches!(
            ExtractionError::classify(&attempts),
            ExtractionError::Corrupted
        ));
    }

    #[test]
    fn everything_else_is_failed() {
        let attempts = vec![
            attempt("a", StrategyError::Empty),
            attempt("b", StrategyError::Unknown("boom".into())),
        ];
        assert!(matches!(
            ExtractionError::classify(&attempts),
            ExtractionError::Failed
        ));
    }
}
