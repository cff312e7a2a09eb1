//! Plain-text strategies
//!
//! Strict UTF-8 first; a lossy decode as the permissive fallback for files
//! with stray non-UTF-8 bytes. The text is returned exactly as decoded
//! (minus a BOM) — trimming is the caller's business.

use super::super::error::StrategyError;
use super::super::types::{estimate_page_count, ExtractionResult};
use super::ExtractionStrategy;

const UTF8_BOM: &str = "\u{feff}";

fn finish(text: String, strategy: &'static str) -> Result<ExtractionResult, StrategyError> {
    let text = match text.strip_prefix(UTF8_BOM) {
        Some(stripped) => stripped.to_string(),
        None => text,
    };
    if text.trim().is_empty() {
        return Err(StrategyError::Empty);
    }
    let page_count = estimate_page_count(&text);
    Ok(ExtractionResult {
        text,
        formatted: None,
        page_count,
        strategy,
        layout_preserved: true,
    })
}

/// Strict UTF-8 decoding
pub struct Utf8Strict;

impl ExtractionStrategy for Utf8Strict {
    fn name(&self) -> &'static str {
        "utf8"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        let text = String::from_utf8(data.to_vec())
            .map_err(|e| StrategyError::Corrupted(format!("invalid utf-8: {}", e)))?;
        finish(text, self.name())
    }
}

/// Lossy UTF-8 decoding; invalid sequences become replacement characters
pub struct Utf8Lossy;

impl ExtractionStrategy for Utf8Lossy {
    fn name(&self) -> &'static str {
        "utf8-lossy"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        finish(String::from_utf8_lossy(data).into_owned(), self.name())
    }
}
