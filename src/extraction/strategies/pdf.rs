//! PDF strategies
//!
//! `pdf-extract` is the fast path: one call, good text ordering, but it
//! gives up on the first malformed object. `lopdf` is the fallback: it
//! parses page by page, tolerates individual page failures, and exposes a
//! typed encryption check, which is what drives the password-protected
//! classification for the whole chain.

use super::super::error::StrategyError;
use super::super::types::{estimate_page_count, ExtractionResult};
use super::ExtractionStrategy;

/// Specialized text engine (`pdf_extract::extract_text_from_mem`)
pub struct PdfExtractEngine;

impl ExtractionStrategy for PdfExtractEngine {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| StrategyError::Unknown(format!("pdf-extract: {}", e)))?;
        if text.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        let page_count = page_count(data).unwrap_or_else(|| estimate_page_count(&text));
        Ok(ExtractionResult {
            text,
            formatted: None,
            page_count,
            strategy: self.name(),
            layout_preserved: false,
        })
    }
}

/// General-purpose parser: walks the page tree and extracts text per page,
/// skipping pages that fail individually.
pub struct LopdfPagewise;

impl ExtractionStrategy for LopdfPagewise {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| StrategyError::Corrupted(format!("lopdf parse: {}", e)))?;

        if doc.is_encrypted() {
            return Err(StrategyError::PasswordProtected(
                "pdf trailer carries an Encrypt dictionary".to_string(),
            ));
        }

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Err(StrategyError::Corrupted("pdf has no pages".to_string()));
        }
        let page_total = pages.len() as u32;

        let mut text = String::new();
        for page_number in pages {
            match doc.extract_text(&[page_number]) {
                Ok(page_text) => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&page_text);
                }
                Err(e) => {
                    tracing::debug!(page = page_number, error = %e, "Skipping unreadable pdf page");
                }
            }
        }

        if text.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        Ok(ExtractionResult {
            text,
            formatted: None,
            page_count: page_total,
            strategy: self.name(),
            layout_preserved: false,
        })
    }
}

/// Page count via a structural parse; `None` if the document will not load.
fn page_count(data: &[u8]) -> Option<u32> {
    lopdf::Document::load_mem(data)
        .ok()
        .map(|doc| doc.get_pages().len() as u32)
}
