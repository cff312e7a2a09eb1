//! Extraction strategies
//!
//! One strategy = one library-backed way of turning bytes of a known format
//! into text. Strategies are synchronous and CPU-bound; the chain runs them
//! on blocking threads under a timeout.

pub mod ooxml;
pub mod pdf;
pub mod plain_text;

use std::sync::Arc;

use super::error::StrategyError;
use super::format::FileFormat;
use super::types::ExtractionResult;

/// One candidate algorithm for extracting text from a known format.
///
/// Failures are reported as typed `StrategyError` values mapped from the
/// underlying library's errors at this seam, so the chain never has to parse
/// error message text.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError>;
}

/// The fixed, ordered fallback chain for a format: fastest/most specialized
/// engine first, general-purpose parser second, lenient parser last.
pub fn chain_for(format: FileFormat) -> Vec<Arc<dyn ExtractionStrategy>> {
    match format {
        FileFormat::PlainText => vec![
            Arc::new(plain_text::Utf8Strict),
            Arc::new(plain_text::Utf8Lossy),
        ],
        FileFormat::Pdf => vec![
            Arc::new(pdf::PdfExtractEngine),
            Arc::new(pdf::LopdfPagewise),
        ],
        FileFormat::Ooxml => vec![
            Arc::new(ooxml::DocxReader),
            Arc::new(ooxml::DocumentXmlParser),
            Arc::new(ooxml::ArchiveTextSweep),
        ],
        FileFormat::Unrecognized => Vec::new(),
    }
}
