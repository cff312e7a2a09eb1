//! Text extraction engine
//!
//! Format sniffing by magic bytes, then an ordered per-format fallback chain
//! of library-backed strategies with bounded timeouts and a typed failure
//! taxonomy. Shared by the single-shot upload path and the chunked path.

pub mod chain;
pub mod error;
pub mod format;
pub mod strategies;
pub mod types;

pub use chain::ExtractionPipeline;
pub use error::{ExtractionError, StrategyError};
pub use format::{sniff, verify, FileFormat};
pub use types::ExtractionResult;
