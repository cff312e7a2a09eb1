//! Extraction result types

/// Words-per-page heuristic used when a format has no native page notion
const WORDS_PER_PAGE: usize = 300;

/// Text extracted from one document (or one plain-text chunk)
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// The extracted text, exactly as the winning strategy produced it
    pub text: String,

    /// Rich-markup rendition when the strategy can keep paragraph
    /// structure (OOXML); `None` for formats extracted flat
    pub formatted: Option<String>,

    /// Page count (PDF), or an estimate for formats without pages
    pub page_count: u32,

    /// Which strategy produced this result
    pub strategy: &'static str,

    /// Whether the source layout survived into the text (paragraph breaks
    /// for OOXML/plain text; PDF extraction flattens layout)
    pub layout_preserved: bool,
}

/// Render extracted text as minimal HTML, one `<p>` per paragraph line.
pub fn paragraphs_to_html(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("<p>{}</p>", html_escape::encode_text(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ExtractionResult {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Estimate a page count from prose length. Used for plain text and as a
/// floor everywhere else: never reports zero pages for non-empty text.
pub fn estimate_page_count(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    (words.div_ceil(WORDS_PER_PAGE)).max(1) as u32
}
