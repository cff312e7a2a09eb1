//! OOXML word-processing strategies
//!
//! Three tiers: the `docx-rs` reader (full document model, strict about the
//! package layout), a direct ZIP + `word/document.xml` parse (survives
//! packages docx-rs refuses, e.g. missing content-type parts), and a last
//! lenient sweep over every XML part in the archive.

use std::io::{Cursor, Read};

use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::super::error::StrategyError;
use super::super::types::{estimate_page_count, paragraphs_to_html, ExtractionResult};
use super::ExtractionStrategy;

const DOCUMENT_PART: &str = "word/document.xml";

/// Specialized reader via the docx-rs document model
pub struct DocxReader;

impl ExtractionStrategy for DocxReader {
    fn name(&self) -> &'static str {
        "docx-rs"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        let docx = read_docx(data)
            .map_err(|e| StrategyError::Corrupted(format!("docx read: {}", e)))?;

        let mut text = String::new();
        for child in &docx.document.children {
            if let DocumentChild::Paragraph(para) = child {
                for para_child in &para.children {
                    if let ParagraphChild::Run(run) = para_child {
                        for run_child in &run.children {
                            if let RunChild::Text(t) = run_child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        if text.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        let page_count = estimate_page_count(&text);
        Ok(ExtractionResult {
            formatted: Some(paragraphs_to_html(&text)),
            page_count,
            strategy: self.name(),
            layout_preserved: true,
            text,
        })
    }
}

/// General-purpose parse of `word/document.xml` straight out of the ZIP
pub struct DocumentXmlParser;

impl ExtractionStrategy for DocumentXmlParser {
    fn name(&self) -> &'static str {
        "docx-xml"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        let mut archive = open_archive(data)?;
        let mut xml = String::new();
        match archive.by_name(DOCUMENT_PART) {
            Ok(mut part) => {
                part.read_to_string(&mut xml).map_err(|e| {
                    StrategyError::Corrupted(format!("reading {}: {}", DOCUMENT_PART, e))
                })?;
            }
            Err(ZipError::FileNotFound) => {
                return Err(StrategyError::Corrupted(format!(
                    "archive has no {}",
                    DOCUMENT_PART
                )));
            }
            Err(e) => return Err(map_zip_error(e)),
        }

        let text = wordprocessing_text(&xml)?;
        if text.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        let page_count = estimate_page_count(&text);
        Ok(ExtractionResult {
            formatted: Some(paragraphs_to_html(&text)),
            page_count,
            strategy: self.name(),
            layout_preserved: true,
            text,
        })
    }
}

/// Lenient sweep: collect text from every XML part that yields any,
/// main document first. Last resort for damaged packages.
pub struct ArchiveTextSweep;

impl ExtractionStrategy for ArchiveTextSweep {
    fn name(&self) -> &'static str {
        "ooxml-scan"
    }

    fn extract(&self, data: &[u8]) -> Result<ExtractionResult, StrategyError> {
        let mut archive = open_archive(data)?;

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.ends_with(".xml"))
            .map(|n| n.to_string())
            .collect();
        names.sort();
        // Main document part goes first so its text leads the output
        if let Some(pos) = names.iter().position(|n| n == DOCUMENT_PART) {
            let main = names.remove(pos);
            names.insert(0, main);
        }

        let mut text = String::new();
        for name in &names {
            let mut xml = String::new();
            let readable = match archive.by_name(name) {
                Ok(mut part) => part.read_to_string(&mut xml).is_ok(),
                Err(e) => {
                    tracing::debug!(part = %name, error = %e, "Skipping unreadable archive part");
                    false
                }
            };
            if !readable {
                continue;
            }
            if let Ok(part_text) = wordprocessing_text(&xml) {
                if !part_text.trim().is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&part_text);
                }
            }
        }

        if text.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        let page_count = estimate_page_count(&text);
        Ok(ExtractionResult {
            text,
            formatted: None,
            page_count,
            strategy: self.name(),
            layout_preserved: false,
        })
    }
}

fn open_archive(data: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, StrategyError> {
    ZipArchive::new(Cursor::new(data)).map_err(map_zip_error)
}

/// The zip crate has no dedicated encrypted-entry variant; encrypted
/// archives surface as `UnsupportedArchive` with a password message, so the
/// mapping to a typed outcome lives here and nowhere else.
fn map_zip_error(e: ZipError) -> StrategyError {
    match e {
        ZipError::InvalidPassword => {
            StrategyError::PasswordProtected("archive requires a password".to_string())
        }
        ZipError::UnsupportedArchive(msg) if msg.to_ascii_lowercase().contains("password") => {
            StrategyError::PasswordProtected(msg.to_string())
        }
        ZipError::UnsupportedArchive(msg) => {
            StrategyError::Unknown(format!("unsupported archive: {}", msg))
        }
        ZipError::FileNotFound => StrategyError::Corrupted("archive entry missing".to_string()),
        other => StrategyError::Corrupted(format!("zip: {}", other)),
    }
}

/// Pull visible text out of WordprocessingML: the contents of `w:t`
/// elements, with paragraph marks, breaks, and tabs rendered as text.
fn wordprocessing_text(xml: &str) -> Result<String, StrategyError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut out = String::new();
    let mut in_text_run = false;
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.name().local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(e)) => match e.name().local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().local_name().as_ref() {
                b"br" | b"cr" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_text_run {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| StrategyError::Corrupted(format!("xml entity: {}", e)))?;
                    out.push_str(&unescaped);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StrategyError::Corrupted(format!("xml parse: {}", e))),
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    const MINIMAL_DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    /// Build a bare ZIP containing only the main document part.
    pub(crate) fn sample_docx(document_xml: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn document_xml_parser_reads_paragraphs() {
        let bytes = sample_docx(MINIMAL_DOCUMENT_XML);
        let result = DocumentXmlParser.extract(&bytes).unwrap();
        assert!(result.text.contains("First paragraph"));
        assert!(result.text.contains("Second paragraph"));
        // Paragraph boundary became a newline
        assert!(result.text.contains("First paragraph\n"));
    }

    #[test]
    fn document_xml_parser_rejects_archive_without_document_part() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file("unrelated.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nope").unwrap();
            writer.finish().unwrap();
        }
        let err = DocumentXmlParser.extract(&cursor.into_inner()).unwrap_err();
        assert!(matches!(err, StrategyError::Corrupted(_)));
    }

    #[test]
    fn sweep_collects_text_from_any_xml_part() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file("word/header1.xml", SimpleFileOptions::default())
                .unwrap();
            writer
                .write_all(
                    br#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>Header text</w:t></w:r></w:p></w:hdr>"#,
                )
                .unwrap();
            writer.finish().unwrap();
        }
        let result = ArchiveTextSweep.extract(&cursor.into_inner()).unwrap();
        assert!(result.text.contains("Header text"));
    }

    #[test]
    fn strategies_reject_non_zip_bytes() {
        let err = DocumentXmlParser.extract(b"PK but not a zip").unwrap_err();
        assert!(matches!(err, StrategyError::Corrupted(_)));
        let err = DocxReader.extract(b"PK but not a zip").unwrap_err();
        assert!(matches!(err, StrategyError::Corrupted(_)));
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>a &amp; b</w:t></w:r></w:p></w:body></w:document>"#;
        let bytes = sample_docx(xml);
        let result = DocumentXmlParser.extract(&bytes).unwrap();
        assert!(result.text.contains("a & b"));
    }
}
