//! File format detection
//!
//! Classifies raw bytes by magic-byte inspection and verifies them against
//! the caller-claimed format label. The claim only selects which signature to
//! check; it is never trusted on its own. Mismatches fail before any
//! extraction library runs, since the most common failure mode is a user
//! picking the wrong file.

use serde::{Deserialize, Serialize};

use super::error::ExtractionError;

/// PDF header: `%PDF`
const PDF_MAGIC: &[u8] = b"%PDF";

/// ZIP local-file-header signature; OOXML documents are ZIP containers
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B];

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Plain text (UTF-8 or close enough)
    #[serde(rename = "txt")]
    PlainText,
    Pdf,
    /// OOXML word-processing document (.docx)
    #[serde(rename = "docx")]
    Ooxml,
    Unrecognized,
}

impl FileFormat {
    /// Map a caller-supplied label (file extension or MIME type) to a format.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().trim_start_matches('.').to_ascii_lowercase();
        match label.as_str() {
            "txt" | "text" | "text/plain" | "text/markdown" | "md" => FileFormat::PlainText,
            "pdf" | "application/pdf" => FileFormat::Pdf,
            "docx"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FileFormat::Ooxml
            }
            _ => FileFormat::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::PlainText => "txt",
            FileFormat::Pdf => "pdf",
            FileFormat::Ooxml => "docx",
            FileFormat::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify bytes by signature alone. Anything that is neither a PDF nor a
/// ZIP container is treated as plain text.
pub fn sniff(data: &[u8]) -> FileFormat {
    if data.len() >= PDF_MAGIC.len() && &data[..PDF_MAGIC.len()] == PDF_MAGIC {
        FileFormat::Pdf
    } else if data.len() >= ZIP_MAGIC.len() && &data[..ZIP_MAGIC.len()] == ZIP_MAGIC {
        FileFormat::Ooxml
    } else {
        FileFormat::PlainText
    }
}

/// Verify the claimed format against the actual byte signature.
///
/// Fails fast with `InvalidFormat` on an empty buffer, an unrecognized
/// claim, or a claim that disagrees with the sniffed signature.
pub fn verify(data: &[u8], claimed: FileFormat) -> Result<FileFormat, ExtractionError> {
    if data.is_empty() {
        return Err(ExtractionError::InvalidFormat(
            "empty file buffer".to_string(),
        ));
    }
    if claimed == FileFormat::Unrecognized {
        return Err(ExtractionError::InvalidFormat(
            "unsupported file type".to_string(),
        ));
    }
    let actual = sniff(data);
    if actual != claimed {
        return Err(ExtractionError::InvalidFormat(format!(
            "file content does not match declared type '{}' (detected '{}')",
            claimed, actual
        )));
    }
    Ok(actual)
}
