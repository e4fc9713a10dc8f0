//! Document collaborator: raw bytes to plain text.

use crate::error::{RagError, Result};

/// Turns a raw document into the text handed to the chunker.
///
/// Binary formats (PDF, DOCX, ...) belong to external tooling; implement this
/// trait around it to feed the pipeline.
pub trait DocumentParser: Send + Sync {
    /// Convert `raw` into text.
    fn parse_to_text(&self, raw: &[u8]) -> Result<String>;
}

/// Parser for UTF-8 plain text and markdown.
///
/// Strips a leading byte-order mark and normalises `\r\n` line endings to
/// `\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

const UTF8_BOM: &str = "\u{feff}";

impl DocumentParser for PlainTextParser {
    fn parse_to_text(&self, raw: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| RagError::DocumentError(format!("document is not valid UTF-8: {e}")))?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        Ok(text.replace("\r\n", "\n"))
    }
}
