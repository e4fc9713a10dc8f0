//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and three implementations:
//!
//! - [`FixedSizeChunker`]: consecutive windows of `chunk_size` characters, optional overlap
//! - [`RecursiveChunker`]: splits hierarchically by paragraphs, lines, sentences, then words
//! - [`MarkdownChunker`]: splits by markdown headers, preserving header context
//!
//! All sizes count Unicode scalar values, so multi-byte text never splits
//! inside a character.

use crate::document::Fragment;
use crate::error::{RagError, Result};

/// A strategy for splitting source text into fragments.
///
/// Implementations must be deterministic: the same text and configuration
/// always produce the same fragments, in document order.
pub trait Chunker: Send + Sync {
    /// Split `text` into fragments.
    ///
    /// Returns an empty `Vec` if `text` is empty.
    fn chunk(&self, text: &str) -> Vec<Fragment>;

    /// The registered name of this strategy.
    fn name(&self) -> &str;
}

fn validate_sizes(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits text into consecutive windows of `chunk_size` characters.
///
/// Without overlap the windows partition the text: concatenating them gives
/// back the input and there are `ceil(len / chunk_size)` of them. With
/// overlap, each window after the first starts `chunk_size - chunk_overlap`
/// characters after the previous one.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 0)?;
/// let fragments = chunker.chunk(&text);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: number of characters per fragment (the last may be shorter)
    /// * `chunk_overlap`: number of characters shared by consecutive fragments
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_sizes(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<Fragment> {
        split_by_size(text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .map(Fragment::new)
            .collect()
    }

    fn name(&self) -> &str {
        "fixed-size"
    }
}

/// Character-window splitting with overlap.
///
/// Stops as soon as a window reaches the end of the text, so overlap never
/// produces a trailing fragment that is entirely contained in its predecessor.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = boundaries.len() - 1;
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}

/// Separators tried in order by [`RecursiveChunker`].
const RECURSIVE_SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// First splits by paragraph separators (`\n\n`). If a paragraph exceeds
/// `chunk_size`, splits by line breaks, then by sentence boundaries
/// (`. `, `! `, `? `), then by spaces. Separators stay attached to the
/// preceding segment, so with zero overlap the fragments concatenate back to
/// the source. With overlap, each merged fragment repeats the last
/// `chunk_overlap` characters of the one before it. A single word longer
/// than `chunk_size` falls back to fixed-size windows.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 0)?;
/// let fragments = chunker.chunk(&text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_sizes(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

/// Split text by a separator, then merge segments into chunks that respect
/// `chunk_size`. If a segment exceeds `chunk_size`, it is split further
/// using the next-level separator.
///
/// Each merged chunk after the first starts with the last `chunk_overlap`
/// characters of the chunk before it, shortened if the next segment would
/// not fit otherwise.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return if text.is_empty() { Vec::new() } else { vec![text.to_string()] };
    }
    let Some((separator, remaining_separators)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for segment in split_keeping_separator(text, separator) {
        let segment_len = char_len(segment);
        if current_len > 0 && current_len + segment_len <= chunk_size {
            current.push_str(segment);
            current_len += segment_len;
            continue;
        }

        if current_len > 0 {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if segment_len > chunk_size {
            chunks.extend(split_and_merge(
                segment,
                chunk_size,
                chunk_overlap,
                remaining_separators,
            ));
            continue;
        }

        let carry = chunk_overlap.min(chunk_size - segment_len);
        let carried = chunks.last().map_or("", |previous| tail_chars(previous, carry));
        current.push_str(carried);
        current.push_str(segment);
        current_len = char_len(carried) + segment_len;
    }

    if current_len > 0 {
        chunks.push(current);
    }

    chunks
}

/// The last `n` characters of `text`, or all of it if shorter.
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let start = text.char_indices().rev().nth(n - 1).map_or(0, |(i, _)| i);
    &text[start..]
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<Fragment> {
        if text.is_empty() {
            return Vec::new();
        }

        split_and_merge(text, self.chunk_size, self.chunk_overlap, &RECURSIVE_SEPARATORS)
            .into_iter()
            .map(Fragment::new)
            .collect()
    }

    fn name(&self) -> &str {
        "recursive"
    }
}

/// Splits text by markdown headers, keeping each section as a fragment.
///
/// Each section is prefixed with its header hierarchy (`Title > Section`).
/// Sections exceeding `chunk_size` are further split using
/// [`RecursiveChunker`] logic; every piece keeps the header prefix so that
/// it stays self-describing when retrieved on its own. A header path longer
/// than half of `chunk_size` is emitted once as its own fragment instead,
/// and the body pieces go unprefixed. No fragment exceeds `chunk_size`.
/// Lines inside fenced code blocks are never treated as headers.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::MarkdownChunker;
///
/// let chunker = MarkdownChunker::new(512, 0)?;
/// let fragments = chunker.chunk(&markdown);
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl MarkdownChunker {
    /// Create a new `MarkdownChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_sizes(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

/// A markdown section with its header hierarchy and body text.
struct MarkdownSection {
    header_path: String,
    text: String,
}

/// Returns the level and title of an ATX header line (`## Title`).
fn parse_header(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((level, rest.trim()))
}

/// Parse markdown text into sections split by headers.
fn parse_markdown_sections(text: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut current_body = String::new();
    let mut current_header_path = String::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }

        let header = if in_fence { None } else { parse_header(line) };
        match header {
            Some((level, title)) => {
                if !current_body.trim().is_empty() || !current_header_path.is_empty() {
                    sections.push(MarkdownSection {
                        header_path: current_header_path.clone(),
                        text: current_body.trim().to_string(),
                    });
                }
                current_body.clear();

                headers.truncate(level.saturating_sub(1));
                headers.push(title.to_string());
                current_header_path = headers.join(" > ");
            }
            None => {
                if !current_body.is_empty() {
                    current_body.push('\n');
                }
                current_body.push_str(line);
            }
        }
    }

    if !current_body.trim().is_empty() || !current_header_path.is_empty() {
        sections.push(MarkdownSection {
            header_path: current_header_path,
            text: current_body.trim().to_string(),
        });
    }

    sections
}

impl Chunker for MarkdownChunker {
    fn chunk(&self, text: &str) -> Vec<Fragment> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut fragments = Vec::new();
        for section in parse_markdown_sections(text) {
            // The "header\n" prefix may take at most half of every piece.
            let prefixed = !section.header_path.is_empty()
                && (char_len(&section.header_path) + 1) * 2 <= self.chunk_size;
            if section.text.is_empty() || !prefixed {
                fragments.extend(
                    split_by_size(&section.header_path, self.chunk_size, 0)
                        .into_iter()
                        .map(Fragment::new),
                );
            }
            if section.text.is_empty() {
                continue;
            }

            let prefix =
                if prefixed { format!("{}\n", section.header_path) } else { String::new() };
            let budget = self.chunk_size - char_len(&prefix);
            let overlap = self.chunk_overlap.min(budget.saturating_sub(1));

            for body in split_and_merge(&section.text, budget, overlap, &RECURSIVE_SEPARATORS) {
                fragments.push(Fragment::new(format!("{prefix}{body}")));
            }
        }

        fragments
    }

    fn name(&self) -> &str {
        "markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeping_separator_keeps_every_byte() {
        let parts = split_keeping_separator("a. b. c", ". ");
        assert_eq!(parts, vec!["a. ", "b. ", "c"]);
        assert_eq!(parts.concat(), "a. b. c");
    }

    #[test]
    fn split_by_size_respects_char_boundaries() {
        let chunks = split_by_size("żółw żółw", 4, 0);
        assert_eq!(chunks, vec!["żółw", " żół", "w"]);
    }

    #[test]
    fn split_by_size_with_overlap_has_no_redundant_tail() {
        let chunks = split_by_size("abcdefgh", 4, 2);
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn tail_chars_counts_characters() {
        assert_eq!(tail_chars("żółw", 2), "łw");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("ab", 0), "");
    }

    #[test]
    fn parse_header_requires_space_after_hashes() {
        assert_eq!(parse_header("## Setup"), Some((2, "Setup")));
        assert_eq!(parse_header("#hashtag"), None);
        assert_eq!(parse_header("plain"), None);
        assert_eq!(parse_header("####### too deep"), None);
    }

    #[test]
    fn markdown_sections_ignore_fenced_comments() {
        let text = "# Title\nintro\n```sh\n# not a header\n```\n## Part\nbody";
        let sections = parse_markdown_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].header_path, "Title");
        assert!(sections[0].text.contains("# not a header"));
        assert_eq!(sections[1].header_path, "Title > Part");
        assert_eq!(sections[1].text, "body");
    }
}
