//! Recursive character text splitting
//!
//! Text is split on the highest-priority separator that occurs in it
//! (paragraph break, line break, space, then individual characters). Pieces
//! that still exceed the chunk size are split again with the remaining
//! separators; pieces that fit are packed greedily into chunks, and each new
//! chunk starts with the trailing pieces of the previous one, up to
//! `chunk_overlap` characters.
//!
//! All lengths are measured in characters, not bytes.

use crate::error::{Error, Result};
use crate::store::Document;
use serde_json::json;
use std::collections::VecDeque;

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between adjacent chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separators in priority order. The empty separator splits into characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Metadata key holding a chunk's position within its document
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Metadata key holding the number of chunks produced from the document
pub const TOTAL_CHUNKS_KEY: &str = "total_chunks";

/// Recursive text splitter
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Chunker {
    /// Create a chunker with the default separators.
    ///
    /// Fails when `chunk_overlap` is not strictly smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator list (highest priority first)
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk overlap in characters
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into ordered, overlapping chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split a document into chunk documents.
    ///
    /// Each chunk carries the parent's metadata plus `chunk_index` and
    /// `total_chunks`.
    pub fn chunk(&self, document: &Document) -> Vec<Document> {
        let pieces = self.split(&document.content);
        let total = pieces.len();

        pieces
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), json!(index));
                metadata.insert(TOTAL_CHUNKS_KEY.to_string(), json!(total));
                Document { content, metadata }
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let Some((separator, remaining)) = pick_separator(text, separators) else {
            return self.split_fixed_width(text);
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying trailing pieces forward
    /// as overlap.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = join_pieces(&current) {
                        chunks.push(chunk);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some((_, dropped)) => total -= dropped,
                            None => break,
                        }
                    }
                }
            }

            current.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_pieces(&current) {
            chunks.push(chunk);
        }

        chunks
    }

    /// Fixed-width slicing used when none of the separators occur
    fn split_fixed_width(&self, text: &str) -> Vec<String> {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        if char_count == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());
            if end == char_count {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }
}

/// Split text with the default separators.
///
/// Convenience wrapper around [`Chunker`].
pub fn split(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(chunk_size, chunk_overlap)?.split(text))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First separator occurring in the text, with the lower-priority ones.
/// The empty separator always matches and ends the recursion.
fn pick_separator<'s>(text: &str, separators: &'s [String]) -> Option<(&'s str, &'s [String])> {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return Some(("", &[]));
        }
        if text.contains(separator.as_str()) {
            return Some((separator.as_str(), &separators[i + 1..]));
        }
    }
    None
}

/// Split on `separator`, attaching each separator to the piece that follows it
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn join_pieces(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
