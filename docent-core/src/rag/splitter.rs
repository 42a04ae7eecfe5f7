//! Recursive text splitting for RAG.
//!
//! Text is cut at the coarsest boundary that yields pieces within the target
//! size (paragraphs, then lines, then words, then single characters), and
//! adjacent pieces are greedily merged back up to the target size with a
//! bounded overlap between consecutive chunks.
//!
//! The splitter only ever produces byte ranges into the source text. Every
//! chunk is an exact slice, consecutive chunks either abut or overlap, and
//! the first and last chunks touch the ends of the text, so no content is
//! dropped at boundaries. Lengths are measured in characters.

use super::types::Chunk;
use std::collections::VecDeque;
use std::ops::Range;
use thiserror::Error;

/// Paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Error)]
pub enum SplitterError {
    #[error("chunk_size must be positive")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replaces the separator hierarchy, coarsest first.
    ///
    /// Without a trailing `""` separator, a piece that has no remaining
    /// separator is emitted whole even if it exceeds the chunk size.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits one document into ordered chunks.
    pub fn split_document(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        self.split_spans(text)
            .into_iter()
            .enumerate()
            .map(|(i, range)| Chunk::new(source_id, &text[range.clone()], i, range))
            .collect()
    }

    /// Splits text into ordered byte ranges.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        if !text.is_empty() {
            self.split_range(text, 0..text.len(), &self.separators, &mut spans);
        }
        spans
    }

    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let segment = &text[range.clone()];

        let Some(position) = separators
            .iter()
            .position(|sep| sep.is_empty() || segment.contains(sep.as_str()))
        else {
            out.push(range);
            return;
        };
        let remaining = &separators[position + 1..];

        let mut fitting = Vec::new();
        for piece in split_keeping_separator(segment, &separators[position], range.start) {
            if char_len(text, &piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                self.merge(text, &fitting, out);
                fitting.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                self.split_range(text, piece, remaining, out);
            }
        }

        if !fitting.is_empty() {
            self.merge(text, &fitting, out);
        }
    }

    /// Greedily joins contiguous pieces into chunks of at most `chunk_size`
    /// characters, carrying up to `chunk_overlap` characters of trailing
    /// pieces into the next chunk.
    fn merge(&self, text: &str, pieces: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut current: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > self.chunk_size && !current.is_empty() {
                out.push(span_of(&current));

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            current.push_back((piece.clone(), len));
            total += len;
        }

        if !current.is_empty() {
            out.push(span_of(&current));
        }
    }
}

fn span_of(pieces: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    match (pieces.front(), pieces.back()) {
        (Some((first, _)), Some((last, _))) => first.start..last.end,
        _ => 0..0,
    }
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

/// Splits `segment` after each occurrence of `separator`, returning absolute
/// byte ranges that tile the segment. An empty separator splits into
/// characters.
fn split_keeping_separator(segment: &str, separator: &str, offset: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| offset + i..offset + i + c.len_utf8())
            .collect();
    }

    let mut start = offset;
    segment
        .split_inclusive(separator)
        .map(|piece| {
            let range = start..start + piece.len();
            start = range.end;
            range
        })
        .collect()
}
