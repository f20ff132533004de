//! Boundary-aware text chunking.
//!
//! Splits documents on paragraph blocks (blank-line separated; a markdown
//! heading starts a new block) and packs them into chunks up to `max_chars`,
//! carrying a trailing overlap into the next chunk so concepts that span a
//! boundary stay retrievable. A single block longer than `max_chars` is
//! split on sentence and then word boundaries.

use sha2::{Digest, Sha256};

use crate::types::{AppError, Chunk, Result};

/// Content-addressed chunk id over `(document_path, position, text)`.
///
/// Identical content always maps to the same id, which is what makes
/// re-ingestion idempotent at the index layer.
pub fn chunk_id(document_path: &str, position: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_path.as_bytes());
    hasher.update(b"|");
    hasher.update(position.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

pub struct TextChunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        // Overlap must leave room for new content in every chunk.
        let overlap_chars = overlap_chars.min(max_chars / 2);
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Split a document into chunks.
    ///
    /// Returns a lazy iterator; calling `chunk` again yields a fresh pass
    /// over the same content.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if the text is empty or whitespace-only, or if
    /// `document_path` is empty.
    pub fn chunk(&self, text: &str, document_path: &str, source_label: &str) -> Result<ChunkIter> {
        if document_path.trim().is_empty() {
            return Err(AppError::InvalidDocument(
                "document path must not be empty".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(AppError::InvalidDocument(
                "document text must not be empty".to_string(),
            ));
        }

        let pieces = self.pack_blocks(split_blocks(text));

        Ok(ChunkIter {
            pieces: pieces.into_iter(),
            document_path: document_path.to_string(),
            source_label: source_label.to_string(),
            position: 0,
        })
    }

    /// Pack paragraph blocks into chunk texts respecting `max_chars`,
    /// seeding each chunk after the first with the previous chunk's tail.
    fn pack_blocks(&self, blocks: Vec<String>) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for block in blocks {
            for piece in self.split_oversize(&block) {
                if current.is_empty() {
                    current = piece;
                } else if current.len() + 2 + piece.len() <= self.max_chars {
                    current.push_str("\n\n");
                    current.push_str(&piece);
                } else {
                    let overlap = tail_on_char_boundary(&current, self.overlap_chars).to_string();
                    chunks.push(std::mem::take(&mut current));
                    // Skip the seed when it would leave no room for the piece.
                    if !overlap.is_empty() && overlap.len() + 2 + piece.len() <= self.max_chars {
                        current = format!("{}\n\n{}", overlap, piece);
                    } else {
                        current = piece;
                    }
                }
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Split a block that exceeds `max_chars` on sentence boundaries, then
    /// word boundaries, then hard character boundaries as a last resort.
    fn split_oversize(&self, block: &str) -> Vec<String> {
        if block.len() <= self.max_chars {
            return vec![block.to_string()];
        }

        let mut pieces = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(block) {
            if sentence.len() > self.max_chars {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                pieces.extend(self.split_words(sentence));
            } else if current.is_empty() {
                current = sentence.to_string();
            } else if current.len() + 1 + sentence.len() <= self.max_chars {
                current.push(' ');
                current.push_str(sentence);
            } else {
                pieces.push(std::mem::take(&mut current));
                current = sentence.to_string();
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    fn split_words(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if word.len() > self.max_chars {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                pieces.extend(hard_split(word, self.max_chars));
            } else if current.is_empty() {
                current = word.to_string();
            } else if current.len() + 1 + word.len() <= self.max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                pieces.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

/// Lazy iterator of [`Chunk`]s for one document.
pub struct ChunkIter {
    pieces: std::vec::IntoIter<String>,
    document_path: String,
    source_label: String,
    position: usize,
}

impl Iterator for ChunkIter {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let text = self.pieces.next()?;
        let position = self.position;
        self.position += 1;

        Some(Chunk {
            id: chunk_id(&self.document_path, position, &text),
            text,
            source_label: self.source_label.clone(),
            document_path: self.document_path.clone(),
            position,
        })
    }
}

// ============= Splitting Helpers =============

/// Split text into paragraph blocks. Blank lines separate blocks and a
/// markdown heading line always starts a new block.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else if trimmed.starts_with('#') && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
            current.push_str(trimmed);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(trimmed);
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Split on sentence-ending punctuation, keeping the punctuation attached
/// to the preceding sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();

    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let next = i + c.len_utf8();
            let at_break = next >= bytes.len() || bytes[next] == b' ' || bytes[next] == b'\n';
            if at_break {
                let sentence = text[start..next].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = next;
            }
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Split a string into pieces of at most `max` bytes on char boundaries.
fn hard_split(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if current.len() + c.len_utf8() > max && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(c);
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Last `max` bytes of `text`, snapped forward to a char boundary.
fn tail_on_char_boundary(text: &str, max: usize) -> &str {
    if max == 0 || text.is_empty() {
        return "";
    }
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].trim_start()
}
