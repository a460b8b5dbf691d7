use std::collections::VecDeque;

pub const DEFAULT_SEPARATOR: &str = "\n";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

impl TextChunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    InvalidConfig { chunk_size: usize, overlap: usize },
}

/// Fixed-size character splitter with overlap.
///
/// Text is cut at the separator first; pieces still longer than the chunk size
/// are cut into overlapping character windows. Pieces are then packed greedily
/// into chunks, carrying a tail of at most `chunk_overlap` characters from one
/// chunk into the next. Lengths count characters, not bytes.
#[derive(Debug, Clone)]
pub struct CharacterSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for CharacterSplitter {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl CharacterSplitter {
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ChunkError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ChunkError::InvalidConfig {
                chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            separator: separator.into(),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn split_text(&self, text: &str) -> Vec<TextChunk> {
        self.merge(self.pieces(text))
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .enumerate()
            .map(|(index, text)| TextChunk { index, text })
            .collect()
    }

    fn pieces(&self, text: &str) -> Vec<String> {
        let raw: Vec<&str> = if self.separator.is_empty() {
            vec![text]
        } else {
            text.split(self.separator.as_str()).collect()
        };

        let mut pieces = Vec::new();
        for piece in raw.into_iter().filter(|p| !p.is_empty()) {
            if piece.chars().count() > self.chunk_size {
                pieces.extend(self.windows(piece));
            } else {
                pieces.push(piece.to_string());
            }
        }
        pieces
    }

    /// Cut an oversized piece into `chunk_size` windows that advance by
    /// `chunk_size - chunk_overlap`. The constructor guarantees a non-zero step.
    fn windows(&self, piece: &str) -> Vec<String> {
        let chars: Vec<char> = piece.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end >= chars.len() {
                break;
            }
            start += step;
        }
        windows
    }

    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let sep_len = self.separator.chars().count();
        let mut chunks = Vec::new();
        let mut current: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            let joined = if current.is_empty() { 0 } else { sep_len };

            if !current.is_empty() && total + joined + len > self.chunk_size {
                chunks.push(self.join(&current));
                // keep a tail no longer than the overlap that still leaves room for `piece`
                while let Some(first_len) = current.front().map(|(_, l)| *l) {
                    if total <= self.chunk_overlap && total + sep_len + len <= self.chunk_size {
                        break;
                    }
                    current.pop_front();
                    total -= first_len + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back((piece, len));
        }

        if !current.is_empty() {
            chunks.push(self.join(&current));
        }
        chunks
    }

    fn join(&self, pieces: &VecDeque<(String, usize)>) -> String {
        pieces
            .iter()
            .map(|(p, _)| p.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}
