//! Overlapping fixed-size text windows for chunk regeneration.

pub const DEFAULT_CHUNK_SIZE: usize = 1100;
pub const DEFAULT_CHUNK_OVERLAP: usize = 180;
pub const MIN_CHUNK_SIZE: usize = 200;

/// Character-based window splitter. Sizes are normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker {
    /// Sizes below [`MIN_CHUNK_SIZE`] are raised to it; an overlap that is not
    /// smaller than the window becomes a quarter of the window.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(MIN_CHUNK_SIZE);
        let overlap = if overlap >= size { size / 4 } else { overlap };
        Self { size, overlap }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily split `text` (trimmed first). Call again to restart.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        let text = text.trim();
        Chunks {
            text,
            size: self.size,
            step: self.size - self.overlap,
            pos: 0,
            done: text.is_empty(),
        }
    }
}

/// Iterator over trimmed, non-empty chunk slices of one text.
///
/// Holds only a byte cursor; each step walks at most one window of chars.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    size: usize,
    /// Chars between consecutive window starts.
    step: usize,
    pos: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    /// Byte offset `n` chars past the cursor, or `None` past the end.
    fn advance(&self, n: usize) -> Option<usize> {
        self.text[self.pos..].char_indices().nth(n).map(|(i, _)| self.pos + i)
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while !self.done {
            let start = self.pos;
            let end = match self.advance(self.size) {
                Some(end) => {
                    self.pos = self.advance(self.step).unwrap_or(end);
                    end
                }
                None => {
                    self.done = true;
                    self.text.len()
                }
            };
            let chunk = self.text[start..end].trim();
            if !chunk.is_empty() {
                return Some(chunk);
            }
        }
        None
    }
}
