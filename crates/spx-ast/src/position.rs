//! Line/character positions in the editor convention (0-based, UTF-16 columns)

use serde::{Deserialize, Serialize};

use crate::Span;

/// Zero-based line and UTF-16 character offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open range of positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Maps byte offsets of one source text to positions and back
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            text: text.to_string(),
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position_of(&self, offset: usize) -> Position {
        let offset = self.clamp_to_boundary(offset.min(self.text.len()));
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let character: usize = self.text[line_start..offset].chars().map(char::len_utf16).sum();
        Position::new(line as u32, character as u32)
    }

    /// Byte offset for a position; characters past the line end clamp to it
    pub fn offset_of(&self, pos: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(pos.line as usize)?;
        let line_end = self
            .line_starts
            .get(pos.line as usize + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let mut units = 0usize;
        for (i, ch) in self.text[line_start..line_end].char_indices() {
            if units >= pos.character as usize {
                return Some(line_start + i);
            }
            units += ch.len_utf16();
        }
        Some(line_end)
    }

    pub fn range_of(&self, span: Span) -> Range {
        Range::new(self.position_of(span.start), self.position_of(span.end))
    }

    fn clamp_to_boundary(&self, mut offset: usize) -> usize {
        while offset > 0 && !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileId;

    #[test]
    fn test_position_of_ascii() {
        let index = LineIndex::new("var (\n\tMySound Sound\n)\n");
        assert_eq!(index.position_of(0), Position::new(0, 0));
        assert_eq!(index.position_of(7), Position::new(1, 1));
        assert_eq!(index.position_of(21), Position::new(2, 0));
    }

    #[test]
    fn test_position_counts_utf16_units() {
        // "😀" is 4 bytes in UTF-8 and 2 units in UTF-16
        let index = LineIndex::new("say \"😀\", x");
        let x_offset = "say \"😀\", ".len();
        assert_eq!(index.position_of(x_offset), Position::new(0, 10));
        assert_eq!(index.offset_of(Position::new(0, 10)), Some(x_offset));
    }

    #[test]
    fn test_offset_of_clamps_to_line_end() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset_of(Position::new(0, 40)), Some(2));
        assert_eq!(index.offset_of(Position::new(1, 1)), Some(4));
        assert_eq!(index.offset_of(Position::new(5, 0)), None);
    }

    #[test]
    fn test_range_of_span() {
        let index = LineIndex::new("play \"biu\"");
        let range = index.range_of(Span::new(5, 10, FileId(0)));
        assert_eq!(range.start, Position::new(0, 5));
        assert_eq!(range.end, Position::new(0, 10));
    }
}
