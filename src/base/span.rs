//! Byte offsets and line/column conversion.

pub use text_size::{TextRange, TextSize};

/// A zero-based line and UTF-16 column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Maps byte offsets of one file's text to line/column pairs and back.
///
/// Columns are measured in UTF-16 code units, which is what LSP clients
/// expect by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    text: std::sync::Arc<str>,
    /// Offset of the first byte of every line.
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: impl Into<std::sync::Arc<str>>) -> Self {
        let text = text.into();
        let mut line_starts = vec![TextSize::new(0)];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(TextSize::new(i as u32 + 1));
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> TextSize {
        TextSize::of(&*self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a line/column. Offsets past the end clamp to
    /// the end of the text.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let segment = &self.text[usize::from(start)..usize::from(offset)];
        let col = segment.chars().map(|c| c.len_utf16() as u32).sum();
        LineCol {
            line: line as u32,
            col,
        }
    }

    /// Convert a line/column back to a byte offset, or `None` if the line is
    /// out of range. Columns past the end of the line clamp to its end.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let start = *self.line_starts.get(line_col.line as usize)?;
        let end = self
            .line_starts
            .get(line_col.line as usize + 1)
            .copied()
            .unwrap_or_else(|| self.len());
        let line_text = &self.text[usize::from(start)..usize::from(end)];
        let mut utf16 = 0u32;
        for (i, c) in line_text.char_indices() {
            if utf16 >= line_col.col || c == '\n' {
                return Some(start + TextSize::new(i as u32));
            }
            utf16 += c.len_utf16() as u32;
        }
        Some(end)
    }

    /// Start offset of the line containing `offset`.
    pub fn line_start(&self, offset: TextSize) -> TextSize {
        let line = self.line_col(offset).line as usize;
        self.line_starts[line]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_roundtrip() {
        let index = LineIndex::new("package p\n\nfunc f() {}\n");
        let lc = index.line_col(TextSize::new(16));
        assert_eq!(lc, LineCol { line: 2, col: 5 });
        assert_eq!(index.offset(lc), Some(TextSize::new(16)));
    }

    #[test]
    fn test_utf16_columns() {
        let index = LineIndex::new("var s = \"é😀x\"");
        let x = "var s = \"é😀".len() as u32;
        // 'é' is one UTF-16 unit, the emoji is two
        assert_eq!(index.line_col(TextSize::new(x)).col, 9 + 1 + 2);
    }

    #[test]
    fn test_offset_out_of_range() {
        let index = LineIndex::new("a\nb");
        assert_eq!(index.offset(LineCol { line: 5, col: 0 }), None);
        assert_eq!(
            index.offset(LineCol { line: 0, col: 40 }),
            Some(TextSize::new(1))
        );
    }
}
