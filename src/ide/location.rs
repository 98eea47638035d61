//! Locations reported to clients.

use std::cmp::Ordering;
use std::path::PathBuf;

use text_size::{TextRange, TextSize};

use crate::base::{FileId, LineCol, LineIndex, Position, Span};
use crate::hir::{Object, Pos, Snapshot};

use super::error::{IdeError, IdeResult};

/// A range in a file, with both byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: FileId,
    pub path: PathBuf,
    pub range: TextRange,
    pub span: Span,
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.path, self.span, self.file).cmp(&(&other.path, other.span, other.file))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) fn span_of(index: &LineIndex, range: TextRange) -> Span {
    let pos = |offset: TextSize| {
        let LineCol { line, col } = index.line_col(offset);
        Position::new(line, col)
    };
    Span::new(pos(range.start()), pos(range.end()))
}

pub(crate) fn range_location(snapshot: &dyn Snapshot, file: FileId, range: TextRange) -> IdeResult<Location> {
    let index = snapshot.line_index(file)?;
    if range.end() > index.len() {
        return Err(IdeError::InvalidRange(format!("{range:?} is past the end of {file}")));
    }
    Ok(Location {
        file,
        path: snapshot.display_path(file),
        range,
        span: span_of(&index, range),
    })
}

/// The location of `len` bytes at `pos`.
pub(crate) fn pos_location(snapshot: &dyn Snapshot, pos: Pos, len: usize) -> IdeResult<Location> {
    let range = TextRange::at(pos.offset, TextSize::new(len as u32));
    range_location(snapshot, pos.file, range)
}

/// The location of an object's name.
pub(crate) fn object_location(snapshot: &dyn Snapshot, obj: &Object) -> IdeResult<Location> {
    let pos = obj.pos().ok_or(IdeError::NoObject)?;
    pos_location(snapshot, pos, obj.name().len())
}

/// Byte offset of a client position.
pub(crate) fn offset_at(snapshot: &dyn Snapshot, file: FileId, position: Position) -> IdeResult<TextSize> {
    let index = snapshot.line_index(file)?;
    index
        .offset(LineCol {
            line: position.line,
            col: position.column,
        })
        .ok_or_else(|| IdeError::InvalidRange(format!("{position:?} is outside {file}")))
}

/// Byte range of a client span.
pub(crate) fn range_at(snapshot: &dyn Snapshot, file: FileId, span: Span) -> IdeResult<TextRange> {
    let start = offset_at(snapshot, file, span.start)?;
    let end = offset_at(snapshot, file, span.end)?;
    if end < start {
        return Err(IdeError::InvalidRange(format!("{span:?} ends before it starts")));
    }
    Ok(TextRange::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_of_multiline_range() {
        let index = LineIndex::new("package p\n\nfunc f() {\n}\n");
        let span = span_of(&index, TextRange::new(TextSize::new(11), TextSize::new(23)));
        assert_eq!(span, Span::from_coords(2, 0, 3, 1));
    }

    #[test]
    fn test_locations_sort_by_path_then_position() {
        let loc = |path: &str, line| Location {
            file: FileId::new(0),
            path: PathBuf::from(path),
            range: TextRange::empty(TextSize::new(0)),
            span: Span::from_coords(line, 0, line, 1),
        };
        let mut locs = vec![loc("b.go", 1), loc("a.go", 7), loc("a.go", 2)];
        locs.sort();
        let order: Vec<_> = locs.iter().map(|l| (l.path.clone(), l.span.start.line)).collect();
        assert_eq!(
            order,
            vec![
                (PathBuf::from("a.go"), 2),
                (PathBuf::from("a.go"), 7),
                (PathBuf::from("b.go"), 1)
            ]
        );
    }
}
