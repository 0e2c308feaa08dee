//! Rectangular cell snapshots fetched in one round-trip.
//!
//! The Sheets API trims trailing blank rows and cells, so rows may be
//! ragged; any cell outside the returned data reads as blank.

use crate::coord::{CellRef, RangeRef};

/// Look up `cell` in `rows`, whose top-left cell is `origin`.
///
/// Returns `None` for blank cells and for cells outside the snapshot.
#[must_use]
pub fn value_at(rows: &[Vec<String>], cell: CellRef, origin: CellRef) -> Option<&str> {
    let (r, c) = cell.offset_from(origin)?;
    let value = rows.get(r)?.get(c)?.as_str();
    (!value.trim().is_empty()).then_some(value)
}

/// Anything cells can be read from. Typed readers never fail: blank or
/// malformed cells come back as `None`, empty text or `false`.
pub trait CellSource {
    /// Raw value, `None` when blank or absent.
    fn get(&self, cell: CellRef) -> Option<&str>;

    /// Trimmed text, empty when blank.
    fn text(&self, cell: CellRef) -> String {
        self.get(cell).map(str::trim).unwrap_or_default().to_string()
    }

    /// Text, falling back to `default` when blank.
    fn text_or(&self, cell: CellRef, default: &str) -> String {
        self.get(cell)
            .map_or_else(|| default.to_string(), |v| v.trim().to_string())
    }

    /// Integer value. Tolerates `%`, thousands separators and surrounding
    /// whitespace.
    fn int(&self, cell: CellRef) -> Option<i32> {
        let raw = self.get(cell)?;
        let cleaned: String = raw
            .trim()
            .trim_end_matches('%')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        cleaned.trim().parse().ok()
    }

    /// Checkbox value.
    fn flag(&self, cell: CellRef) -> bool {
        self.get(cell).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_uppercase().as_str(),
                "TRUE" | "1" | "O" | "V" | "✓" | "✔"
            )
        })
    }
}

/// A block of cell values anchored at `origin`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Top-left cell of the block.
    pub origin: CellRef,
    /// Row-major values.
    pub rows: Vec<Vec<String>>,
}

impl Snapshot {
    /// Wrap fetched values.
    #[must_use]
    pub fn new(origin: CellRef, rows: Vec<Vec<String>>) -> Self {
        Self { origin, rows }
    }

    /// Empty snapshot for `range`.
    #[must_use]
    pub fn empty(range: RangeRef) -> Self {
        Self {
            origin: range.start,
            rows: Vec::new(),
        }
    }

    /// Overwrite a cell, growing the block as needed. Cells above or left
    /// of the origin are ignored.
    pub fn set(&mut self, cell: CellRef, value: impl Into<String>) {
        let Some((r, c)) = cell.offset_from(self.origin) else {
            return;
        };
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let row = &mut self.rows[r];
        if row.len() <= c {
            row.resize(c + 1, String::new());
        }
        row[c] = value.into();
    }
}

impl CellSource for Snapshot {
    fn get(&self, cell: CellRef) -> Option<&str> {
        value_at(&self.rows, cell, self.origin)
    }
}

/// The snapshots of one full character read, addressed as a single sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    /// Fetched blocks; their ranges must not overlap.
    pub snapshots: Vec<Snapshot>,
}

impl SheetData {
    /// Wrap fetched blocks.
    #[must_use]
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self { snapshots }
    }
}

impl CellSource for SheetData {
    fn get(&self, cell: CellRef) -> Option<&str> {
        self.snapshots.iter().find_map(|s| s.get(cell))
    }
}
