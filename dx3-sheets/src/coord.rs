//! A1-notation coordinates.

use std::fmt;
use std::str::FromStr;

use crate::error::SheetsError;

/// A single cell, zero-based internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// Column index (`A` = 0).
    pub col: u32,
    /// Row index (row `1` = 0).
    pub row: u32,
}

/// Build a cell from a single-letter column and a one-based row, as the
/// template is written.
#[must_use]
pub const fn a1(column: char, row: u32) -> CellRef {
    CellRef {
        col: column as u32 - 'A' as u32,
        row: row - 1,
    }
}

impl CellRef {
    /// Build from zero-based indices.
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Same column, `n` rows down.
    #[must_use]
    pub const fn down(self, n: u32) -> Self {
        Self {
            col: self.col,
            row: self.row + n,
        }
    }

    /// Same row, another column.
    #[must_use]
    pub const fn with_col(self, column: char) -> Self {
        Self {
            col: column as u32 - 'A' as u32,
            row: self.row,
        }
    }

    /// Column letters (`0` → `A`, `26` → `AA`).
    #[must_use]
    pub fn column_letters(&self) -> String {
        let mut n = self.col + 1;
        let mut out = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            out.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
            n = (n - 1) / 26;
        }
        out.iter().rev().collect()
    }

    /// `(row, col)` offset of `self` relative to `origin`, or `None` if
    /// `self` lies above or left of it.
    #[must_use]
    pub fn offset_from(&self, origin: CellRef) -> Option<(usize, usize)> {
        let row = self.row.checked_sub(origin.row)?;
        let col = self.col.checked_sub(origin.col)?;
        Some((row as usize, col as usize))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = SheetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SheetsError::InvalidCoordinate(s.to_string());
        let s = s.trim().trim_start_matches('$');
        let split = s
            .find(|c: char| c.is_ascii_digit() || c == '$')
            .ok_or_else(invalid)?;
        let (letters, digits) = s.split_at(split);
        let digits = digits.trim_start_matches('$');
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            let v = u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1;
            col = col.checked_mul(26).and_then(|x| x.checked_add(v)).ok_or_else(invalid)?;
        }
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self {
            col: col - 1,
            row: row - 1,
        })
    }
}

/// A rectangular range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRef {
    /// Top-left cell.
    pub start: CellRef,
    /// Bottom-right cell, inclusive.
    pub end: CellRef,
}

impl RangeRef {
    /// Build a range from its corners.
    #[must_use]
    pub const fn new(start: CellRef, end: CellRef) -> Self {
        Self { start, end }
    }

    /// Whether `cell` lies inside the range.
    #[must_use]
    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Render with an optional tab prefix (`'캐릭터시트'!B2:R22`).
    #[must_use]
    pub fn qualified(&self, tab: Option<&str>) -> String {
        match tab {
            Some(tab) => format!("'{}'!{self}", tab.replace('\'', "''")),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
