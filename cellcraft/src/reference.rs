//! A1-style cell references and ranges
//!
//! Rows and columns are 1-based everywhere in this crate.

use std::fmt;
use std::str::FromStr;

use crate::error::SheetError;

/// Number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;
/// Number of columns in a worksheet (`XFD`).
pub const MAX_COLUMNS: u32 = 16_384;

/// Check a row index against the sheet bounds.
pub fn check_row(row: u32) -> Result<(), SheetError> {
    if row == 0 || row > MAX_ROWS {
        return Err(SheetError::RowOutOfRange(row));
    }
    Ok(())
}

/// Check a column index against the sheet bounds.
pub fn check_column(col: u32) -> Result<(), SheetError> {
    if col == 0 || col > MAX_COLUMNS {
        return Err(SheetError::ColumnOutOfRange(col));
    }
    Ok(())
}

/// Convert a 1-based column number to letters (1 -> A, 27 -> AA)
pub fn column_to_letters(col: u32) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut c = col;
    while c > 0 {
        let m = (c - 1) % 26;
        letters.push(b'A' + m as u8);
        c = (c - m) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert column letters to a 1-based column number. Case-insensitive.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    (col <= MAX_COLUMNS).then_some(col)
}

/// A single cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Whether the position lies inside the sheet bounds.
    pub fn is_valid(&self) -> bool {
        check_row(self.row).is_ok() && check_column(self.col).is_ok()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = SheetError;

    /// Parse `B12` or `$B$12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| SheetError::InvalidRange(s.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);
        let col = letters_to_column(letters).ok_or_else(|| SheetError::InvalidRange(s.to_string()))?;
        let row = digits
            .parse::<u32>()
            .map_err(|_| SheetError::InvalidRange(s.to_string()))?;
        check_row(row)?;
        Ok(Self { row, col })
    }
}

impl From<(u32, u32)> for CellRef {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

/// An inclusive rectangular range of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    /// Create a range; corners are normalized so `first <= last`.
    pub fn new(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    pub fn single(cell: CellRef) -> Self {
        Self::new(cell.row, cell.col, cell.row, cell.col)
    }

    pub fn top_left(&self) -> CellRef {
        CellRef::new(self.first_row, self.first_col)
    }

    pub fn bottom_right(&self) -> CellRef {
        CellRef::new(self.last_row, self.last_col)
    }

    pub fn row_count(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    pub fn column_count(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.first_row && row <= self.last_row && col >= self.first_col && col <= self.last_col
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// Check both corners against the sheet bounds.
    pub fn validate(&self) -> Result<(), SheetError> {
        check_row(self.first_row)?;
        check_row(self.last_row)?;
        check_column(self.first_col)?;
        check_column(self.last_col)
    }

    /// Iterate every position in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |row| (self.first_col..=self.last_col).map(move |col| CellRef::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.top_left())
        } else {
            write!(f, "{}:{}", self.top_left(), self.bottom_right())
        }
    }
}

impl FromStr for CellRange {
    type Err = SheetError;

    /// Parse `A1:C10` or a single `B2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((start, end)) => {
                let start: CellRef = start.parse()?;
                let end: CellRef = end.parse()?;
                Ok(Self::new(start.row, start.col, end.row, end.col))
            }
            None => Ok(Self::single(s.parse()?)),
        }
    }
}

impl From<CellRef> for CellRange {
    fn from(cell: CellRef) -> Self {
        Self::single(cell)
    }
}

/// Parse a space separated list of ranges (`sqref`), skipping invalid entries.
pub fn parse_sqref(sqref: &str) -> Vec<CellRange> {
    sqref
        .split_whitespace()
        .filter_map(|part| part.parse::<CellRange>().ok())
        .collect()
}

/// Format ranges as a space separated `sqref` list.
pub fn format_sqref(ranges: &[CellRange]) -> String {
    ranges.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!("A1".parse::<CellRef>(), Ok(CellRef::new(1, 1)));
        assert_eq!("B2".parse::<CellRef>(), Ok(CellRef::new(2, 2)));
        assert_eq!("Z26".parse::<CellRef>(), Ok(CellRef::new(26, 26)));
        assert_eq!("AA1".parse::<CellRef>(), Ok(CellRef::new(1, 27)));
        assert_eq!("$AB$10".parse::<CellRef>(), Ok(CellRef::new(10, 28)));
        assert_eq!("xfd1048576".parse::<CellRef>(), Ok(CellRef::new(MAX_ROWS, MAX_COLUMNS)));
        assert!("XFE1".parse::<CellRef>().is_err());
        assert!("A0".parse::<CellRef>().is_err());
        assert!("12".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_parse_cell_range() {
        let range: CellRange = "C3:A1".parse().unwrap();
        assert_eq!(range, CellRange::new(1, 1, 3, 3));
        assert_eq!(range.to_string(), "A1:C3");
        assert_eq!("B2".parse::<CellRange>().unwrap().to_string(), "B2");
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_to_letters(1), "A");
        assert_eq!(column_to_letters(26), "Z");
        assert_eq!(column_to_letters(27), "AA");
        assert_eq!(column_to_letters(702), "ZZ");
        assert_eq!(column_to_letters(703), "AAA");
        assert_eq!(column_to_letters(MAX_COLUMNS), "XFD");
        assert_eq!(letters_to_column("XFD"), Some(MAX_COLUMNS));
    }

    #[test]
    fn test_range_geometry() {
        let a = CellRange::new(1, 1, 2, 3);
        let b = CellRange::new(2, 3, 5, 5);
        let c = CellRange::new(3, 1, 4, 2);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.cells().count(), 6);
        assert_eq!(parse_sqref("A1:B2 D4"), vec![CellRange::new(1, 1, 2, 2), CellRange::new(4, 4, 4, 4)]);
    }
}
