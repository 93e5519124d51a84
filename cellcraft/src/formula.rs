//! Cell formulas and shared formula reference shifting

use regex::{Captures, Regex};

use crate::reference::{CellRange, MAX_COLUMNS, MAX_ROWS, column_to_letters, letters_to_column};

/// The `t` attribute of an `<f>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormulaType {
    #[default]
    Normal,
    Shared,
    Array,
    DataTable,
}

impl FormulaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaType::Normal => "normal",
            FormulaType::Shared => "shared",
            FormulaType::Array => "array",
            FormulaType::DataTable => "dataTable",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "shared" => FormulaType::Shared,
            "array" => FormulaType::Array,
            "dataTable" => FormulaType::DataTable,
            _ => FormulaType::Normal,
        }
    }
}

/// A formula as stored on a cell. The text never starts with `=`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellFormula {
    pub kind: FormulaType,
    pub text: String,
    /// Range covered by a shared, array or data table formula.
    pub reference: Option<CellRange>,
    /// Group index (`si`) of a shared formula.
    pub shared_index: Option<u32>,
    /// The `ca` attribute; only written when explicitly set.
    pub always_calculate: Option<bool>,
}

impl CellFormula {
    /// A normal formula. A leading `=` is stripped.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_type(text, FormulaType::Normal, None)
    }

    pub fn with_type(text: impl Into<String>, kind: FormulaType, reference: Option<CellRange>) -> Self {
        let text = text.into();
        let text = match text.strip_prefix('=') {
            Some(stripped) => stripped.to_string(),
            None => text,
        };
        Self {
            kind,
            text,
            reference,
            shared_index: None,
            always_calculate: None,
        }
    }

    pub fn shared(text: impl Into<String>, reference: CellRange) -> Self {
        Self::with_type(text, FormulaType::Shared, Some(reference))
    }

    pub fn array(text: impl Into<String>, reference: CellRange) -> Self {
        Self::with_type(text, FormulaType::Array, Some(reference))
    }

    /// A dependent member of a shared formula group: no text, only the index.
    pub fn shared_dependent(shared_index: u32) -> Self {
        Self {
            kind: FormulaType::Shared,
            text: String::new(),
            reference: None,
            shared_index: Some(shared_index),
            always_calculate: None,
        }
    }

    /// Whether this is a shared formula whose text lives on another cell.
    pub fn is_shared_dependent(&self) -> bool {
        self.kind == FormulaType::Shared && self.text.is_empty()
    }
}

thread_local! {
    static CELL_REF: Regex = Regex::new(
        r"(?P<sheet>(?:'(?:[^']|'')+'|[A-Za-z_][A-Za-z0-9_\.]*)!)?(?P<col_abs>\$?)(?P<col>[A-Za-z]{1,3})(?P<row_abs>\$?)(?P<row>[0-9]+)",
    )
    .expect("cell reference pattern is valid");
}

/// Shift every relative cell reference in `formula` by the given deltas.
///
/// Absolute components (`$A`, `$1`) stay put, text inside string literals is
/// left alone, and tokens that only look like references (function names such
/// as `LOG10(` or parts of longer identifiers) are skipped. A reference pushed
/// outside the sheet becomes `#REF!`.
pub fn shift_formula_references(formula: &str, row_delta: i64, col_delta: i64) -> String {
    if row_delta == 0 && col_delta == 0 {
        return formula.to_string();
    }
    let mut result = String::with_capacity(formula.len() + 8);
    let mut in_string = false;
    let mut segment_start = 0;
    for (pos, ch) in formula.char_indices() {
        if ch == '"' {
            let segment = &formula[segment_start..pos];
            if in_string {
                result.push_str(segment);
            } else {
                result.push_str(&shift_segment(segment, row_delta, col_delta));
            }
            result.push('"');
            in_string = !in_string;
            segment_start = pos + 1;
        }
    }
    let tail = &formula[segment_start..];
    if in_string {
        result.push_str(tail);
    } else {
        result.push_str(&shift_segment(tail, row_delta, col_delta));
    }
    result
}

fn shift_segment(segment: &str, row_delta: i64, col_delta: i64) -> String {
    CELL_REF.with(|re| {
        re.replace_all(segment, |caps: &Captures| {
            let whole = &caps[0];
            let Some(m) = caps.get(0) else {
                return whole.to_string();
            };
            let before = segment[..m.start()].chars().next_back();
            let after = segment[m.end()..].chars().next();
            let is_identifier_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
            if before.is_some_and(|c| is_identifier_char(c) || c == '$')
                || after.is_some_and(|c| is_identifier_char(c) || c == '(' || c == '!')
            {
                return whole.to_string();
            }

            let Some(col) = letters_to_column(&caps["col"]) else {
                return whole.to_string();
            };
            let Ok(row) = caps["row"].parse::<i64>() else {
                return whole.to_string();
            };
            if row == 0 || row > MAX_ROWS as i64 {
                return whole.to_string();
            }
            let col_abs = !caps["col_abs"].is_empty();
            let row_abs = !caps["row_abs"].is_empty();

            let new_row = if row_abs { row } else { row + row_delta };
            let new_col = if col_abs { col as i64 } else { col as i64 + col_delta };
            if new_row < 1 || new_row > MAX_ROWS as i64 || new_col < 1 || new_col > MAX_COLUMNS as i64 {
                return "#REF!".to_string();
            }

            let mut out = caps.name("sheet").map(|s| s.as_str().to_string()).unwrap_or_default();
            if col_abs {
                out.push('$');
            }
            out.push_str(&column_to_letters(new_col as u32));
            if row_abs {
                out.push('$');
            }
            out.push_str(&new_row.to_string());
            out
        })
        .into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_equals() {
        let f = CellFormula::new("=SUM(A1:A3)");
        assert_eq!(f.text, "SUM(A1:A3)");
        assert_eq!(f.kind, FormulaType::Normal);
    }

    #[test]
    fn test_shift_relative_references() {
        assert_eq!(shift_formula_references("A1+B1", 1, 0), "A2+B2");
        assert_eq!(shift_formula_references("A1+B1", 2, 0), "A3+B3");
        assert_eq!(shift_formula_references("SUM(A1:B2)", 0, 2), "SUM(C1:D2)");
    }

    #[test]
    fn test_shift_keeps_absolute_parts() {
        assert_eq!(shift_formula_references("$A$1*A1", 3, 3), "$A$1*D4");
        assert_eq!(shift_formula_references("$A1+A$1", 1, 1), "$A2+B$1");
    }

    #[test]
    fn test_shift_sheet_qualified() {
        assert_eq!(shift_formula_references("Data!B2+'My Sheet'!C3", 1, 0), "Data!B3+'My Sheet'!C4");
    }

    #[test]
    fn test_shift_skips_strings_and_functions() {
        assert_eq!(shift_formula_references("IF(A1=\"B2\",LOG10(A1),0)", 1, 0), "IF(A2=\"B2\",LOG10(A2),0)");
    }

    #[test]
    fn test_shift_out_of_bounds() {
        assert_eq!(shift_formula_references("A1", -1, 0), "#REF!");
        assert_eq!(shift_formula_references("XFD1+1", 0, 1), "#REF!+1");
    }
}
