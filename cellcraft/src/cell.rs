//! Cell data structures

use crate::formula::CellFormula;
use crate::rich_string::RichString;
use crate::styles::StyleId;

/// How a cell is stored in the sheet XML (`t` attribute plus content rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    /// `t="n"`, also used for blank cells
    #[default]
    Number,
    /// `t="s"`, content lives in the shared string table
    SharedString,
    /// `t="inlineStr"`
    InlineString,
    /// `t="str"`, text result of a formula
    Str,
    /// `t="b"`
    Boolean,
    /// Numeric serial day count with a date format
    Date,
    /// `t="e"`
    Error,
    /// No `t` attribute was present in the source
    Custom,
}

impl CellType {
    /// The `t` attribute value, if any.
    pub fn type_attr(&self) -> Option<&'static str> {
        match self {
            CellType::Number | CellType::Date => Some("n"),
            CellType::SharedString => Some("s"),
            CellType::InlineString => Some("inlineStr"),
            CellType::Str => Some("str"),
            CellType::Boolean => Some("b"),
            CellType::Error => Some("e"),
            CellType::Custom => None,
        }
    }

    /// Parse a `t` attribute; `None` maps to [`CellType::Custom`].
    pub fn from_attr(attr: Option<&str>) -> Self {
        match attr {
            None => CellType::Custom,
            Some("s") => CellType::SharedString,
            Some("inlineStr") => CellType::InlineString,
            Some("str") => CellType::Str,
            Some("b") => CellType::Boolean,
            Some("e") => CellType::Error,
            Some("d") => CellType::Date,
            Some(_) => CellType::Number,
        }
    }
}

/// Stored cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub(crate) cell_type: CellType,
    pub(crate) value: CellValue,
    pub(crate) formula: Option<CellFormula>,
    pub(crate) rich_string: Option<RichString>,
    pub(crate) format: Option<StyleId>,
}

impl Cell {
    pub fn new(cell_type: CellType, value: CellValue) -> Self {
        Self {
            cell_type,
            value,
            ..Self::default()
        }
    }

    /// A cell with no value, possibly carrying only a format.
    pub fn blank(format: Option<StyleId>) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub(crate) fn with_format(mut self, format: Option<StyleId>) -> Self {
        self.format = format;
        self
    }

    pub(crate) fn with_formula(mut self, formula: CellFormula) -> Self {
        self.formula = Some(formula);
        self
    }

    pub(crate) fn with_rich_string(mut self, rich_string: RichString) -> Self {
        self.rich_string = Some(rich_string);
        self
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn formula(&self) -> Option<&CellFormula> {
        self.formula.as_ref()
    }

    pub fn rich_string(&self) -> Option<&RichString> {
        self.rich_string.as_ref()
    }

    pub fn format(&self) -> Option<StyleId> {
        self.format
    }

    pub fn set_format(&mut self, format: Option<StyleId>) {
        self.format = format;
    }

    pub fn set_value(&mut self, value: CellValue) {
        self.value = value;
    }

    pub fn set_formula(&mut self, formula: Option<CellFormula>) {
        self.formula = formula;
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// A number cell without a value or formula.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.formula.is_none() && self.rich_string.is_none()
    }

    /// Whether this cell is stored as a date serial.
    pub fn is_date_time(&self) -> bool {
        self.cell_type == CellType::Date
    }

    /// Text content of string cells, rich or plain.
    pub fn text(&self) -> Option<String> {
        match (&self.rich_string, &self.value) {
            (Some(rich), _) => Some(rich.to_plain_text()),
            (None, CellValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_not_zero() {
        let blank = Cell::blank(None);
        let zero = Cell::new(CellType::Number, CellValue::Number(0.0));
        assert!(blank.is_blank());
        assert!(!zero.is_blank());
        assert_ne!(blank, zero);
    }

    #[test]
    fn test_type_attr() {
        assert_eq!(CellType::from_attr(None), CellType::Custom);
        assert_eq!(CellType::from_attr(Some("s")), CellType::SharedString);
        assert_eq!(CellType::from_attr(Some("n")), CellType::Number);
        assert_eq!(CellType::Date.type_attr(), Some("n"));
        assert_eq!(CellType::Custom.type_attr(), None);
    }

    #[test]
    fn test_rich_text_content() {
        let cell = Cell::new(CellType::SharedString, CellValue::Text("ab".into()))
            .with_rich_string(RichString::new().with_fragment("a", None).with_fragment("b", None));
        assert_eq!(cell.text().as_deref(), Some("ab"));
    }
}
