//! Cell formats and the deduplicating style table
//!
//! Cells, rows and columns never hold a [`Format`] directly. They store a
//! [`StyleId`], an index into the workbook's [`StyleTable`], which is also the
//! `s` attribute written to the sheet XML.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Font size used when a format does not set one.
pub const DEFAULT_FONT_SIZE: f64 = 11.0;
/// Font name used when a format does not set one.
pub const DEFAULT_FONT_NAME: &str = "Calibri";

/// Handle to a format registered in a [`StyleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StyleId(pub(crate) u32);

impl StyleId {
    /// The index written as the `s` attribute.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Font properties, used both by cell formats and by rich text fragments.
///
/// Unset fields inherit from the cell format (for fragments) or fall back to
/// [`DEFAULT_FONT_NAME`] / [`DEFAULT_FONT_SIZE`] (for cell formats).
#[derive(Debug, Clone, Default)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
    /// ARGB hex, e.g. `FF0563C1`
    pub color: Option<String>,
}

impl Font {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn effective_size(&self) -> f64 {
        self.size.unwrap_or(DEFAULT_FONT_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.size.is_none()
            && !self.bold
            && !self.italic
            && !self.underline
            && !self.strikeout
            && self.color.is_none()
    }
}

// Sizes compare by bit pattern so that `Font` can key hash maps.
impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.size.map(f64::to_bits) == other.size.map(f64::to_bits)
            && self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.strikeout == other.strikeout
            && self.color == other.color
    }
}

impl Eq for Font {}

impl Hash for Font {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.size.map(f64::to_bits).hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
        self.underline.hash(state);
        self.strikeout.hash(state);
        self.color.hash(state);
    }
}

/// Number format: a built-in id or a custom format code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    Builtin(u32),
    Custom(String),
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::Builtin(0)
    }
}

/// Built-in ids that Excel renders as dates or times.
const BUILTIN_DATE_IDS: &[u32] = &[14, 15, 16, 17, 18, 19, 20, 21, 22, 45, 46, 47];

impl NumberFormat {
    pub fn custom(code: impl Into<String>) -> Self {
        NumberFormat::Custom(code.into())
    }

    /// Whether values with this format are dates or times.
    pub fn is_date_time(&self) -> bool {
        match self {
            NumberFormat::Builtin(id) => BUILTIN_DATE_IDS.contains(id) || (27..=36).contains(id) || (50..=58).contains(id),
            NumberFormat::Custom(code) => is_date_format_code(code),
        }
    }

    /// The format code for built-ins with a known code.
    pub fn code(&self) -> Option<&str> {
        match self {
            NumberFormat::Custom(code) => Some(code),
            NumberFormat::Builtin(id) => builtin_format_code(*id),
        }
    }
}

/// Codes of the built-in formats, as listed in ECMA-376 18.8.30.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Detect date/time tokens in a custom number format code.
///
/// Quoted literals, escaped characters and bracketed sections are ignored,
/// except elapsed-time sections such as `[h]` or `[mm]`.
pub fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut section = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    section.push(c);
                }
                let lower = section.to_ascii_lowercase();
                if !lower.is_empty() && lower.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

impl HorizontalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "general" => HorizontalAlignment::General,
            "left" => HorizontalAlignment::Left,
            "center" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            "fill" => HorizontalAlignment::Fill,
            "justify" => HorizontalAlignment::Justify,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    Justify,
}

impl VerticalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
            VerticalAlignment::Justify => "justify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Center,
            "bottom" => VerticalAlignment::Bottom,
            "justify" => VerticalAlignment::Justify,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    pub horizontal: Option<HorizontalAlignment>,
    pub vertical: Option<VerticalAlignment>,
    pub wrap_text: bool,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        self.horizontal.is_none() && self.vertical.is_none() && !self.wrap_text
    }
}

/// A cell format record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Format {
    pub number_format: NumberFormat,
    pub font: Font,
    /// Solid fill color as ARGB hex
    pub fill_color: Option<String>,
    pub alignment: Alignment,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            number_format: NumberFormat::default(),
            font: Font {
                name: Some(DEFAULT_FONT_NAME.to_string()),
                size: Some(DEFAULT_FONT_SIZE),
                ..Font::default()
            },
            fill_color: None,
            alignment: Alignment::default(),
        }
    }
}

impl Format {
    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = number_format;
        self
    }

    pub fn with_bold(mut self) -> Self {
        self.font.bold = true;
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font.size = Some(size);
        self
    }

    pub fn with_font_color(mut self, argb: impl Into<String>) -> Self {
        self.font.color = Some(argb.into());
        self
    }

    pub fn with_fill_color(mut self, argb: impl Into<String>) -> Self {
        self.fill_color = Some(argb.into());
        self
    }

    pub fn with_horizontal_alignment(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = Some(align);
        self
    }

    pub fn with_wrap_text(mut self) -> Self {
        self.alignment.wrap_text = true;
        self
    }

    pub fn is_date_time(&self) -> bool {
        self.number_format.is_date_time()
    }

    /// Default format for hyperlink cells: blue underlined text.
    pub fn hyperlink() -> Self {
        let mut format = Self::default();
        format.font.color = Some("FF0563C1".to_string());
        format.font.underline = true;
        format
    }
}

/// Deduplicating table of cell formats (`cellXfs`) and differential formats
/// (`dxfs`) used by conditional formatting.
#[derive(Debug, Clone)]
pub struct StyleTable {
    xfs: Vec<Format>,
    lookup: HashMap<Format, StyleId>,
    dxfs: Vec<Format>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    /// Create a table holding only the default format at index 0.
    pub fn new() -> Self {
        let mut table = Self {
            xfs: Vec::new(),
            lookup: HashMap::new(),
            dxfs: Vec::new(),
        };
        table.add_xf_format(Format::default());
        table
    }

    /// An empty table, filled by the styles part reader.
    pub(crate) fn empty() -> Self {
        Self {
            xfs: Vec::new(),
            lookup: HashMap::new(),
            dxfs: Vec::new(),
        }
    }

    /// Register a format, returning the index of an equal existing one if present.
    pub fn add_xf_format(&mut self, format: Format) -> StyleId {
        if let Some(id) = self.lookup.get(&format) {
            return *id;
        }
        let id = StyleId(self.xfs.len() as u32);
        self.lookup.insert(format.clone(), id);
        self.xfs.push(format);
        id
    }

    /// Append a loaded format at the next index without deduplication, so
    /// that indices keep matching the `s` attributes of the source file.
    pub(crate) fn push_loaded(&mut self, format: Format) -> StyleId {
        let id = StyleId(self.xfs.len() as u32);
        self.lookup.entry(format.clone()).or_insert(id);
        self.xfs.push(format);
        id
    }

    pub fn xf_format(&self, id: StyleId) -> Option<&Format> {
        self.xfs.get(id.0 as usize)
    }

    /// Resolve a raw `s` attribute value.
    pub fn style_id(&self, index: u32) -> Option<StyleId> {
        ((index as usize) < self.xfs.len()).then_some(StyleId(index))
    }

    pub fn xf_formats(&self) -> &[Format] {
        &self.xfs
    }

    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }

    /// Register a differential format and return its `dxfId`.
    pub fn add_dxf_format(&mut self, format: Format) -> u32 {
        if let Some(pos) = self.dxfs.iter().position(|f| *f == format) {
            return pos as u32;
        }
        self.dxfs.push(format);
        (self.dxfs.len() - 1) as u32
    }

    pub(crate) fn push_loaded_dxf(&mut self, format: Format) {
        self.dxfs.push(format);
    }

    pub fn dxf_format(&self, id: u32) -> Option<&Format> {
        self.dxfs.get(id as usize)
    }

    pub fn dxf_formats(&self) -> &[Format] {
        &self.dxfs
    }

    /// Return a style equal to `base` (or the default format) but carrying
    /// `number_format` when `base` is not already a date format.
    pub(crate) fn ensure_date_format(&mut self, base: Option<StyleId>, number_format: NumberFormat) -> StyleId {
        let current = base.and_then(|id| self.xf_format(id).cloned());
        match current {
            Some(format) if format.is_date_time() => base.unwrap_or(StyleId(0)),
            Some(format) => self.add_xf_format(format.with_number_format(number_format)),
            None => self.add_xf_format(Format::default().with_number_format(number_format)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_formats() {
        let mut table = StyleTable::new();
        let bold = table.add_xf_format(Format::default().with_bold());
        let again = table.add_xf_format(Format::default().with_bold());
        let default = table.add_xf_format(Format::default());
        assert_eq!(bold, again);
        assert_eq!(default.index(), 0);
        assert_eq!(bold.index(), 1);
        assert_eq!(table.len(), 2);
        assert!(table.xf_format(bold).unwrap().font.bold);
    }

    #[test]
    fn test_date_format_detection() {
        assert!(NumberFormat::Builtin(14).is_date_time());
        assert!(NumberFormat::Builtin(22).is_date_time());
        assert!(!NumberFormat::Builtin(0).is_date_time());
        assert!(!NumberFormat::Builtin(49).is_date_time());
        assert!(NumberFormat::custom("yyyy-mm-dd").is_date_time());
        assert!(NumberFormat::custom("[h]:mm").is_date_time());
        assert!(!NumberFormat::custom("0.00\"days\"").is_date_time());
        assert!(!NumberFormat::custom("[Red]#,##0").is_date_time());
        assert!(!NumberFormat::custom("General").is_date_time());
    }

    #[test]
    fn test_ensure_date_format() {
        let mut table = StyleTable::new();
        let bold = table.add_xf_format(Format::default().with_bold());
        let dated = table.ensure_date_format(Some(bold), NumberFormat::custom("yyyy-mm-dd"));
        assert_ne!(dated, bold);
        let format = table.xf_format(dated).unwrap();
        assert!(format.font.bold);
        assert!(format.is_date_time());
        assert_eq!(table.ensure_date_format(Some(dated), NumberFormat::Builtin(14)), dated);
    }
}
