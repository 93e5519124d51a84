//! Worksheet cell table
//!
//! A worksheet stores its cells in a two level ordered map (row, then
//! column), together with row and column records, merged ranges, shared
//! formula groups and the sheet-level feature lists. The shared string and
//! style tables belong to the workbook; every worksheet holds a handle to
//! them.

mod features;
mod metadata;

pub use features::{
    AutoFilter, CfRule, CfRuleType, ComparisonOperator, ConditionalFormatting, DataValidation, ErrorStyle, FilterColumn,
    Hyperlink, HyperlinkTarget, ValidationType,
};
pub use metadata::{ColumnInfo, MAX_OUTLINE_LEVEL, RowInfo};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use regex::Regex;

use crate::cell::{Cell, CellType, CellValue};
use crate::config::WorkbookConfig;
use crate::error::SheetError;
use crate::formula::{CellFormula, FormulaType, shift_formula_references};
use crate::reference::{CellRange, CellRef, MAX_COLUMNS, MAX_ROWS, check_column, check_row};
use crate::rich_string::RichString;
use crate::shared_strings::SharedStrings;
use crate::styles::{DEFAULT_FONT_SIZE, Format, NumberFormat, StyleId, StyleTable};
use crate::value::{Value, date_to_serial, datetime_to_serial, serial_to_value, time_to_serial};

use metadata::lower_level;

type SheetResult<T> = Result<T, SheetError>;

/// Longest text a cell can hold.
pub const MAX_STRING_LENGTH: usize = 32_767;

const DEFAULT_DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd";
const DEFAULT_TIME_FORMAT: &str = "hh:mm:ss";

/// Visibility of a sheet tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }
}

/// Master of a shared formula group.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedFormula {
    pub anchor: CellRef,
    pub formula: CellFormula,
}

/// Occupied row and column spans, grown on every write.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Dimension {
    rows: Option<(u32, u32)>,
    columns: Option<(u32, u32)>,
}

impl Dimension {
    fn widen(span: &mut Option<(u32, u32)>, first: u32, last: u32) {
        *span = Some(match *span {
            Some((lo, hi)) => (lo.min(first), hi.max(last)),
            None => (first, last),
        });
    }

    pub(crate) fn add_rows(&mut self, first: u32, last: u32) {
        Self::widen(&mut self.rows, first, last);
    }

    pub(crate) fn add_columns(&mut self, first: u32, last: u32) {
        Self::widen(&mut self.columns, first, last);
    }

    pub(crate) fn add_cell(&mut self, row: u32, col: u32) {
        self.add_rows(row, row);
        self.add_columns(col, col);
    }

    fn range(&self) -> Option<CellRange> {
        match (self.rows, self.columns) {
            (None, None) => None,
            (rows, columns) => {
                let (first_row, last_row) = rows.unwrap_or((1, 1));
                let (first_col, last_col) = columns.unwrap_or((1, 1));
                Some(CellRange::new(first_row, first_col, last_row, last_col))
            }
        }
    }
}

pub struct Worksheet {
    pub(crate) name: String,
    pub(crate) state: SheetState,
    pub(crate) selected: bool,
    pub(crate) config: WorkbookConfig,
    pub(crate) shared_strings: Rc<RefCell<SharedStrings>>,
    pub(crate) styles: Rc<RefCell<StyleTable>>,
    pub(crate) cells: BTreeMap<u32, BTreeMap<u32, Cell>>,
    pub(crate) dimension: Dimension,
    pub(crate) rows: BTreeMap<u32, RowInfo>,
    pub(crate) columns: BTreeMap<u32, ColumnInfo>,
    pub(crate) default_row_height: f64,
    pub(crate) default_column_width: Option<f64>,
    pub(crate) merges: Vec<CellRange>,
    pub(crate) shared_formulas: BTreeMap<u32, SharedFormula>,
    pub(crate) data_validations: Vec<DataValidation>,
    pub(crate) conditional_formats: Vec<ConditionalFormatting>,
    pub(crate) auto_filter: Option<AutoFilter>,
    pub(crate) hyperlinks: Vec<Hyperlink>,
}

impl std::fmt::Debug for Worksheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worksheet")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("rows", &self.cells.len())
            .field("dimension", &self.dimension())
            .finish()
    }
}

fn url_pattern() -> &'static Regex {
    static URL_PATTERN: OnceLock<Regex> = OnceLock::new();
    URL_PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?:https?|ftps?)://|mailto:|file://)\S+$").expect("URL pattern is valid")
    })
}

impl Worksheet {
    pub(crate) fn new(
        name: impl Into<String>,
        config: WorkbookConfig,
        shared_strings: Rc<RefCell<SharedStrings>>,
        styles: Rc<RefCell<StyleTable>>,
    ) -> Self {
        let default_row_height = config.default_row_height;
        Self {
            name: name.into(),
            state: SheetState::Visible,
            selected: false,
            config,
            shared_strings,
            styles,
            cells: BTreeMap::new(),
            dimension: Dimension::default(),
            rows: BTreeMap::new(),
            columns: BTreeMap::new(),
            default_row_height,
            default_column_width: None,
            merges: Vec::new(),
            shared_formulas: BTreeMap::new(),
            data_validations: Vec::new(),
            conditional_formats: Vec::new(),
            auto_filter: None,
            hyperlinks: Vec::new(),
        }
    }

    /// Deep copy under a new name. Shared strings used by the copy get their
    /// reference counts incremented.
    pub(crate) fn duplicate(&self, name: impl Into<String>) -> Self {
        {
            let mut sst = self.shared_strings.borrow_mut();
            for cell in self.cells.values().flat_map(|r| r.values()) {
                if cell.cell_type == CellType::SharedString {
                    sst.add(&shared_content(cell));
                }
            }
        }
        Self {
            name: name.into(),
            state: self.state,
            selected: false,
            config: self.config.clone(),
            shared_strings: Rc::clone(&self.shared_strings),
            styles: Rc::clone(&self.styles),
            cells: self.cells.clone(),
            dimension: self.dimension,
            rows: self.rows.clone(),
            columns: self.columns.clone(),
            default_row_height: self.default_row_height,
            default_column_width: self.default_column_width,
            merges: self.merges.clone(),
            shared_formulas: self.shared_formulas.clone(),
            data_validations: self.data_validations.clone(),
            conditional_formats: self.conditional_formats.clone(),
            auto_filter: self.auto_filter.clone(),
            hyperlinks: self.hyperlinks.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SheetState {
        self.state
    }

    pub fn set_state(&mut self, state: SheetState) {
        self.state = state;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn config(&self) -> &WorkbookConfig {
        &self.config
    }

    pub fn default_row_height(&self) -> f64 {
        self.default_row_height
    }

    pub fn set_default_row_height(&mut self, height: f64) {
        self.default_row_height = height;
    }

    /// Register a format in the workbook style table.
    pub fn add_format(&self, format: Format) -> StyleId {
        self.styles.borrow_mut().add_xf_format(format)
    }

    /// Look up a registered format.
    pub fn format(&self, id: StyleId) -> Option<Format> {
        self.styles.borrow().xf_format(id).cloned()
    }

    /// Bounding range of everything written so far, `None` for an empty sheet.
    pub fn dimension(&self) -> Option<CellRange> {
        self.dimension.range()
    }

    // Cell storage

    fn store(&mut self, row: u32, col: u32, cell: Cell) {
        self.release_shared_master(row, col);
        self.cells.entry(row).or_default().insert(col, cell);
        self.dimension.add_cell(row, col);
    }

    pub fn cell_at(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&row)?.get(&col)
    }

    pub fn cell_at_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&row)?.get_mut(&col)
    }

    /// Iterate populated cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells
            .iter()
            .flat_map(|(row, cols)| cols.iter().map(move |(col, cell)| (CellRef::new(*row, *col), cell)))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    /// Write a dynamically typed value.
    ///
    /// Text starting with `=` becomes a formula, `{=...}` an array formula
    /// over the single cell. Depending on the workbook configuration, URL-like
    /// text becomes a hyperlink and numeric text a number.
    pub fn write(&mut self, row: u32, col: u32, value: impl Into<Value>, format: Option<StyleId>) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        match value.into() {
            Value::Null => self.write_blank(row, col, format),
            Value::Number(n) => self.write_numeric(row, col, n, format),
            Value::Boolean(b) => self.write_bool(row, col, b, format),
            Value::DateTime(dt) => self.write_date_time(row, col, dt, format),
            Value::Date(d) => self.write_date(row, col, d, format),
            Value::Time(t) => self.write_time(row, col, t, format),
            Value::Url(url) => self.write_hyperlink(row, col, &url, None, None, format),
            Value::RichText(rich) => self.write_rich_string(row, col, &rich, format),
            Value::Text(text) => self.write_text(row, col, &text, format),
        }
    }

    fn write_text(&mut self, row: u32, col: u32, text: &str, format: Option<StyleId>) -> SheetResult<()> {
        if let Some(inner) = text.strip_prefix("{=").and_then(|t| t.strip_suffix('}')) {
            let cell = CellRange::single(CellRef::new(row, col));
            return self.write_formula(row, col, CellFormula::array(inner, cell), format, None);
        }
        if text.len() > 1 && text.starts_with('=') {
            return self.write_formula(row, col, CellFormula::new(text), format, None);
        }
        if self.config.strings_to_hyperlinks && url_pattern().is_match(text) {
            return self.write_hyperlink(row, col, text, None, None, format);
        }
        if self.config.strings_to_numbers
            && let Some(n) = parse_number(text)
        {
            return self.write_numeric(row, col, n, format);
        }
        self.write_string(row, col, text, format)
    }

    /// Write plain text through the shared string table.
    pub fn write_string(&mut self, row: u32, col: u32, text: &str, format: Option<StyleId>) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        let text = truncate(text);
        self.shared_strings.borrow_mut().add(&RichString::plain(text.as_str()));
        let cell = Cell::new(CellType::SharedString, CellValue::Text(text)).with_format(format);
        self.store(row, col, cell);
        Ok(())
    }

    /// Write formatted text. A string without formatting is stored as plain text.
    pub fn write_rich_string(
        &mut self,
        row: u32,
        col: u32,
        text: &RichString,
        format: Option<StyleId>,
    ) -> SheetResult<()> {
        if !text.is_rich() {
            return self.write_string(row, col, &text.to_plain_text(), format);
        }
        check_row(row)?;
        check_column(col)?;
        self.shared_strings.borrow_mut().add(text);
        let cell = Cell::new(CellType::SharedString, CellValue::Text(text.to_plain_text()))
            .with_rich_string(text.clone())
            .with_format(format);
        self.store(row, col, cell);
        Ok(())
    }

    /// Write text stored inside the cell element instead of the shared string table.
    pub fn write_inline_string(&mut self, row: u32, col: u32, text: &str, format: Option<StyleId>) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        let cell = Cell::new(CellType::InlineString, CellValue::Text(truncate(text))).with_format(format);
        self.store(row, col, cell);
        Ok(())
    }

    /// Write a number. Infinities and NaN cannot be stored and become `#NUM!`.
    pub fn write_numeric(&mut self, row: u32, col: u32, value: f64, format: Option<StyleId>) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        let cell = if value.is_finite() {
            Cell::new(CellType::Number, CellValue::Number(value))
        } else {
            warn!("non-finite number written to {}, storing #NUM!", CellRef::new(row, col));
            Cell::new(CellType::Error, CellValue::Text("#NUM!".to_string()))
        };
        self.store(row, col, cell.with_format(format));
        Ok(())
    }

    pub fn write_bool(&mut self, row: u32, col: u32, value: bool, format: Option<StyleId>) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        self.store(row, col, Cell::new(CellType::Boolean, CellValue::Boolean(value)).with_format(format));
        Ok(())
    }

    fn write_serial(
        &mut self,
        row: u32,
        col: u32,
        serial: f64,
        format: Option<StyleId>,
        default_code: &str,
    ) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        let style = self
            .styles
            .borrow_mut()
            .ensure_date_format(format, NumberFormat::custom(default_code));
        let cell = Cell::new(CellType::Date, CellValue::Number(serial)).with_format(Some(style));
        self.store(row, col, cell);
        Ok(())
    }

    /// Write a date-time as a serial number. A format without a date number
    /// format gets `yyyy-mm-dd hh:mm:ss`.
    pub fn write_date_time(
        &mut self,
        row: u32,
        col: u32,
        value: NaiveDateTime,
        format: Option<StyleId>,
    ) -> SheetResult<()> {
        let serial = datetime_to_serial(value, self.config.date1904);
        self.write_serial(row, col, serial, format, DEFAULT_DATE_TIME_FORMAT)
    }

    pub fn write_date(&mut self, row: u32, col: u32, value: NaiveDate, format: Option<StyleId>) -> SheetResult<()> {
        let serial = date_to_serial(value, self.config.date1904);
        self.write_serial(row, col, serial, format, DEFAULT_DATE_FORMAT)
    }

    pub fn write_time(&mut self, row: u32, col: u32, value: NaiveTime, format: Option<StyleId>) -> SheetResult<()> {
        self.write_serial(row, col, time_to_serial(value), format, DEFAULT_TIME_FORMAT)
    }

    /// Write a formula with an optional cached numeric result.
    ///
    /// A shared formula without a group index gets the lowest free one and is
    /// registered as the group master. When its range covers more than one
    /// cell, every other cell of the range receives a dependent formula
    /// pointing at the group.
    pub fn write_formula(
        &mut self,
        row: u32,
        col: u32,
        formula: CellFormula,
        format: Option<StyleId>,
        result: Option<f64>,
    ) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        let mut formula = formula;
        if formula.kind != FormulaType::Normal && formula.reference.is_none() && !formula.is_shared_dependent() {
            formula.reference = Some(CellRange::single(CellRef::new(row, col)));
        }
        if let Some(range) = &formula.reference {
            range.validate()?;
        }

        self.release_shared_master(row, col);
        let mut dependents = None;
        let mut master_index = None;
        if formula.kind == FormulaType::Shared && !formula.is_shared_dependent() {
            let si = match formula.shared_index {
                Some(si) if !self.shared_formulas.contains_key(&si) => si,
                Some(si) => {
                    let free = self.next_shared_index();
                    warn!("shared formula index {} is taken, using {}", si, free);
                    free
                }
                None => self.next_shared_index(),
            };
            formula.shared_index = Some(si);
            master_index = Some(si);
            if let Some(range) = formula.reference.filter(|r| !r.is_single_cell()) {
                dependents = Some((range, si));
            }
        }

        let master = master_index.map(|si| {
            (
                si,
                SharedFormula {
                    anchor: CellRef::new(row, col),
                    formula: formula.clone(),
                },
            )
        });
        let value = result.map(CellValue::Number).unwrap_or_default();
        let cell = Cell::new(CellType::Number, value)
            .with_formula(formula)
            .with_format(format);
        self.store(row, col, cell);
        if let Some((si, master)) = master {
            self.shared_formulas.insert(si, master);
        }

        if let Some((range, si)) = dependents {
            for pos in range.cells().filter(|p| (p.row, p.col) != (row, col)) {
                self.release_shared_master(pos.row, pos.col);
                match self.cell_at_mut(pos.row, pos.col) {
                    Some(existing) => existing.formula = Some(CellFormula::shared_dependent(si)),
                    None => self.store(
                        pos.row,
                        pos.col,
                        Cell::blank(None).with_formula(CellFormula::shared_dependent(si)),
                    ),
                }
            }
        }
        Ok(())
    }

    /// Dissolve the shared group whose master sits at (row, col), if any.
    ///
    /// Every dependent of the group becomes a normal formula carrying its
    /// shifted text, and the group leaves the registry.
    fn release_shared_master(&mut self, row: u32, col: u32) {
        let Some(si) = self
            .cell_at(row, col)
            .and_then(|cell| cell.formula.as_ref())
            .filter(|f| f.kind == FormulaType::Shared && !f.is_shared_dependent())
            .and_then(|f| f.shared_index)
        else {
            return;
        };
        match self.shared_formulas.get(&si) {
            Some(master) if master.anchor == CellRef::new(row, col) => {}
            _ => return,
        }
        let Some(master) = self.shared_formulas.remove(&si) else {
            return;
        };
        let mut released = 0usize;
        for (r, cols) in self.cells.iter_mut() {
            for (c, cell) in cols.iter_mut() {
                let dependent = cell
                    .formula
                    .as_ref()
                    .is_some_and(|f| f.is_shared_dependent() && f.shared_index == Some(si));
                if dependent {
                    let text = shift_formula_references(
                        &master.formula.text,
                        *r as i64 - row as i64,
                        *c as i64 - col as i64,
                    );
                    cell.formula = Some(CellFormula::new(text));
                    released += 1;
                }
            }
        }
        debug!("dissolved shared formula {} at {} ({} dependents)", si, master.anchor, released);
    }

    fn next_shared_index(&self) -> u32 {
        (0..).find(|si| !self.shared_formulas.contains_key(si)).unwrap_or(0)
    }

    /// Master formula of a shared group.
    pub fn shared_formula(&self, shared_index: u32) -> Option<&SharedFormula> {
        self.shared_formulas.get(&shared_index)
    }

    pub(crate) fn register_shared_formula(&mut self, anchor: CellRef, formula: CellFormula) {
        if let Some(si) = formula.shared_index {
            self.shared_formulas.insert(si, SharedFormula { anchor, formula });
        }
    }

    /// Write a cell with no value, keeping only its format.
    pub fn write_blank(&mut self, row: u32, col: u32, format: Option<StyleId>) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        self.store(row, col, Cell::blank(format));
        Ok(())
    }

    /// Write a hyperlink cell.
    ///
    /// The cell shows `display` (or the URL without a `mailto:` prefix) and
    /// uses the hyperlink format unless `format` is given. URLs starting with
    /// `internal:` point inside the workbook.
    pub fn write_hyperlink(
        &mut self,
        row: u32,
        col: u32,
        url: &str,
        display: Option<&str>,
        tooltip: Option<&str>,
        format: Option<StyleId>,
    ) -> SheetResult<()> {
        check_row(row)?;
        check_column(col)?;
        let shown = match display {
            Some(text) => text.to_string(),
            None => {
                let target = url.strip_prefix("internal:").unwrap_or(url);
                target.strip_prefix("mailto:").unwrap_or(target).to_string()
            }
        };
        let format = match format {
            Some(id) => id,
            None => self.add_format(Format::hyperlink()),
        };
        self.write_string(row, col, &shown, Some(format))?;

        let range = CellRange::single(CellRef::new(row, col));
        let mut link = Hyperlink::from_url(range, url);
        link.display = display.map(str::to_string);
        link.tooltip = tooltip.map(str::to_string);
        self.add_hyperlink(link);
        Ok(())
    }

    /// Attach a hyperlink, replacing any link on the same range.
    pub fn add_hyperlink(&mut self, link: Hyperlink) {
        self.hyperlinks.retain(|h| h.range != link.range);
        self.hyperlinks.push(link);
    }

    pub fn hyperlinks(&self) -> &[Hyperlink] {
        &self.hyperlinks
    }

    /// Read the logical value of a cell.
    ///
    /// Formula cells yield their text with a leading `=`; dependents of a
    /// shared formula get the master text shifted to their own position.
    pub fn read(&self, row: u32, col: u32) -> Value {
        let Some(cell) = self.cell_at(row, col) else {
            return Value::Null;
        };
        if let Some(formula) = &cell.formula {
            return Value::Text(format!("={}", self.formula_text(row, col, formula)));
        }
        match (cell.cell_type, &cell.value) {
            (_, CellValue::Empty) => Value::Null,
            (CellType::Date, CellValue::Number(serial)) => {
                serial_to_value(*serial, self.config.date1904).unwrap_or(Value::Number(*serial))
            }
            (CellType::SharedString | CellType::InlineString, CellValue::Text(text)) => match &cell.rich_string {
                Some(rich) if rich.is_rich() => Value::RichText(rich.clone()),
                _ => Value::Text(text.clone()),
            },
            (_, CellValue::Number(n)) => Value::Number(*n),
            (_, CellValue::Boolean(b)) => Value::Boolean(*b),
            (_, CellValue::Text(text)) => Value::Text(text.clone()),
        }
    }

    /// Effective formula text of the cell at (row, col), without `=`.
    fn formula_text(&self, row: u32, col: u32, formula: &CellFormula) -> String {
        if !formula.is_shared_dependent() {
            return formula.text.clone();
        }
        let Some(master) = formula.shared_index.and_then(|si| self.shared_formulas.get(&si)) else {
            warn!("shared formula {:?} at {} has no master", formula.shared_index, CellRef::new(row, col));
            return String::new();
        };
        let row_delta = row as i64 - master.anchor.row as i64;
        let col_delta = col as i64 - master.anchor.col as i64;
        shift_formula_references(&master.formula.text, row_delta, col_delta)
    }

    // Merges

    /// Merge a range. Every cell but the top-left one is blanked; `format`,
    /// when given, is applied to all of them.
    pub fn merge_cells(&mut self, range: CellRange, format: Option<StyleId>) -> SheetResult<()> {
        range.validate()?;
        if range.is_single_cell() {
            return Err(SheetError::InvalidRange(range.to_string()));
        }
        if let Some(existing) = self.merges.iter().find(|m| m.intersects(&range)) {
            return Err(SheetError::OverlappingMerge(existing.to_string()));
        }

        let top_left = range.top_left();
        for pos in range.cells() {
            if pos == top_left {
                match self.cell_at_mut(pos.row, pos.col) {
                    Some(cell) => {
                        if format.is_some() {
                            cell.format = format;
                        }
                    }
                    None => self.store(pos.row, pos.col, Cell::blank(format)),
                }
            } else {
                self.store(pos.row, pos.col, Cell::blank(format));
            }
        }
        self.merges.push(range);
        Ok(())
    }

    /// Remove a merge. Only an exact match is removed.
    pub fn unmerge_cells(&mut self, range: CellRange) -> SheetResult<()> {
        let pos = self
            .merges
            .iter()
            .position(|m| *m == range)
            .ok_or_else(|| SheetError::MergeNotFound(range.to_string()))?;
        self.merges.remove(pos);
        Ok(())
    }

    pub fn merged_cells(&self) -> &[CellRange] {
        &self.merges
    }

    // Row records

    fn row_span(first: u32, last: u32) -> SheetResult<()> {
        check_row(first)?;
        check_row(last)?;
        if first > last {
            return Err(SheetError::InvalidRange(format!("rows {}:{}", first, last)));
        }
        Ok(())
    }

    fn column_span(first: u32, last: u32) -> SheetResult<()> {
        check_column(first)?;
        check_column(last)?;
        if first > last {
            return Err(SheetError::InvalidRange(format!("columns {}:{}", first, last)));
        }
        Ok(())
    }

    fn update_rows(&mut self, first: u32, last: u32, mut update: impl FnMut(&mut RowInfo)) -> SheetResult<()> {
        Self::row_span(first, last)?;
        for row in first..=last {
            update(self.rows.entry(row).or_default());
        }
        self.dimension.add_rows(first, last);
        Ok(())
    }

    fn update_columns(&mut self, first: u32, last: u32, mut update: impl FnMut(&mut ColumnInfo)) -> SheetResult<()> {
        Self::column_span(first, last)?;
        for col in first..=last {
            update(self.columns.entry(col).or_default());
        }
        self.dimension.add_columns(first, last);
        Ok(())
    }

    /// Set the height in points of rows `first..=last`.
    pub fn set_row_height(&mut self, first: u32, last: u32, height: f64) -> SheetResult<()> {
        self.update_rows(first, last, |info| info.height = Some(height))
    }

    pub fn set_row_format(&mut self, first: u32, last: u32, format: Option<StyleId>) -> SheetResult<()> {
        self.update_rows(first, last, |info| info.format = format)
    }

    pub fn set_row_hidden(&mut self, first: u32, last: u32, hidden: bool) -> SheetResult<()> {
        self.update_rows(first, last, |info| info.hidden = Some(hidden))
    }

    pub fn row_info(&self, row: u32) -> Option<&RowInfo> {
        self.rows.get(&row)
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.rows.get(&row).and_then(|r| r.height)
    }

    pub fn row_format(&self, row: u32) -> Option<StyleId> {
        self.rows.get(&row).and_then(|r| r.format)
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.rows.get(&row).and_then(|r| r.hidden).unwrap_or(false)
    }

    // Column records

    /// Set the width in characters of columns `first..=last`.
    pub fn set_column_width(&mut self, first: u32, last: u32, width: f64) -> SheetResult<()> {
        self.update_columns(first, last, |info| info.width = Some(width))
    }

    pub fn set_column_format(&mut self, first: u32, last: u32, format: Option<StyleId>) -> SheetResult<()> {
        self.update_columns(first, last, |info| info.format = format)
    }

    pub fn set_column_hidden(&mut self, first: u32, last: u32, hidden: bool) -> SheetResult<()> {
        self.update_columns(first, last, |info| info.hidden = Some(hidden))
    }

    pub fn column_info(&self, col: u32) -> Option<&ColumnInfo> {
        self.columns.get(&col)
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.columns.get(&col).and_then(|c| c.width)
    }

    pub fn column_format(&self, col: u32) -> Option<StyleId> {
        self.columns.get(&col).and_then(|c| c.format)
    }

    pub fn is_column_hidden(&self, col: u32) -> bool {
        self.columns.get(&col).and_then(|c| c.hidden).unwrap_or(false)
    }

    // Outlines

    /// Add one outline level to rows `first..=last`. With `collapsed`, the
    /// rows are hidden and the row below them carries the collapse marker.
    pub fn group_rows(&mut self, first: u32, last: u32, collapsed: bool) -> SheetResult<()> {
        Self::row_span(first, last)?;
        if (first..=last).any(|r| self.rows.get(&r).map_or(0, RowInfo::level) >= MAX_OUTLINE_LEVEL) {
            return Err(SheetError::OutlineLevelExceeded);
        }
        self.update_rows(first, last, |info| {
            info.outline_level = Some(info.level() + 1);
            if collapsed {
                info.hidden = Some(true);
            }
        })?;
        if collapsed && last < MAX_ROWS {
            self.update_rows(last + 1, last + 1, |info| info.collapsed = Some(true))?;
        }
        Ok(())
    }

    /// Remove one outline level from rows `first..=last`. Rows leaving a
    /// collapsed group are shown again; other hidden rows stay hidden.
    pub fn ungroup_rows(&mut self, first: u32, last: u32) -> SheetResult<()> {
        Self::row_span(first, last)?;
        let was_collapsed = self
            .rows
            .get_mut(&(last + 1))
            .and_then(|next| next.collapsed.take())
            .unwrap_or(false);
        for row in first..=last {
            if let Some(info) = self.rows.get_mut(&row) {
                info.outline_level = lower_level(info.outline_level);
                if was_collapsed && info.outline_level.is_none() {
                    info.hidden = None;
                }
            }
        }
        self.rows.retain(|_, info| !info.is_default());
        Ok(())
    }

    /// Add one outline level to columns `first..=last`.
    pub fn group_columns(&mut self, first: u32, last: u32, collapsed: bool) -> SheetResult<()> {
        Self::column_span(first, last)?;
        if (first..=last).any(|c| self.columns.get(&c).map_or(0, ColumnInfo::level) >= MAX_OUTLINE_LEVEL) {
            return Err(SheetError::OutlineLevelExceeded);
        }
        self.update_columns(first, last, |info| {
            info.outline_level = Some(info.level() + 1);
            if collapsed {
                info.hidden = Some(true);
            }
        })?;
        if collapsed && last < MAX_COLUMNS {
            self.update_columns(last + 1, last + 1, |info| info.collapsed = Some(true))?;
        }
        Ok(())
    }

    pub fn ungroup_columns(&mut self, first: u32, last: u32) -> SheetResult<()> {
        Self::column_span(first, last)?;
        let was_collapsed = self
            .columns
            .get_mut(&(last + 1))
            .and_then(|next| next.collapsed.take())
            .unwrap_or(false);
        for col in first..=last {
            if let Some(info) = self.columns.get_mut(&col) {
                info.outline_level = lower_level(info.outline_level);
                if was_collapsed && info.outline_level.is_none() {
                    info.hidden = None;
                }
            }
        }
        self.columns.retain(|_, info| !info.is_default());
        Ok(())
    }

    /// Approximate column widths from the longest displayed text in each
    /// column of `range`, scaled by the font size against 11pt. This is a
    /// character count heuristic, not a text measurement.
    pub fn autosize_column_widths(&mut self, range: CellRange) -> SheetResult<()> {
        range.validate()?;
        let mut widths: BTreeMap<u32, f64> = BTreeMap::new();
        {
            let styles = self.styles.borrow();
            for (row, cols) in self.cells.range(range.first_row..=range.last_row) {
                for (col, cell) in cols.range(range.first_col..=range.last_col) {
                    let text = self.read(*row, *col).display_text();
                    if text.is_empty() {
                        continue;
                    }
                    let style = cell
                        .format
                        .or_else(|| self.row_format(*row))
                        .or_else(|| self.column_format(*col));
                    let size = style
                        .and_then(|id| styles.xf_format(id))
                        .map(|f| f.font.effective_size())
                        .unwrap_or(DEFAULT_FONT_SIZE);
                    let width = text.chars().count() as f64 * size / DEFAULT_FONT_SIZE;
                    let entry = widths.entry(*col).or_insert(0.0);
                    *entry = entry.max(width);
                }
            }
        }
        for (col, width) in widths {
            self.set_column_width(col, col, width)?;
        }
        Ok(())
    }

    // Sheet features

    /// Add a data validation. A range already covered by another validation
    /// is rejected.
    pub fn add_data_validation(&mut self, validation: DataValidation) -> SheetResult<()> {
        if validation.ranges.is_empty() {
            return Err(SheetError::InvalidRange(String::new()));
        }
        for range in &validation.ranges {
            range.validate()?;
            if self.data_validations.iter().any(|dv| dv.ranges.contains(range)) {
                return Err(SheetError::DuplicateValidationRange(range.to_string()));
            }
        }
        self.data_validations.push(validation);
        Ok(())
    }

    pub fn data_validations(&self) -> &[DataValidation] {
        &self.data_validations
    }

    /// Add a conditional format. Rule formats are registered as differential
    /// formats and unset priorities continue after the highest existing one.
    pub fn add_conditional_formatting(&mut self, mut formatting: ConditionalFormatting) -> SheetResult<()> {
        if formatting.ranges.is_empty() {
            return Err(SheetError::InvalidRange(String::new()));
        }
        for range in &formatting.ranges {
            range.validate()?;
        }
        let mut next_priority = self
            .conditional_formats
            .iter()
            .flat_map(|cf| cf.rules.iter().map(|r| r.priority))
            .max()
            .unwrap_or(0)
            + 1;
        {
            let mut styles = self.styles.borrow_mut();
            for rule in &mut formatting.rules {
                if let Some(format) = &rule.format {
                    rule.dxf_id = Some(styles.add_dxf_format(format.clone()));
                }
                if rule.priority == 0 {
                    rule.priority = next_priority;
                    next_priority += 1;
                }
            }
        }
        self.conditional_formats.push(formatting);
        Ok(())
    }

    pub fn conditional_formats(&self) -> &[ConditionalFormatting] {
        &self.conditional_formats
    }

    pub fn set_auto_filter(&mut self, filter: AutoFilter) -> SheetResult<()> {
        filter.range.validate()?;
        self.auto_filter = Some(filter);
        Ok(())
    }

    pub fn clear_auto_filter(&mut self) {
        self.auto_filter = None;
    }

    pub fn auto_filter(&self) -> Option<&AutoFilter> {
        self.auto_filter.as_ref()
    }

    pub fn rows(&self) -> &BTreeMap<u32, RowInfo> {
        &self.rows
    }

    pub fn columns(&self) -> &BTreeMap<u32, ColumnInfo> {
        &self.columns
    }

    // Loading

    pub(crate) fn insert_loaded(&mut self, row: u32, col: u32, cell: Cell) {
        self.store(row, col, cell);
    }

    /// Apply a `<dimension>` read from the source, keeping every loaded cell inside it.
    pub(crate) fn apply_declared_dimension(&mut self, declared: CellRange) {
        self.dimension.add_rows(declared.first_row, declared.last_row);
        self.dimension.add_columns(declared.first_col, declared.last_col);
        debug!("sheet '{}' declared dimension {}", self.name, declared);
    }
}

/// Text identity of a shared string cell.
pub(crate) fn shared_content(cell: &Cell) -> RichString {
    match (&cell.rich_string, &cell.value) {
        (Some(rich), _) => rich.clone(),
        (None, CellValue::Text(text)) => RichString::plain(text.as_str()),
        _ => RichString::plain(""),
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_STRING_LENGTH) {
        Some((end, _)) => {
            warn!("string of {} characters truncated to {}", text.chars().count(), MAX_STRING_LENGTH);
            text[..end].to_string()
        }
        None => text.to_string(),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() != text.len() {
        return None;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
