//! Workbook: the owner of the worksheets and of the tables they share

use std::cell::RefCell;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use log::debug;

use crate::config::WorkbookConfig;
use crate::error::SheetError;
use crate::shared_strings::SharedStrings;
use crate::styles::{Format, StyleId, StyleTable};
use crate::worksheet::Worksheet;
use crate::{reader, writer};

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME_LENGTH: usize = 31;

const INVALID_SHEET_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// An in-memory workbook.
///
/// Worksheets hold handles to the workbook's shared string and style tables,
/// so formats registered through any sheet are visible to all of them.
pub struct Workbook {
    pub(crate) config: WorkbookConfig,
    pub(crate) shared_strings: Rc<RefCell<SharedStrings>>,
    pub(crate) styles: Rc<RefCell<StyleTable>>,
    pub(crate) worksheets: Vec<Worksheet>,
    pub(crate) active_sheet: usize,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("sheets", &self.sheet_names())
            .field("active_sheet", &self.active_sheet)
            .finish()
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create an empty workbook with the default configuration
    pub fn new() -> Self {
        Self::with_config(WorkbookConfig::default())
    }

    /// Create an empty workbook with a custom configuration
    pub fn with_config(config: WorkbookConfig) -> Self {
        Self::from_parts(config, SharedStrings::new(), StyleTable::new())
    }

    pub(crate) fn from_parts(config: WorkbookConfig, shared_strings: SharedStrings, styles: StyleTable) -> Self {
        Self {
            config,
            shared_strings: Rc::new(RefCell::new(shared_strings)),
            styles: Rc::new(RefCell::new(styles)),
            worksheets: Vec::new(),
            active_sheet: 0,
        }
    }

    /// Open an `.xlsx` file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        reader::read_workbook(path, WorkbookConfig::default())
    }

    /// Read a workbook package from any seekable source
    pub fn from_reader<R: Read + Seek>(source: R) -> Result<Self> {
        reader::read_workbook_from(source, WorkbookConfig::default())
    }

    /// Save the workbook as an `.xlsx` file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        writer::save_workbook(self, path)
    }

    /// Write the workbook package to any seekable sink
    pub fn save_to_writer<W: Write + Seek>(&self, sink: W) -> Result<()> {
        writer::write_workbook(self, sink)
    }

    pub fn config(&self) -> &WorkbookConfig {
        &self.config
    }

    /// Add an empty worksheet at the end of the sheet list.
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet, SheetError> {
        self.check_new_name(name)?;
        let sheet = self.new_sheet(name);
        Ok(self.push_sheet(sheet))
    }

    pub(crate) fn new_sheet(&self, name: &str) -> Worksheet {
        Worksheet::new(
            name,
            self.config.clone(),
            Rc::clone(&self.shared_strings),
            Rc::clone(&self.styles),
        )
    }

    pub(crate) fn push_sheet(&mut self, mut sheet: Worksheet) -> &mut Worksheet {
        sheet.selected = self.worksheets.len() == self.active_sheet;
        debug!("adding worksheet '{}'", sheet.name);
        self.worksheets.push(sheet);
        let last = self.worksheets.len() - 1;
        &mut self.worksheets[last]
    }

    fn check_new_name(&self, name: &str) -> Result<(), SheetError> {
        validate_sheet_name(name)?;
        if self.position(name).is_some() {
            return Err(SheetError::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }

    /// Index of a sheet; names compare case-insensitively like Excel does.
    fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.worksheets.iter().position(|s| s.name.to_lowercase() == wanted)
    }

    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.position(name).map(|i| &self.worksheets[i])
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.position(name).map(move |i| &mut self.worksheets[i])
    }

    pub fn worksheet_at(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_at_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Deep-copy a sheet under a new name, appending the copy.
    pub fn copy_worksheet(&mut self, source: &str, name: &str) -> Result<&mut Worksheet, SheetError> {
        let index = self
            .position(source)
            .ok_or_else(|| SheetError::SheetNotFound(source.to_string()))?;
        self.check_new_name(name)?;
        let copy = self.worksheets[index].duplicate(name);
        Ok(self.push_sheet(copy))
    }

    /// Remove a sheet. Shared strings it used stay in the table.
    pub fn remove_worksheet(&mut self, name: &str) -> Result<Worksheet, SheetError> {
        let index = self
            .position(name)
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))?;
        let removed = self.worksheets.remove(index);
        if self.active_sheet >= self.worksheets.len() || self.active_sheet > index {
            self.active_sheet = self.active_sheet.saturating_sub(1);
        }
        self.sync_selection();
        Ok(removed)
    }

    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Make the sheet at `index` the active (selected) tab.
    pub fn set_active_sheet(&mut self, index: usize) -> Result<(), SheetError> {
        if index >= self.worksheets.len() {
            return Err(SheetError::SheetNotFound(format!("#{}", index)));
        }
        self.active_sheet = index;
        self.sync_selection();
        Ok(())
    }

    fn sync_selection(&mut self) {
        for (i, sheet) in self.worksheets.iter_mut().enumerate() {
            sheet.selected = i == self.active_sheet;
        }
    }

    /// Register a cell format.
    pub fn add_format(&self, format: Format) -> StyleId {
        self.styles.borrow_mut().add_xf_format(format)
    }

    pub fn format(&self, id: StyleId) -> Option<Format> {
        self.styles.borrow().xf_format(id).cloned()
    }

    /// Snapshot of the shared string table.
    pub fn shared_strings(&self) -> std::cell::Ref<'_, SharedStrings> {
        self.shared_strings.borrow()
    }

    /// Snapshot of the style table.
    pub fn styles(&self) -> std::cell::Ref<'_, StyleTable> {
        self.styles.borrow()
    }
}

/// Check a sheet name against Excel's rules.
pub fn validate_sheet_name(name: &str) -> Result<(), SheetError> {
    let invalid = name.trim().is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LENGTH
        || name.contains(INVALID_SHEET_NAME_CHARS)
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(SheetError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_add_worksheet_names() {
        let mut wb = Workbook::new();
        wb.add_worksheet("Data").unwrap();
        assert_eq!(
            wb.add_worksheet("data").unwrap_err(),
            SheetError::DuplicateSheetName("data".to_string())
        );
        assert!(matches!(wb.add_worksheet("a/b"), Err(SheetError::InvalidSheetName(_))));
        assert!(matches!(wb.add_worksheet(""), Err(SheetError::InvalidSheetName(_))));
        assert!(matches!(
            wb.add_worksheet(&"x".repeat(32)),
            Err(SheetError::InvalidSheetName(_))
        ));
        assert_eq!(wb.sheet_names(), vec!["Data"]);
        assert!(wb.worksheet("DATA").is_some());
        assert!(wb.worksheet_at(0).unwrap().is_selected());
    }

    #[test]
    fn test_formats_are_shared_between_sheets() {
        let mut wb = Workbook::new();
        let bold = wb.add_format(Format::default().with_bold());
        let sheet = wb.add_worksheet("One").unwrap();
        assert_eq!(sheet.add_format(Format::default().with_bold()), bold);
        assert!(wb.format(bold).unwrap().font.bold);
    }

    #[test]
    fn test_copy_worksheet_increments_string_refs() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet("Source").unwrap();
        sheet.write_string(1, 1, "hello", None).unwrap();
        sheet.write_numeric(2, 1, 4.0, None).unwrap();

        let copy = wb.copy_worksheet("Source", "Copy").unwrap();
        assert_eq!(copy.read(1, 1), Value::Text("hello".to_string()));
        assert!(!copy.is_selected());
        assert_eq!(wb.shared_strings().ref_count(0), 2);

        wb.worksheet_mut("Copy").unwrap().write_numeric(2, 1, 5.0, None).unwrap();
        assert_eq!(wb.worksheet("Source").unwrap().read(2, 1), Value::Number(4.0));
        assert!(matches!(
            wb.copy_worksheet("Missing", "Other"),
            Err(SheetError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_remove_and_activate() {
        let mut wb = Workbook::new();
        wb.add_worksheet("A").unwrap();
        wb.add_worksheet("B").unwrap();
        wb.add_worksheet("C").unwrap();
        wb.set_active_sheet(2).unwrap();
        assert!(wb.worksheet("C").unwrap().is_selected());
        assert!(!wb.worksheet("A").unwrap().is_selected());
        assert!(wb.set_active_sheet(3).is_err());

        wb.remove_worksheet("A").unwrap();
        assert_eq!(wb.active_sheet(), 1);
        assert!(wb.worksheet("C").unwrap().is_selected());
        assert_eq!(wb.sheet_names(), vec!["B", "C"]);
        assert!(wb.remove_worksheet("A").is_err());
    }
}
