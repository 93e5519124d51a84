//! cellcraft: Excel worksheet model with an `.xlsx` reader and writer
//!
//! A [`Workbook`] owns a shared string table and a style table; each of its
//! [`Worksheet`]s keeps a sparse cell table plus row, column and merge
//! metadata, and serializes itself to SpreadsheetML in schema order.
//!
//! ```no_run
//! use cellcraft::{Format, Workbook};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut workbook = Workbook::new();
//! let bold = workbook.add_format(Format::default().with_bold());
//! let sheet = workbook.add_worksheet("Data")?;
//! sheet.write_string(1, 1, "Total", Some(bold))?;
//! sheet.write(1, 2, "=SUM(C2:C10)", None)?;
//! workbook.save("report.xlsx")?;
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod config;
pub mod error;
pub mod formula;
pub mod package;
pub mod reader;
pub mod reference;
pub mod rich_string;
pub mod shared_strings;
pub mod styles;
pub mod value;
pub mod workbook;
pub mod worksheet;
pub mod writer;

pub use cell::{Cell, CellType};
pub use config::WorkbookConfig;
pub use error::{SheetError, XlsxError};
pub use formula::{CellFormula, FormulaType};
pub use reference::{CellRange, CellRef};
pub use rich_string::RichString;
pub use shared_strings::SharedStrings;
pub use styles::{Font, Format, HorizontalAlignment, NumberFormat, StyleId, StyleTable, VerticalAlignment};
pub use value::Value;
pub use workbook::Workbook;
pub use worksheet::{SheetState, Worksheet};
