//! Error types for worksheet mutations and package I/O

use thiserror::Error;

/// Result type for XML and package operations.
pub type Result<T> = std::result::Result<T, XlsxError>;

/// Reasons a worksheet or workbook mutation is rejected.
///
/// A rejected call never leaves a partial change behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("row {0} is outside the sheet bounds (1..=1048576)")]
    RowOutOfRange(u32),

    #[error("column {0} is outside the sheet bounds (1..=16384)")]
    ColumnOutOfRange(u32),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("range {0} overlaps an existing merged range")]
    OverlappingMerge(String),

    #[error("range {0} is not merged")]
    MergeNotFound(String),

    #[error("outline level would exceed the maximum of 7")]
    OutlineLevelExceeded,

    #[error("a data validation already covers range {0}")]
    DuplicateValidationRange(String),

    #[error("invalid sheet name: {0}")]
    InvalidSheetName(String),

    #[error("a sheet named '{0}' already exists")]
    DuplicateSheetName(String),

    #[error("no sheet named '{0}'")]
    SheetNotFound(String),
}

/// Errors raised while reading or writing XML parts and the ZIP package.
#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("part not found in package: {0}")]
    MissingPart(String),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}
