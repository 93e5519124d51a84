//! `.xlsx` package reader built on event-driven XML parsers
//!
//! Styles and shared strings are loaded before the worksheets that index
//! into them.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

pub mod parser_utils;
pub mod shared_strings;
pub mod sheet;
pub mod styles;
pub mod workbook;

pub use self::shared_strings::read_shared_strings;
pub use self::sheet::read_worksheet;
pub use self::styles::read_styles;
pub use self::workbook::{read_relationships, read_workbook_part};

use crate::config::WorkbookConfig;
use crate::error::XlsxError;
use crate::package::{
    PART_ROOT_RELS, PART_WORKBOOK, REL_OFFICE_DOCUMENT, REL_SHARED_STRINGS, REL_STYLES, Relationship,
    rels_part_for, resolve_target,
};
use crate::shared_strings::SharedStrings;
use crate::styles::StyleTable;
use crate::workbook::{Workbook, validate_sheet_name};

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P, config: WorkbookConfig) -> Result<Workbook> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).with_context(|| format!("Failed to open file: {}", path_ref.display()))?;
    read_workbook_from(BufReader::new(file), config)
        .with_context(|| format!("Failed to read workbook: {}", path_ref.display()))
}

/// Read a workbook package from a seekable source.
///
/// The `date1904` flag of the package overrides the one in `config`.
pub fn read_workbook_from<R: Read + Seek>(source: R, mut config: WorkbookConfig) -> Result<Workbook> {
    let mut archive = ZipArchive::new(source).context("Failed to open zip archive")?;

    let workbook_path = read_part(&mut archive, PART_ROOT_RELS)?
        .map(|data| read_relationships(data.as_slice()))
        .transpose()
        .context("Failed to parse package relationships")?
        .and_then(|rels| rels.into_iter().find(|r| r.rel_type == REL_OFFICE_DOCUMENT))
        .map(|r| resolve_target("", &r.target))
        .unwrap_or_else(|| PART_WORKBOOK.to_string());

    let workbook_xml = read_part(&mut archive, &workbook_path)?
        .ok_or_else(|| XlsxError::MissingPart(workbook_path.clone()))?;
    let part = read_workbook_part(workbook_xml.as_slice()).context("Failed to parse workbook part")?;
    config.date1904 = part.date1904;

    let rels = read_rels_of(&mut archive, &workbook_path)?;
    let target_of = |rel_type: &str| {
        rels.iter()
            .find(|r| r.rel_type == rel_type)
            .map(|r| resolve_target(&workbook_path, &r.target))
    };

    let styles = match target_of(REL_STYLES) {
        Some(name) => match read_part(&mut archive, &name)? {
            Some(data) => read_styles(data.as_slice()).context("Failed to parse styles")?,
            None => StyleTable::new(),
        },
        None => StyleTable::new(),
    };
    let shared_strings = match target_of(REL_SHARED_STRINGS) {
        Some(name) => match read_part(&mut archive, &name)? {
            Some(data) => read_shared_strings(data.as_slice()).context("Failed to parse shared strings")?,
            None => SharedStrings::new(),
        },
        None => SharedStrings::new(),
    };

    let mut workbook = Workbook::from_parts(config, shared_strings, styles);
    workbook.active_sheet = part.active_tab.min(part.sheets.len().saturating_sub(1));

    for entry in &part.sheets {
        let Some(rel) = rels.iter().find(|r| r.id == entry.rel_id) else {
            warn!("sheet '{}' has no relationship {}, skipping", entry.name, entry.rel_id);
            continue;
        };
        let sheet_path = resolve_target(&workbook_path, &rel.target);
        let data = read_part(&mut archive, &sheet_path)?.ok_or_else(|| XlsxError::MissingPart(sheet_path.clone()))?;
        let sheet_rels = read_rels_of(&mut archive, &sheet_path)?;

        if let Err(e) = validate_sheet_name(&entry.name) {
            warn!("{}", e);
        }
        let mut sheet = workbook.new_sheet(&entry.name);
        sheet.state = entry.state;
        read_worksheet(data.as_slice(), &mut sheet, &sheet_rels)
            .with_context(|| format!("Failed to parse sheet '{}' ({})", entry.name, sheet_path))?;
        workbook.push_sheet(sheet);
    }

    debug!(
        "read workbook: {} sheets, {} shared strings, {} formats",
        workbook.worksheets.len(),
        workbook.shared_strings.borrow().len(),
        workbook.styles.borrow().len()
    );
    Ok(workbook)
}

/// Read a whole part, or `None` when the package does not contain it.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to open part {}", name)),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .with_context(|| format!("Failed to read part {}", name))?;
    Ok(Some(data))
}

/// Relationships of `part`; empty when it has no `.rels` part.
fn read_rels_of<R: Read + Seek>(archive: &mut ZipArchive<R>, part: &str) -> Result<Vec<Relationship>> {
    let rels_name = rels_part_for(part);
    match read_part(archive, &rels_name)? {
        Some(data) => read_relationships(data.as_slice()).with_context(|| format!("Failed to parse {}", rels_name)),
        None => Ok(Vec::new()),
    }
}
