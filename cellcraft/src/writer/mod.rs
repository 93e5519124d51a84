pub mod package;
pub mod shared_strings;
pub mod sheet;
pub mod styles;
mod xml;

pub use package::{write_content_types, write_relationships};
pub use shared_strings::write_shared_strings;
pub use sheet::write_worksheet;
pub use styles::write_styles;

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use log::debug;
use zip::{ZipWriter, write::FileOptions};

use crate::package::{
    PART_APP, PART_CONTENT_TYPES, PART_CORE, PART_ROOT_RELS, PART_SHARED_STRINGS, PART_STYLES, PART_WORKBOOK,
    PART_WORKBOOK_RELS, REL_CORE_PROPERTIES, REL_EXTENDED_PROPERTIES, REL_OFFICE_DOCUMENT, REL_SHARED_STRINGS,
    REL_STYLES, REL_WORKSHEET, Relationship, rels_part_for, worksheet_part,
};
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

/// Add one part to the archive, recording its content type.
fn put<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    parts: &mut Vec<(String, &'static str)>,
    name: &str,
    bytes: &[u8],
) -> Result<()> {
    zip.start_file(name, FileOptions::<()>::default())
        .with_context(|| format!("Failed to start {}", name))?;
    zip.write_all(bytes)?;
    if let Some(content_type) = package::content_type_for(name) {
        parts.push((name.to_string(), content_type));
    }
    Ok(())
}

/// Save the workbook as an `.xlsx` file at `path`.
pub fn save_workbook<P: AsRef<Path>>(workbook: &Workbook, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_workbook(workbook, BufWriter::new(file)).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write the workbook package to any seekable sink.
///
/// A workbook without sheets is saved with one empty `Sheet1`.
pub fn write_workbook<W: Write + Seek>(workbook: &Workbook, sink: W) -> Result<()> {
    let placeholder;
    let sheets: &[Worksheet] = if workbook.worksheets.is_empty() {
        placeholder = [workbook.new_sheet("Sheet1")];
        &placeholder
    } else {
        &workbook.worksheets
    };
    let active = workbook.active_sheet.min(sheets.len() - 1);

    let mut zip = ZipWriter::new(sink);
    let mut parts: Vec<(String, &'static str)> = Vec::new();

    let mut workbook_rels = Vec::with_capacity(sheets.len() + 2);
    for (i, sheet) in sheets.iter().enumerate() {
        let part = worksheet_part(i + 1);
        let mut xml = Vec::new();
        let sheet_rels = write_worksheet(sheet, &mut xml)
            .with_context(|| format!("Failed to serialize worksheet '{}'", sheet.name()))?;
        put(&mut zip, &mut parts, &part, &xml)?;
        if !sheet_rels.is_empty() {
            let mut rels = Vec::new();
            write_relationships(&mut rels, &sheet_rels)?;
            put(&mut zip, &mut parts, &rels_part_for(&part), &rels)?;
        }
        workbook_rels.push(Relationship::new(
            format!("rId{}", i + 1),
            REL_WORKSHEET,
            format!("worksheets/sheet{}.xml", i + 1),
        ));
        debug!("wrote {} ({} cells)", part, sheet.cell_count());
    }

    let mut xml = Vec::new();
    write_styles(&workbook.styles.borrow(), &mut xml)?;
    put(&mut zip, &mut parts, PART_STYLES, &xml)?;
    workbook_rels.push(Relationship::new(
        format!("rId{}", sheets.len() + 1),
        REL_STYLES,
        "styles.xml",
    ));

    let shared_strings = workbook.shared_strings.borrow();
    if !shared_strings.is_empty() {
        let mut xml = Vec::new();
        write_shared_strings(&shared_strings, &mut xml)?;
        put(&mut zip, &mut parts, PART_SHARED_STRINGS, &xml)?;
        workbook_rels.push(Relationship::new(
            format!("rId{}", sheets.len() + 2),
            REL_SHARED_STRINGS,
            "sharedStrings.xml",
        ));
        debug!("wrote {} unique shared strings", shared_strings.len());
    }
    drop(shared_strings);

    let mut xml = Vec::new();
    package::write_workbook_part(&mut xml, sheets, active, workbook.config.date1904)?;
    put(&mut zip, &mut parts, PART_WORKBOOK, &xml)?;

    let mut xml = Vec::new();
    write_relationships(&mut xml, &workbook_rels)?;
    put(&mut zip, &mut parts, PART_WORKBOOK_RELS, &xml)?;

    let mut xml = Vec::new();
    package::write_core_properties(&mut xml, Utc::now())?;
    put(&mut zip, &mut parts, PART_CORE, &xml)?;

    let mut xml = Vec::new();
    package::write_app_properties(&mut xml, sheets)?;
    put(&mut zip, &mut parts, PART_APP, &xml)?;

    let root_rels = [
        Relationship::new("rId1", REL_OFFICE_DOCUMENT, PART_WORKBOOK),
        Relationship::new("rId2", REL_CORE_PROPERTIES, PART_CORE),
        Relationship::new("rId3", REL_EXTENDED_PROPERTIES, PART_APP),
    ];
    let mut xml = Vec::new();
    write_relationships(&mut xml, &root_rels)?;
    put(&mut zip, &mut parts, PART_ROOT_RELS, &xml)?;

    let mut xml = Vec::new();
    write_content_types(&mut xml, &parts)?;
    put(&mut zip, &mut parts, PART_CONTENT_TYPES, &xml)?;

    zip.finish().context("Failed to finish the zip archive")?;
    Ok(())
}
