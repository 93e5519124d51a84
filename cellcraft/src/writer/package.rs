//! Package-level parts: content types, relationships, workbook and document
//! properties

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use super::xml::XmlWriter;
use crate::error::Result;
use crate::package::{
    CT_CORE_PROPERTIES, CT_EXTENDED_PROPERTIES, CT_RELATIONSHIPS, CT_SHARED_STRINGS, CT_STYLES, CT_WORKBOOK,
    CT_WORKSHEET, NS_CONTENT_TYPES, NS_MAIN, NS_PACKAGE_RELATIONSHIPS, NS_RELATIONSHIPS, Relationship,
};
use crate::worksheet::{SheetState, Worksheet};

pub fn write_content_types<W: Write>(sink: W, parts: &[(String, &str)]) -> Result<()> {
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    w.empty("Default", &[("Extension", "rels"), ("ContentType", CT_RELATIONSHIPS)])?;
    w.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for (part, content_type) in parts {
        let name = format!("/{}", part);
        w.empty("Override", &[("PartName", name.as_str()), ("ContentType", content_type)])?;
    }
    w.end("Types")?;
    w.into_inner().flush()?;
    Ok(())
}

/// Content type of each part this writer produces.
pub fn content_type_for(part: &str) -> Option<&'static str> {
    match part {
        "xl/workbook.xml" => Some(CT_WORKBOOK),
        "xl/styles.xml" => Some(CT_STYLES),
        "xl/sharedStrings.xml" => Some(CT_SHARED_STRINGS),
        "docProps/core.xml" => Some(CT_CORE_PROPERTIES),
        "docProps/app.xml" => Some(CT_EXTENDED_PROPERTIES),
        p if p.starts_with("xl/worksheets/") && p.ends_with(".xml") => Some(CT_WORKSHEET),
        _ => None,
    }
}

pub fn write_relationships<W: Write>(sink: W, rels: &[Relationship]) -> Result<()> {
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    for rel in rels {
        let mut attrs = vec![
            ("Id", rel.id.as_str()),
            ("Type", rel.rel_type.as_str()),
            ("Target", rel.target.as_str()),
        ];
        if let Some(mode) = &rel.target_mode {
            attrs.push(("TargetMode", mode.as_str()));
        }
        w.empty("Relationship", &attrs)?;
    }
    w.end("Relationships")?;
    w.into_inner().flush()?;
    Ok(())
}

/// `xl/workbook.xml`. Sheet `i` refers to relationship `rId{i+1}`.
pub fn write_workbook_part<W: Write>(sink: W, sheets: &[Worksheet], active: usize, date1904: bool) -> Result<()> {
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    if date1904 {
        w.empty("workbookPr", &[("date1904", "1")])?;
    } else {
        w.empty("workbookPr", &[])?;
    }
    w.start("bookViews", &[])?;
    let active = active.to_string();
    w.empty("workbookView", &[("activeTab", active.as_str())])?;
    w.end("bookViews")?;

    w.start("sheets", &[])?;
    for (i, sheet) in sheets.iter().enumerate() {
        let sheet_id = (i + 1).to_string();
        let rel_id = format!("rId{}", i + 1);
        let mut attrs = vec![("name", sheet.name()), ("sheetId", sheet_id.as_str())];
        if sheet.state() != SheetState::Visible {
            attrs.push(("state", sheet.state().as_str()));
        }
        attrs.push(("r:id", rel_id.as_str()));
        w.empty("sheet", &attrs)?;
    }
    w.end("sheets")?;
    w.empty("calcPr", &[("calcId", "191029")])?;
    w.end("workbook")?;
    w.into_inner().flush()?;
    Ok(())
}

/// `docProps/core.xml` stamped with `now`.
pub fn write_core_properties<W: Write>(sink: W, now: DateTime<Utc>) -> Result<()> {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    w.text_element("dc:creator", &[], env!("CARGO_PKG_NAME"))?;
    w.text_element("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")], &timestamp)?;
    w.text_element("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")], &timestamp)?;
    w.end("cp:coreProperties")?;
    w.into_inner().flush()?;
    Ok(())
}

/// `docProps/app.xml`
pub fn write_app_properties<W: Write>(sink: W, sheets: &[Worksheet]) -> Result<()> {
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start(
        "Properties",
        &[
            (
                "xmlns",
                "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
            ),
            (
                "xmlns:vt",
                "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
            ),
        ],
    )?;
    w.text_element("Application", &[], "Microsoft Excel")?;
    let count = sheets.len().to_string();
    w.start("TitlesOfParts", &[])?;
    w.start("vt:vector", &[("size", count.as_str()), ("baseType", "lpstr")])?;
    for sheet in sheets {
        w.text_element("vt:lpstr", &[], sheet.name())?;
    }
    w.end("vt:vector")?;
    w.end("TitlesOfParts")?;
    w.end("Properties")?;
    w.into_inner().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::REL_HYPERLINK;
    use chrono::TimeZone;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut bytes = Vec::new();
        f(&mut bytes).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_relationships_keep_target_mode() {
        let xml = render(|out| {
            write_relationships(
                out,
                &[Relationship::external("rId1", REL_HYPERLINK, "https://example.com/?a=1&b=2")],
            )
        });
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));
    }

    #[test]
    fn test_core_properties_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let xml = render(|out| write_core_properties(out, now));
        assert!(xml.contains(r#"<dcterms:created xsi:type="dcterms:W3CDTF">2024-05-01T12:30:00Z</dcterms:created>"#));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("xl/worksheets/sheet3.xml"), Some(CT_WORKSHEET));
        assert_eq!(content_type_for("xl/worksheets/_rels/sheet3.xml.rels"), None);
        let parts = vec![("xl/workbook.xml".to_string(), CT_WORKBOOK)];
        let xml = render(|out| write_content_types(out, &parts));
        assert!(xml.contains(r#"<Override PartName="/xl/workbook.xml""#));
    }
}
