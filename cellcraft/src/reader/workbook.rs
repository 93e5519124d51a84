//! `xl/workbook.xml` and `.rels` readers

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::parser_utils::{attr_value, parse_bool};
use crate::error::Result;
use crate::package::Relationship;
use crate::worksheet::SheetState;

/// One `<sheet>` entry of the workbook part.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    pub name: String,
    pub rel_id: String,
    pub state: SheetState,
}

/// What the loader needs from `xl/workbook.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookPart {
    pub sheets: Vec<SheetEntry>,
    pub date1904: bool,
    pub active_tab: usize,
}

/// Parse the workbook part: sheet list, date system and active tab.
pub fn read_workbook_part<R: BufRead>(source: R) -> Result<WorkbookPart> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);
    let mut part = WorkbookPart::default();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"workbookPr" => {
                    part.date1904 = attr_value(&e, b"date1904")?.is_some_and(|v| parse_bool(v.as_bytes()));
                }
                b"workbookView" => {
                    part.active_tab = attr_value(&e, b"activeTab")?.and_then(|v| v.parse().ok()).unwrap_or(0);
                }
                b"sheet" => {
                    let mut entry = SheetEntry {
                        name: String::new(),
                        rel_id: String::new(),
                        state: SheetState::Visible,
                    };
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => entry.name = attr.unescape_value()?.to_string(),
                            b"r:id" => entry.rel_id = attr.unescape_value()?.to_string(),
                            b"state" => entry.state = SheetState::parse(&attr.unescape_value()?),
                            _ => {}
                        }
                    }
                    part.sheets.push(entry);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(part)
}

/// Parse a relationships part.
pub fn read_relationships<R: BufRead>(source: R) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);
    let mut rels = Vec::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let mut rel = Relationship::new("", "", "");
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => rel.id = attr.unescape_value()?.to_string(),
                        b"Type" => rel.rel_type = attr.unescape_value()?.to_string(),
                        b"Target" => rel.target = attr.unescape_value()?.to_string(),
                        b"TargetMode" => rel.target_mode = Some(attr.unescape_value()?.to_string()),
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{REL_HYPERLINK, REL_WORKSHEET};

    #[test]
    fn test_read_workbook_part() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="1"/>
  <bookViews><workbookView activeTab="1"/></bookViews>
  <sheets>
    <sheet name="Data &amp; Notes" sheetId="1" r:id="rId1"/>
    <sheet name="Hidden" sheetId="2" state="hidden" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let part = read_workbook_part(xml.as_bytes()).unwrap();
        assert!(part.date1904);
        assert_eq!(part.active_tab, 1);
        assert_eq!(part.sheets.len(), 2);
        assert_eq!(part.sheets[0].name, "Data & Notes");
        assert_eq!(part.sheets[0].rel_id, "rId1");
        assert_eq!(part.sheets[1].state, SheetState::Hidden);
    }

    #[test]
    fn test_read_relationships() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;
        let rels = read_relationships(xml.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].rel_type, REL_WORKSHEET);
        assert!(!rels[0].is_external());
        assert_eq!(rels[1].rel_type, REL_HYPERLINK);
        assert_eq!(rels[1].target, "https://example.com/?a=1&b=2");
        assert!(rels[1].is_external());
    }
}
