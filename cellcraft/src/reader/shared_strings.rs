//! `xl/sharedStrings.xml` reader

use std::io::BufRead;

use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;

use super::parser_utils::{read_text_node, skip_element, unescape_control_chars};
use super::styles::read_font;
use crate::error::Result;
use crate::rich_string::RichString;
use crate::shared_strings::SharedStrings;
use crate::styles::Font;

/// Read the body of an `<si>` or `<is>` element, up to `end`.
///
/// Plain `<t>` content and `<r>` runs are both supported; phonetic runs
/// (`<rPh>`) are skipped.
pub(crate) fn read_rich_text<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<RichString> {
    let mut text = RichString::new();
    let mut plain: Option<String> = None;
    let mut run_font: Option<Font> = None;
    let mut in_run = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"t" => {
                    let content = read_text_node(reader)?;
                    let content = unescape_control_chars(&content).into_owned();
                    if in_run {
                        text.push(content, run_font.take());
                    } else {
                        plain.get_or_insert_with(String::new).push_str(&content);
                    }
                }
                b"r" => {
                    in_run = true;
                    run_font = None;
                }
                b"rPr" => run_font = Some(read_font(reader, b"rPr")?),
                b"rPh" | b"phoneticPr" => skip_element(reader, &e)?,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"t" && !in_run => {
                plain.get_or_insert_with(String::new);
            }
            Event::End(e) if e.name().as_ref() == b"r" => in_run = false,
            Event::End(e) if e.name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if text.fragments().is_empty() {
        return Ok(RichString::plain(plain.unwrap_or_default()));
    }
    Ok(text)
}

/// Parse a shared strings part. Entries keep the order of the file so that
/// `t="s"` indices resolve unchanged.
pub fn read_shared_strings<R: BufRead>(source: R) -> Result<SharedStrings> {
    let mut reader = Reader::from_reader(source);
    let mut table = SharedStrings::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"si" => {
                table.push_loaded(read_rich_text(&mut reader, b"si")?);
            }
            Event::Empty(e) if e.name().as_ref() == b"si" => table.push_loaded(RichString::plain("")),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    debug!("loaded {} shared strings", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_shared_strings() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="3">
<si><t>Hello</t></si>
<si><t xml:space="preserve"> padded </t></si>
<si><r><rPr><b/><sz val="11"/></rPr><t>Bold</t></r><r><t xml:space="preserve"> plain</t></r><rPh sb="0" eb="1"><t>ignored</t></rPh></si>
</sst>"#;
        let table = read_shared_strings(xml.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some(&RichString::plain("Hello")));
        assert_eq!(table.get(1).unwrap().to_plain_text(), " padded ");

        let rich = table.get(2).unwrap();
        assert!(rich.is_rich());
        assert_eq!(rich.to_plain_text(), "Bold plain");
        assert!(rich.fragments()[0].font.as_ref().unwrap().bold);
        assert!(rich.fragments()[1].font.is_none());
        assert_eq!(table.ref_count(0), 0);
    }
}
