//! `xl/styles.xml` reader

use std::collections::HashMap;
use std::io::BufRead;

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::parser_utils::{attr_value, parse_bool, skip_element};
use crate::error::Result;
use crate::styles::{Alignment, Font, Format, HorizontalAlignment, NumberFormat, StyleTable, VerticalAlignment};

/// Toggle elements such as `<b/>` are on unless `val` says otherwise.
fn toggle(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"val")
        .map(|a| parse_bool(a.value.as_ref()))
        .unwrap_or(true)
}

/// Read a `<font>` or `<rPr>` body up to its end tag.
pub(crate) fn read_font<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<Font> {
    let mut font = Font::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"b" => font.bold = toggle(&e),
                b"i" => font.italic = toggle(&e),
                b"strike" => font.strikeout = toggle(&e),
                b"u" => font.underline = attr_value(&e, b"val")?.is_none_or(|v| v != "none"),
                b"sz" => font.size = attr_value(&e, b"val")?.and_then(|v| v.parse().ok()),
                b"name" | b"rFont" => font.name = attr_value(&e, b"val")?,
                b"color" => {
                    if let Some(rgb) = attr_value(&e, b"rgb")? {
                        font.color = Some(rgb);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(font)
}

/// Read a `<fill>` body; only solid pattern fills carry a color.
fn read_fill<R: BufRead>(reader: &mut Reader<R>, color_tag: &[u8]) -> Result<Option<String>> {
    let mut color = None;
    let mut solid = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"patternFill" => {
                    solid = attr_value(&e, b"patternType")?.is_none_or(|p| p == "solid");
                }
                tag if tag == color_tag => color = attr_value(&e, b"rgb")?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"fill" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(if solid { color } else { None })
}

fn read_alignment(e: &BytesStart<'_>) -> Result<Alignment> {
    Ok(Alignment {
        horizontal: attr_value(e, b"horizontal")?.and_then(|h| HorizontalAlignment::parse(&h)),
        vertical: attr_value(e, b"vertical")?.and_then(|v| VerticalAlignment::parse(&v)),
        wrap_text: attr_value(e, b"wrapText")?.is_some_and(|w| parse_bool(w.as_bytes())),
    })
}

fn number_format(id: u32, custom: &HashMap<u32, String>) -> NumberFormat {
    match custom.get(&id) {
        Some(code) => NumberFormat::Custom(code.clone()),
        None => NumberFormat::Builtin(id),
    }
}

#[derive(Default)]
struct RawXf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    alignment: Alignment,
}

fn read_xf_attrs(e: &BytesStart<'_>) -> Result<RawXf> {
    let mut xf = RawXf::default();
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"numFmtId" => xf.num_fmt_id = value.parse().unwrap_or(0),
            b"fontId" => xf.font_id = value.parse().unwrap_or(0),
            b"fillId" => xf.fill_id = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    Ok(xf)
}

/// Read a `<dxf>` body.
fn read_dxf<R: BufRead>(reader: &mut Reader<R>) -> Result<Format> {
    let mut format = Format {
        font: Font::default(),
        ..Format::default()
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"font" => format.font = read_font(reader, b"font")?,
                b"fill" => format.fill_color = read_fill(reader, b"bgColor")?,
                b"numFmt" => {
                    if let Some(code) = attr_value(&e, b"formatCode")? {
                        format.number_format = NumberFormat::Custom(code);
                    }
                    skip_element(reader, &e)?;
                }
                b"alignment" => {
                    format.alignment = read_alignment(&e)?;
                    skip_element(reader, &e)?;
                }
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"numFmt" => {
                    if let Some(code) = attr_value(&e, b"formatCode")? {
                        format.number_format = NumberFormat::Custom(code);
                    }
                }
                b"alignment" => format.alignment = read_alignment(&e)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"dxf" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(format)
}

/// Parse a styles part into a style table whose indices match the `s`
/// attributes of the sheets.
pub fn read_styles<R: BufRead>(source: R) -> Result<StyleTable> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<Font> = Vec::new();
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut xfs: Vec<RawXf> = Vec::new();
    let mut dxfs: Vec<Format> = Vec::new();
    let mut in_cell_xfs = false;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"numFmt" => {
                    read_num_fmt(&e, &mut custom_formats)?;
                    skip_element(&mut reader, &e)?;
                }
                b"font" => fonts.push(read_font(&mut reader, b"font")?),
                b"fill" => fills.push(read_fill(&mut reader, b"fgColor")?),
                b"cellXfs" => in_cell_xfs = true,
                b"cellStyleXfs" | b"borders" | b"cellStyles" | b"colors" | b"extLst" | b"tableStyles" => {
                    skip_element(&mut reader, &e)?
                }
                b"xf" if in_cell_xfs => {
                    let mut xf = read_xf_attrs(&e)?;
                    let mut inner = Vec::new();
                    loop {
                        match reader.read_event_into(&mut inner)? {
                            Event::Start(a) | Event::Empty(a) if a.name().as_ref() == b"alignment" => {
                                xf.alignment = read_alignment(&a)?;
                            }
                            Event::End(end) if end.name().as_ref() == b"xf" => break,
                            Event::Eof => break,
                            _ => {}
                        }
                        inner.clear();
                    }
                    xfs.push(xf);
                }
                b"dxf" => dxfs.push(read_dxf(&mut reader)?),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"numFmt" => read_num_fmt(&e, &mut custom_formats)?,
                b"fill" => fills.push(None),
                b"font" => fonts.push(Font::default()),
                b"xf" if in_cell_xfs => xfs.push(read_xf_attrs(&e)?),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if xfs.is_empty() {
        debug!("styles part has no cell formats, using defaults");
        return Ok(StyleTable::new());
    }

    let mut table = StyleTable::empty();
    for xf in xfs {
        let font = fonts.get(xf.font_id).cloned().unwrap_or_else(|| {
            warn!("cell format refers to missing font {}", xf.font_id);
            Format::default().font
        });
        let fill_color = fills.get(xf.fill_id).cloned().flatten();
        table.push_loaded(Format {
            number_format: number_format(xf.num_fmt_id, &custom_formats),
            font,
            fill_color,
            alignment: xf.alignment,
        });
    }
    for dxf in dxfs {
        table.push_loaded_dxf(dxf);
    }
    debug!(
        "loaded {} cell formats and {} differential formats",
        table.len(),
        table.dxf_formats().len()
    );
    Ok(table)
}

fn read_num_fmt(e: &BytesStart<'_>, custom: &mut HashMap<u32, String>) -> Result<()> {
    let id = attr_value(e, b"numFmtId")?.and_then(|v| v.parse::<u32>().ok());
    let code = attr_value(e, b"formatCode")?;
    if let (Some(id), Some(code)) = (id, code) {
        custom.insert(id, code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/></patternFill></fill>
  </fills>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" xfId="0" applyAlignment="1"><alignment horizontal="center" wrapText="1"/></xf>
    <xf numFmtId="14" fontId="0" fillId="0" xfId="0"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><b/></font><fill><patternFill><bgColor rgb="FFC6EFCE"/></patternFill></fill></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn test_read_styles() {
        let table = read_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.xf_format(table.style_id(0).unwrap()), Some(&Format::default()));

        let styled = table.xf_format(table.style_id(1).unwrap()).unwrap();
        assert_eq!(styled.number_format, NumberFormat::custom("yyyy-mm-dd"));
        assert!(styled.font.bold);
        assert_eq!(styled.font.size, Some(14.0));
        assert_eq!(styled.font.name.as_deref(), Some("Arial"));
        assert_eq!(styled.fill_color.as_deref(), Some("FFFFFF00"));
        assert_eq!(styled.alignment.horizontal, Some(HorizontalAlignment::Center));
        assert!(styled.alignment.wrap_text);

        assert!(table.xf_format(table.style_id(2).unwrap()).unwrap().is_date_time());

        let dxf = table.dxf_format(0).unwrap();
        assert!(dxf.font.bold);
        assert_eq!(dxf.fill_color.as_deref(), Some("FFC6EFCE"));
    }

    #[test]
    fn test_empty_styles_fall_back_to_default() {
        let table = read_styles("<styleSheet/>".as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
    }
}
