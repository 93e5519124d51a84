//! `xl/styles.xml` writer

use std::collections::HashMap;
use std::io::Write;

use super::xml::XmlWriter;
use crate::error::Result;
use crate::package::NS_MAIN;
use crate::styles::{Alignment, Font, Format, NumberFormat, StyleTable};

/// First id available for custom number formats.
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// Write the children of a `<font>` or `<rPr>` element.
///
/// Run properties name their typeface with `rFont` instead of `name`.
pub(crate) fn write_font_props<W: Write>(w: &mut XmlWriter<W>, font: &Font, run: bool) -> Result<()> {
    if font.bold {
        w.empty("b", &[])?;
    }
    if font.italic {
        w.empty("i", &[])?;
    }
    if font.strikeout {
        w.empty("strike", &[])?;
    }
    if font.underline {
        w.empty("u", &[])?;
    }
    if let Some(size) = font.size {
        w.empty("sz", &[("val", &size.to_string())])?;
    }
    if let Some(color) = &font.color {
        w.empty("color", &[("rgb", color)])?;
    }
    if let Some(name) = &font.name {
        w.empty(if run { "rFont" } else { "name" }, &[("val", name)])?;
    }
    Ok(())
}

fn write_alignment<W: Write>(w: &mut XmlWriter<W>, alignment: &Alignment) -> Result<()> {
    let mut attrs: Vec<(&str, &str)> = Vec::new();
    if let Some(h) = alignment.horizontal {
        attrs.push(("horizontal", h.as_str()));
    }
    if let Some(v) = alignment.vertical {
        attrs.push(("vertical", v.as_str()));
    }
    if alignment.wrap_text {
        attrs.push(("wrapText", "1"));
    }
    w.empty("alignment", &attrs)
}

/// Deduplicated component tables referenced by the `cellXfs` records.
struct Components<'a> {
    num_fmts: Vec<(u32, &'a str)>,
    num_fmt_ids: HashMap<&'a str, u32>,
    fonts: Vec<&'a Font>,
    font_ids: HashMap<&'a Font, usize>,
    fills: Vec<&'a str>,
    fill_ids: HashMap<&'a str, usize>,
}

impl<'a> Components<'a> {
    fn collect(formats: &'a [Format]) -> Self {
        let mut c = Components {
            num_fmts: Vec::new(),
            num_fmt_ids: HashMap::new(),
            fonts: Vec::new(),
            font_ids: HashMap::new(),
            fills: Vec::new(),
            fill_ids: HashMap::new(),
        };
        for format in formats {
            if let NumberFormat::Custom(code) = &format.number_format {
                if !c.num_fmt_ids.contains_key(code.as_str()) {
                    let id = FIRST_CUSTOM_NUM_FMT + c.num_fmts.len() as u32;
                    c.num_fmt_ids.insert(code.as_str(), id);
                    c.num_fmts.push((id, code.as_str()));
                }
            }
            if !c.font_ids.contains_key(&format.font) {
                c.font_ids.insert(&format.font, c.fonts.len());
                c.fonts.push(&format.font);
            }
            if let Some(color) = &format.fill_color {
                if !c.fill_ids.contains_key(color.as_str()) {
                    // Two reserved fills (none, gray125) come first.
                    c.fill_ids.insert(color.as_str(), c.fills.len() + 2);
                    c.fills.push(color.as_str());
                }
            }
        }
        c
    }

    fn num_fmt_id(&self, format: &NumberFormat) -> u32 {
        match format {
            NumberFormat::Builtin(id) => *id,
            NumberFormat::Custom(code) => self.num_fmt_ids.get(code.as_str()).copied().unwrap_or(0),
        }
    }
}

/// Serialize the style table. Record `i` of `cellXfs` is the format with
/// `StyleId` index `i`.
pub fn write_styles<W: Write>(table: &StyleTable, sink: W) -> Result<()> {
    let formats = table.xf_formats();
    let components = Components::collect(formats);
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start("styleSheet", &[("xmlns", NS_MAIN)])?;

    if !components.num_fmts.is_empty() {
        w.start("numFmts", &[("count", &components.num_fmts.len().to_string())])?;
        for (id, code) in &components.num_fmts {
            w.empty("numFmt", &[("numFmtId", &id.to_string()), ("formatCode", code)])?;
        }
        w.end("numFmts")?;
    }

    let default_font = Format::default().font;
    let fonts: Vec<&Font> = if components.fonts.is_empty() {
        vec![&default_font]
    } else {
        components.fonts.clone()
    };
    w.start("fonts", &[("count", &fonts.len().to_string())])?;
    for font in &fonts {
        w.start("font", &[])?;
        write_font_props(&mut w, font, false)?;
        w.end("font")?;
    }
    w.end("fonts")?;

    w.start("fills", &[("count", &(components.fills.len() + 2).to_string())])?;
    for pattern in ["none", "gray125"] {
        w.start("fill", &[])?;
        w.empty("patternFill", &[("patternType", pattern)])?;
        w.end("fill")?;
    }
    for color in &components.fills {
        w.start("fill", &[])?;
        w.start("patternFill", &[("patternType", "solid")])?;
        w.empty("fgColor", &[("rgb", color)])?;
        w.empty("bgColor", &[("indexed", "64")])?;
        w.end("patternFill")?;
        w.end("fill")?;
    }
    w.end("fills")?;

    w.start("borders", &[("count", "1")])?;
    w.start("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        w.empty(side, &[])?;
    }
    w.end("border")?;
    w.end("borders")?;

    w.start("cellStyleXfs", &[("count", "1")])?;
    w.empty("xf", &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")])?;
    w.end("cellStyleXfs")?;

    w.start("cellXfs", &[("count", &formats.len().to_string())])?;
    for format in formats {
        let num_fmt_id = components.num_fmt_id(&format.number_format).to_string();
        let font_id = components.font_ids.get(&format.font).copied().unwrap_or(0).to_string();
        let fill_id = format
            .fill_color
            .as_deref()
            .and_then(|c| components.fill_ids.get(c).copied())
            .unwrap_or(0)
            .to_string();
        let mut attrs = vec![
            ("numFmtId", num_fmt_id.as_str()),
            ("fontId", font_id.as_str()),
            ("fillId", fill_id.as_str()),
            ("borderId", "0"),
            ("xfId", "0"),
        ];
        if num_fmt_id != "0" {
            attrs.push(("applyNumberFormat", "1"));
        }
        if font_id != "0" {
            attrs.push(("applyFont", "1"));
        }
        if fill_id != "0" {
            attrs.push(("applyFill", "1"));
        }
        if format.alignment.is_default() {
            w.empty("xf", &attrs)?;
        } else {
            attrs.push(("applyAlignment", "1"));
            w.start("xf", &attrs)?;
            write_alignment(&mut w, &format.alignment)?;
            w.end("xf")?;
        }
    }
    w.end("cellXfs")?;

    w.start("cellStyles", &[("count", "1")])?;
    w.empty("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    w.end("cellStyles")?;

    let dxfs = table.dxf_formats();
    w.start("dxfs", &[("count", &dxfs.len().to_string())])?;
    for dxf in dxfs {
        write_dxf(&mut w, dxf)?;
    }
    w.end("dxfs")?;

    w.end("styleSheet")?;
    w.into_inner().flush()?;
    Ok(())
}

fn write_dxf<W: Write>(w: &mut XmlWriter<W>, dxf: &Format) -> Result<()> {
    w.start("dxf", &[])?;
    if !dxf.font.is_empty() {
        w.start("font", &[])?;
        write_font_props(w, &dxf.font, false)?;
        w.end("font")?;
    }
    if let NumberFormat::Custom(code) = &dxf.number_format {
        w.empty("numFmt", &[("numFmtId", &FIRST_CUSTOM_NUM_FMT.to_string()), ("formatCode", code)])?;
    }
    if let Some(color) = &dxf.fill_color {
        w.start("fill", &[])?;
        w.start("patternFill", &[])?;
        w.empty("bgColor", &[("rgb", color)])?;
        w.end("patternFill")?;
        w.end("fill")?;
    }
    if !dxf.alignment.is_default() {
        write_alignment(w, &dxf.alignment)?;
    }
    w.end("dxf")
}
