//! `xl/sharedStrings.xml` writer

use std::io::Write;

use super::styles::write_font_props;
use super::xml::XmlWriter;
use crate::error::Result;
use crate::package::NS_MAIN;
use crate::rich_string::RichString;
use crate::shared_strings::SharedStrings;

/// Write the body of an `<si>` or `<is>` element.
pub(crate) fn write_rich_text<W: Write>(w: &mut XmlWriter<W>, text: &RichString) -> Result<()> {
    if !text.is_rich() {
        return w.text_run(&text.to_plain_text());
    }
    for fragment in text.fragments() {
        w.start("r", &[])?;
        if let Some(font) = &fragment.font {
            w.start("rPr", &[])?;
            write_font_props(w, font, true)?;
            w.end("rPr")?;
        }
        w.text_run(&fragment.text)?;
        w.end("r")?;
    }
    Ok(())
}

/// Serialize the table in index order. `count` is the total number of
/// references, `uniqueCount` the number of entries.
pub fn write_shared_strings<W: Write>(table: &SharedStrings, sink: W) -> Result<()> {
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    let count = table.total_refs().to_string();
    let unique = table.len().to_string();
    w.start("sst", &[("xmlns", NS_MAIN), ("count", &count), ("uniqueCount", &unique)])?;
    for string in table.iter() {
        w.start("si", &[])?;
        write_rich_text(&mut w, string)?;
        w.end("si")?;
    }
    w.end("sst")?;
    w.into_inner().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_shared_strings;
    use crate::styles::Font;

    #[test]
    fn test_write_shared_strings() {
        let mut table = SharedStrings::new();
        table.add(&RichString::plain("a & b"));
        table.add(&RichString::plain("a & b"));
        table.add(&RichString::plain(" lead"));
        let rich = RichString::new()
            .with_fragment("Bold", Some(Font::bold()))
            .with_fragment(" tail", None);
        table.add(&rich);

        let mut bytes = Vec::new();
        write_shared_strings(&table, &mut bytes).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains(r#"count="4" uniqueCount="3""#));
        assert!(xml.contains("<si><t>a &amp; b</t></si>"));
        assert!(xml.contains(r#"<si><t xml:space="preserve"> lead</t></si>"#));
        assert!(xml.contains("<r><rPr><b/></rPr><t>Bold</t></r>"));

        let loaded = read_shared_strings(xml.as_bytes()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(2), Some(&rich));
        assert_eq!(loaded.index_of(&RichString::plain("a & b")), Some(0));
    }
}
