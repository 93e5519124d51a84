//! Common parsing utilities shared by the part readers

use std::borrow::Cow;
use std::io::BufRead;
use std::sync::OnceLock;

use log::trace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::{Captures, Regex};

use crate::error::Result;

/// Read text content up to the end of the current element
pub fn read_text_node<R: BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Decode `_xHHHH_` escapes in string content. `_x005F_` stands for a
/// literal underscore, so `_x005F_x0041_` reads back as `_x0041_`.
pub fn unescape_control_chars(text: &str) -> Cow<'_, str> {
    static ESCAPE: OnceLock<Regex> = OnceLock::new();
    let escape = ESCAPE.get_or_init(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").expect("escape pattern is valid"));
    escape.replace_all(text, |caps: &Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// Skip an element and its whole subtree. `start` is the already consumed start tag.
pub fn skip_element<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<()> {
    trace!("skipping <{}>", String::from_utf8_lossy(start.name().as_ref()));
    let end = start.to_end().into_owned();
    let mut buf = Vec::new();
    reader.read_to_end_into(end.name(), &mut buf)?;
    Ok(())
}

/// Value of one attribute, unescaped.
pub fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// XML schema boolean: `1`/`true` or `0`/`false`. Anything else is `false`.
pub fn parse_bool(value: &[u8]) -> bool {
    matches!(value, b"1" | b"true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_text_node_unescapes() {
        let mut reader = Reader::from_str("<t>a &amp; b<x>c</x></t>");
        let mut buf = Vec::new();
        reader.read_event_into(&mut buf).unwrap();
        assert_eq!(read_text_node(&mut reader).unwrap(), "a & bc");
    }

    #[test]
    fn test_skip_element() {
        let mut reader = Reader::from_str("<root><skip><a/><b>x</b></skip><keep/></root>");
        let mut buf = Vec::new();
        reader.read_event_into(&mut buf).unwrap();
        let start = match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) => e.into_owned(),
            other => panic!("unexpected {:?}", other),
        };
        skip_element(&mut reader, &start).unwrap();
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Empty(e) => assert_eq!(e.name().as_ref(), b"keep"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unescape_control_chars() {
        assert_eq!(unescape_control_chars("plain"), "plain");
        assert_eq!(unescape_control_chars("a_x0001_b_x000d_"), "a\u{1}b\r");
        assert_eq!(unescape_control_chars("_x005F_x0041_"), "_x0041_");
        assert_eq!(unescape_control_chars("_xD800_"), "_xD800_");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(b"1"));
        assert!(parse_bool(b"true"));
        assert!(!parse_bool(b"0"));
        assert!(!parse_bool(b"yes"));
    }
}
