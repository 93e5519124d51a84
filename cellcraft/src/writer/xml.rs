//! Thin element-level wrapper around `quick_xml::Writer`

use std::borrow::Cow;
use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;

/// Control characters XML 1.0 cannot carry.
fn is_forbidden_control(c: char) -> bool {
    c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')
}

/// `_xHHHH_` at the start of `s`.
fn starts_with_escape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 7 && b[0] == b'_' && b[1] == b'x' && b[2..6].iter().all(u8::is_ascii_hexdigit) && b[6] == b'_'
}

/// Encode string content the way SpreadsheetML expects: forbidden control
/// characters become `_xHHHH_`, and a literal `_xHHHH_` sequence gets its
/// leading underscore written as `_x005F_`.
pub(crate) fn escape_control_chars(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_forbidden_control) && !text.contains("_x") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for (i, c) in text.char_indices() {
        if is_forbidden_control(c) {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else if c == '_' && starts_with_escape(&text[i..]) {
            out.push_str("_x005F_");
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

pub(crate) struct XmlWriter<W: Write> {
    inner: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    pub(crate) fn new(sink: W) -> Self {
        Self {
            inner: Writer::new(sink),
        }
    }

    /// `<?xml version="1.0" encoding="UTF-8" standalone="yes"?>` plus a newline.
    pub(crate) fn declaration(&mut self) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        self.inner.get_mut().write_all(b"\n")?;
        Ok(())
    }

    fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        start
    }

    pub(crate) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.inner.write_event(Event::Start(Self::element(name, attrs)))?;
        Ok(())
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.inner.write_event(Event::Empty(Self::element(name, attrs)))?;
        Ok(())
    }

    /// `<name attrs>text</name>`, with the text escaped.
    pub(crate) fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// A `<t>` element, marked `xml:space="preserve"` when the text has
    /// leading or trailing whitespace. Control characters are escaped.
    pub(crate) fn text_run(&mut self, text: &str) -> Result<()> {
        let text = escape_control_chars(text);
        let text = text.as_ref();
        let preserve = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
        if preserve {
            self.text_element("t", &[("xml:space", "preserve")], text)
        } else {
            self.text_element("t", &[], text)
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>) -> String {
        let mut w = XmlWriter::new(Vec::new());
        f(&mut w).unwrap();
        String::from_utf8(w.into_inner()).unwrap()
    }

    #[test]
    fn test_escaping() {
        let xml = render(|w| w.text_element("v", &[("a", "x\"<y")], "1 < 2 & 3"));
        assert_eq!(xml, r#"<v a="x&quot;&lt;y">1 &lt; 2 &amp; 3</v>"#);
    }

    #[test]
    fn test_text_run_preserves_whitespace() {
        assert_eq!(render(|w| w.text_run("plain")), "<t>plain</t>");
        assert_eq!(
            render(|w| w.text_run(" padded")),
            r#"<t xml:space="preserve"> padded</t>"#
        );
    }

    #[test]
    fn test_control_chars_are_escaped() {
        assert_eq!(escape_control_chars("plain"), "plain");
        assert_eq!(escape_control_chars("a\u{1}b\tc"), "a_x0001_b\tc");
        assert_eq!(escape_control_chars("_x0041_"), "_x005F_x0041_");
        assert_eq!(escape_control_chars("_x00_ and _xZZZZ_"), "_x00_ and _xZZZZ_");
        assert_eq!(render(|w| w.text_run("bell\u{7}")), "<t>bell_x0007_</t>");
    }
}
