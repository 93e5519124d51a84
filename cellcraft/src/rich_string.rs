//! Rich text: strings made of separately formatted fragments

use crate::styles::Font;

/// One run of text with optional run-level font properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    pub text: String,
    pub font: Option<Font>,
}

/// Text content of a string cell, plain or rich.
///
/// A plain string is a single fragment without a font. Two rich strings are
/// equal only if both their text and per-fragment formatting match, which is
/// the identity used by the shared string table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RichString {
    fragments: Vec<Fragment>,
}

impl RichString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            fragments: vec![Fragment {
                text: text.into(),
                font: None,
            }],
        }
    }

    /// Append a fragment; empty texts are ignored.
    pub fn push(&mut self, text: impl Into<String>, font: Option<Font>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.fragments.push(Fragment {
            text,
            font: font.filter(|f| !f.is_empty()),
        });
    }

    pub fn with_fragment(mut self, text: impl Into<String>, font: Option<Font>) -> Self {
        self.push(text, font);
        self
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Whether any fragment carries formatting or there is more than one run.
    pub fn is_rich(&self) -> bool {
        self.fragments.len() > 1 || self.fragments.iter().any(|f| f.font.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|f| f.text.is_empty())
    }

    pub fn to_plain_text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

impl From<&str> for RichString {
    fn from(s: &str) -> Self {
        RichString::plain(s)
    }
}

impl From<String> for RichString {
    fn from(s: String) -> Self {
        RichString::plain(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_rich() {
        let plain = RichString::plain("Hello");
        assert!(!plain.is_rich());
        assert_eq!(plain.to_plain_text(), "Hello");

        let rich = RichString::new()
            .with_fragment("Hello ", Some(Font::bold()))
            .with_fragment("World", None);
        assert!(rich.is_rich());
        assert_eq!(rich.to_plain_text(), "Hello World");
        assert_ne!(rich, RichString::plain("Hello World"));
    }

    #[test]
    fn test_empty_font_is_dropped() {
        let s = RichString::new().with_fragment("x", Some(Font::default()));
        assert_eq!(s, RichString::plain("x"));
    }
}
