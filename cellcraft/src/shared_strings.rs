//! Shared string table
//!
//! Excel stores string cell contents once per workbook and lets cells refer to
//! them by index. Entries are deduplicated by full content, formatting
//! included, and carry a reference count used for the `count` attribute of
//! the shared strings part.
//!
//! The table only grows: overwriting a cell does not release its entry, so an
//! index stays valid for as long as the workbook lives.

use std::collections::HashMap;

use crate::rich_string::RichString;

#[derive(Debug, Clone)]
struct Entry {
    string: RichString,
    refs: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    entries: Vec<Entry>,
    index: HashMap<RichString, usize>,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a string, or increment its reference count if present.
    /// Returns its index.
    pub fn add(&mut self, string: &RichString) -> usize {
        if let Some(&idx) = self.index.get(string) {
            self.entries[idx].refs += 1;
            return idx;
        }
        let idx = self.entries.len();
        self.entries.push(Entry {
            string: string.clone(),
            refs: 1,
        });
        self.index.insert(string.clone(), idx);
        idx
    }

    /// Append an entry read from a shared strings part with no references
    /// yet. Duplicate entries in the source keep their own index.
    pub(crate) fn push_loaded(&mut self, string: RichString) {
        let idx = self.entries.len();
        self.index.entry(string.clone()).or_insert(idx);
        self.entries.push(Entry { string, refs: 0 });
    }

    pub fn index_of(&self, string: &RichString) -> Option<usize> {
        self.index.get(string).copied()
    }

    pub fn get(&self, idx: usize) -> Option<&RichString> {
        self.entries.get(idx).map(|e| &e.string)
    }

    /// Increment the reference count of an existing entry.
    /// Returns false if the index is unknown.
    pub fn inc_ref(&mut self, idx: usize) -> bool {
        match self.entries.get_mut(idx) {
            Some(entry) => {
                entry.refs += 1;
                true
            }
            None => false,
        }
    }

    pub fn ref_count(&self, idx: usize) -> u32 {
        self.entries.get(idx).map(|e| e.refs).unwrap_or(0)
    }

    /// Sum of all reference counts.
    pub fn total_refs(&self) -> u64 {
        self.entries.iter().map(|e| e.refs as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RichString> {
        self.entries.iter().map(|e| &e.string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::Font;

    #[test]
    fn test_shared_strings() {
        let mut ss = SharedStrings::new();
        let idx1 = ss.add(&"Hello".into());
        let idx2 = ss.add(&"World".into());
        let idx3 = ss.add(&"Hello".into());

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 0);
        assert_eq!(ss.len(), 2);
        assert_eq!(ss.ref_count(0), 2);
        assert_eq!(ss.total_refs(), 3);
    }

    #[test]
    fn test_formatting_is_part_of_identity() {
        let mut ss = SharedStrings::new();
        let plain = ss.add(&RichString::plain("Total"));
        let bold = ss.add(&RichString::new().with_fragment("Total", Some(Font::bold())));
        assert_ne!(plain, bold);
        assert_eq!(ss.index_of(&RichString::plain("Total")), Some(plain));
    }

    #[test]
    fn test_loaded_entries_keep_order() {
        let mut ss = SharedStrings::new();
        ss.push_loaded("b".into());
        ss.push_loaded("a".into());
        assert_eq!(ss.index_of(&"a".into()), Some(1));
        assert_eq!(ss.ref_count(1), 0);
        assert!(ss.inc_ref(1));
        assert!(!ss.inc_ref(7));
        assert_eq!(ss.ref_count(1), 1);
    }
}
