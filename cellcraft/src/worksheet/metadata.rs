//! Row and column records
//!
//! Every attribute is optional: a row whose height was never set is written
//! without `ht`, while one explicitly set to the default height keeps it.

use crate::styles::StyleId;

/// Deepest outline level a row or column can have.
pub const MAX_OUTLINE_LEVEL: u8 = 7;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowInfo {
    /// Height in points
    pub height: Option<f64>,
    pub format: Option<StyleId>,
    pub hidden: Option<bool>,
    pub outline_level: Option<u8>,
    pub collapsed: Option<bool>,
}

impl RowInfo {
    /// Whether nothing was set on this row.
    pub fn is_default(&self) -> bool {
        self.height.is_none()
            && self.format.is_none()
            && self.hidden.is_none()
            && self.outline_level.is_none()
            && self.collapsed.is_none()
    }

    pub fn level(&self) -> u8 {
        self.outline_level.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnInfo {
    /// Width in characters
    pub width: Option<f64>,
    pub format: Option<StyleId>,
    pub hidden: Option<bool>,
    pub outline_level: Option<u8>,
    pub collapsed: Option<bool>,
}

impl ColumnInfo {
    pub fn is_default(&self) -> bool {
        self.width.is_none()
            && self.format.is_none()
            && self.hidden.is_none()
            && self.outline_level.is_none()
            && self.collapsed.is_none()
    }

    pub fn level(&self) -> u8 {
        self.outline_level.unwrap_or(0)
    }
}

/// Decrease an outline level, clearing it once it reaches zero.
pub(crate) fn lower_level(level: Option<u8>) -> Option<u8> {
    match level {
        Some(l) if l > 1 => Some(l - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_differs_from_default_value() {
        let unset = RowInfo::default();
        let explicit = RowInfo {
            hidden: Some(false),
            ..RowInfo::default()
        };
        assert!(unset.is_default());
        assert!(!explicit.is_default());
    }

    #[test]
    fn test_lower_level() {
        assert_eq!(lower_level(Some(3)), Some(2));
        assert_eq!(lower_level(Some(1)), None);
        assert_eq!(lower_level(None), None);
    }
}
