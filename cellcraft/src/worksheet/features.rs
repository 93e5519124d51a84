//! Sheet-level records stored next to the cell table: data validations,
//! conditional formatting, the autofilter and hyperlinks.

use crate::reference::CellRange;
use crate::styles::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationType {
    #[default]
    None,
    Whole,
    Decimal,
    List,
    Date,
    Time,
    TextLength,
    Custom,
}

impl ValidationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::None => "none",
            ValidationType::Whole => "whole",
            ValidationType::Decimal => "decimal",
            ValidationType::List => "list",
            ValidationType::Date => "date",
            ValidationType::Time => "time",
            ValidationType::TextLength => "textLength",
            ValidationType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "whole" => ValidationType::Whole,
            "decimal" => ValidationType::Decimal,
            "list" => ValidationType::List,
            "date" => ValidationType::Date,
            "time" => ValidationType::Time,
            "textLength" => ValidationType::TextLength,
            "custom" => ValidationType::Custom,
            _ => ValidationType::None,
        }
    }
}

/// Comparison used by data validations and `cellIs` conditional formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonOperator {
    #[default]
    Between,
    NotBetween,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Between => "between",
            ComparisonOperator::NotBetween => "notBetween",
            ComparisonOperator::Equal => "equal",
            ComparisonOperator::NotEqual => "notEqual",
            ComparisonOperator::LessThan => "lessThan",
            ComparisonOperator::LessThanOrEqual => "lessThanOrEqual",
            ComparisonOperator::GreaterThan => "greaterThan",
            ComparisonOperator::GreaterThanOrEqual => "greaterThanOrEqual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "between" => ComparisonOperator::Between,
            "notBetween" => ComparisonOperator::NotBetween,
            "equal" => ComparisonOperator::Equal,
            "notEqual" => ComparisonOperator::NotEqual,
            "lessThan" => ComparisonOperator::LessThan,
            "lessThanOrEqual" => ComparisonOperator::LessThanOrEqual,
            "greaterThan" => ComparisonOperator::GreaterThan,
            "greaterThanOrEqual" => ComparisonOperator::GreaterThanOrEqual,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorStyle {
    #[default]
    Stop,
    Warning,
    Information,
}

impl ErrorStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStyle::Stop => "stop",
            ErrorStyle::Warning => "warning",
            ErrorStyle::Information => "information",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "warning" => ErrorStyle::Warning,
            "information" => ErrorStyle::Information,
            _ => ErrorStyle::Stop,
        }
    }
}

/// A `<dataValidation>` rule applied to one or more ranges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValidation {
    pub ranges: Vec<CellRange>,
    pub validation_type: ValidationType,
    pub operator: Option<ComparisonOperator>,
    pub formula1: Option<String>,
    pub formula2: Option<String>,
    pub allow_blank: bool,
    pub show_input_message: bool,
    pub show_error_message: bool,
    pub error_style: ErrorStyle,
    pub prompt_title: Option<String>,
    pub prompt: Option<String>,
    pub error_title: Option<String>,
    pub error: Option<String>,
}

impl DataValidation {
    pub fn new(validation_type: ValidationType, range: CellRange) -> Self {
        Self {
            ranges: vec![range],
            validation_type,
            allow_blank: true,
            show_input_message: true,
            show_error_message: true,
            ..Self::default()
        }
    }

    /// A drop-down list of literal choices.
    pub fn list<S: AsRef<str>>(range: CellRange, items: &[S]) -> Self {
        let joined = items.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(",");
        let mut validation = Self::new(ValidationType::List, range);
        validation.formula1 = Some(format!("\"{}\"", joined));
        validation
    }

    pub fn with_operator(mut self, operator: ComparisonOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_formulas(mut self, formula1: impl Into<String>, formula2: Option<String>) -> Self {
        self.formula1 = Some(formula1.into());
        self.formula2 = formula2;
        self
    }

    pub fn with_range(mut self, range: CellRange) -> Self {
        self.ranges.push(range);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CfRuleType {
    CellIs,
    Expression,
    ContainsText,
    DuplicateValues,
    UniqueValues,
    ContainsBlanks,
    NotContainsBlanks,
    Top10,
    AboveAverage,
    /// Any other `type` attribute, kept verbatim.
    Other(String),
}

impl CfRuleType {
    pub fn as_str(&self) -> &str {
        match self {
            CfRuleType::CellIs => "cellIs",
            CfRuleType::Expression => "expression",
            CfRuleType::ContainsText => "containsText",
            CfRuleType::DuplicateValues => "duplicateValues",
            CfRuleType::UniqueValues => "uniqueValues",
            CfRuleType::ContainsBlanks => "containsBlanks",
            CfRuleType::NotContainsBlanks => "notContainsBlanks",
            CfRuleType::Top10 => "top10",
            CfRuleType::AboveAverage => "aboveAverage",
            CfRuleType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cellIs" => CfRuleType::CellIs,
            "expression" => CfRuleType::Expression,
            "containsText" => CfRuleType::ContainsText,
            "duplicateValues" => CfRuleType::DuplicateValues,
            "uniqueValues" => CfRuleType::UniqueValues,
            "containsBlanks" => CfRuleType::ContainsBlanks,
            "notContainsBlanks" => CfRuleType::NotContainsBlanks,
            "top10" => CfRuleType::Top10,
            "aboveAverage" => CfRuleType::AboveAverage,
            other => CfRuleType::Other(other.to_string()),
        }
    }
}

/// One `<cfRule>`.
#[derive(Debug, Clone, PartialEq)]
pub struct CfRule {
    pub rule_type: CfRuleType,
    pub operator: Option<ComparisonOperator>,
    pub formulas: Vec<String>,
    /// Search text of `containsText` rules
    pub text: Option<String>,
    /// Evaluation order; 0 means assign the next free priority on insertion
    pub priority: u32,
    pub stop_if_true: bool,
    /// Differential format applied when the rule matches
    pub format: Option<Format>,
    pub(crate) dxf_id: Option<u32>,
}

impl CfRule {
    pub fn new(rule_type: CfRuleType) -> Self {
        Self {
            rule_type,
            operator: None,
            formulas: Vec::new(),
            text: None,
            priority: 0,
            stop_if_true: false,
            format: None,
            dxf_id: None,
        }
    }

    pub fn cell_is(operator: ComparisonOperator, formula: impl Into<String>, format: Format) -> Self {
        let mut rule = Self::new(CfRuleType::CellIs);
        rule.operator = Some(operator);
        rule.formulas.push(formula.into());
        rule.format = Some(format);
        rule
    }

    pub fn expression(formula: impl Into<String>, format: Format) -> Self {
        let mut rule = Self::new(CfRuleType::Expression);
        rule.formulas.push(formula.into());
        rule.format = Some(format);
        rule
    }

    pub fn dxf_id(&self) -> Option<u32> {
        self.dxf_id
    }
}

/// A `<conditionalFormatting>` block: rules sharing a set of ranges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionalFormatting {
    pub ranges: Vec<CellRange>,
    pub rules: Vec<CfRule>,
}

impl ConditionalFormatting {
    pub fn new(range: CellRange) -> Self {
        Self {
            ranges: vec![range],
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: CfRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Value list filter on one autofilter column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterColumn {
    /// 0-based offset from the first column of the autofilter range
    pub col_id: u32,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoFilter {
    pub range: CellRange,
    pub columns: Vec<FilterColumn>,
}

impl AutoFilter {
    pub fn new(range: CellRange) -> Self {
        Self {
            range,
            columns: Vec::new(),
        }
    }

    pub fn with_filter(mut self, col_id: u32, values: Vec<String>) -> Self {
        self.columns.retain(|c| c.col_id != col_id);
        self.columns.push(FilterColumn { col_id, values });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HyperlinkTarget {
    /// URL stored in the sheet relationships
    External(String),
    /// Location inside the workbook, e.g. `Sheet2!A1`
    Internal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    pub range: CellRange,
    pub target: HyperlinkTarget,
    pub display: Option<String>,
    pub tooltip: Option<String>,
}

impl Hyperlink {
    /// Build a link from a URL; `internal:` prefixes denote in-workbook locations.
    pub fn from_url(range: CellRange, url: &str) -> Self {
        let target = match url.strip_prefix("internal:") {
            Some(location) => HyperlinkTarget::Internal(location.to_string()),
            None => HyperlinkTarget::External(url.to_string()),
        };
        Self {
            range,
            target,
            display: None,
            tooltip: None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.target, HyperlinkTarget::External(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::CellRef;

    #[test]
    fn test_list_validation_formula() {
        let dv = DataValidation::list(CellRange::new(1, 1, 10, 1), &["Yes", "No"]);
        assert_eq!(dv.formula1.as_deref(), Some("\"Yes,No\""));
        assert_eq!(dv.validation_type.as_str(), "list");
    }

    #[test]
    fn test_hyperlink_targets() {
        let cell = CellRange::from(CellRef::new(1, 1));
        assert!(Hyperlink::from_url(cell, "https://example.com").is_external());
        assert_eq!(
            Hyperlink::from_url(cell, "internal:Sheet2!A1").target,
            HyperlinkTarget::Internal("Sheet2!A1".to_string())
        );
    }

    #[test]
    fn test_rule_type_roundtrip_text() {
        assert_eq!(CfRuleType::parse("cellIs"), CfRuleType::CellIs);
        assert_eq!(CfRuleType::parse("dataBar"), CfRuleType::Other("dataBar".to_string()));
        assert_eq!(CfRuleType::parse("dataBar").as_str(), "dataBar");
    }
}
