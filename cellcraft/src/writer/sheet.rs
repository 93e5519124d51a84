//! Worksheet XML writer
//!
//! Elements are emitted in the order required by the `CT_Worksheet` schema;
//! Excel rejects a part whose children are out of order.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use log::{debug, warn};

use super::shared_strings::write_rich_text;
use super::xml::{XmlWriter, escape_control_chars};
use crate::cell::{Cell, CellType, CellValue};
use crate::error::Result;
use crate::formula::{CellFormula, FormulaType};
use crate::package::{NS_MAIN, NS_RELATIONSHIPS, REL_HYPERLINK, Relationship};
use crate::reference::{CellRange, CellRef, format_sqref};
use crate::rich_string::RichString;
use crate::styles::StyleId;
use crate::worksheet::{
    AutoFilter, ColumnInfo, ConditionalFormatting, DataValidation, HyperlinkTarget, RowInfo, ValidationType,
    Worksheet, shared_content,
};

/// Rows sharing one `spans` hint.
const SPAN_BLOCK: u32 = 16;

fn bool_attr(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Shortest text that parses back to the same `f64`. Very small and very
/// large magnitudes use exponent notation.
pub(crate) fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

/// Serialize `sheet` and return the relationships its part needs (external
/// hyperlinks), with ids matching the `r:id` attributes written.
pub fn write_worksheet<W: Write>(sheet: &Worksheet, sink: W) -> Result<Vec<Relationship>> {
    let mut w = XmlWriter::new(sink);
    w.declaration()?;
    w.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;

    let dimension = sheet.dimension().map(|r| r.to_string()).unwrap_or_else(|| "A1".to_string());
    w.empty("dimension", &[("ref", &dimension)])?;

    w.start("sheetViews", &[])?;
    if sheet.is_selected() {
        w.empty("sheetView", &[("tabSelected", "1"), ("workbookViewId", "0")])?;
    } else {
        w.empty("sheetView", &[("workbookViewId", "0")])?;
    }
    w.end("sheetViews")?;

    write_sheet_format(&mut w, sheet)?;
    write_cols(&mut w, sheet.columns())?;
    write_sheet_data(&mut w, sheet)?;

    if let Some(filter) = sheet.auto_filter() {
        write_auto_filter(&mut w, filter)?;
    }
    if !sheet.merged_cells().is_empty() {
        w.start("mergeCells", &[("count", &sheet.merged_cells().len().to_string())])?;
        for range in sheet.merged_cells() {
            w.empty("mergeCell", &[("ref", &range.to_string())])?;
        }
        w.end("mergeCells")?;
    }
    for formatting in sheet.conditional_formats() {
        write_conditional_formatting(&mut w, formatting)?;
    }
    if !sheet.data_validations().is_empty() {
        w.start("dataValidations", &[("count", &sheet.data_validations().len().to_string())])?;
        for validation in sheet.data_validations() {
            write_data_validation(&mut w, validation)?;
        }
        w.end("dataValidations")?;
    }
    let rels = write_hyperlinks(&mut w, sheet)?;

    w.empty(
        "pageMargins",
        &[
            ("left", "0.7"),
            ("right", "0.7"),
            ("top", "0.75"),
            ("bottom", "0.75"),
            ("header", "0.3"),
            ("footer", "0.3"),
        ],
    )?;
    w.end("worksheet")?;
    w.into_inner().flush()?;
    debug!("wrote sheet '{}': {} cells", sheet.name(), sheet.cell_count());
    Ok(rels)
}

fn write_sheet_format<W: Write>(w: &mut XmlWriter<W>, sheet: &Worksheet) -> Result<()> {
    let row_height = format_number(sheet.default_row_height());
    let col_width = sheet.default_column_width.map(format_number);
    let row_levels = sheet.rows().values().map(RowInfo::level).max().unwrap_or(0).to_string();
    let col_levels = sheet.columns().values().map(ColumnInfo::level).max().unwrap_or(0).to_string();

    let mut attrs = vec![("defaultRowHeight", row_height.as_str())];
    if let Some(width) = &col_width {
        attrs.push(("defaultColWidth", width));
    }
    if row_levels != "0" {
        attrs.push(("outlineLevelRow", &row_levels));
    }
    if col_levels != "0" {
        attrs.push(("outlineLevelCol", &col_levels));
    }
    w.empty("sheetFormatPr", &attrs)
}

/// Write `<cols>`, merging runs of adjacent columns with identical settings
/// into one `<col min max>` record.
fn write_cols<W: Write>(w: &mut XmlWriter<W>, columns: &std::collections::BTreeMap<u32, ColumnInfo>) -> Result<()> {
    let mut runs: Vec<(u32, u32, &ColumnInfo)> = Vec::new();
    for (&col, info) in columns.iter().filter(|(_, info)| !info.is_default()) {
        match runs.last_mut() {
            Some((_, last, run_info)) if *last + 1 == col && *run_info == info => *last = col,
            _ => runs.push((col, col, info)),
        }
    }
    if runs.is_empty() {
        return Ok(());
    }

    w.start("cols", &[])?;
    for (min, max, info) in runs {
        let min = min.to_string();
        let max = max.to_string();
        let width = info.width.map(format_number);
        let style = info.format.map(|s| s.index().to_string());
        let level = info.outline_level.map(|l| l.to_string());
        let mut attrs = vec![("min", min.as_str()), ("max", max.as_str())];
        if let Some(width) = &width {
            attrs.push(("width", width));
            attrs.push(("customWidth", "1"));
        }
        if let Some(style) = &style {
            attrs.push(("style", style));
        }
        if let Some(hidden) = info.hidden {
            attrs.push(("hidden", bool_attr(hidden)));
        }
        if let Some(level) = &level {
            attrs.push(("outlineLevel", level));
        }
        if let Some(collapsed) = info.collapsed {
            attrs.push(("collapsed", bool_attr(collapsed)));
        }
        w.empty("col", &attrs)?;
    }
    w.end("cols")
}

/// `spans` hint per block of rows: the first and last column used anywhere
/// in the block.
fn row_spans(sheet: &Worksheet) -> HashMap<u32, (u32, u32)> {
    let mut spans: HashMap<u32, (u32, u32)> = HashMap::new();
    for (row, cols) in &sheet.cells {
        let (Some(first), Some(last)) = (cols.keys().next(), cols.keys().next_back()) else {
            continue;
        };
        spans
            .entry((row - 1) / SPAN_BLOCK)
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(*first);
                *hi = (*hi).max(*last);
            })
            .or_insert((*first, *last));
    }
    spans
}

fn write_sheet_data<W: Write>(w: &mut XmlWriter<W>, sheet: &Worksheet) -> Result<()> {
    let rows: BTreeSet<u32> = sheet
        .cells
        .keys()
        .copied()
        .chain(sheet.rows().iter().filter(|(_, info)| !info.is_default()).map(|(r, _)| *r))
        .collect();
    if rows.is_empty() {
        return w.empty("sheetData", &[]);
    }

    let spans = row_spans(sheet);
    w.start("sheetData", &[])?;
    for row in rows {
        let info = sheet.row_info(row);
        let r = row.to_string();
        let span = spans.get(&((row - 1) / SPAN_BLOCK)).map(|(lo, hi)| format!("{}:{}", lo, hi));
        let style = info.and_then(|i| i.format).map(|s| s.index().to_string());
        let height = info.and_then(|i| i.height).map(format_number);
        let level = info.and_then(|i| i.outline_level).map(|l| l.to_string());

        let mut attrs = vec![("r", r.as_str())];
        if let Some(span) = &span {
            attrs.push(("spans", span));
        }
        if let Some(style) = &style {
            attrs.push(("s", style));
            attrs.push(("customFormat", "1"));
        }
        if let Some(height) = &height {
            attrs.push(("ht", height));
            attrs.push(("customHeight", "1"));
        }
        if let Some(hidden) = info.and_then(|i| i.hidden) {
            attrs.push(("hidden", bool_attr(hidden)));
        }
        if let Some(level) = &level {
            attrs.push(("outlineLevel", level));
        }
        if let Some(collapsed) = info.and_then(|i| i.collapsed) {
            attrs.push(("collapsed", bool_attr(collapsed)));
        }

        match sheet.cells.get(&row).filter(|cols| !cols.is_empty()) {
            Some(cols) => {
                w.start("row", &attrs)?;
                for (&col, cell) in cols {
                    write_cell(w, sheet, CellRef::new(row, col), cell)?;
                }
                w.end("row")?;
            }
            None => w.empty("row", &attrs)?,
        }
    }
    w.end("sheetData")
}

/// Style written for a cell: its own, else its row's, else its column's.
fn effective_style(sheet: &Worksheet, pos: CellRef, cell: &Cell) -> Option<StyleId> {
    cell.format()
        .or_else(|| sheet.row_format(pos.row))
        .or_else(|| sheet.column_format(pos.col))
}

enum Content {
    None,
    Value(String),
    Inline(RichString),
}

fn write_cell<W: Write>(w: &mut XmlWriter<W>, sheet: &Worksheet, pos: CellRef, cell: &Cell) -> Result<()> {
    let reference = pos.to_string();
    let style = effective_style(sheet, pos, cell).map(|s| s.index().to_string());
    let mut cell_type = cell.cell_type().type_attr();

    let content = match (cell.cell_type(), cell.value()) {
        (CellType::SharedString, CellValue::Text(_)) => {
            let text = shared_content(cell);
            match sheet.shared_strings.borrow().index_of(&text) {
                Some(index) => Content::Value(index.to_string()),
                None => {
                    warn!("cell {} text is missing from the shared strings, writing it inline", pos);
                    cell_type = Some("inlineStr");
                    Content::Inline(text)
                }
            }
        }
        (CellType::InlineString, CellValue::Text(text)) => Content::Inline(
            cell.rich_string()
                .cloned()
                .unwrap_or_else(|| RichString::plain(text.as_str())),
        ),
        (_, CellValue::Empty) => Content::None,
        (_, CellValue::Number(n)) => Content::Value(format_number(*n)),
        (_, CellValue::Boolean(b)) => Content::Value(bool_attr(*b).to_string()),
        (_, CellValue::Text(text)) => Content::Value(escape_control_chars(text).into_owned()),
    };

    let mut attrs = vec![("r", reference.as_str())];
    if let Some(style) = &style {
        attrs.push(("s", style));
    }
    if let Some(t) = cell_type {
        attrs.push(("t", t));
    }

    if cell.formula().is_none() && matches!(content, Content::None) {
        return w.empty("c", &attrs);
    }
    w.start("c", &attrs)?;
    if let Some(formula) = cell.formula() {
        write_formula(w, pos, formula)?;
    }
    match content {
        Content::None => {}
        Content::Value(v) => w.text_element("v", &[], &v)?,
        Content::Inline(text) => {
            w.start("is", &[])?;
            write_rich_text(w, &text)?;
            w.end("is")?;
        }
    }
    w.end("c")
}

/// Write an `<f>` element for the formula stored at `pos`.
pub(crate) fn write_formula<W: Write>(w: &mut XmlWriter<W>, pos: CellRef, formula: &CellFormula) -> Result<()> {
    let reference = formula
        .reference
        .unwrap_or_else(|| CellRange::single(pos))
        .to_string();
    let shared_index = formula.shared_index.map(|si| si.to_string());

    let mut attrs: Vec<(&str, &str)> = Vec::new();
    match formula.kind {
        FormulaType::Normal => {}
        FormulaType::Shared => {
            attrs.push(("t", "shared"));
            if !formula.is_shared_dependent() {
                attrs.push(("ref", &reference));
            }
            if let Some(si) = &shared_index {
                attrs.push(("si", si));
            }
        }
        FormulaType::Array | FormulaType::DataTable => {
            attrs.push(("t", formula.kind.as_str()));
            attrs.push(("ref", &reference));
        }
    }
    if let Some(ca) = formula.always_calculate {
        attrs.push(("ca", bool_attr(ca)));
    }

    if formula.is_shared_dependent() {
        w.empty("f", &attrs)
    } else {
        w.text_element("f", &attrs, &formula.text)
    }
}

fn write_auto_filter<W: Write>(w: &mut XmlWriter<W>, filter: &AutoFilter) -> Result<()> {
    let range = filter.range.to_string();
    if filter.columns.is_empty() {
        return w.empty("autoFilter", &[("ref", &range)]);
    }
    w.start("autoFilter", &[("ref", &range)])?;
    for column in &filter.columns {
        w.start("filterColumn", &[("colId", &column.col_id.to_string())])?;
        w.start("filters", &[])?;
        for value in &column.values {
            w.empty("filter", &[("val", value)])?;
        }
        w.end("filters")?;
        w.end("filterColumn")?;
    }
    w.end("autoFilter")
}

fn write_conditional_formatting<W: Write>(w: &mut XmlWriter<W>, formatting: &ConditionalFormatting) -> Result<()> {
    if formatting.ranges.is_empty() || formatting.rules.is_empty() {
        return Ok(());
    }
    w.start("conditionalFormatting", &[("sqref", &format_sqref(&formatting.ranges))])?;
    for rule in &formatting.rules {
        let dxf_id = rule.dxf_id().map(|id| id.to_string());
        let priority = rule.priority.to_string();
        let mut attrs = vec![("type", rule.rule_type.as_str())];
        if let Some(dxf_id) = &dxf_id {
            attrs.push(("dxfId", dxf_id));
        }
        attrs.push(("priority", &priority));
        if rule.stop_if_true {
            attrs.push(("stopIfTrue", "1"));
        }
        if let Some(operator) = rule.operator {
            attrs.push(("operator", operator.as_str()));
        }
        if let Some(text) = &rule.text {
            attrs.push(("text", text));
        }
        if rule.formulas.is_empty() {
            w.empty("cfRule", &attrs)?;
            continue;
        }
        w.start("cfRule", &attrs)?;
        for formula in &rule.formulas {
            w.text_element("formula", &[], formula)?;
        }
        w.end("cfRule")?;
    }
    w.end("conditionalFormatting")
}

fn write_data_validation<W: Write>(w: &mut XmlWriter<W>, validation: &DataValidation) -> Result<()> {
    let sqref = format_sqref(&validation.ranges);
    let mut attrs: Vec<(&str, &str)> = Vec::new();
    if validation.validation_type != ValidationType::None {
        attrs.push(("type", validation.validation_type.as_str()));
    }
    if validation.error_style != Default::default() {
        attrs.push(("errorStyle", validation.error_style.as_str()));
    }
    if let Some(operator) = validation.operator {
        attrs.push(("operator", operator.as_str()));
    }
    attrs.push(("allowBlank", bool_attr(validation.allow_blank)));
    attrs.push(("showInputMessage", bool_attr(validation.show_input_message)));
    attrs.push(("showErrorMessage", bool_attr(validation.show_error_message)));
    for (key, value) in [
        ("errorTitle", &validation.error_title),
        ("error", &validation.error),
        ("promptTitle", &validation.prompt_title),
        ("prompt", &validation.prompt),
    ] {
        if let Some(value) = value {
            attrs.push((key, value));
        }
    }
    attrs.push(("sqref", &sqref));

    if validation.formula1.is_none() && validation.formula2.is_none() {
        return w.empty("dataValidation", &attrs);
    }
    w.start("dataValidation", &attrs)?;
    if let Some(formula) = &validation.formula1 {
        w.text_element("formula1", &[], formula)?;
    }
    if let Some(formula) = &validation.formula2 {
        w.text_element("formula2", &[], formula)?;
    }
    w.end("dataValidation")
}

fn write_hyperlinks<W: Write>(w: &mut XmlWriter<W>, sheet: &Worksheet) -> Result<Vec<Relationship>> {
    let mut rels = Vec::new();
    if sheet.hyperlinks().is_empty() {
        return Ok(rels);
    }
    w.start("hyperlinks", &[])?;
    for link in sheet.hyperlinks() {
        let range = link.range.to_string();
        let rel_id = match &link.target {
            HyperlinkTarget::External(url) => {
                let id = format!("rId{}", rels.len() + 1);
                rels.push(Relationship::external(id.as_str(), REL_HYPERLINK, url.as_str()));
                Some(id)
            }
            HyperlinkTarget::Internal(_) => None,
        };
        let mut attrs = vec![("ref", range.as_str())];
        match (&link.target, &rel_id) {
            (HyperlinkTarget::Internal(location), _) => attrs.push(("location", location)),
            (HyperlinkTarget::External(_), Some(id)) => attrs.push(("r:id", id)),
            (HyperlinkTarget::External(_), None) => {}
        }
        if let Some(display) = &link.display {
            attrs.push(("display", display));
        }
        if let Some(tooltip) = &link.tooltip {
            attrs.push(("tooltip", tooltip));
        }
        w.empty("hyperlink", &attrs)?;
    }
    w.end("hyperlinks")?;
    Ok(rels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbookConfig;
    use crate::formula::CellFormula;
    use crate::reader::read_worksheet;
    use crate::shared_strings::SharedStrings;
    use crate::styles::{Format, StyleTable};
    use crate::value::Value;
    use crate::worksheet::{ComparisonOperator, CfRule, Hyperlink};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sheet() -> Worksheet {
        Worksheet::new(
            "Sheet1",
            WorkbookConfig::default(),
            Rc::new(RefCell::new(SharedStrings::new())),
            Rc::new(RefCell::new(StyleTable::new())),
        )
    }

    fn render(sheet: &Worksheet) -> String {
        let mut bytes = Vec::new();
        write_worksheet(sheet, &mut bytes).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    /// Reload into a sheet sharing the same tables.
    fn reload(source: &Worksheet) -> Worksheet {
        let mut bytes = Vec::new();
        let rels = write_worksheet(source, &mut bytes).unwrap();
        let mut target = Worksheet::new(
            "Copy",
            source.config().clone(),
            Rc::new(RefCell::new((*source.shared_strings.borrow()).clone())),
            Rc::clone(&source.styles),
        );
        read_worksheet(bytes.as_slice(), &mut target, &rels).unwrap();
        target
    }

    fn position(xml: &str, needle: &str) -> usize {
        xml.find(needle).unwrap_or_else(|| panic!("{} not found in {}", needle, xml))
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(1e-300), "1e-300");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e20).parse::<f64>().unwrap(), 1e20);
    }

    #[test]
    fn test_empty_sheet() {
        let xml = render(&sheet());
        assert!(xml.contains(r#"<dimension ref="A1"/>"#));
        assert!(xml.contains("<sheetData/>"));
        assert!(!xml.contains("<cols>"));
    }

    #[test]
    fn test_element_order() {
        let mut ws = sheet();
        ws.write_numeric(1, 1, 1.0, None).unwrap();
        ws.set_column_width(2, 3, 20.0).unwrap();
        ws.merge_cells(CellRange::new(3, 1, 3, 2), None).unwrap();
        ws.set_auto_filter(AutoFilter::new(CellRange::new(1, 1, 5, 2))).unwrap();
        ws.add_data_validation(DataValidation::list(CellRange::new(6, 1, 6, 1), &["a", "b"]))
            .unwrap();
        ws.add_conditional_formatting(ConditionalFormatting::new(CellRange::new(1, 1, 2, 2)).with_rule(
            CfRule::cell_is(ComparisonOperator::GreaterThan, "1", Format::default().with_bold()),
        ))
        .unwrap();
        ws.add_hyperlink(Hyperlink::from_url(CellRange::new(7, 1, 7, 1), "https://example.com"));

        let xml = render(&ws);
        let order = [
            "<dimension",
            "<sheetViews>",
            "<sheetFormatPr",
            "<cols>",
            "<sheetData>",
            "<autoFilter",
            "<mergeCells",
            "<conditionalFormatting",
            "<dataValidations",
            "<hyperlinks>",
            "<pageMargins",
        ];
        for pair in order.windows(2) {
            assert!(position(&xml, pair[0]) < position(&xml, pair[1]), "{} before {}", pair[0], pair[1]);
        }
        assert!(xml.contains(r#"<col min="2" max="3" width="20" customWidth="1"/>"#));
    }

    #[test]
    fn test_cell_encoding() {
        let mut ws = sheet();
        ws.write_string(1, 1, "text", None).unwrap();
        ws.write_numeric(1, 2, 0.1, None).unwrap();
        ws.write_bool(1, 3, true, None).unwrap();
        ws.write_blank(1, 4, None).unwrap();
        ws.write_numeric(1, 5, 0.0, None).unwrap();
        ws.write_inline_string(1, 6, "a<b", None).unwrap();
        ws.write_formula(1, 7, CellFormula::new("=A1&\"x\""), None, None).unwrap();

        let xml = render(&ws);
        assert!(xml.contains(r#"<c r="A1" t="s"><v>0</v></c>"#));
        assert!(xml.contains(r#"<c r="B1" t="n"><v>0.1</v></c>"#));
        assert!(xml.contains(r#"<c r="C1" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<c r="D1" t="n"/>"#));
        assert!(xml.contains(r#"<c r="E1" t="n"><v>0</v></c>"#));
        assert!(xml.contains(r#"<c r="F1" t="inlineStr"><is><t>a&lt;b</t></is></c>"#));
        assert!(xml.contains(r#"<c r="G1" t="n"><f>A1&amp;"#));
        assert!(xml.contains(r#"<row r="1" spans="1:7">"#));
    }

    #[test]
    fn test_spans_cover_each_block_of_rows() {
        let mut ws = sheet();
        ws.write_numeric(1, 1, 1.0, None).unwrap();
        ws.write_numeric(10, 8, 2.0, None).unwrap();
        ws.write_numeric(17, 3, 3.0, None).unwrap();

        let xml = render(&ws);
        assert!(xml.contains(r#"<row r="1" spans="1:8">"#));
        assert!(xml.contains(r#"<row r="10" spans="1:8">"#));
        assert!(xml.contains(r#"<row r="17" spans="3:3">"#));
    }

    #[test]
    fn test_control_chars_in_strings() {
        let mut ws = sheet();
        ws.write_string(1, 1, "tab\there\u{1}", None).unwrap();
        ws.write_inline_string(1, 2, "bell\u{7}", None).unwrap();
        ws.insert_loaded(1, 3, Cell::new(CellType::Str, CellValue::Text("nul\u{0}_x0041_".into())));

        let xml = render(&ws);
        assert!(xml.contains("<t>bell_x0007_</t>"));
        assert!(xml.contains(r#"<c r="C1" t="str"><v>nul_x0000__x005F_x0041_</v></c>"#));
        assert!(!xml.contains('\u{7}'));

        let loaded = reload(&ws);
        assert_eq!(loaded.read(1, 1), Value::Text("tab\there\u{1}".into()));
        assert_eq!(loaded.read(1, 2), Value::Text("bell\u{7}".into()));
        assert_eq!(loaded.read(1, 3), Value::Text("nul\u{0}_x0041_".into()));
    }

    #[test]
    fn test_shared_formula_encoding() {
        let mut ws = sheet();
        let range = CellRange::new(1, 3, 3, 3);
        ws.write_formula(1, 3, CellFormula::shared("A1+B1", range), None, Some(3.0))
            .unwrap();
        let xml = render(&ws);
        assert!(xml.contains(r#"<f t="shared" ref="C1:C3" si="0">A1+B1</f><v>3</v>"#));
        assert!(xml.contains(r#"<c r="C2" t="n"><f t="shared" si="0"/></c>"#));
    }

    #[test]
    fn test_style_fallback() {
        let mut ws = sheet();
        let row_style = ws.add_format(Format::default().with_bold());
        let col_style = ws.add_format(Format::default().with_font_size(14.0));
        ws.set_row_format(2, 2, Some(row_style)).unwrap();
        ws.set_column_format(3, 3, Some(col_style)).unwrap();
        ws.write_numeric(2, 1, 1.0, None).unwrap();
        ws.write_numeric(4, 3, 1.0, None).unwrap();

        let xml = render(&ws);
        assert!(xml.contains(&format!(r#"<c r="A2" s="{}" t="n">"#, row_style.index())));
        assert!(xml.contains(&format!(r#"<c r="C4" s="{}" t="n">"#, col_style.index())));
        assert!(xml.contains(&format!(r#"<row r="2" spans="1:3" s="{}" customFormat="1">"#, row_style.index())));
    }

    #[test]
    fn test_round_trip_preserves_cells() {
        let mut ws = sheet();
        ws.write_string(1, 1, " spaced ", None).unwrap();
        ws.write_numeric(1, 2, 1.0 / 3.0, None).unwrap();
        ws.write_numeric(1, 3, 1e-300, None).unwrap();
        ws.write_numeric(1, 4, 123456789.125, None).unwrap();
        ws.write_bool(2, 1, false, None).unwrap();
        ws.write_blank(2, 2, None).unwrap();
        ws.write_formula(3, 1, CellFormula::new("SUM(B1:C1)"), None, Some(0.5)).unwrap();
        ws.write_date(3, 2, chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), None)
            .unwrap();
        ws.write_hyperlink(4, 1, "https://example.com/a?b=1&c=2", None, Some("tip"), None)
            .unwrap();
        ws.write_hyperlink(4, 2, "internal:Sheet1!A1", Some("back"), None, None)
            .unwrap();
        ws.set_row_height(5, 5, 30.0).unwrap();

        let loaded = reload(&ws);
        for (pos, cell) in ws.cells() {
            let other = loaded.cell_at(pos.row, pos.col).unwrap();
            assert_eq!(other.value(), cell.value(), "value at {}", pos);
            assert_eq!(other.cell_type(), cell.cell_type(), "type at {}", pos);
            assert_eq!(other.format(), cell.format(), "format at {}", pos);
            assert_eq!(other.formula(), cell.formula(), "formula at {}", pos);
            assert_eq!(loaded.read(pos.row, pos.col), ws.read(pos.row, pos.col));
        }
        assert_eq!(loaded.cell_count(), ws.cell_count());
        assert_eq!(loaded.read(1, 1), Value::Text(" spaced ".to_string()));
        assert_eq!(loaded.hyperlinks(), ws.hyperlinks());
        assert_eq!(loaded.row_height(5), Some(30.0));
        assert_eq!(loaded.dimension(), ws.dimension());
    }
}
