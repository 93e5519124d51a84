//! Worksheet XML reader
//!
//! Rebuilds a [`Worksheet`] from a `<worksheet>` part. Elements the model does
//! not cover are skipped with their subtree; unparseable attribute values fall
//! back to defaults instead of failing the load.

use std::io::BufRead;

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::parser_utils::{attr_value, parse_bool, read_text_node, skip_element, unescape_control_chars};
use super::shared_strings::read_rich_text;
use crate::cell::{Cell, CellType, CellValue};
use crate::error::Result;
use crate::formula::{CellFormula, FormulaType};
use crate::package::Relationship;
use crate::reference::{CellRange, CellRef, MAX_COLUMNS, parse_sqref};
use crate::rich_string::RichString;
use crate::styles::StyleId;
use crate::value::{date_to_serial, datetime_to_serial};
use crate::worksheet::{
    AutoFilter, CfRule, CfRuleType, ColumnInfo, ComparisonOperator, ConditionalFormatting, DataValidation, ErrorStyle,
    Hyperlink, HyperlinkTarget, RowInfo, ValidationType, Worksheet,
};

/// Raw content of one `<c>` element.
#[derive(Default)]
struct CellBody {
    value: Option<String>,
    formula: Option<CellFormula>,
    inline: Option<RichString>,
}

fn parse_u8(value: &str) -> Option<u8> {
    value.parse().ok()
}

/// Read a worksheet part into `sheet`.
///
/// `rels` are the relationships of the worksheet part, used to resolve
/// external hyperlink targets.
pub fn read_worksheet<R: BufRead>(source: R, sheet: &mut Worksheet, rels: &[Relationship]) -> Result<()> {
    let mut reader = Reader::from_reader(source);
    let mut declared: Option<CellRange> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"worksheet" | b"cols" | b"mergeCells" | b"dataValidations" | b"hyperlinks" | b"sheetViews" => {}
                b"sheetData" => read_sheet_data(&mut reader, sheet)?,
                b"conditionalFormatting" => {
                    if let Some(cf) = read_conditional_formatting(&mut reader, &e, sheet)? {
                        sheet.conditional_formats.push(cf);
                    }
                }
                b"dataValidation" => {
                    let dv = read_data_validation(&mut reader, &e)?;
                    if !dv.ranges.is_empty() {
                        sheet.data_validations.push(dv);
                    }
                }
                b"autoFilter" => sheet.auto_filter = read_auto_filter(&mut reader, &e, true)?,
                b"dimension" | b"sheetFormatPr" | b"col" | b"mergeCell" | b"hyperlink" | b"sheetView" => {
                    apply_attributes(&e, sheet, &mut declared, rels)?;
                    skip_element(&mut reader, &e)?;
                }
                _ => skip_element(&mut reader, &e)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"autoFilter" => sheet.auto_filter = read_auto_filter(&mut reader, &e, false)?,
                b"dataValidation" => {
                    let dv = data_validation_attrs(&e)?;
                    if !dv.ranges.is_empty() {
                        sheet.data_validations.push(dv);
                    }
                }
                _ => apply_attributes(&e, sheet, &mut declared, rels)?,
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(range) = declared {
        sheet.apply_declared_dimension(range);
    }
    debug!(
        "read sheet '{}': {} cells, {} merges",
        sheet.name(),
        sheet.cell_count(),
        sheet.merges.len()
    );
    Ok(())
}

/// Elements whose information lives entirely in their attributes.
fn apply_attributes(
    e: &BytesStart<'_>,
    sheet: &mut Worksheet,
    declared: &mut Option<CellRange>,
    rels: &[Relationship],
) -> Result<()> {
    match e.name().as_ref() {
        b"dimension" => {
            if let Some(r) = attr_value(e, b"ref")? {
                *declared = r.parse().ok();
            }
        }
        b"sheetView" => {
            if let Some(selected) = attr_value(e, b"tabSelected")? {
                sheet.selected = parse_bool(selected.as_bytes());
            }
        }
        b"sheetFormatPr" => {
            if let Some(height) = attr_value(e, b"defaultRowHeight")?.and_then(|v| v.parse().ok()) {
                sheet.default_row_height = height;
            }
            sheet.default_column_width = attr_value(e, b"defaultColWidth")?.and_then(|v| v.parse().ok());
        }
        b"col" => read_col(e, sheet)?,
        b"mergeCell" => {
            if let Some(range) = attr_value(e, b"ref")?.and_then(|r| r.parse::<CellRange>().ok()) {
                if range.is_single_cell() {
                    warn!("ignoring single cell merge {}", range);
                } else {
                    sheet.merges.push(range);
                }
            }
        }
        b"hyperlink" => {
            if let Some(link) = read_hyperlink(e, rels)? {
                sheet.hyperlinks.push(link);
            }
        }
        _ => {}
    }
    Ok(())
}

fn read_col(e: &BytesStart<'_>, sheet: &mut Worksheet) -> Result<()> {
    let mut min = 0u32;
    let mut max = 0u32;
    let mut info = ColumnInfo::default();
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"min" => min = value.parse().unwrap_or(0),
            b"max" => max = value.parse().unwrap_or(0),
            b"width" => info.width = value.parse().ok(),
            b"style" => info.format = value.parse().ok().and_then(|s| sheet.styles.borrow().style_id(s)),
            b"hidden" => info.hidden = Some(parse_bool(value.as_bytes())),
            b"outlineLevel" => info.outline_level = parse_u8(&value).filter(|l| *l > 0),
            b"collapsed" => info.collapsed = Some(parse_bool(value.as_bytes())),
            _ => {}
        }
    }
    if min == 0 || max < min {
        warn!("ignoring <col> with min={} max={}", min, max);
        return Ok(());
    }
    let max = max.min(MAX_COLUMNS);
    if info.is_default() {
        return Ok(());
    }
    for col in min..=max {
        sheet.columns.insert(col, info.clone());
    }
    sheet.dimension.add_columns(min, max);
    Ok(())
}

fn read_hyperlink(e: &BytesStart<'_>, rels: &[Relationship]) -> Result<Option<Hyperlink>> {
    let Some(range) = attr_value(e, b"ref")?.and_then(|r| r.parse::<CellRange>().ok()) else {
        return Ok(None);
    };
    let rel_target = attr_value(e, b"r:id")?.and_then(|id| rels.iter().find(|r| r.id == id).map(|r| r.target.clone()));
    let target = match (rel_target, attr_value(e, b"location")?) {
        (Some(url), _) => HyperlinkTarget::External(url),
        (None, Some(location)) => HyperlinkTarget::Internal(location),
        (None, None) => {
            warn!("hyperlink on {} has no target", range);
            return Ok(None);
        }
    };
    Ok(Some(Hyperlink {
        range,
        target,
        display: attr_value(e, b"display")?,
        tooltip: attr_value(e, b"tooltip")?,
    }))
}

fn read_sheet_data<R: BufRead>(reader: &mut Reader<R>, sheet: &mut Worksheet) -> Result<()> {
    let mut buf = Vec::new();
    let mut current_row = 0u32;
    let mut current_col = 0u32;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"row" => {
                current_row = read_row(&e, sheet, current_row)?;
                current_col = 0;
            }
            Event::Start(e) if e.name().as_ref() == b"c" => {
                let (pos, style, cell_type) = read_cell_attrs(&e, current_row, current_col)?;
                let body = read_cell_body(reader)?;
                current_col = pos.col;
                store_cell(sheet, pos, style, cell_type, body);
            }
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                let (pos, style, cell_type) = read_cell_attrs(&e, current_row, current_col)?;
                current_col = pos.col;
                store_cell(sheet, pos, style, cell_type, CellBody::default());
            }
            Event::End(e) if e.name().as_ref() == b"sheetData" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Parse a `<row>` start tag, returning its row number. A missing `r`
/// continues from the previous row.
fn read_row(e: &BytesStart<'_>, sheet: &mut Worksheet, previous: u32) -> Result<u32> {
    let mut row = previous.saturating_add(1);
    let mut info = RowInfo::default();
    let mut style = None;
    let mut custom_format = false;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"r" => row = value.parse().unwrap_or(row),
            b"ht" => info.height = value.parse().ok(),
            b"hidden" => info.hidden = Some(parse_bool(value.as_bytes())),
            b"s" => style = value.parse::<u32>().ok(),
            b"customFormat" => custom_format = parse_bool(value.as_bytes()),
            b"outlineLevel" => info.outline_level = parse_u8(&value).filter(|l| *l > 0),
            b"collapsed" => info.collapsed = Some(parse_bool(value.as_bytes())),
            _ => {}
        }
    }
    if custom_format {
        info.format = style.and_then(|s| sheet.styles.borrow().style_id(s));
    }
    if !info.is_default() && CellRef::new(row, 1).is_valid() {
        sheet.rows.insert(row, info);
        sheet.dimension.add_rows(row, row);
    }
    Ok(row)
}

fn read_cell_attrs(e: &BytesStart<'_>, row: u32, previous_col: u32) -> Result<(CellRef, Option<u32>, Option<String>)> {
    let mut pos = CellRef::new(row, previous_col.saturating_add(1));
    let mut style = None;
    let mut cell_type = None;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"r" => match value.parse::<CellRef>() {
                Ok(parsed) => pos = parsed,
                Err(_) => warn!("invalid cell reference '{}', using {}", value, pos),
            },
            b"s" => style = value.parse::<u32>().ok(),
            b"t" => cell_type = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok((pos, style, cell_type))
}

fn read_cell_body<R: BufRead>(reader: &mut Reader<R>) -> Result<CellBody> {
    let mut body = CellBody::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"v" => body.value = Some(read_text_node(reader)?),
                b"f" => {
                    let mut formula = read_formula_attrs(&e)?;
                    formula.text = read_text_node(reader)?;
                    body.formula = Some(formula);
                }
                b"is" => body.inline = Some(read_rich_text(reader, b"is")?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"v" => body.value = Some(String::new()),
                b"f" => body.formula = Some(read_formula_attrs(&e)?),
                b"is" => body.inline = Some(RichString::plain("")),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(body)
}

fn read_formula_attrs(e: &BytesStart<'_>) -> Result<CellFormula> {
    let mut formula = CellFormula::default();
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"t" => formula.kind = FormulaType::parse(&value),
            b"ref" => formula.reference = value.parse().ok(),
            b"si" => formula.shared_index = value.parse().ok(),
            b"ca" => formula.always_calculate = Some(parse_bool(value.as_bytes())),
            _ => {}
        }
    }
    Ok(formula)
}

fn parse_iso_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(|d| d.and_time(Default::default())))
}

/// Text content as stored on the cell: rich only when it carries formatting.
fn text_cell(cell_type: CellType, text: RichString) -> Cell {
    let plain = text.to_plain_text();
    let cell = Cell::new(cell_type, CellValue::Text(plain));
    if text.is_rich() { cell.with_rich_string(text) } else { cell }
}

fn store_cell(sheet: &mut Worksheet, pos: CellRef, style: Option<u32>, type_attr: Option<String>, body: CellBody) {
    if !pos.is_valid() {
        warn!("skipping cell outside the sheet bounds at row {} column {}", pos.row, pos.col);
        return;
    }
    let format: Option<StyleId> = style.and_then(|s| {
        let id = sheet.styles.borrow().style_id(s);
        if id.is_none() {
            warn!("cell {} refers to unknown style {}", pos, s);
        }
        id
    });
    let is_date_style = format
        .and_then(|id| sheet.styles.borrow().xf_format(id).map(|f| f.is_date_time()))
        .unwrap_or(false);
    let cell_type = CellType::from_attr(type_attr.as_deref());
    let value = body.value;

    let mut cell = match cell_type {
        CellType::SharedString => {
            let index = value.as_deref().and_then(|v| v.trim().parse::<usize>().ok());
            let mut sst = sheet.shared_strings.borrow_mut();
            match index.and_then(|i| sst.get(i).cloned().map(|s| (i, s))) {
                Some((i, text)) => {
                    sst.inc_ref(i);
                    text_cell(CellType::SharedString, text)
                }
                None => {
                    warn!("cell {} refers to unknown shared string {:?}", pos, value);
                    Cell::blank(None)
                }
            }
        }
        CellType::InlineString => match body.inline {
            Some(text) => text_cell(CellType::InlineString, text),
            None => Cell::new(CellType::InlineString, CellValue::Text(value.unwrap_or_default())),
        },
        CellType::Boolean => match value {
            Some(v) => Cell::new(CellType::Boolean, CellValue::Boolean(parse_bool(v.trim().as_bytes()))),
            None => Cell::new(CellType::Boolean, CellValue::Empty),
        },
        CellType::Str | CellType::Error => Cell::new(
            cell_type,
            value
                .map(|v| CellValue::Text(unescape_control_chars(&v).into_owned()))
                .unwrap_or_default(),
        ),
        CellType::Date => {
            let date1904 = sheet.config.date1904;
            match value.as_deref().and_then(parse_iso_date) {
                Some(dt) if dt.time() == Default::default() => {
                    Cell::new(CellType::Date, CellValue::Number(date_to_serial(dt.date(), date1904)))
                }
                Some(dt) => Cell::new(CellType::Date, CellValue::Number(datetime_to_serial(dt, date1904))),
                None => Cell::new(CellType::Str, value.map(CellValue::Text).unwrap_or_default()),
            }
        }
        CellType::Number | CellType::Custom => match value.as_deref().map(str::trim) {
            None | Some("") => Cell::new(cell_type, CellValue::Empty),
            Some(v) => match v.parse::<f64>() {
                Ok(n) if is_date_style => Cell::new(CellType::Date, CellValue::Number(n)),
                Ok(n) => Cell::new(cell_type, CellValue::Number(n)),
                Err(_) => {
                    warn!("cell {} has unparseable number '{}'", pos, v);
                    Cell::new(CellType::Str, CellValue::Text(v.to_string()))
                }
            },
        },
    };

    if let Some(formula) = body.formula {
        if formula.kind == FormulaType::Shared && !formula.text.is_empty() {
            sheet.register_shared_formula(pos, formula.clone());
        }
        cell = cell.with_formula(formula);
    }
    sheet.insert_loaded(pos.row, pos.col, cell.with_format(format));
}

fn read_cf_rule(e: &BytesStart<'_>, sheet: &Worksheet) -> Result<CfRule> {
    let mut rule = CfRule::new(CfRuleType::Other(String::new()));
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"type" => rule.rule_type = CfRuleType::parse(&value),
            b"operator" => rule.operator = ComparisonOperator::parse(&value),
            b"dxfId" => rule.dxf_id = value.parse().ok(),
            b"priority" => rule.priority = value.parse().unwrap_or(0),
            b"stopIfTrue" => rule.stop_if_true = parse_bool(value.as_bytes()),
            b"text" => rule.text = Some(value.into_owned()),
            _ => {}
        }
    }
    rule.format = rule.dxf_id.and_then(|id| sheet.styles.borrow().dxf_format(id).cloned());
    Ok(rule)
}

fn read_conditional_formatting<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    sheet: &Worksheet,
) -> Result<Option<ConditionalFormatting>> {
    let ranges = attr_value(start, b"sqref")?.map(|s| parse_sqref(&s)).unwrap_or_default();
    let mut rules = Vec::new();
    let mut current: Option<CfRule> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"cfRule" => current = Some(read_cf_rule(&e, sheet)?),
                b"formula" => {
                    let text = read_text_node(reader)?;
                    if let Some(rule) = current.as_mut() {
                        rule.formulas.push(text);
                    }
                }
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) if e.name().as_ref() == b"cfRule" => rules.push(read_cf_rule(&e, sheet)?),
            Event::End(e) if e.name().as_ref() == b"cfRule" => rules.extend(current.take()),
            Event::End(e) if e.name().as_ref() == b"conditionalFormatting" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    rules.retain(|rule| match &rule.rule_type {
        CfRuleType::Other(kind) if matches!(kind.as_str(), "" | "colorScale" | "dataBar" | "iconSet") => {
            warn!("dropping unsupported conditional format rule '{}'", kind);
            false
        }
        _ => true,
    });
    if ranges.is_empty() || rules.is_empty() {
        return Ok(None);
    }
    Ok(Some(ConditionalFormatting { ranges, rules }))
}

fn read_data_validation<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart<'_>) -> Result<DataValidation> {
    let mut dv = data_validation_attrs(start)?;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"formula1" => dv.formula1 = Some(read_text_node(reader)?),
                b"formula2" => dv.formula2 = Some(read_text_node(reader)?),
                _ => skip_element(reader, &e)?,
            },
            Event::End(e) if e.name().as_ref() == b"dataValidation" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(dv)
}

fn data_validation_attrs(e: &BytesStart<'_>) -> Result<DataValidation> {
    let mut dv = DataValidation::default();
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"sqref" => dv.ranges = parse_sqref(&value),
            b"type" => dv.validation_type = ValidationType::parse(&value),
            b"operator" => dv.operator = ComparisonOperator::parse(&value),
            b"errorStyle" => dv.error_style = ErrorStyle::parse(&value),
            b"allowBlank" => dv.allow_blank = parse_bool(value.as_bytes()),
            b"showInputMessage" => dv.show_input_message = parse_bool(value.as_bytes()),
            b"showErrorMessage" => dv.show_error_message = parse_bool(value.as_bytes()),
            b"promptTitle" => dv.prompt_title = Some(value.into_owned()),
            b"prompt" => dv.prompt = Some(value.into_owned()),
            b"errorTitle" => dv.error_title = Some(value.into_owned()),
            b"error" => dv.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(dv)
}

/// Read an `<autoFilter>`; `has_body` is false for an empty element.
fn read_auto_filter<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<Option<AutoFilter>> {
    let range = attr_value(start, b"ref")?.and_then(|r| r.parse::<CellRange>().ok());
    let mut filter = range.map(AutoFilter::new);
    if !has_body {
        return Ok(filter);
    }
    let mut col_id: Option<u32> = None;
    let mut values: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"filterColumn" => {
                    col_id = attr_value(&e, b"colId")?.and_then(|v| v.parse().ok());
                    values.clear();
                }
                b"filter" => values.extend(attr_value(&e, b"val")?),
                b"filters" => {}
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"filterColumn" => {
                if let (Some(f), Some(id)) = (filter.as_mut(), col_id.take()) {
                    f.columns.push(crate::worksheet::FilterColumn {
                        col_id: id,
                        values: std::mem::take(&mut values),
                    });
                }
            }
            Event::End(e) if e.name().as_ref() == b"autoFilter" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbookConfig;
    use crate::shared_strings::SharedStrings;
    use crate::styles::{Format, NumberFormat, StyleTable};
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn empty_sheet() -> Worksheet {
        let mut sst = SharedStrings::new();
        sst.push_loaded(RichString::plain("alpha"));
        sst.push_loaded(RichString::plain("beta"));
        let mut styles = StyleTable::new();
        styles.add_xf_format(Format::default().with_number_format(NumberFormat::Builtin(14)));
        Worksheet::new(
            "Sheet1",
            WorkbookConfig::default(),
            Rc::new(RefCell::new(sst)),
            Rc::new(RefCell::new(styles)),
        )
    }

    fn load(xml: &str) -> Worksheet {
        let mut sheet = empty_sheet();
        read_worksheet(xml.as_bytes(), &mut sheet, &[]).unwrap();
        sheet
    }

    #[test]
    fn test_cell_types() {
        let sheet = load(
            r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1"><v>2.5</v></c><c r="C1" t="b"><v>1</v></c>
<c r="D1" t="inlineStr"><is><t>inline</t></is></c><c r="E1" t="e"><v>#DIV/0!</v></c>
<c r="F1" t="str"><f>"a"&amp;"b"</f><v>ab</v></c><c r="G1" s="1"><v>45139</v></c><c r="H1" t="b"><v>maybe</v></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(sheet.read(1, 1), Value::Text("beta".to_string()));
        assert_eq!(sheet.shared_strings.borrow().ref_count(1), 1);
        assert_eq!(sheet.cell_at(1, 2).unwrap().cell_type(), CellType::Custom);
        assert_eq!(sheet.read(1, 2), Value::Number(2.5));
        assert_eq!(sheet.read(1, 3), Value::Boolean(true));
        assert_eq!(sheet.read(1, 4), Value::Text("inline".to_string()));
        assert_eq!(sheet.read(1, 5), Value::Text("#DIV/0!".to_string()));
        assert_eq!(sheet.read(1, 6), Value::Text("=\"a\"&\"b\"".to_string()));
        assert_eq!(sheet.cell_at(1, 7).unwrap().cell_type(), CellType::Date);
        assert_eq!(sheet.read(1, 7), Value::Date(NaiveDate::from_ymd_opt(2023, 8, 1).unwrap()));
        assert_eq!(sheet.read(1, 8), Value::Boolean(false));
    }

    #[test]
    fn test_implicit_positions() {
        let sheet = load(
            r#"<worksheet><sheetData>
<row><c><v>1</v></c><c><v>2</v></c></row>
<row><c r="C2"><v>3</v></c><c><v>4</v></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(sheet.read(1, 1), Value::Number(1.0));
        assert_eq!(sheet.read(1, 2), Value::Number(2.0));
        assert_eq!(sheet.read(2, 3), Value::Number(3.0));
        assert_eq!(sheet.read(2, 4), Value::Number(4.0));
        assert_eq!(sheet.dimension(), Some(CellRange::new(1, 1, 2, 4)));
    }

    #[test]
    fn test_implicit_positions_past_the_last_row() {
        let sheet = load(
            r#"<worksheet><sheetData>
<row r="4294967295"/>
<row><c><v>1</v></c></row>
<row r="2"><c r="XFD2"><v>2</v></c><c><v>3</v></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(sheet.cell_count(), 1);
        assert_eq!(sheet.read(2, 16_384), Value::Number(2.0));
    }

    #[test]
    fn test_shared_formula_group() {
        let sheet = load(
            r#"<worksheet><sheetData>
<row r="1"><c r="C1"><f t="shared" ref="C1:C3" si="0">A1+B1</f><v>3</v></c></row>
<row r="2"><c r="C2"><f t="shared" si="0"/><v>7</v></c></row>
<row r="3"><c r="C3"><f t="shared" si="0"/></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(sheet.read(2, 3), Value::Text("=A2+B2".to_string()));
        assert_eq!(sheet.read(3, 3), Value::Text("=A3+B3".to_string()));
        assert_eq!(sheet.shared_formula(0).unwrap().anchor, CellRef::new(1, 3));
        assert_eq!(sheet.cell_at(2, 3).unwrap().value(), &CellValue::Number(7.0));
    }

    #[test]
    fn test_metadata_and_features() {
        let sheet = load(
            r#"<worksheet xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetPr><tabColor rgb="FFFF0000"/></sheetPr>
<dimension ref="A1:D10"/>
<sheetViews><sheetView tabSelected="1" workbookViewId="0"><selection activeCell="A1"/></sheetView></sheetViews>
<sheetFormatPr defaultRowHeight="18"/>
<cols><col min="2" max="4" width="12" customWidth="1"/><col min="6" max="6" hidden="1" width="9"/></cols>
<sheetData><row r="3" ht="25" customHeight="1" hidden="1" outlineLevel="2"/></sheetData>
<autoFilter ref="A1:D10"><filterColumn colId="1"><filters><filter val="x"/><filter val="y"/></filters></filterColumn></autoFilter>
<mergeCells count="1"><mergeCell ref="A1:B2"/></mergeCells>
<conditionalFormatting sqref="A1:A10"><cfRule type="cellIs" dxfId="0" priority="1" operator="greaterThan"><formula>5</formula></cfRule><cfRule type="dataBar" priority="2"><dataBar><cfvo type="min"/></dataBar></cfRule></conditionalFormatting>
<dataValidations count="1"><dataValidation type="list" allowBlank="1" sqref="B1:B5"><formula1>"a,b"</formula1></dataValidation></dataValidations>
<hyperlinks><hyperlink ref="D1" location="Other!A1" display="go"/></hyperlinks>
<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
</worksheet>"#,
        );
        assert!(sheet.is_selected());
        assert_eq!(sheet.default_row_height(), 18.0);
        assert_eq!(sheet.column_width(3), Some(12.0));
        assert!(sheet.is_column_hidden(6));
        assert_eq!(sheet.column_width(5), None);
        assert_eq!(sheet.row_height(3), Some(25.0));
        assert!(sheet.is_row_hidden(3));
        assert_eq!(sheet.row_info(3).unwrap().outline_level, Some(2));
        assert_eq!(sheet.dimension(), Some(CellRange::new(1, 1, 10, 6)));

        let filter = sheet.auto_filter().unwrap();
        assert_eq!(filter.range, CellRange::new(1, 1, 10, 4));
        assert_eq!(filter.columns[0].values, vec!["x".to_string(), "y".to_string()]);

        assert_eq!(sheet.merged_cells(), &[CellRange::new(1, 1, 2, 2)]);

        let cf = &sheet.conditional_formats()[0];
        assert_eq!(cf.rules.len(), 1);
        assert_eq!(cf.rules[0].formulas, vec!["5".to_string()]);
        assert_eq!(cf.rules[0].operator, Some(ComparisonOperator::GreaterThan));

        let dv = &sheet.data_validations()[0];
        assert_eq!(dv.validation_type, ValidationType::List);
        assert_eq!(dv.formula1.as_deref(), Some("\"a,b\""));

        assert_eq!(
            sheet.hyperlinks()[0].target,
            HyperlinkTarget::Internal("Other!A1".to_string())
        );
    }

    #[test]
    fn test_external_hyperlink_uses_relationships() {
        let mut sheet = empty_sheet();
        let rels = vec![Relationship::external(
            "rId1",
            crate::package::REL_HYPERLINK,
            "https://example.com",
        )];
        read_worksheet(
            r#"<worksheet><hyperlinks><hyperlink ref="A1" r:id="rId1"/></hyperlinks></worksheet>"#.as_bytes(),
            &mut sheet,
            &rels,
        )
        .unwrap();
        assert_eq!(
            sheet.hyperlinks()[0].target,
            HyperlinkTarget::External("https://example.com".to_string())
        );
    }

    #[test]
    fn test_unknown_indices_are_tolerated() {
        let sheet = load(
            r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>99</v></c><c r="B1" s="42"><v>1</v></c><c r="C1"><v>abc</v></c></row></sheetData><extLst><ext><x/></ext></extLst></worksheet>"#,
        );
        assert_eq!(sheet.read(1, 1), Value::Null);
        assert_eq!(sheet.cell_at(1, 2).unwrap().format(), None);
        assert_eq!(sheet.read(1, 3), Value::Text("abc".to_string()));
    }
}
