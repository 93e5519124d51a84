use cellcraft::worksheet::{CfRule, ComparisonOperator, ConditionalFormatting, DataValidation};
use cellcraft::{CellFormula, CellRange, Format, HorizontalAlignment, NumberFormat, Workbook};
use std::env;

fn main() -> anyhow::Result<()> {
    let output = env::args().nth(1).unwrap_or_else(|| "report.xlsx".to_string());

    let mut workbook = Workbook::new();
    let header = workbook.add_format(
        Format::default()
            .with_bold()
            .with_fill_color("FFD9E1F2")
            .with_horizontal_alignment(HorizontalAlignment::Center),
    );
    let money = workbook.add_format(Format::default().with_number_format(NumberFormat::custom("#,##0.00")));

    let sheet = workbook.add_worksheet("Sales")?;
    sheet.merge_cells("A1:D1".parse()?, Some(header))?;
    sheet.write_string(1, 1, "Quarterly sales", Some(header))?;
    for (col, title) in ["Region", "Units", "Price", "Total"].iter().enumerate() {
        sheet.write_string(2, col as u32 + 1, title, Some(header))?;
    }

    let rows = [("North", 120.0, 9.5), ("South", 80.0, 11.25), ("East", 45.0, 10.0), ("West", 200.0, 8.75)];
    for (i, (region, units, price)) in rows.iter().enumerate() {
        let row = i as u32 + 3;
        sheet.write_string(row, 1, region, None)?;
        sheet.write_numeric(row, 2, *units, None)?;
        sheet.write_numeric(row, 3, *price, Some(money))?;
    }
    let last = rows.len() as u32 + 2;
    let totals: CellRange = format!("D3:D{}", last).parse()?;
    sheet.write_formula(3, 4, CellFormula::shared("B3*C3", totals), Some(money), None)?;

    sheet.add_data_validation(DataValidation::list(
        format!("A3:A{}", last).parse()?,
        &["North", "South", "East", "West"],
    ))?;
    sheet.add_conditional_formatting(ConditionalFormatting::new(totals).with_rule(CfRule::cell_is(
        ComparisonOperator::GreaterThan,
        "1000",
        Format::default().with_bold().with_font_color("FF006100"),
    )))?;
    sheet.autosize_column_widths(format!("A2:D{}", last).parse()?)?;
    sheet.write_hyperlink(last + 2, 1, "https://example.com/sales", Some("Source data"), None, None)?;

    workbook.save(&output)?;
    println!("Wrote {}", output);
    Ok(())
}
