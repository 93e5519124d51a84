use cellcraft::{Value, Workbook};
use std::env;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.xlsx> [sheet]", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let workbook = Workbook::open(path)?;

    println!("File: {}", path);
    println!("Sheets: {}", workbook.sheet_names().join(", "));
    println!(
        "Shared strings: {} unique, {} references",
        workbook.shared_strings().len(),
        workbook.shared_strings().total_refs()
    );

    for sheet in workbook.worksheets() {
        if let Some(wanted) = args.get(2) {
            if sheet.name() != wanted {
                continue;
            }
        }
        let dimension = sheet.dimension().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        println!("\n=== Sheet: {} ({:?}, {}) ===", sheet.name(), sheet.state(), dimension);

        for (pos, cell) in sheet.cells() {
            let format = cell
                .format()
                .and_then(|id| workbook.format(id))
                .and_then(|f| f.number_format.code().map(str::to_string))
                .unwrap_or_default();
            match sheet.read(pos.row, pos.col) {
                Value::Null => println!("  {} <blank> {}", pos, format),
                value => println!("  {} [{:?}] {:?} {}", pos, cell.cell_type(), value, format),
            }
        }

        for range in sheet.merged_cells() {
            println!("  merged {}", range);
        }
        for link in sheet.hyperlinks() {
            println!("  link {} -> {:?}", link.range, link.target);
        }
    }

    Ok(())
}
