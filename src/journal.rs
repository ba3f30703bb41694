use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use csv::ReaderBuilder;
use gl_audit_sampling::CellValue;
use log::debug;
use std::{fs::File, io::Read, path::Path};

pub type Grid = Vec<Vec<CellValue>>;

/// Date-times keep their serial value so the engine converts them the same
/// way as plain numeric dates.
fn cell_from_xlsx(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn load_excel(path: &Path) -> Result<Grid> {
    let mut wb = open_workbook_auto(path).with_context(|| format!("failed to open workbook: {}", path.display()))?;
    let name = wb
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("workbook has no sheets"))?;
    let range = wb.worksheet_range(&name).with_context(|| format!("failed to read sheet '{name}'"))?;
    let grid: Grid = range.rows().map(|r| r.iter().map(cell_from_xlsx).collect()).collect();
    debug!("sheet '{name}': {} rows", grid.len());
    Ok(grid)
}

fn read_csv<R: Read>(reader: R) -> Result<Grid> {
    let mut rdr = ReaderBuilder::new().flexible(true).has_headers(false).from_reader(reader);
    let mut grid = Grid::new();
    for rec in rdr.records() {
        let rec = rec.context("malformed CSV record")?;
        grid.push(
            rec.iter()
                .map(|v| if v.trim().is_empty() { CellValue::Empty } else { CellValue::Text(v.to_string()) })
                .collect(),
        );
    }
    Ok(grid)
}

fn load_csv(path: &Path) -> Result<Grid> {
    let file = File::open(path).with_context(|| format!("failed to open CSV: {}", path.display()))?;
    let grid = read_csv(file)?;
    debug!("csv: {} rows", grid.len());
    Ok(grid)
}

/// Decodes a ledger export into raw cells, choosing the decoder by extension.
pub fn load_grid(path: &Path) -> Result<Grid> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_excel(path),
        "csv" => load_csv(path),
        _ => {
            if path.is_file() {
                load_excel(path).or_else(|_| load_csv(path))
            } else {
                Err(anyhow::anyhow!("unsupported ledger file: {}", path.display()))
            }
        }
    }
}
