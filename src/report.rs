use anyhow::{Context, Result};
use gl_audit_sampling::{AccountGroup, SamplingResults, SamplingSummary, SelectedSample};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::{fs::File, io::BufWriter, path::Path};

const SAMPLE_HEADERS: &[&str] = &[
    "Id", "Account", "Account Number", "Date", "Description", "Reference", "Vendor", "Amount", "Selection Reason",
    "Account Total Balance",
];

/// `.json` gets the full result bundle; anything else an Excel workbook.
pub fn write_results(results: &SamplingResults, output: &Path) -> Result<()> {
    let is_json = output.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let file = File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), results).context("failed to write JSON results")?;
        return Ok(());
    }

    let money = Format::new().set_num_format("#,##0.00");
    let bold = Format::new().set_bold();
    let mut wb = Workbook::new();
    {
        let ws = wb.add_worksheet().set_name("Samples")?;
        write_samples(ws, &results.samples, &bold, &money)?;
    }
    {
        let ws = wb.add_worksheet().set_name("Accounts")?;
        write_accounts(ws, &results.material_accounts, &bold, &money)?;
    }
    {
        let ws = wb.add_worksheet().set_name("Summary")?;
        write_summary(ws, &results.summary, results.filtered_transaction_count, &bold)?;
    }
    wb.save(output).with_context(|| format!("failed to save workbook: {}", output.display()))?;
    Ok(())
}

fn write_samples(ws: &mut Worksheet, samples: &[SelectedSample], bold: &Format, money: &Format) -> Result<()> {
    for (c, h) in SAMPLE_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, c as u16, *h, bold)?;
    }
    for (i, s) in samples.iter().enumerate() {
        let row = (i + 1) as u32;
        let t = &s.transaction;
        ws.write_string(row, 0, t.id.as_deref().unwrap_or(""))?;
        ws.write_string(row, 1, &s.account_group)?;
        ws.write_string(row, 2, &t.account_number)?;
        ws.write_string(row, 3, &t.date)?;
        ws.write_string(row, 4, &t.description)?;
        ws.write_string(row, 5, &t.reference)?;
        ws.write_string(row, 6, &t.vendor)?;
        ws.write_number_with_format(row, 7, t.amount, money)?;
        ws.write_string(row, 8, s.selection_reason.label())?;
        ws.write_number_with_format(row, 9, s.group_total_balance, money)?;
    }
    Ok(())
}

fn write_accounts(ws: &mut Worksheet, accounts: &[AccountGroup], bold: &Format, money: &Format) -> Result<()> {
    for (c, h) in ["Account", "Account Number", "Transactions", "Total Balance"].iter().enumerate() {
        ws.write_string_with_format(0, c as u16, *h, bold)?;
    }
    for (i, g) in accounts.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &g.account_name)?;
        ws.write_string(row, 1, &g.account_number)?;
        ws.write_number(row, 2, g.transaction_count as f64)?;
        ws.write_number_with_format(row, 3, g.total_balance, money)?;
    }
    Ok(())
}

fn write_summary(ws: &mut Worksheet, s: &SamplingSummary, filtered: usize, bold: &Format) -> Result<()> {
    let rows: [(&str, f64); 8] = [
        ("Transactions after keyword filter", filtered as f64),
        ("Material accounts", s.total_material_accounts as f64),
        ("Transactions reviewed", s.total_transactions_reviewed as f64),
        ("Total material balance", s.total_material_balance),
        ("Total value tested", s.total_value_tested),
        ("Coverage %", s.coverage_percentage),
        ("Over-scope items", s.over_scope_count as f64),
        ("High-value key items", s.high_value_count as f64),
    ];
    ws.write_string_with_format(0, 0, "Metric", bold)?;
    ws.write_string_with_format(0, 1, "Value", bold)?;
    for (i, (label, value)) in rows.iter().enumerate() {
        ws.write_string((i + 1) as u32, 0, *label)?;
        ws.write_number((i + 1) as u32, 1, *value)?;
    }
    Ok(())
}
