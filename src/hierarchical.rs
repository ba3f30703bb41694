//! Drill-down ledger layout: an account-name banner in column 0 followed by
//! transaction rows whose first column is blank.

use crate::model::{CellValue, Transaction};
use crate::normalize::{amount_from_cell, date_from_cell};
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

/// Rows searched for the header row.
pub const HEADER_SCAN_ROWS: usize = 10;
/// Rows after the header searched for a banner/continuation pair.
pub const BANNER_LOOKAHEAD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LedgerFormat {
    Flat,
    Hierarchical,
}

/// Problems reported to the caller instead of failing the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum IngestWarning {
    #[error("header row not found in the first {scanned} rows; no transactions parsed")]
    HeaderRowNotFound { scanned: usize },
    #[error("header row {header_row} has no amount column; no transactions parsed")]
    AmountColumnMissing { header_row: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchicalParse {
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<IngestWarning>,
}

static EMPTY: CellValue = CellValue::Empty;

fn first_cell(row: &[CellValue]) -> &CellValue {
    row.first().unwrap_or(&EMPTY)
}

fn lower_text(cell: &CellValue) -> String {
    cell.to_display().trim().to_lowercase()
}

fn is_total_label(s: &str) -> bool {
    s.trim().to_lowercase().starts_with("total")
}

/// A non-blank, non-"Total ..." string in column 0.
fn banner_label(row: &[CellValue]) -> Option<&str> {
    match first_cell(row) {
        CellValue::Text(s) if !s.trim().is_empty() && !is_total_label(s) => Some(s.trim()),
        _ => None,
    }
}

/// Index of the first row (within the scan window) whose joined lowercase
/// text mentions "date" and either "amount" or "balance".
pub fn find_header_row(grid: &[Vec<CellValue>]) -> Option<usize> {
    grid.iter().take(HEADER_SCAN_ROWS).position(|row| {
        let joined = row.iter().map(lower_text).collect::<Vec<_>>().join(" ");
        joined.contains("date") && (joined.contains("amount") || joined.contains("balance"))
    })
}

/// Hierarchical only if, shortly after the header, a banner row is
/// immediately followed by a row with a blank first column. Ledgers where
/// every account has a single line never satisfy this and read as flat.
pub fn detect_format(grid: &[Vec<CellValue>]) -> LedgerFormat {
    let Some(header) = find_header_row(grid) else {
        return LedgerFormat::Flat;
    };
    let start = header + 1;
    let end = (start + BANNER_LOOKAHEAD).min(grid.len());
    for i in start..end {
        if banner_label(&grid[i]).is_none() {
            continue;
        }
        if let Some(next) = grid.get(i + 1) {
            if first_cell(next).is_empty() {
                debug!("hierarchical layout: banner at row {i}, header at row {header}");
                return LedgerFormat::Hierarchical;
            }
        }
    }
    LedgerFormat::Flat
}

#[derive(Debug, Clone, Default)]
struct HeaderColumns {
    date: Option<usize>,
    amount: Option<usize>,
    memo: Option<usize>,
    num: Option<usize>,
    name: Option<usize>,
}

fn find_index(headers: &[String], keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|k| headers.iter().position(|h| h.as_str() == *k || h.contains(*k)))
}

impl HeaderColumns {
    fn resolve(header_row: &[CellValue]) -> Self {
        let headers: Vec<String> = header_row.iter().map(lower_text).collect();
        HeaderColumns {
            date: find_index(&headers, &["date"]),
            amount: find_index(&headers, &["amount"]),
            memo: find_index(&headers, &["memo", "description"]),
            num: find_index(&headers, &["num"]),
            name: find_index(&headers, &["name"]),
        }
    }
}

fn cell_at(row: &[CellValue], idx: Option<usize>) -> &CellValue {
    idx.and_then(|i| row.get(i)).unwrap_or(&EMPTY)
}

fn text_at(row: &[CellValue], idx: Option<usize>) -> String {
    cell_at(row, idx).to_display().trim().to_string()
}

/// Flattens a drill-down ledger into transactions. Banner rows set the
/// current account; blank-first-column rows become its transactions unless
/// they have no amount, a zero amount, or a "beginning balance" date cell.
pub fn parse_hierarchical(grid: &[Vec<CellValue>]) -> HierarchicalParse {
    let Some(header) = find_header_row(grid) else {
        let w = IngestWarning::HeaderRowNotFound { scanned: HEADER_SCAN_ROWS.min(grid.len()) };
        warn!("{w}");
        return HierarchicalParse { transactions: Vec::new(), warnings: vec![w] };
    };
    let cols = HeaderColumns::resolve(&grid[header]);
    if cols.amount.is_none() {
        let w = IngestWarning::AmountColumnMissing { header_row: header };
        warn!("{w}");
        return HierarchicalParse { transactions: Vec::new(), warnings: vec![w] };
    }

    let mut current_account = String::new();
    let mut transactions = Vec::new();
    let mut skipped = 0usize;
    for row in &grid[header + 1..] {
        let first = first_cell(row);
        if !first.is_empty() {
            if let Some(label) = banner_label(row) {
                current_account = label.to_string();
            }
            continue;
        }

        let amount_cell = cell_at(row, cols.amount);
        if amount_cell.is_empty() {
            skipped += 1;
            continue;
        }
        let date_cell = cell_at(row, cols.date);
        if lower_text(date_cell).contains("beginning balance") {
            skipped += 1;
            continue;
        }
        let amount = amount_from_cell(amount_cell);
        if amount == 0.0 {
            skipped += 1;
            continue;
        }

        transactions.push(Transaction {
            id: None,
            date: date_from_cell(date_cell),
            account_number: String::new(),
            account_name: current_account.clone(),
            description: text_at(row, cols.memo),
            amount,
            reference: text_at(row, cols.num),
            vendor: text_at(row, cols.name),
            extra: Default::default(),
        });
    }
    debug!("hierarchical parse: {} transactions, {skipped} rows skipped", transactions.len());
    HierarchicalParse { transactions, warnings: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::from(s)
    }
    fn n(f: f64) -> CellValue {
        CellValue::Number(f)
    }
    const E: CellValue = CellValue::Empty;

    fn header() -> Vec<CellValue> {
        vec![E, t("Type"), t("Date"), t("Num"), t("Name"), t("Memo/Description"), t("Amount"), t("Balance")]
    }

    fn sample_grid() -> Vec<Vec<CellValue>> {
        vec![
            vec![t("Acme Co")],
            vec![t("General Ledger")],
            header(),
            vec![t("Utilities")],
            vec![E, t("Bill"), t("01/05/2024"), t("1001"), t("City Power"), t("Jan power"), n(300.0), n(300.0)],
            vec![E, t("Credit"), t("01/09/2024"), t("1002"), t("City Power"), t("Refund"), t("(50)"), n(250.0)],
            vec![t("Total Utilities"), E, E, E, E, E, n(250.0)],
            vec![t("Rent")],
            vec![E, E, t("Beginning Balance"), E, E, E, n(900.0)],
            vec![E, t("Check"), n(45300.0), t("77"), t("Landlord"), E, t("$1,200.00")],
            vec![E, t("Check"), t("02/01/2024"), E, E, t("void"), t("0")],
            vec![E, t("Check"), t("02/02/2024"), E, E, t("no amount"), E],
        ]
    }

    #[test]
    fn detects_hierarchical_layout() {
        assert_eq!(find_header_row(&sample_grid()), Some(2));
        assert_eq!(detect_format(&sample_grid()), LedgerFormat::Hierarchical);
    }

    #[test]
    fn flat_sheet_is_not_hierarchical() {
        let grid = vec![
            vec![t("Date"), t("Account"), t("Amount")],
            vec![t("2024-01-01"), t("Cash"), n(10.0)],
            vec![t("2024-01-02"), t("Rent"), n(20.0)],
        ];
        assert_eq!(detect_format(&grid), LedgerFormat::Flat);
    }

    #[test]
    fn no_header_is_flat() {
        let grid = vec![vec![t("foo")], vec![E]];
        assert_eq!(detect_format(&grid), LedgerFormat::Flat);
    }

    #[test]
    fn single_line_accounts_are_not_detected() {
        // Known corner case: banners are never followed by a blank-first-column row.
        let grid = vec![
            header(),
            vec![t("Utilities"), E, t("01/05/2024"), E, E, E, n(300.0)],
            vec![t("Rent"), E, t("01/06/2024"), E, E, E, n(900.0)],
        ];
        assert_eq!(detect_format(&grid), LedgerFormat::Flat);
    }

    #[test]
    fn total_rows_do_not_trigger_detection() {
        let grid = vec![header(), vec![t("Total Utilities")], vec![E, E, t("x"), E, E, E, n(1.0)]];
        assert_eq!(detect_format(&grid), LedgerFormat::Flat);
    }

    #[test]
    fn banner_outside_lookahead_is_ignored() {
        let mut grid = vec![header()];
        for _ in 0..BANNER_LOOKAHEAD {
            grid.push(vec![n(1.0)]);
        }
        grid.push(vec![t("Late Account")]);
        grid.push(vec![E, E, t("d"), E, E, E, n(5.0)]);
        assert_eq!(detect_format(&grid), LedgerFormat::Flat);
    }

    #[test]
    fn parses_accounts_and_amounts() {
        let parsed = parse_hierarchical(&sample_grid());
        assert!(parsed.warnings.is_empty());
        let tx = &parsed.transactions;
        assert_eq!(tx.len(), 3);

        assert_eq!(tx[0].account_name, "Utilities");
        assert_eq!(tx[0].amount, 300.0);
        assert_eq!(tx[0].date, "01/05/2024");
        assert_eq!(tx[0].reference, "1001");
        assert_eq!(tx[0].vendor, "City Power");
        assert_eq!(tx[0].description, "Jan power");
        assert_eq!(tx[0].account_number, "");

        assert_eq!(tx[1].account_name, "Utilities");
        assert_eq!(tx[1].amount, -50.0);
        assert_eq!(tx[1].amount.to_string(), "-50");

        assert_eq!(tx[2].account_name, "Rent");
        assert_eq!(tx[2].amount, 1200.0);
        assert_eq!(tx[2].date, "2024-01-09");
        assert!(tx.iter().all(|t| t.id.is_none()));
    }

    #[test]
    fn missing_header_is_a_warning() {
        let grid = vec![vec![t("nothing here")], vec![E, n(5.0)]];
        let parsed = parse_hierarchical(&grid);
        assert!(parsed.transactions.is_empty());
        assert_eq!(parsed.warnings, vec![IngestWarning::HeaderRowNotFound { scanned: 2 }]);
    }

    #[test]
    fn balance_only_header_has_no_amount_column() {
        let grid = vec![vec![E, t("Date"), t("Balance")], vec![t("Cash")], vec![E, t("d"), n(5.0)]];
        let parsed = parse_hierarchical(&grid);
        assert!(parsed.transactions.is_empty());
        assert_eq!(parsed.warnings, vec![IngestWarning::AmountColumnMissing { header_row: 0 }]);
    }
}
