//! Cell coercion and id assignment shared by both ingest paths.

use crate::model::{CellValue, Transaction};
use chrono::{Duration, NaiveDate};
use log::debug;
use std::collections::HashSet;

/// Parses a currency string. `$` and `,` are stripped and `(123)` reads as
/// `-123`. Anything unparseable, or non-finite, becomes 0.
pub fn parse_amount(s: &str) -> f64 {
    let mut t = s.trim().replace([',', '$'], "");
    let has_paren = t.starts_with('(') && t.ends_with(')');
    if has_paren {
        t = t.trim_matches(|c: char| c == '(' || c == ')').trim().to_string();
    }
    let v = t.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0);
    if has_paren { -v } else { v }
}

pub fn amount_from_cell(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(f) if f.is_finite() => *f,
        CellValue::Number(_) => 0.0,
        CellValue::Text(s) => parse_amount(s),
        CellValue::Empty => 0.0,
    }
}

/// Spreadsheet serial date (1899-12-30 epoch) as `YYYY-MM-DD`.
pub fn serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = serial.floor() as i64;
    let date = base.checked_add_signed(Duration::try_days(days)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Numbers are serial dates; text is kept verbatim.
pub fn date_from_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Number(f) => serial_to_date(*f).unwrap_or_else(|| cell.to_display()),
        _ => cell.to_display(),
    }
}

/// Run-scoped id source: `TXN-000001`, `TXN-000002`, ...
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    next: u64,
    taken: HashSet<String>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::with_prefix("TXN")
    }
}

impl IdGenerator {
    pub fn with_prefix(prefix: &str) -> Self {
        Self { prefix: prefix.to_string(), next: 1, taken: HashSet::new() }
    }

    /// Marks an id as used so it is never handed out.
    pub fn reserve(&mut self, id: &str) {
        self.taken.insert(id.to_string());
    }

    pub fn next_id(&mut self) -> String {
        loop {
            let candidate = format!("{}-{:06}", self.prefix, self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn has_id(t: &Transaction) -> bool {
    t.id.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Gives every transaction without an id a fresh one. Existing ids are
/// left alone and reserved first.
pub fn backfill_ids(transactions: Vec<Transaction>, ids: &mut IdGenerator) -> Vec<Transaction> {
    for t in transactions.iter().filter(|t| has_id(t)) {
        if let Some(id) = &t.id {
            ids.reserve(id);
        }
    }
    let mut assigned = 0usize;
    let out: Vec<Transaction> = transactions
        .into_iter()
        .map(|mut t| {
            if !has_id(&t) {
                t.id = Some(ids.next_id());
                assigned += 1;
            }
            t
        })
        .collect();
    debug!("backfilled {assigned} transaction ids");
    out
}
