use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A raw spreadsheet cell as handed over by the tabular decoder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Blank strings count as empty, the same as absent cells.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Stringified form used for free-text fields.
    pub fn to_display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Number(f)
    }
}

/// One row of a flat export, keyed by header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub values: HashMap<String, CellValue>,
}

impl RawRecord {
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.values.get(header)
    }
}

/// A flat export: ordered headers plus keyed rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    /// First row supplies the headers; fully blank rows are dropped.
    pub fn from_grid(grid: &[Vec<CellValue>]) -> Self {
        let mut iter = grid.iter();
        let headers: Vec<String> = match iter.next() {
            Some(row) => row.iter().map(|c| c.to_display().trim().to_string()).collect(),
            None => return RawTable::default(),
        };
        let mut rows = Vec::new();
        for r in iter {
            let mut values = HashMap::new();
            for (i, cell) in r.iter().enumerate() {
                if let Some(h) = headers.get(i) {
                    if h.is_empty() {
                        continue;
                    }
                    values.insert(h.clone(), cell.clone());
                }
            }
            if values.values().all(CellValue::is_empty) {
                continue;
            }
            rows.push(RawRecord { values });
        }
        RawTable { headers, rows }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Option<String>,
    pub date: String,
    pub account_number: String,
    pub account_name: String,
    pub description: String,
    /// Signed; always finite.
    pub amount: f64,
    pub reference: String,
    pub vendor: String,
    /// Source columns that did not map to a canonical field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, CellValue>,
}

impl Transaction {
    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroup {
    pub account_name: String,
    pub account_number: String,
    pub transactions: Vec<Transaction>,
    /// Sum of absolute amounts.
    pub total_balance: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionReason {
    OverScope,
    HighValueKeyItem,
}

impl SelectionReason {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionReason::OverScope => "OVER_SCOPE",
            SelectionReason::HighValueKeyItem => "HIGH_VALUE_KEY_ITEM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSample {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub selection_reason: SelectionReason,
    pub account_group: String,
    pub group_total_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    pub tolerable_misstatement: f64,
    pub testing_scope: f64,
    #[serde(default)]
    pub target_keywords: Vec<String>,
    /// Per-account cap; non-positive yields no samples.
    pub sample_size: i64,
}

impl SamplingConfig {
    pub fn sample_cap(&self) -> usize {
        if self.sample_size <= 0 { 0 } else { self.sample_size as usize }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingSummary {
    pub total_material_accounts: usize,
    pub total_value_tested: f64,
    pub total_material_balance: f64,
    pub coverage_percentage: f64,
    pub total_transactions_reviewed: usize,
    pub over_scope_count: usize,
    pub high_value_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingResults {
    pub samples: Vec<SelectedSample>,
    pub summary: SamplingSummary,
    pub material_accounts: Vec<AccountGroup>,
    pub filtered_transaction_count: usize,
}
