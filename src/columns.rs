//! Header auto-detection for flat ledger exports.

use crate::model::{CellValue, RawRecord, RawTable, Transaction};
use crate::normalize::{amount_from_cell, date_from_cell};
use log::debug;
use std::collections::BTreeMap;

// Variants are tried in order; earlier entries win.
const DATE_CANDS: &[&str] = &["date", "transaction date", "posting date", "trans date", "entry date", "gl date"];
const ACCOUNT_NUMBER_CANDS: &[&str] = &[
    "account number", "account no", "account #", "acct number", "acct no", "acct #", "account code",
    "account id", "gl code",
];
const ACCOUNT_NAME_CANDS: &[&str] = &[
    "account name", "account description", "account title", "acct name", "gl account", "account",
];
const AMOUNT_CANDS: &[&str] = &["amount", "net amount", "value", "debit", "balance", "total"];
const DESCRIPTION_CANDS: &[&str] = &["description", "memo", "narrative", "details", "particulars", "comment"];
const REFERENCE_CANDS: &[&str] = &["reference", "ref", "document number", "doc no", "voucher", "journal", "check no"];
// No bare "name": it would pick up "Account Name".
const VENDOR_CANDS: &[&str] = &["vendor", "supplier", "payee", "customer"];
// Only exact header names; "id" would otherwise match "paid", "valid", ...
const ID_CANDS: &[&str] = &["id", "transaction id", "txn id"];

/// Resolved header for each canonical field. `None` leaves the field empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    pub id: Option<String>,
    pub date: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub amount: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub vendor: Option<String>,
}

impl ColumnMapping {
    pub fn detect(headers: &[String]) -> Self {
        let id = headers
            .iter()
            .find(|h| {
                let l = h.trim().to_lowercase();
                ID_CANDS.iter().any(|c| l == *c)
            })
            .cloned();
        let mapping = ColumnMapping {
            id,
            date: find_col(headers, DATE_CANDS),
            account_number: find_col(headers, ACCOUNT_NUMBER_CANDS),
            account_name: find_col(headers, ACCOUNT_NAME_CANDS),
            amount: find_col(headers, AMOUNT_CANDS),
            description: find_col(headers, DESCRIPTION_CANDS),
            reference: find_col(headers, REFERENCE_CANDS),
            vendor: find_col(headers, VENDOR_CANDS),
        };
        debug!("column mapping: {mapping:?}");
        mapping
    }

    fn is_mapped(&self, header: &str) -> bool {
        [
            &self.id,
            &self.date,
            &self.account_number,
            &self.account_name,
            &self.amount,
            &self.description,
            &self.reference,
            &self.vendor,
        ]
        .iter()
        .any(|c| c.as_deref() == Some(header))
    }
}

/// First header equal to, or containing, the earliest matching variant.
pub fn find_col(headers: &[String], cands: &[&str]) -> Option<String> {
    cands.iter().find_map(|c| {
        headers
            .iter()
            .find(|h| {
                let l = h.trim().to_lowercase();
                l == *c || l.contains(c)
            })
            .cloned()
    })
}

fn cell<'a>(r: &'a RawRecord, col: &Option<String>) -> Option<&'a CellValue> {
    col.as_deref().and_then(|c| r.get(c))
}

fn text_of(values: Option<&CellValue>) -> String {
    values.map(CellValue::to_display).map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Maps every row of a flat export onto canonical transactions. Unmapped
/// columns are carried in `extra`.
pub fn map_columns(data: &RawTable) -> Vec<Transaction> {
    if data.rows.is_empty() {
        return Vec::new();
    }
    let m = ColumnMapping::detect(&data.headers);

    data.rows
        .iter()
        .map(|r| {
            let extra: BTreeMap<String, CellValue> = r
                .values
                .iter()
                .filter(|(h, _)| !m.is_mapped(h))
                .map(|(h, v)| (h.clone(), v.clone()))
                .collect();
            let id = Some(text_of(cell(r, &m.id))).filter(|s| !s.is_empty());
            Transaction {
                id,
                date: cell(r, &m.date).map(date_from_cell).unwrap_or_default(),
                account_number: text_of(cell(r, &m.account_number)),
                account_name: text_of(cell(r, &m.account_name)),
                description: text_of(cell(r, &m.description)),
                amount: cell(r, &m.amount).map(amount_from_cell).unwrap_or(0.0),
                reference: text_of(cell(r, &m.reference)),
                vendor: text_of(cell(r, &m.vendor)),
                extra,
            }
        })
        .collect()
}
