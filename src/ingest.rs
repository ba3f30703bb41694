use crate::columns::map_columns;
use crate::hierarchical::{IngestWarning, LedgerFormat, detect_format, parse_hierarchical};
use crate::model::{CellValue, RawTable, Transaction};
use log::info;

/// How the caller wants the grid read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    #[default]
    Auto,
    Flat,
    Hierarchical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub format: LedgerFormat,
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<IngestWarning>,
}

/// Turns a decoded sheet into transactions through whichever parser fits.
pub fn ingest_grid(grid: &[Vec<CellValue>], mode: FormatMode) -> Ingested {
    let format = match mode {
        FormatMode::Auto => detect_format(grid),
        FormatMode::Flat => LedgerFormat::Flat,
        FormatMode::Hierarchical => LedgerFormat::Hierarchical,
    };
    let ingested = match format {
        LedgerFormat::Flat => Ingested {
            format,
            transactions: map_columns(&RawTable::from_grid(grid)),
            warnings: Vec::new(),
        },
        LedgerFormat::Hierarchical => {
            let parsed = parse_hierarchical(grid);
            Ingested { format, transactions: parsed.transactions, warnings: parsed.warnings }
        }
    };
    info!("read {} transactions as {:?} ledger", ingested.transactions.len(), ingested.format);
    ingested
}
