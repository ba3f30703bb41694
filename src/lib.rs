//! General-ledger audit sampling: material-account selection and
//! priority-based sample extraction.
//!
//! Pipeline: decoded sheet -> column mapping or hierarchical parse ->
//! id backfill -> keyword filter -> account aggregation -> materiality ->
//! per-account selection -> summary. See DESIGN.md for the rules.

pub mod columns;
pub mod hierarchical;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod sampling;

pub use columns::{ColumnMapping, map_columns};
pub use hierarchical::{IngestWarning, LedgerFormat, detect_format, parse_hierarchical};
pub use ingest::{FormatMode, Ingested, ingest_grid};
pub use model::{
    AccountGroup, CellValue, RawRecord, RawTable, SamplingConfig, SamplingResults, SamplingSummary, SelectedSample,
    SelectionReason, Transaction,
};
pub use normalize::{IdGenerator, backfill_ids, parse_amount};
pub use sampling::{aggregate_accounts, filter_by_keywords, material_accounts, run_sampling, select_samples, summarize};
