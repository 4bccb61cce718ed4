// 📒 Ledger - one store per (bank, currency, year), one section per month
//
// Physical layout (1-indexed, must stay compatible with existing files):
//   rows 1-6   header block (title, month/year placeholders, column headers)
//   rows 7..   data rows
//   columns    FECHA | DETALLE | CARGOS | ABONOS | SALDOS | NUM OP | OBSERVACION | DOCUMENTO

pub mod export;
pub mod merge;
pub mod store;
pub mod workbook;

pub use export::{export_section_csv, export_section_to_path};
pub use merge::{sort_by_date, DedupOutcome, ExistingIndex, MergeEngine, MergeReport};
pub use store::{LedgerEvent, LedgerStore};
pub use workbook::{Cell, CellValue, Workbook, Worksheet};

pub const COL_DATE: u32 = 1;
pub const COL_DETAIL: u32 = 2;
pub const COL_DEBIT: u32 = 3;
pub const COL_CREDIT: u32 = 4;
pub const COL_BALANCE: u32 = 5;
pub const COL_OPERATION: u32 = 6;
/// Counterparty / beneficiary
pub const COL_NOTE: u32 = 7;
/// Message
pub const COL_DOCUMENT: u32 = 8;

pub const COLUMN_COUNT: u32 = 8;

pub const COLUMN_HEADERS: [&str; 8] = [
    "FECHA",
    "DETALLE",
    "CARGOS",
    "ABONOS",
    "SALDOS",
    "NUM OP",
    "OBSERVACION",
    "DOCUMENTO",
];

/// Row holding the column headers
pub const HEADER_ROW: u32 = 6;

/// First data row
pub const DATA_START_ROW: u32 = 7;

/// Spreadsheet "text" number format; operation ids are never coerced to numbers
pub const TEXT_FORMAT: &str = "@";
