// In-memory workbook: ordered month sections made of sparse cells

use super::{COLUMN_HEADERS, HEADER_ROW};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::{month_name, Bank, Currency, MONTH_NAMES};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CELLS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
}

impl CellValue {
    /// Text cell, or Empty for an empty string
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    /// Whitespace-only text counts as blank
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Display form; numbers render without coercion tricks
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(d) => d.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    /// Spreadsheet number format ("@" = text)
    pub num_fmt: Option<String>,
}

// ============================================================================
// WORKSHEET (one ledger section)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
}

static EMPTY_VALUE: CellValue = CellValue::Empty;

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Worksheet {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cell(row, col).map_or(&EMPTY_VALUE, |c| &c.value)
    }

    pub fn value_text(&self, row: u32, col: u32) -> String {
        self.value(row, col).as_text()
    }

    /// Set a value, keeping the cell's existing number format
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.cells.entry((row, col)).or_default().value = value;
    }

    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn set_num_fmt(&mut self, row: u32, col: u32, num_fmt: &str) {
        self.cells.entry((row, col)).or_default().num_fmt = Some(num_fmt.to_string());
    }

    /// Highest row holding any cell (formatted blanks included), 0 when empty
    pub fn row_count(&self) -> u32 {
        self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0)
    }

    /// True when columns `1..=cols` of `row` are all blank
    pub fn is_row_blank(&self, row: u32, cols: u32) -> bool {
        (1..=cols).all(|col| self.value(row, col).is_blank())
    }

    /// Distinct rows holding at least one cell, ascending
    pub fn rows(&self) -> impl Iterator<Item = u32> + '_ {
        let mut last = None;
        self.cells.keys().filter_map(move |(row, _)| {
            if last == Some(*row) {
                None
            } else {
                last = Some(*row);
                Some(*row)
            }
        })
    }

    /// All cells in (row, col) order
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        self.cells.iter().map(|((row, col), cell)| (*row, *col, cell))
    }

    /// Replace `{MES}`, `{AÑO}`, `{BANK}`, `{CURRENCY}` in every text cell
    pub fn replace_placeholders(&mut self, month: &str, year: i32, bank: Bank, currency: Currency) {
        let year = year.to_string();
        for cell in self.cells.values_mut() {
            if let CellValue::Text(text) = &mut cell.value {
                if text.contains('{') {
                    *text = text
                        .replace("{MES}", month)
                        .replace("{AÑO}", &year)
                        .replace("{BANK}", bank.name())
                        .replace("{CURRENCY}", currency.name());
                }
            }
        }
    }
}

// ============================================================================
// WORKBOOK (one ledger store)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook { sheets: Vec::new() }
    }

    /// Blank ledger with the twelve month sections and their header block
    pub fn template() -> Self {
        let mut workbook = Workbook::new();
        for month in MONTH_NAMES {
            let mut ws = Worksheet::new(month);
            ws.set_value(1, 1, CellValue::text("MOVIMIENTOS DE BANCO {BANK} {CURRENCY}"));
            ws.set_value(2, 1, CellValue::text("MES:"));
            ws.set_value(2, 2, CellValue::text("{MES}"));
            ws.set_value(3, 1, CellValue::text("AÑO:"));
            ws.set_value(3, 2, CellValue::text("{AÑO}"));
            ws.set_value(4, 1, CellValue::text("SALDO INICIAL:"));
            for (idx, header) in COLUMN_HEADERS.iter().enumerate() {
                ws.set_value(HEADER_ROW, idx as u32 + 1, CellValue::text(*header));
            }
            workbook.add_sheet(ws);
        }
        workbook
    }

    pub fn add_sheet(&mut self, sheet: Worksheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Case-insensitive exact name lookup
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|ws| ws.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|ws| ws.name.eq_ignore_ascii_case(name))
    }

    /// Section for a month (1-12)
    pub fn find_section(&mut self, month: u32) -> LedgerResult<&mut Worksheet> {
        let name = month_name(month).ok_or(LedgerError::InvalidMonth(month))?;
        self.sheet_mut(name).ok_or_else(|| LedgerError::SectionNotFound {
            month: name.to_string(),
        })
    }

    /// Find the month section and fill its header placeholders
    pub fn prepare_section(
        &mut self,
        month: u32,
        year: i32,
        bank: Bank,
        currency: Currency,
    ) -> LedgerResult<&mut Worksheet> {
        let section = self.find_section(month)?;
        let name = month_name(month).unwrap_or_default();
        section.replace_placeholders(name, year, bank, currency);
        Ok(section)
    }
}

// ============================================================================
// TESTS
// ============================================================================
