// 🔀 Merge Engine - idempotent, order-preserving append into a month section
// scan → dedup → sort → plan (fill gaps, then append) → write

use super::workbook::{CellValue, Worksheet};
use super::{
    COLUMN_COUNT, COL_DATE, COL_DEBIT, COL_DETAIL, COL_DOCUMENT, COL_NOTE, COL_OPERATION,
    DATA_START_ROW, TEXT_FORMAT,
};
use crate::movement::Movement;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// EXISTING INDEX
// ============================================================================

/// What the section already holds, built once per merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistingIndex {
    /// Trimmed operation ids already present
    pub operations: HashSet<String>,

    /// Blank rows between the data offset and the last row with data, ascending
    pub empty_rows: Vec<u32>,

    /// Last row with any data, `DATA_START_ROW - 1` when there is none
    pub last_row_with_data: u32,
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// Movements to write, in input order
    pub fresh: Vec<Movement>,

    /// Already in the section or repeated within the batch
    pub duplicates: usize,

    /// No operation id, can't be deduplicated
    pub unmergeable: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub considered: usize,
    pub existing_operations: usize,
    pub empty_slots: usize,
    pub written_in_empty: usize,
    pub appended: usize,
    pub skipped_duplicates: usize,
    pub skipped_unmergeable: usize,
}

impl MergeReport {
    pub fn written(&self) -> usize {
        self.written_in_empty + self.appended
    }
}

// ============================================================================
// MERGE ENGINE
// ============================================================================

pub struct MergeEngine {
    /// First data row (default: 7)
    pub data_start_row: u32,

    /// Column holding the dedup key (default: 6)
    pub operation_column: u32,
}

impl MergeEngine {
    /// Engine for the standard ledger layout
    pub fn new() -> Self {
        MergeEngine {
            data_start_row: DATA_START_ROW,
            operation_column: COL_OPERATION,
        }
    }

    /// Index the section's existing rows.
    ///
    /// A row is reusable only when all its ledger columns are blank, so a
    /// hand-entered row without operation id is never overwritten. Blank
    /// rows past the last row with data are left to appending.
    pub fn scan(&self, ws: &Worksheet) -> ExistingIndex {
        let mut index = ExistingIndex {
            last_row_with_data: self.data_start_row.saturating_sub(1),
            ..Default::default()
        };

        for row in self.data_start_row..=ws.row_count() {
            let op = ws.value_text(row, self.operation_column);
            let op = op.trim();
            if !op.is_empty() {
                index.operations.insert(op.to_string());
            }

            if ws.is_row_blank(row, COLUMN_COUNT) {
                index.empty_rows.push(row);
            } else {
                index.last_row_with_data = row;
            }
        }

        let last = index.last_row_with_data;
        index.empty_rows.retain(|row| *row < last);

        index
    }

    /// Drop movements already in the section or repeated in the batch (first wins)
    pub fn dedup(&self, movements: &[Movement], index: &ExistingIndex) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();
        let mut seen_in_batch: HashSet<&str> = HashSet::new();

        for movement in movements {
            if !movement.is_mergeable() {
                outcome.unmergeable += 1;
                continue;
            }

            let key = movement.dedup_key();
            if index.operations.contains(key) || !seen_in_batch.insert(key) {
                outcome.duplicates += 1;
                continue;
            }

            outcome.fresh.push(movement.clone());
        }

        outcome
    }

    /// Assign target rows: empty slots in ascending order first, then
    /// rows after the last row with data.
    pub fn plan(&self, movements: Vec<Movement>, index: &ExistingIndex) -> Vec<(u32, Movement)> {
        let mut slots = index.empty_rows.iter().copied();
        let mut next_append = index.last_row_with_data + 1;

        movements
            .into_iter()
            .map(|movement| {
                let row = slots.next().unwrap_or_else(|| {
                    let row = next_append;
                    next_append += 1;
                    row
                });
                (row, movement)
            })
            .collect()
    }

    /// Merge movements into a section. The whole plan is computed before any
    /// cell is written.
    pub fn merge(&self, ws: &mut Worksheet, movements: &[Movement]) -> MergeReport {
        let index = self.scan(ws);
        let dedup = self.dedup(movements, &index);

        let mut fresh = dedup.fresh;
        sort_by_date(&mut fresh);

        let plan = self.plan(fresh, &index);
        let empty: HashSet<u32> = index.empty_rows.iter().copied().collect();

        let mut report = MergeReport {
            considered: movements.len(),
            existing_operations: index.operations.len(),
            empty_slots: index.empty_rows.len(),
            skipped_duplicates: dedup.duplicates,
            skipped_unmergeable: dedup.unmergeable,
            ..Default::default()
        };

        for (row, movement) in &plan {
            if empty.contains(row) {
                report.written_in_empty += 1;
            } else {
                report.appended += 1;
            }
            self.write_row(ws, *row, movement);
        }

        tracing::debug!(
            section = ws.name(),
            written = report.written(),
            duplicates = report.skipped_duplicates,
            unmergeable = report.skipped_unmergeable,
            "section merged"
        );

        report
    }

    /// Credit and balance columns are left as they are.
    fn write_row(&self, ws: &mut Worksheet, row: u32, movement: &Movement) {
        ws.set_value(row, COL_DATE, CellValue::text(movement.date_text()));
        ws.set_value(row, COL_DETAIL, CellValue::text(movement.account_or_detail.as_str()));
        if let Some(amount) = movement.amount {
            ws.set_value(row, COL_DEBIT, CellValue::Number(amount));
        }
        ws.set_value(row, self.operation_column, CellValue::text(movement.dedup_key()));
        ws.set_num_fmt(row, self.operation_column, TEXT_FORMAT);
        ws.set_value(row, COL_NOTE, CellValue::text(movement.counterparty.as_str()));
        ws.set_value(row, COL_DOCUMENT, CellValue::text(movement.note.as_str()));
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Ascending by date; same-date movements keep their relative order
pub fn sort_by_date(movements: &mut [Movement]) {
    movements.sort_by_key(|m| m.date);
}

// ============================================================================
// TESTS
// ============================================================================
