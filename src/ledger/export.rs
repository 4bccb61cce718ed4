// 📤 Section export - one ledger section as CSV (header + data rows)

use super::workbook::Worksheet;
use super::{COLUMN_COUNT, COLUMN_HEADERS, DATA_START_ROW};
use crate::error::LedgerResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write the data rows of a section as CSV; blank rows are skipped.
/// Returns the number of data rows written.
pub fn export_section_csv<W: Write>(ws: &Worksheet, writer: W) -> LedgerResult<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(COLUMN_HEADERS)?;

    let mut written = 0;
    for row in ws.rows().filter(|row| *row >= DATA_START_ROW) {
        if ws.is_row_blank(row, COLUMN_COUNT) {
            continue;
        }
        let record: Vec<String> = (1..=COLUMN_COUNT)
            .map(|col| ws.value_text(row, col))
            .collect();
        wtr.write_record(&record)?;
        written += 1;
    }

    wtr.flush()?;
    Ok(written)
}

pub fn export_section_to_path(ws: &Worksheet, path: &Path) -> LedgerResult<usize> {
    let file = File::create(path)?;
    export_section_csv(ws, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CellValue, COL_DATE, COL_DEBIT, COL_OPERATION};
    use rust_decimal::Decimal;

    #[test]
    fn test_export_skips_blank_rows() {
        let mut ws = Worksheet::new("ENERO");
        ws.set_value(7, COL_DATE, CellValue::text("05/01/2026"));
        ws.set_value(7, COL_DEBIT, CellValue::Number("300.00".parse::<Decimal>().unwrap()));
        ws.set_value(7, COL_OPERATION, CellValue::text("00012345"));
        ws.set_num_fmt(8, COL_OPERATION, "@");
        ws.set_value(9, COL_DATE, CellValue::text("06/01/2026"));

        let mut out = Vec::new();
        let written = export_section_csv(&ws, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 2);
        assert_eq!(lines[0], "FECHA,DETALLE,CARGOS,ABONOS,SALDOS,NUM OP,OBSERVACION,DOCUMENTO");
        assert_eq!(lines[1], "05/01/2026,,300.00,,,00012345,,");
        assert_eq!(lines[2], "06/01/2026,,,,,,,");
    }

    #[test]
    fn test_export_empty_section_writes_header_only() {
        let ws = Worksheet::new("MAYO");
        let mut out = Vec::new();
        assert_eq!(export_section_csv(&ws, &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
