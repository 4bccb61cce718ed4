// End-to-end import: .eml files on disk → SQLite ledgers

use movimientos::ledger::{CellValue, LedgerStore, COL_DATE, COL_DEBIT, COL_DETAIL, COL_DOCUMENT, COL_NOTE, COL_OPERATION};
use movimientos::{load_documents, Bank, Currency, Pipeline, Settings, Workbook};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BCP_SENDER: &str = "notificaciones@notificacionesbcp.com.pe";
const INTERBANK_SENDER: &str = "bancaporinternet@empresas.interbank.pe";

fn eml(sender: &str, html: &str) -> String {
    format!(
        "From: Notificaciones <{sender}>\r\n\
         Subject: Constancia\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         \r\n\
         {html}\r\n"
    )
}

fn bcp_html(date_time: &str, op: &str, amount: &str, beneficiary: &str) -> String {
    format!(
        "<html><body><p>Banca por Internet BCP</p><table>\
         <tr><td></td><td>Fecha y hora</td><td>:</td><td><b>{date_time}</b></td></tr>\
         <tr><td></td><td>Número de operación</td><td>:</td><td>{op}</td></tr>\
         <tr><td></td><td>Cuenta</td><td>:</td><td>194-XXXXXX4-0-19</td></tr>\
         <tr><td></td><td>Beneficiario</td><td>:</td><td>{beneficiary}</td></tr>\
         <tr><td></td><td>Monto</td><td>:</td><td>{amount}</td></tr>\
         <tr><td></td><td>Mensaje</td><td>:</td><td>PAGO FACTURA</td></tr>\
         </table></body></html>"
    )
}

fn interbank_html(request: &str, date: &str, amount: &str) -> String {
    format!(
        r#"<html><body><div class="content">
        <div style="text-align:center">Número de solicitud: {request}<br>Fecha: {date} Hora: 03:40 P.M.</div>
        <table class="detail">
        <tr><td>Cuenta de cargo</td><td>Corriente Soles **********2540</td></tr>
        <tr><td>Para</td><td>SERVICIOS GENERALES SAC</td></tr>
        <tr><td>Monto</td><td>{amount}</td></tr>
        </table><p>Interbank</p></div></body></html>"#
    )
}

fn write_mail(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn settings_for(ledgers: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.ledger.store_dir = ledgers.path().to_path_buf();
    settings
}

fn import(inbox: &Path, settings: &Settings) -> movimientos::RunSummary {
    let loaded = load_documents(inbox, |s| settings.is_sender_allowed(s)).unwrap();
    Pipeline::new(settings.clone()).run(&loaded.documents)
}

fn load(settings: &Settings, bank: Bank, currency: Currency, year: i32) -> Workbook {
    let path = settings.ledger_path(bank, currency, year, false);
    LedgerStore::open(&path).unwrap().load_workbook().unwrap().unwrap()
}

#[test]
fn test_import_creates_monthly_ledgers() {
    let inbox = TempDir::new().unwrap();
    let ledgers = TempDir::new().unwrap();
    let settings = settings_for(&ledgers);

    write_mail(
        inbox.path(),
        "01.eml",
        &eml(BCP_SENDER, &bcp_html("13/01/2026 - 10:35 a. m.", "00061864", "S/ 218.30", "PULSO CORPORACION")),
    );
    write_mail(
        inbox.path(),
        "02.eml",
        &eml(BCP_SENDER, &bcp_html("02/02/2026 - 09:00 a. m.", "00070001", "S/ 1,250.00", "ALQUILERES SAC")),
    );
    write_mail(
        inbox.path(),
        "03.eml",
        &eml(INTERBANK_SENDER, &interbank_html("998877", "20/01/2026", "S/ 50.00")),
    );
    write_mail(inbox.path(), "04.eml", &eml("promo@tienda.pe", "<html><body>Oferta BCP</body></html>"));

    let summary = import(inbox.path(), &settings);

    assert_eq!(summary.parse.documents, 3);
    assert_eq!(summary.parse.parsed, 3);
    assert_eq!(summary.units.len(), 2);
    assert_eq!(summary.written(), 3);

    let bcp = load(&settings, Bank::Bcp, Currency::Soles, 2026);
    let enero = bcp.sheet("ENERO").unwrap();
    assert_eq!(enero.value(2, 2).as_text(), "ENERO");
    assert_eq!(enero.value(7, COL_DATE).as_text(), "13/01/2026");
    assert_eq!(enero.value(7, COL_DETAIL).as_text(), "194-XXXXXX4-0-19");
    assert_eq!(enero.value(7, COL_DEBIT), &CellValue::Number("218.30".parse().unwrap()));
    assert_eq!(enero.value(7, COL_OPERATION), &CellValue::Text("00061864".to_string()));
    assert_eq!(enero.value(7, COL_NOTE).as_text(), "PULSO CORPORACION");
    assert_eq!(enero.value(7, COL_DOCUMENT).as_text(), "PAGO FACTURA");

    let febrero = bcp.sheet("FEBRERO").unwrap();
    assert_eq!(febrero.value(7, COL_DEBIT), &CellValue::Number("1250.00".parse().unwrap()));

    let interbank = load(&settings, Bank::Interbank, Currency::Soles, 2026);
    let enero = interbank.sheet("ENERO").unwrap();
    assert_eq!(enero.value(7, COL_DATE).as_text(), "20/01/2026");
    assert_eq!(enero.value(7, COL_DETAIL).as_text(), "**********2540");
    assert_eq!(enero.value(7, COL_OPERATION).as_text(), "998877");
}

#[test]
fn test_reimport_is_idempotent() {
    let inbox = TempDir::new().unwrap();
    let ledgers = TempDir::new().unwrap();
    let settings = settings_for(&ledgers);

    for (i, op) in ["101", "102", "103"].iter().enumerate() {
        let date = format!("{:02}/03/2026 - 11:00 a. m.", 10 - i);
        write_mail(
            inbox.path(),
            &format!("{}.eml", op),
            &eml(BCP_SENDER, &bcp_html(&date, op, "US$ 10.00", "PROVEEDOR")),
        );
    }

    let first = import(inbox.path(), &settings);
    let after_first = load(&settings, Bank::Bcp, Currency::Dolares, 2026);
    let second = import(inbox.path(), &settings);
    let after_second = load(&settings, Bank::Bcp, Currency::Dolares, 2026);

    assert_eq!(first.written(), 3);
    assert_eq!(second.written(), 0);
    let report = &second.units[0].result.as_ref().unwrap()[0].report;
    assert_eq!(report.skipped_duplicates, 3);
    assert_eq!(after_first, after_second);

    // Rows sorted by date: 08, 09, 10
    let marzo = after_first.sheet("MARZO").unwrap();
    assert_eq!(marzo.value(7, COL_OPERATION).as_text(), "103");
    assert_eq!(marzo.value(8, COL_OPERATION).as_text(), "102");
    assert_eq!(marzo.value(9, COL_OPERATION).as_text(), "101");
}

#[test]
fn test_cleared_rows_are_refilled() {
    let inbox = TempDir::new().unwrap();
    let ledgers = TempDir::new().unwrap();
    let settings = settings_for(&ledgers);

    write_mail(
        inbox.path(),
        "a.eml",
        &eml(BCP_SENDER, &bcp_html("05/04/2026 - 08:00 a. m.", "1", "S/ 1.00", "A")),
    );
    write_mail(
        inbox.path(),
        "b.eml",
        &eml(BCP_SENDER, &bcp_html("06/04/2026 - 08:00 a. m.", "2", "S/ 2.00", "B")),
    );
    import(inbox.path(), &settings);

    // Operator clears row 7 by hand
    let path = settings.ledger_path(Bank::Bcp, Currency::Soles, 2026, false);
    let mut store = LedgerStore::open(&path).unwrap();
    let mut workbook = store.load_workbook().unwrap().unwrap();
    let abril = workbook.sheet_mut("ABRIL").unwrap();
    for col in 1..=8 {
        abril.set_value(7, col, CellValue::Empty);
    }
    store.save_workbook(&workbook, &[]).unwrap();
    drop(store);

    write_mail(
        inbox.path(),
        "c.eml",
        &eml(BCP_SENDER, &bcp_html("20/04/2026 - 08:00 a. m.", "3", "S/ 3.00", "C")),
    );
    let summary = import(inbox.path(), &settings);

    // "1" was removed from the ledger, so it comes back along with "3"
    let report = &summary.units[0].result.as_ref().unwrap()[0].report;
    assert_eq!(report.written_in_empty, 1);
    assert_eq!(report.appended, 1);
    assert_eq!(report.skipped_duplicates, 1);

    let abril = load(&settings, Bank::Bcp, Currency::Soles, 2026);
    let abril = abril.sheet("ABRIL").unwrap();
    assert_eq!(abril.value(7, COL_OPERATION).as_text(), "1");
    assert_eq!(abril.value(8, COL_OPERATION).as_text(), "2");
    assert_eq!(abril.value(9, COL_OPERATION).as_text(), "3");
}

#[test]
fn test_unrecognised_and_zero_amount_documents_write_nothing() {
    let inbox = TempDir::new().unwrap();
    let ledgers = TempDir::new().unwrap();
    let mut settings = settings_for(&ledgers);
    settings.email.allowed_senders.clear();

    write_mail(inbox.path(), "news.html", "<html><body>Boletín mensual</body></html>");
    write_mail(
        inbox.path(),
        "zero.eml",
        &eml(BCP_SENDER, &bcp_html("05/05/2026 - 08:00 a. m.", "9", "S/ 0.00", "X")),
    );

    let summary = import(inbox.path(), &settings);

    assert_eq!(summary.parse.undetected, 1);
    assert_eq!(summary.zero_amount, 1);
    assert!(summary.units.is_empty());
    assert!(fs::read_dir(ledgers.path()).unwrap().next().is_none());
}

#[test]
fn test_cleared_last_row_keeps_every_movement() {
    let inbox = TempDir::new().unwrap();
    let ledgers = TempDir::new().unwrap();
    let settings = settings_for(&ledgers);

    write_mail(
        inbox.path(),
        "a.eml",
        &eml(BCP_SENDER, &bcp_html("05/06/2026 - 08:00 a. m.", "1", "S/ 1.00", "A")),
    );
    write_mail(
        inbox.path(),
        "b.eml",
        &eml(BCP_SENDER, &bcp_html("06/06/2026 - 08:00 a. m.", "2", "S/ 2.00", "B")),
    );
    import(inbox.path(), &settings);

    // Operator clears the last row (row 8); its cells stay behind as blanks
    let path = settings.ledger_path(Bank::Bcp, Currency::Soles, 2026, false);
    let mut store = LedgerStore::open(&path).unwrap();
    let mut workbook = store.load_workbook().unwrap().unwrap();
    let junio = workbook.sheet_mut("JUNIO").unwrap();
    for col in 1..=8 {
        junio.set_value(8, col, CellValue::Empty);
    }
    store.save_workbook(&workbook, &[]).unwrap();
    drop(store);

    write_mail(
        inbox.path(),
        "c.eml",
        &eml(BCP_SENDER, &bcp_html("20/06/2026 - 08:00 a. m.", "3", "S/ 3.00", "C")),
    );
    let summary = import(inbox.path(), &settings);

    let report = &summary.units[0].result.as_ref().unwrap()[0].report;
    assert_eq!(report.written_in_empty, 0);
    assert_eq!(report.appended, 2);
    assert_eq!(report.skipped_duplicates, 1);

    let workbook = load(&settings, Bank::Bcp, Currency::Soles, 2026);
    let junio = workbook.sheet("JUNIO").unwrap();
    let ops: Vec<String> = (7..=junio.row_count())
        .map(|row| junio.value(row, COL_OPERATION).as_text())
        .filter(|op| !op.is_empty())
        .collect();
    assert_eq!(ops, vec!["1", "2", "3"]);
    assert_eq!(ops.len(), 1 + report.written());
}
