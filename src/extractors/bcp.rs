// BCP notification e-mails ("Constancia de ... - Banca por Internet")
//
// Layout: label/value rows, usually [spacer, label, spacer, value]:
//   Fecha y hora         | 13/01/2026 - 10:35 a. m.
//   Número de operación  | 00061864
//   Cuenta               | 194-XXXXXX4-0-19      (Datos de origen)
//   Cuenta               | ...                   (Datos de destino, ignored)
//   Beneficiario         | PULSO CORPORACION ...
//   Monto                | S/ 218.30
//   Mensaje              | PAGO DE EMO ...

use super::{currency_from_amount_text, currency_from_body, parse_amount, BankExtractor, Document};
use crate::movement::{Bank, Currency, RawExtraction};

const SENDER_TOKEN: &str = "bcp";
const BODY_PHRASES: [&str; 2] = ["BCP", "Banco de Crédito"];

const LABEL_DATE: &str = "Fecha y hora";
const LABEL_OPERATION: &str = "Número de operación";
const LABEL_ACCOUNT: &str = "Cuenta";
const LABEL_BENEFICIARY: &str = "Beneficiario";
const LABEL_AMOUNT: &str = "Monto";
const LABEL_MESSAGE: &str = "Mensaje";

pub struct BcpExtractor;

impl BcpExtractor {
    pub fn new() -> Self {
        BcpExtractor
    }

    /// (label, value) pairs: first non-empty cell is the label, the next one the value
    fn label_values(doc: &Document) -> Vec<(String, String)> {
        doc.table_rows()
            .into_iter()
            .filter(|row| row.len() >= 2)
            .filter_map(|row| {
                // Separator cells (":") count as empty
                let mut cells = row
                    .into_iter()
                    .filter(|c| !c.trim_matches(':').trim().is_empty());
                let label = cells.next()?.trim_end_matches(':').trim().to_string();
                let value = cells.next().unwrap_or_default();
                Some((label, value))
            })
            .collect()
    }
}

impl Default for BcpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl BankExtractor for BcpExtractor {
    fn bank(&self) -> Bank {
        Bank::Bcp
    }

    fn matches_sender(&self, sender: &str) -> bool {
        sender.to_lowercase().contains(SENDER_TOKEN)
    }

    fn matches_body(&self, doc: &Document) -> bool {
        BODY_PHRASES.iter().any(|p| doc.text().contains(p))
    }

    fn extract_currency(&self, doc: &Document) -> Option<Currency> {
        let amount_text = Self::label_values(doc)
            .into_iter()
            .find(|(label, _)| label == LABEL_AMOUNT)
            .map(|(_, value)| value);

        amount_text
            .and_then(|v| currency_from_amount_text(&v))
            .or_else(|| currency_from_body(doc.text()))
    }

    fn extract_fields(&self, doc: &Document) -> RawExtraction {
        let mut raw = RawExtraction::default();

        for (label, value) in Self::label_values(doc) {
            match label.as_str() {
                LABEL_DATE => raw.date_text = value,
                LABEL_OPERATION => raw.operation_id = value,
                // First "Cuenta" is the origin account
                LABEL_ACCOUNT if raw.account_text.is_empty() => raw.account_text = value,
                LABEL_BENEFICIARY => raw.beneficiary = value,
                LABEL_AMOUNT => raw.amount = parse_amount(&value),
                LABEL_MESSAGE => raw.message = value,
                _ => {}
            }
        }

        raw
    }
}

// ============================================================================
// TESTS
// ============================================================================
