// Interbank "Banca por Internet Empresas" transfer notifications
//
// Centered summary block:
//   Número de solicitud: 123456
//   Fecha: 13/01/2026 Hora: 10:35 A.M.
// followed by `table.detail` with "Cuenta de cargo", "Para", "Monto" rows.
// There is no message field in this format.

use super::{currency_from_amount_text, currency_from_body, parse_amount, BankExtractor, Document};
use crate::movement::{Bank, Currency, RawExtraction};
use regex::Regex;
use scraper::Selector;
use std::sync::OnceLock;

const SENDER_TOKEN: &str = "interbank";
const BODY_PHRASE: &str = "interbank";

fn center_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(r#".content div[style*="text-align:center"]"#)
            .expect("invalid center selector")
    })
}

fn detail_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("table.detail").expect("invalid detail selector"))
}

fn request_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Número de solicitud:\s*(\d+)").expect("invalid request regex"))
}

fn date_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Fecha:\s*([\d/]+)\s+Hora:\s*([\d:]+\s*[AaPp]\.\s?[Mm]\.)")
            .expect("invalid date regex")
    })
}

fn masked_account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*+(\d+)").expect("invalid account regex"))
}

pub struct InterbankExtractor;

impl InterbankExtractor {
    pub fn new() -> Self {
        InterbankExtractor
    }

    /// (label, value) of each `table.detail` row
    fn detail_rows(doc: &Document) -> Vec<(String, String)> {
        doc.table_rows_in(detail_selector())
            .into_iter()
            .filter(|row| row.len() >= 2)
            .map(|mut row| {
                let value = row.swap_remove(1);
                let label = row.swap_remove(0);
                (label, value)
            })
            .collect()
    }
}

impl Default for InterbankExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl BankExtractor for InterbankExtractor {
    fn bank(&self) -> Bank {
        Bank::Interbank
    }

    fn matches_sender(&self, sender: &str) -> bool {
        sender.to_lowercase().contains(SENDER_TOKEN)
    }

    fn matches_body(&self, doc: &Document) -> bool {
        doc.text().to_lowercase().contains(BODY_PHRASE)
    }

    fn extract_currency(&self, doc: &Document) -> Option<Currency> {
        Self::detail_rows(doc)
            .into_iter()
            .find(|(label, _)| label.contains("Monto"))
            .and_then(|(_, value)| currency_from_amount_text(&value))
            .or_else(|| currency_from_body(doc.text()))
    }

    fn extract_fields(&self, doc: &Document) -> RawExtraction {
        let mut raw = RawExtraction::default();

        let center_text = doc.text_of(center_selector());

        if let Some(caps) = request_number_re().captures(&center_text) {
            raw.operation_id = caps[1].to_string();
        }

        if let Some(caps) = date_time_re().captures(&center_text) {
            raw.date_text = format!("{} - {}", &caps[1], &caps[2]);
        }

        for (label, value) in Self::detail_rows(doc) {
            if label.contains("Cuenta de cargo") {
                // "Corriente Soles **********2540" → "**********2540"
                raw.account_text = match masked_account_re().captures(&value) {
                    Some(caps) => format!("**********{}", &caps[1]),
                    None => value,
                };
            } else if label.contains("Para") {
                raw.beneficiary = value;
            } else if label.contains("Monto") {
                raw.amount = parse_amount(&value);
            }
        }

        raw
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn interbank_email() -> &'static str {
        r#"<html><body><div class="content">
            <div style="text-align:center; font-size:14px">
              <p>Número de solicitud: 4587123</p>
              <p>Fecha: 21/01/2026 Hora: 11:16 A.M.</p>
            </div>
            <table class="detail">
              <tr><td>Cuenta de
                  cargo</td><td>Corriente Soles **********2540</td></tr>
              <tr><td>Para</td><td>DISTRIBUIDORA NORTE SAC</td></tr>
              <tr><td>Monto</td><td>S/ 10,592.00</td></tr>
            </table>
            <p>Interbank - Banca por Internet Empresas</p>
        </div></body></html>"#
    }

    #[test]
    fn test_interbank_detect() {
        let doc = Document::parse("<html><body>Gracias por usar INTERBANK</body></html>");
        let ex = InterbankExtractor::new();
        assert!(ex.detect(&doc, None));
        assert!(ex.matches_sender("bancaporinternet@empresas.interbank.pe"));
        assert!(!ex.matches_sender("notificaciones@notificacionesbcp.com.pe"));
    }

    #[test]
    fn test_interbank_extract_fields() {
        let doc = Document::parse(interbank_email());
        let raw = InterbankExtractor::new().extract_fields(&doc);

        assert_eq!(raw.operation_id, "4587123");
        assert_eq!(raw.date_text, "21/01/2026 - 11:16 A.M.");
        assert_eq!(raw.account_text, "**********2540");
        assert_eq!(raw.beneficiary, "DISTRIBUIDORA NORTE SAC");
        assert_eq!(raw.amount, "10592.00".parse::<Decimal>().unwrap());
        assert_eq!(raw.message, "");
    }

    #[test]
    fn test_interbank_currency() {
        let doc = Document::parse(interbank_email());
        assert_eq!(InterbankExtractor::new().extract_currency(&doc), Some(Currency::Soles));
    }

    #[test]
    fn test_interbank_unmasked_account_kept_verbatim() {
        let html = r#"<html><body><table class="detail">
            <tr><td>Cuenta de cargo</td><td>Corriente Soles 2003001234567</td></tr>
            </table></body></html>"#;
        let raw = InterbankExtractor::new().extract_fields(&Document::parse(html));
        assert_eq!(raw.account_text, "Corriente Soles 2003001234567");
        assert_eq!(raw.operation_id, "");
        assert_eq!(raw.amount, Decimal::ZERO);
    }
}
