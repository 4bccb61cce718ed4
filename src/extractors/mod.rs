// 🏗️ Extractor Framework - one implementation per bank notification format
// Detect → extract currency → extract the six raw fields
//
// Extractors are best-effort: a label that drifted in the bank's markup
// degrades one field to empty/zero, it never fails the document.

pub mod bcp;
pub mod interbank;

pub use bcp::BcpExtractor;
pub use interbank::InterbankExtractor;

use crate::movement::{Bank, Currency, RawExtraction};
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

// ============================================================================
// DOCUMENT
// ============================================================================

/// Document - parsed notification body
///
/// Parsed once and shared by every extractor's `detect` during registry lookup.
pub struct Document {
    html: Html,
    text: String,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        let html = Html::parse_document(body);
        let raw_text = match html.select(body_selector()).next() {
            Some(body) => body.text().collect::<Vec<_>>().join(" "),
            None => html.root_element().text().collect::<Vec<_>>().join(" "),
        };
        let text = clean_text(&raw_text);
        Document { html, text }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Body text with whitespace collapsed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Every `<tr>` as its direct `td`/`th` cells (text cleaned).
    /// Rows where every cell is empty are skipped.
    pub fn table_rows(&self) -> Vec<Vec<String>> {
        rows_of(self.html.select(tr_selector()))
    }

    /// Rows of the tables matching `table_selector` only
    pub fn table_rows_in(&self, table_selector: &Selector) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for table in self.html.select(table_selector) {
            rows.extend(rows_of(table.select(tr_selector())));
        }
        rows
    }

    /// Concatenated text of every element matching `selector`
    pub fn text_of(&self, selector: &Selector) -> String {
        let parts: Vec<String> = self
            .html
            .select(selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .collect();
        clean_text(&parts.join(" "))
    }
}

fn rows_of<'a>(trs: impl Iterator<Item = ElementRef<'a>>) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for tr in trs {
        let row = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| {
                let name = cell.value().name();
                name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
            })
            .map(|cell| clean_text(&cell.text().collect::<Vec<_>>().join(" ")))
            .collect::<Vec<_>>();
        if row.iter().any(|c| !c.is_empty()) {
            rows.push(row);
        }
    }
    rows
}

// ============================================================================
// EXTRACTOR TRAIT
// ============================================================================

/// BankExtractor - capability set every bank format provides
///
/// Agregar un banco: implementar este trait y registrarlo en el
/// `ParserRegistry`. Ningún extractor existente cambia.
pub trait BankExtractor: Send + Sync {
    /// Bank this extractor handles
    fn bank(&self) -> Bank;

    /// Sender address contains the bank's token (cheap, high precision)
    fn matches_sender(&self, sender: &str) -> bool;

    /// Body text contains an identifying phrase (fallback)
    fn matches_body(&self, doc: &Document) -> bool;

    /// Sender first, then body text
    fn detect(&self, doc: &Document, sender: Option<&str>) -> bool {
        sender.map_or(false, |s| self.matches_sender(s)) || self.matches_body(doc)
    }

    /// Currency of the movement; `None` when absent or ambiguous
    fn extract_currency(&self, doc: &Document) -> Option<Currency>;

    /// Pull the raw fields; missing fields come back empty (amount 0)
    fn extract_fields(&self, doc: &Document) -> RawExtraction;

    /// Extractor version (for logging)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("invalid amount regex"))
}

fn body_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("body").expect("invalid body selector"))
}

fn tr_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("invalid tr selector"))
}

/// Collapse runs of whitespace (including &nbsp;) into single spaces
pub fn clean_text(s: &str) -> String {
    let s = s.replace('\u{a0}', " ");
    ws_re().replace_all(s.trim(), " ").trim().to_string()
}

/// First number in `text` with thousands separators removed.
///
/// "S/ 10,592.00" → 10592.00, "S/. 300.00" → 300.00, "" → 0
pub fn parse_amount(text: &str) -> Decimal {
    amount_re()
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO)
}

/// Currency from the symbol written next to an amount ("S/ 300.00", "US$ 25.00")
pub fn currency_from_amount_text(text: &str) -> Option<Currency> {
    let upper = text.to_uppercase();
    if upper.contains("US$") || upper.contains("USD") || upper.contains('$') {
        return Some(Currency::Dolares);
    }
    if upper.contains("S/") || upper.contains("PEN") {
        return Some(Currency::Soles);
    }
    None
}

/// Currency from markers anywhere in the body text.
/// Both currencies present counts as ambiguous.
pub fn currency_from_body(text: &str) -> Option<Currency> {
    let soles = text.contains("Soles") || text.contains("S/");
    let dolares = text.contains("Dólares")
        || text.contains("Dolares")
        || text.contains("USD")
        || text.contains("US$");

    match (soles, dolares) {
        (true, false) => Some(Currency::Soles),
        (false, true) => Some(Currency::Dolares),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
