// 🧹 Normalization - RawExtraction → Statement
// Date is the routing key: a movement whose date can't be parsed is rejected,
// never filed under "the current month".

use crate::error::ParseError;
use crate::movement::{Bank, Currency, Movement, RawExtraction, Statement};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Normalization options taken from settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Used only when the extractor found no currency marker.
    /// `None` leaves the statement undetected (skipped downstream).
    pub fallback_currency: Option<Currency>,
}

fn leading_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2}/\d{1,2}/\d{4})").expect("invalid date regex"))
}

/// Date part of a "dd/mm/yyyy - hh:mm" string
///
/// - "13/01/2026 - 10:35 a. m." → "13/01/2026"
/// - anything without a leading date is returned unchanged
pub fn extract_date_only(date_time: &str) -> &str {
    let trimmed = date_time.trim();
    match leading_date_re().captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    }
}

/// Parse a `dd/mm/yyyy` date
pub fn parse_movement_date(bank: Bank, text: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(text, "%d/%m/%Y").map_err(|_| ParseError::MalformedDate {
        bank,
        text: text.to_string(),
    })
}

/// Build the single-movement statement for one document
pub fn normalize(
    raw: RawExtraction,
    bank: Bank,
    opts: &NormalizeOptions,
) -> Result<Statement, ParseError> {
    let date = parse_movement_date(bank, extract_date_only(&raw.date_text))?;

    let amount = if raw.amount > Decimal::ZERO {
        Some(raw.amount)
    } else {
        None
    };

    let movement = Movement {
        date,
        account_or_detail: raw.account_text.clone(),
        amount,
        credit_amount: None,
        balance: None,
        operation_id: raw.operation_id.trim().to_string(),
        counterparty: raw.beneficiary,
        note: raw.message,
    };

    Ok(Statement {
        bank,
        currency: raw.currency_hint.or(opts.fallback_currency),
        account_number: raw.account_text,
        month: date.month(),
        year: date.year(),
        movements: vec![movement],
    })
}

// ============================================================================
// TESTS
// ============================================================================
