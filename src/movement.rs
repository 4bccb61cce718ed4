// 💸 Movement Model - canonical ledger entry
// RawExtraction (per document) → Movement → Statement (per bank/currency/month)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// INSTITUTIONS & CURRENCIES
// ============================================================================

/// Bank - Identifica qué banco envió la notificación
///
/// Adding a bank means adding a variant here plus an extractor registered
/// in the `ParserRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bank {
    Bcp,
    Interbank,
}

impl Bank {
    /// Name used in ledger file names and section placeholders
    pub fn name(&self) -> &'static str {
        match self {
            Bank::Bcp => "BCP",
            Bank::Interbank => "INTERBANK",
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BCP" => Ok(Bank::Bcp),
            "INTERBANK" => Ok(Bank::Interbank),
            other => Err(format!("unknown bank: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Soles,
    Dolares,
}

impl Currency {
    pub fn name(&self) -> &'static str {
        match self {
            Currency::Soles => "SOLES",
            Currency::Dolares => "DOLARES",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SOLES" | "PEN" => Ok(Currency::Soles),
            "DOLARES" | "DÓLARES" | "USD" => Ok(Currency::Dolares),
            other => Err(format!("unknown currency: {}", other)),
        }
    }
}

// ============================================================================
// MONTHS
// ============================================================================

/// Section names, one per month, in calendar order
pub const MONTH_NAMES: [&str; 12] = [
    "ENERO", "FEBRERO", "MARZO", "ABRIL", "MAYO", "JUNIO",
    "JULIO", "AGOSTO", "SEPTIEMBRE", "OCTUBRE", "NOVIEMBRE", "DICIEMBRE",
];

/// Month number (1-12) → section name
pub fn month_name(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_NAMES[(month - 1) as usize])
    } else {
        None
    }
}

/// Section name → month number (case-insensitive)
pub fn month_from_name(name: &str) -> Option<u32> {
    let needle = name.trim();
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(needle))
        .map(|idx| idx as u32 + 1)
}

// ============================================================================
// RAW EXTRACTION
// ============================================================================

/// RawExtraction - Output of extractor.extract_fields()
/// Cualquier campo puede venir vacío: los extractores nunca fallan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// "Fecha y hora" as written in the document, e.g. "13/01/2026 - 10:35 a. m."
    pub date_text: String,
    /// Source account descriptor
    pub account_text: String,
    /// Amount with currency symbols and separators already stripped (0 when absent)
    pub amount: Decimal,
    pub operation_id: String,
    pub beneficiary: String,
    pub message: String,
    pub currency_hint: Option<Currency>,
}

// ============================================================================
// MOVEMENT
// ============================================================================

/// Movement - one row of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub account_or_detail: String,
    /// Debit ("cargo")
    pub amount: Option<Decimal>,
    /// Credit ("abono"), never populated by extraction
    pub credit_amount: Option<Decimal>,
    /// Running balance ("saldo"), never populated by extraction
    pub balance: Option<Decimal>,
    /// Dedup key, kept verbatim (leading zeros included)
    pub operation_id: String,
    pub counterparty: String,
    pub note: String,
}

impl Movement {
    pub fn new(date: NaiveDate, operation_id: impl Into<String>, amount: Decimal) -> Self {
        Movement {
            date,
            account_or_detail: String::new(),
            amount: Some(amount),
            credit_amount: None,
            balance: None,
            operation_id: operation_id.into(),
            counterparty: String::new(),
            note: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.account_or_detail = detail.into();
        self
    }

    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = counterparty.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Operation id as used for deduplication
    pub fn dedup_key(&self) -> &str {
        self.operation_id.trim()
    }

    /// A movement without operation id can't be deduplicated on re-runs
    pub fn is_mergeable(&self) -> bool {
        !self.dedup_key().is_empty()
    }

    /// Date as written to the ledger
    pub fn date_text(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

// ============================================================================
// STATEMENT
// ============================================================================

/// Statement - movements sharing bank, currency and month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub bank: Bank,
    /// None = currency could not be detected
    pub currency: Option<Currency>,
    pub account_number: String,
    /// 1-12, inferred from the movement date
    pub month: u32,
    pub year: i32,
    pub movements: Vec<Movement>,
}

impl Statement {
    pub fn month_name(&self) -> &'static str {
        month_name(self.month).unwrap_or("")
    }
}

// ============================================================================
// TESTS
// ============================================================================
