// ✅ Validity Filter - drop statements that must never reach the ledger

use crate::error::Rejection;
use crate::movement::{Bank, Currency, Statement};
use rust_decimal::Decimal;

/// Outcome of filtering a batch
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<Statement>,
    pub zero_amount: usize,
    pub missing_fields: usize,
}

impl FilterOutcome {
    pub fn rejected(&self) -> usize {
        self.zero_amount + self.missing_fields
    }
}

/// Zero/missing amounts are notifications without money movement
/// (or partial parse failures), not legitimate zero-value entries.
pub fn is_valid(statement: &Statement) -> Result<(), Rejection> {
    if statement.movements.is_empty() {
        return Err(Rejection::MissingCoreFields);
    }

    let has_bad_amount = statement
        .movements
        .iter()
        .any(|m| m.amount.map_or(true, |a| a == Decimal::ZERO));

    if has_bad_amount {
        return Err(Rejection::ZeroOrMissingAmount);
    }

    Ok(())
}

pub fn filter_valid(statements: Vec<Statement>) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for statement in statements {
        match is_valid(&statement) {
            Ok(()) => outcome.kept.push(statement),
            Err(Rejection::ZeroOrMissingAmount) => outcome.zero_amount += 1,
            Err(Rejection::MissingCoreFields) => outcome.missing_fields += 1,
        }
    }

    outcome
}

/// Statements belonging to one ledger (bank + currency).
/// Undetected currency never matches: it would land in every currency's ledger.
pub fn filter_by_bank_currency(statements: &[Statement], bank: Bank, currency: Currency) -> Vec<&Statement> {
    statements
        .iter()
        .filter(|st| st.bank == bank && st.currency == Some(currency))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::Movement;
    use chrono::NaiveDate;

    fn statement(bank: Bank, currency: Option<Currency>, amount: Option<&str>) -> Statement {
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let mut movement = Movement::new(date, "0001", Decimal::ONE);
        movement.amount = amount.map(|a| a.parse().unwrap());
        Statement {
            bank,
            currency,
            account_number: String::new(),
            month: 1,
            year: 2026,
            movements: vec![movement],
        }
    }

    #[test]
    fn test_zero_and_missing_amounts_rejected() {
        let zero = statement(Bank::Bcp, Some(Currency::Soles), Some("0.00"));
        let none = statement(Bank::Bcp, Some(Currency::Soles), None);
        assert_eq!(is_valid(&zero), Err(Rejection::ZeroOrMissingAmount));
        assert_eq!(is_valid(&none), Err(Rejection::ZeroOrMissingAmount));
    }

    #[test]
    fn test_statement_without_movements_rejected() {
        let mut empty = statement(Bank::Bcp, Some(Currency::Soles), Some("1"));
        empty.movements.clear();
        assert_eq!(is_valid(&empty), Err(Rejection::MissingCoreFields));
    }

    #[test]
    fn test_filter_valid_counts() {
        let outcome = filter_valid(vec![
            statement(Bank::Bcp, Some(Currency::Soles), Some("12.50")),
            statement(Bank::Bcp, Some(Currency::Soles), Some("0")),
            statement(Bank::Interbank, Some(Currency::Soles), None),
        ]);
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.zero_amount, 2);
        assert_eq!(outcome.rejected(), 2);
    }

    #[test]
    fn test_filter_by_bank_currency_skips_undetected() {
        let all = vec![
            statement(Bank::Bcp, Some(Currency::Soles), Some("1")),
            statement(Bank::Bcp, Some(Currency::Dolares), Some("2")),
            statement(Bank::Bcp, None, Some("3")),
            statement(Bank::Interbank, Some(Currency::Soles), Some("4")),
        ];

        let bcp_soles = filter_by_bank_currency(&all, Bank::Bcp, Currency::Soles);
        assert_eq!(bcp_soles.len(), 1);
        assert_eq!(bcp_soles[0].movements[0].amount, Some(Decimal::ONE));
    }
}
