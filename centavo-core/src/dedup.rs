//! Natural transaction keys and the ledger-backed duplicate index.
//!
//! Two records with equal natural keys are the same real-world
//! transaction, regardless of which email carried them. The key is
//! `lowercase(merchant)|DD/MM/YYYY|amount`, matching what can be
//! re-derived from already-written ledger rows.

use std::collections::HashSet;

use crate::transaction::TransactionRecord;

/// Canonical amount rendering for key derivation.
///
/// Ledger cells come back formatted ("15000", "15,000", "15.5"), so both
/// sides normalize to the shortest decimal form: two decimals, trailing
/// zeros trimmed.
pub fn amount_key(amount: f64) -> String {
    let mut s = format!("{:.2}", amount);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Derive the natural key from its parts. `date_dmy` must already be in
/// `DD/MM/YYYY` form.
pub fn natural_key(merchant: &str, date_dmy: &str, amount: f64) -> String {
    format!("{}|{}|{}", merchant.trim(), date_dmy, amount_key(amount)).to_lowercase()
}

impl TransactionRecord {
    pub fn natural_key(&self) -> String {
        natural_key(&self.merchant, &self.date_dmy(), self.amount)
    }
}

/// Set of natural keys built from recent ledger rows, consulted once per
/// pipeline invocation. Newly recorded transactions are inserted so a
/// batch cannot record the same transaction twice.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    keys: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn contains(&self, record: &TransactionRecord) -> bool {
        self.keys.contains(&record.natural_key())
    }

    pub fn insert(&mut self, record: &TransactionRecord) {
        self.keys.insert(record.natural_key());
    }

    pub fn insert_key(&mut self, key: String) {
        self.keys.insert(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Bank, Currency};
    use chrono::NaiveDate;

    fn record(merchant: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            merchant: merchant.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            amount,
            currency: Currency::Crc,
            bank: Bank::Bac,
        }
    }

    #[test]
    fn test_amount_key_trims_trailing_zeros() {
        assert_eq!(amount_key(15000.0), "15000");
        assert_eq!(amount_key(15.5), "15.5");
        assert_eq!(amount_key(15.55), "15.55");
        assert_eq!(amount_key(0.5), "0.5");
    }

    #[test]
    fn test_natural_key_is_case_insensitive_on_merchant() {
        let upper = record("SUPER XYZ", 15000.0);
        let lower = record("super xyz", 15000.0);
        assert_eq!(upper.natural_key(), lower.natural_key());
        assert_eq!(upper.natural_key(), "super xyz|05/01/2025|15000");
    }

    #[test]
    fn test_index_membership() {
        let rec = record("Ferretería El Mar", 9800.25);
        let mut index = DedupIndex::from_keys(vec![rec.natural_key()]);
        assert!(index.contains(&rec));

        let other = record("Ferretería El Mar", 9800.30);
        assert!(!index.contains(&other));

        index.insert(&other);
        assert!(index.contains(&other));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_key_matches_reformatted_cell_amount() {
        // A cell written as 15000.00 reads back as "15000"; parsing that
        // string and re-keying must agree with the record's key.
        let rec = record("SUPER XYZ", 15000.00);
        let cell: f64 = "15000".parse().unwrap();
        assert_eq!(
            rec.natural_key(),
            natural_key("SUPER XYZ", "05/01/2025", cell)
        );
    }
}
