//! Credix notification extractor.
//!
//! Labels arrive as `<strong>Campo:</strong> valor` pairs. Credix is
//! the one sender that spells the currency out (DOLARES/COLONES) and
//! writes amounts with a decimal comma.

use centavo_core::{Bank, Currency, TransactionRecord};
use regex::Regex;

use super::Extractor;
use crate::{amounts, dates};

pub struct CredixExtractor;

impl Extractor for CredixExtractor {
    fn bank(&self) -> Bank {
        Bank::Credix
    }

    fn extract(&self, html: &str) -> Option<TransactionRecord> {
        let merchant_re = Regex::new(r"(?i)<strong>Comercio:</strong>\s*([^<\n\r]+)").ok()?;
        let date_re = Regex::new(r"(?i)<strong>Fecha:</strong>\s*([^<\n\r]+)").ok()?;
        let amount_re = Regex::new(r"(?i)<strong>Monto:</strong>\s*([^<\n\r]+)").ok()?;
        let currency_re = Regex::new(r"(?i)<strong>Moneda:</strong>\s*(DOLARES|COLONES)").ok()?;

        let merchant = merchant_re.captures(html)?[1].trim().to_string();
        let date = dates::parse_dmy(date_re.captures(html)?[1].trim())?;
        let amount = amounts::parse_decimal_comma(&amount_re.captures(html)?[1])?;
        let currency = if currency_re.captures(html)?[1].eq_ignore_ascii_case("DOLARES") {
            Currency::Usd
        } else {
            Currency::Crc
        };

        if amount <= 0.0 || merchant.is_empty() {
            return None;
        }
        Some(TransactionRecord {
            merchant,
            date,
            amount,
            currency,
            bank: Bank::Credix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_colones() {
        let html = include_str!("../../tests/fixtures/credix.html");
        let rec = CredixExtractor.extract(html).expect("should extract");
        assert_eq!(rec.merchant, "AUTO MERCADO ESCAZU");
        assert_eq!(rec.date_dmy(), "05/01/2025");
        assert_eq!(rec.amount, 4500.00);
        assert_eq!(rec.currency, Currency::Crc);
        assert_eq!(rec.bank, Bank::Credix);
    }

    #[test]
    fn test_dolares_marker_sets_usd() {
        let html = "<p><strong>Comercio:</strong> NETFLIX.COM</p>\
                    <p><strong>Fecha:</strong> 14/02/2025</p>\
                    <p><strong>Monto:</strong> 12,99</p>\
                    <p><strong>Moneda:</strong> DOLARES</p>";
        let rec = CredixExtractor.extract(html).expect("should extract");
        assert_eq!(rec.currency, Currency::Usd);
        assert_eq!(rec.amount, 12.99);
    }

    #[test]
    fn test_missing_currency_marker_is_no_match() {
        let html = "<p><strong>Comercio:</strong> NETFLIX.COM</p>\
                    <p><strong>Fecha:</strong> 14/02/2025</p>\
                    <p><strong>Monto:</strong> 12,99</p>";
        assert!(CredixExtractor.extract(html).is_none());
    }
}
