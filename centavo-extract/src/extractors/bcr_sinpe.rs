//! BCR SINPE Móvil transfer extractor.
//!
//! Transfers are prose, not a table: the destination client name is the
//! merchant, and the date sits inside a sentence whose "transacción"
//! may arrive as the `&oacute;` entity or the literal character.
//! Always CRC.

use centavo_core::{Bank, Currency, TransactionRecord};
use regex::Regex;

use super::Extractor;
use crate::{amounts, dates};

pub struct BcrSinpeExtractor;

impl Extractor for BcrSinpeExtractor {
    fn bank(&self) -> Bank {
        Bank::BcrSinpe
    }

    fn extract(&self, html: &str) -> Option<TransactionRecord> {
        let merchant_re = Regex::new(r"(?i)Nombre cliente Destino:\s*([^<]+)").ok()?;
        let date_re =
            Regex::new(r"(?i)Esta transacci(?:&oacute;|ó)n fue realizada el\s*([\d/]+)\s*a las")
                .ok()?;
        let amount_re = Regex::new(r">Monto:\s*([\d,]+\.\d{2})").ok()?;

        let merchant = merchant_re.captures(html)?[1].trim().to_string();
        let date = dates::parse_dmy(date_re.captures(html)?[1].trim())?;
        let amount = amounts::parse_en(&amount_re.captures(html)?[1])?;

        if amount <= 0.0 || merchant.is_empty() {
            return None;
        }
        Some(TransactionRecord {
            merchant,
            date,
            amount,
            currency: Currency::Crc,
            bank: Bank::BcrSinpe,
        })
    }
}
