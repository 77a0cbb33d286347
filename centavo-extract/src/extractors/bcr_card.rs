//! BCR card notification extractor.
//!
//! The template is one table whose data cells carry `class="datos"` /
//! `class="datos-num"`: a date-time cell, the amount, then the merchant
//! cell, which always ends in the "CR" country suffix. Card
//! notifications are always CRC.

use centavo_core::{Bank, Currency, TransactionRecord};
use regex::Regex;

use super::Extractor;
use crate::{amounts, dates};

pub struct BcrCardExtractor;

impl Extractor for BcrCardExtractor {
    fn bank(&self) -> Bank {
        Bank::BcrCard
    }

    fn extract(&self, html: &str) -> Option<TransactionRecord> {
        let re = Regex::new(concat!(
            r#"(?is)<td class="datos">([\d/]+\s[\d:]+)</td>"#,
            r#".*?<td class="datos-num">([\d,]+\.\d{2})</td>"#,
            r#".*?<td[^>]+>([^<]+CR)</td>"#,
        ))
        .ok()?;
        let caps = re.captures(html)?;

        // The first cell is "DD/MM/YYYY HH:MM:SS"; only the date part
        // matters.
        let date_token = caps[1].trim().split_whitespace().next()?.to_string();
        let date = dates::parse_dmy(&date_token)?;
        let amount = amounts::parse_en(&caps[2])?;
        let merchant = caps[3].trim().to_string();

        if amount <= 0.0 || merchant.is_empty() {
            return None;
        }
        Some(TransactionRecord {
            merchant,
            date,
            amount,
            currency: Currency::Crc,
            bank: Bank::BcrCard,
        })
    }
}
