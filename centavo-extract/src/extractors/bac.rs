//! BAC notification extractor.
//!
//! BAC is the highest-volume sender and has shipped two template
//! generations. The newer label/value layout carries an explicit
//! USD/CRC marker next to the amount and is tried first; the older
//! layout has no currency marker and is always CRC.

use centavo_core::{Bank, Currency, TransactionRecord};
use chrono::NaiveDate;
use regex::Regex;

use super::Extractor;
use crate::{amounts, dates};

pub struct BacExtractor;

impl Extractor for BacExtractor {
    fn bank(&self) -> Bank {
        Bank::Bac
    }

    fn extract(&self, html: &str) -> Option<TransactionRecord> {
        extract_new_layout(html).or_else(|| extract_old_layout(html))
    }
}

/// BAC writes dates as Spanish month tokens in either order
/// ("05 Ene 2025" or "Ene 5, 2025"); commas are noise.
fn parse_bac_date(text: &str) -> Option<NaiveDate> {
    let cleaned = text.replace(',', " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() != 3 {
        return None;
    }

    let month_pos = tokens
        .iter()
        .position(|t| dates::spanish_month(t).is_some())?;
    let month = dates::spanish_month(tokens[month_pos])?;
    let rest: Vec<&str> = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != month_pos)
        .map(|(_, t)| *t)
        .collect();

    // The 4-digit token is the year; day-first order is assumed when
    // both remaining tokens are short ("05 Ene 25").
    let (day_tok, year_tok) = if rest[0].len() == 4 {
        (rest[1], rest[0])
    } else {
        (rest[0], rest[1])
    };
    let day: u32 = day_tok.parse().ok()?;
    let year = dates::year_from_str(year_tok)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn extract_new_layout(html: &str) -> Option<TransactionRecord> {
    let amount_re =
        Regex::new(r"(?is)>Monto:</p>.*?<p>\s*(USD|CRC)\s*([\d,]+\.\d{2})\s*</p>").ok()?;
    let caps = amount_re.captures(html)?;
    let currency = if caps[1].eq_ignore_ascii_case("USD") {
        Currency::Usd
    } else {
        Currency::Crc
    };
    let amount = amounts::parse_en(&caps[2])?;

    let merchant_re = Regex::new(r"(?is)>Comercio:</p>.*?<p>\s*([^<]+?)\s*</p>").ok()?;
    let date_re = Regex::new(r"(?is)>Fecha:</p>.*?<p>\s*([^<]+?)\s*</p>").ok()?;
    let merchant = merchant_re.captures(html)?[1].trim().to_string();
    let date = parse_bac_date(date_re.captures(html)?[1].trim())?;

    if amount <= 0.0 || merchant.is_empty() {
        return None;
    }
    Some(TransactionRecord {
        merchant,
        date,
        amount,
        currency,
        bank: Bank::Bac,
    })
}

fn extract_old_layout(html: &str) -> Option<TransactionRecord> {
    let merchant_re = Regex::new(r"(?is)Comercio:</p>.*?<p>([^<]+)</p>").ok()?;
    let date_re = Regex::new(r"(?is)Fecha:</p>.*?<p>([^<]+)</p>").ok()?;
    let amount_re = Regex::new(r"(?is)Monto:</p>.*?<p>[^>]*?([\d,]+\.\d{2})</p>").ok()?;

    let merchant = merchant_re.captures(html)?[1].trim().to_string();
    let date = parse_bac_date(date_re.captures(html)?[1].trim())?;
    let amount = amounts::parse_en(&amount_re.captures(html)?[1])?;

    if amount <= 0.0 || merchant.is_empty() {
        return None;
    }
    Some(TransactionRecord {
        merchant,
        date,
        amount,
        currency: Currency::Crc,
        bank: Bank::Bac,
    })
}
