//! Promerica notification extractor.
//!
//! Promerica sometimes delivers the HTML part still base64-encoded; a
//! body that does not look like complete markup goes through a
//! transport-decode attempt before structural extraction. The template
//! is a label/value table with the amount inside `<strong>CUR: n</strong>`
//! and a `d mon yyyy / hh:mm` date.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use centavo_core::{Bank, Currency, TransactionRecord};
use chrono::NaiveDate;
use regex::Regex;

use super::Extractor;
use crate::{amounts, dates};

pub struct PromericaExtractor;

impl Extractor for PromericaExtractor {
    fn bank(&self) -> Bank {
        Bank::Promerica
    }

    fn extract(&self, html: &str) -> Option<TransactionRecord> {
        let body = decode_if_wrapped(html);
        extract_fields(&body)
    }
}

/// Bodies missing a closing `</html>` are assumed to still be
/// base64-wrapped; a failed decode keeps the original body.
fn decode_if_wrapped(html: &str) -> String {
    if html.contains("</html>") {
        return html.to_string();
    }
    let compact: String = html.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => html.to_string(),
    }
}

/// "5 ene 2025 / 19:22" — date part before the slash, lowercase
/// Spanish month.
fn parse_promerica_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.split('/').next()?.trim();
    let parts: Vec<&str> = date_part.split_whitespace().collect();
    if parts.len() != 3 {
        return None;
    }
    dates::from_spanish_parts(parts[0], parts[1], parts[2])
}

fn extract_fields(body: &str) -> Option<TransactionRecord> {
    let merchant_re = Regex::new(r"(?is)>\s*Comercio\s*</td>.*?<td[^>]+>([^<]+)<").ok()?;
    let date_re = Regex::new(r"(?is)>\s*Fecha/hora\s*</td>.*?<td[^>]+>\s*([^<]+?)\s*<").ok()?;
    let amount_re =
        Regex::new(r"(?is)>\s*Monto\s*</td>.*?<strong>\s*(USD|CRC):\s*([\d,]+\.?\d*)\s*</strong>")
            .ok()?;

    let merchant = merchant_re.captures(body)?[1].trim().to_string();
    let date = parse_promerica_date(date_re.captures(body)?[1].trim())?;
    let caps = amount_re.captures(body)?;
    let currency = if caps[1].eq_ignore_ascii_case("USD") {
        Currency::Usd
    } else {
        Currency::Crc
    };
    let amount = amounts::parse_en(&caps[2])?;

    if amount <= 0.0 || merchant.is_empty() {
        return None;
    }
    Some(TransactionRecord {
        merchant,
        date,
        amount,
        currency,
        bank: Bank::Promerica,
    })
}
