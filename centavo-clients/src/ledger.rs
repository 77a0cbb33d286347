//! Ledger collaborator: one Google Sheet, one row per recorded
//! transaction.
//!
//! Column layout (A..I): merchant, date, currency, original USD amount
//! (blank for CRC rows), local amount (value or conversion formula),
//! category (VLOOKUP formula), description, bank, thread ts. The thread
//! ts is written with a leading apostrophe so Sheets keeps it textual.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use centavo_core::{Currency, DedupIndex, TransactionRecord, natural_key};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::google_auth::GoogleAuth;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// 0-based column indices within an A:I row.
const COL_MERCHANT: usize = 0;
const COL_DATE: usize = 1;
const COL_CURRENCY: usize = 2;
const COL_USD_AMOUNT: usize = 3;
const COL_LOCAL_AMOUNT: usize = 4;
const COL_DESCRIPTION: usize = 6;
const COL_BANK: usize = 7;
const COL_THREAD_TS: usize = 8;

/// A ledger row awaiting a human description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    /// 1-based sheet row.
    pub row: u32,
    pub thread_ts: String,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append a transaction; returns the 1-based row written.
    async fn append(&self, record: &TransactionRecord, thread_ts: &str) -> Result<u32>;

    /// Natural keys of the most recent `max_rows` ledger rows.
    async fn recent_keys(&self, max_rows: usize) -> Result<DedupIndex>;

    /// Rows with a thread reference but no description, scanning from
    /// the most recent row backward, newest first.
    async fn pending_descriptions(&self, limit: usize) -> Result<Vec<PendingRow>>;

    /// Idempotent single-cell description update.
    async fn set_description(&self, row: u32, text: &str) -> Result<()>;
}

pub struct SheetsLedger {
    http: reqwest::Client,
    auth: Arc<GoogleAuth>,
    spreadsheet_id: String,
    sheet_name: String,
    usd_to_crc_rate: f64,
    category_table: String,
}

impl SheetsLedger {
    pub fn new(
        http: reqwest::Client,
        auth: Arc<GoogleAuth>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        usd_to_crc_rate: f64,
        category_table: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            usd_to_crc_rate,
            category_table: category_table.into(),
        }
    }

    fn range_url(&self, range: &str) -> String {
        let encoded = format!("{}!{}", self.sheet_name, range).replace(' ', "%20");
        format!("{SHEETS_BASE}/{}/values/{}", self.spreadsheet_id, encoded)
    }

    async fn values_get(&self, range: &str) -> Result<Vec<Vec<String>>> {
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            values: Vec<Vec<String>>,
        }

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .get(self.range_url(range))
            .bearer_auth(token)
            .send()
            .await
            .context("sheets get request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("sheets get error: {status} {txt}");
        }
        let out: Resp = resp.json().await.context("parse sheets values")?;
        Ok(out.values)
    }

    async fn values_update(&self, range: &str, values: Vec<Vec<Value>>) -> Result<()> {
        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .put(self.range_url(range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": values }))
            .send()
            .await
            .context("sheets update request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("sheets update error: {status} {txt}");
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn append(&self, record: &TransactionRecord, thread_ts: &str) -> Result<u32> {
        // Next append position comes from the merchant column's extent.
        let col_a = self.values_get("A:A").await?;
        let row = (col_a.len().max(1) + 1) as u32;

        let mut cells: Vec<Value> = vec![json!(""); 9];
        cells[COL_MERCHANT] = json!(record.merchant);
        cells[COL_DATE] = json!(record.date_dmy());
        cells[COL_CURRENCY] = json!(record.currency.code());
        cells[COL_BANK] = json!(record.bank.label());
        cells[COL_THREAD_TS] = json!(format!("'{thread_ts}"));

        match record.currency {
            Currency::Usd => {
                // The local amount stays a formula so a rate-policy
                // change upstream reprices historical rows.
                cells[COL_USD_AMOUNT] = json!(record.amount);
                cells[COL_LOCAL_AMOUNT] = json!(format!("=D{row}*{}", self.usd_to_crc_rate));
            }
            Currency::Crc => {
                cells[COL_LOCAL_AMOUNT] = json!(record.amount);
            }
        }

        self.values_update(&format!("A{row}:I{row}"), vec![cells])
            .await?;

        // Category is a lookup against the merchant table, installed
        // rather than resolved here. Semicolons: es-CR sheet locale.
        let formula = format!("=VLOOKUP(A{row};'{}'!A:B;2;0)", self.category_table);
        self.values_update(&format!("F{row}"), vec![vec![json!(formula)]])
            .await?;

        info!(row, merchant = %record.merchant, "ledger row written");
        Ok(row)
    }

    async fn recent_keys(&self, max_rows: usize) -> Result<DedupIndex> {
        let rows = self.values_get("A:E").await?;
        let keys = keys_from_rows(&rows, max_rows);
        debug!(keys = keys.len(), "dedup index built from ledger tail");
        Ok(DedupIndex::from_keys(keys))
    }

    async fn pending_descriptions(&self, limit: usize) -> Result<Vec<PendingRow>> {
        let rows = self.values_get("A:I").await?;
        Ok(pending_from_rows(&rows, limit))
    }

    async fn set_description(&self, row: u32, text: &str) -> Result<()> {
        self.values_update(&format!("G{row}"), vec![vec![json!(text)]])
            .await?;
        info!(row, "description written");
        Ok(())
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("").trim()
}

/// Formatted cells come back with separators and currency signs; keys
/// must match what a freshly extracted record derives.
fn parse_cell_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Natural keys for the last `max_rows` data rows (header excluded).
/// The amount comes from the original USD column when present so
/// foreign transactions key on the amount the extractor saw.
fn keys_from_rows(rows: &[Vec<String>], max_rows: usize) -> Vec<String> {
    let data = rows.iter().skip(1);
    let skip = rows.len().saturating_sub(1).saturating_sub(max_rows);
    data.skip(skip)
        .filter_map(|row| {
            let merchant = cell(row, COL_MERCHANT);
            let date = cell(row, COL_DATE);
            let amount_cell = match cell(row, COL_USD_AMOUNT) {
                "" => cell(row, COL_LOCAL_AMOUNT),
                usd => usd,
            };
            if merchant.is_empty() || date.is_empty() {
                return None;
            }
            let amount = parse_cell_amount(amount_cell)?;
            Some(natural_key(merchant, date, amount))
        })
        .collect()
}

fn pending_from_rows(rows: &[Vec<String>], limit: usize) -> Vec<PendingRow> {
    let mut pending = Vec::new();
    // Backward: recent rows are the ones still awaiting a reply.
    for (i, row) in rows.iter().enumerate().skip(1).rev() {
        if pending.len() >= limit {
            break;
        }
        let thread_ts = cell(row, COL_THREAD_TS);
        let description = cell(row, COL_DESCRIPTION);
        if !thread_ts.is_empty() && description.is_empty() {
            pending.push(PendingRow {
                row: (i + 1) as u32,
                thread_ts: thread_ts.trim_start_matches('\'').to_string(),
            });
        }
    }
    pending
}
