//! In-memory fakes for the three collaborator traits, used by the
//! pipeline and reconcile tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use centavo_clients::{
    InboundEmail, Ledger, Mailbox, Notifier, NotifyOutcome, PendingRow, ThreadReplies,
};
use centavo_core::{Bank, Currency, DedupIndex, TransactionRecord};

struct FakeEmail {
    id: String,
    from: String,
    html_body: String,
    unread: bool,
}

pub struct FakeMailbox {
    emails: Mutex<Vec<FakeEmail>>,
    mark_read_fails: AtomicBool,
}

impl FakeMailbox {
    pub fn new(emails: Vec<(&str, &str, String)>) -> Self {
        let emails = emails
            .into_iter()
            .map(|(id, from, html_body)| FakeEmail {
                id: id.to_string(),
                from: from.to_string(),
                html_body,
                unread: true,
            })
            .collect();
        Self {
            emails: Mutex::new(emails),
            mark_read_fails: AtomicBool::new(false),
        }
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.emails
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.id == id && e.unread)
    }

    pub fn set_unread(&self, id: &str, unread: bool) {
        let mut emails = self.emails.lock().unwrap();
        if let Some(email) = emails.iter_mut().find(|e| e.id == id) {
            email.unread = unread;
        }
    }

    pub fn fail_mark_read(&self, fail: bool) {
        self.mark_read_fails.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_unread_transactional(&self) -> Result<Vec<String>> {
        Ok(self
            .emails
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.unread)
            .map(|e| e.id.clone())
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<InboundEmail>> {
        Ok(self.emails.lock().unwrap().iter().find(|e| e.id == id).map(
            |e| InboundEmail {
                id: e.id.clone(),
                from: e.from.clone(),
                subject: String::new(),
                html_body: e.html_body.clone(),
            },
        ))
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        if self.mark_read_fails.load(Ordering::SeqCst) {
            bail!("mail api unavailable");
        }
        self.set_unread(id, false);
        Ok(())
    }
}

pub enum ReplyScript {
    Replies(Vec<String>),
    RateLimited,
    Error,
}

pub struct FakeNotifier {
    posts_fail: AtomicBool,
    sent: Mutex<Vec<String>>,
    replies: Mutex<HashMap<String, ReplyScript>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self {
            posts_fail: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
        }
    }

    /// Merchants of the notifications posted, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_posts(&self, fail: bool) {
        self.posts_fail.store(fail, Ordering::SeqCst);
    }

    pub fn script_replies(&self, thread_ts: &str, script: ReplyScript) {
        self.replies
            .lock()
            .unwrap()
            .insert(thread_ts.to_string(), script);
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(
        &self,
        merchant: &str,
        _amount: f64,
        _bank: Bank,
        _currency: Currency,
    ) -> Result<NotifyOutcome> {
        if self.posts_fail.load(Ordering::SeqCst) {
            bail!("chat api unavailable");
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(merchant.to_string());
        Ok(NotifyOutcome {
            accepted: true,
            thread_ts: Some(format!("1700000000.{:06}", sent.len())),
        })
    }

    async fn thread_replies(&self, thread_ts: &str) -> Result<ThreadReplies> {
        match self.replies.lock().unwrap().get(thread_ts) {
            Some(ReplyScript::Replies(messages)) => Ok(ThreadReplies::Replies(messages.clone())),
            Some(ReplyScript::RateLimited) => Ok(ThreadReplies::RateLimited),
            Some(ReplyScript::Error) => bail!("chat api unavailable"),
            None => Ok(ThreadReplies::Replies(vec!["notification".to_string()])),
        }
    }
}

#[derive(Clone)]
pub struct LedgerRow {
    pub record: TransactionRecord,
    pub thread_ts: String,
    pub description: Option<String>,
}

pub struct FakeLedger {
    rows: Mutex<Vec<LedgerRow>>,
    seeded_keys: Mutex<Vec<String>>,
    append_fails_for: Mutex<Option<String>>,
    recent_keys_fail: AtomicBool,
}

// Data rows start under a header row, like the real sheet.
const FIRST_DATA_ROW: u32 = 2;

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            seeded_keys: Mutex::new(Vec::new()),
            append_fails_for: Mutex::new(None),
            recent_keys_fail: AtomicBool::new(false),
        }
    }

    pub fn rows(&self) -> Vec<LedgerRow> {
        self.rows.lock().unwrap().clone()
    }

    /// Pre-populate the duplicate index without a backing row.
    pub fn seed_key(&self, key: &str) {
        self.seeded_keys.lock().unwrap().push(key.to_string());
    }

    /// Insert a recorded row and return its sheet row number.
    pub fn seed_row(&self, record: TransactionRecord, thread_ts: &str) -> u32 {
        let mut rows = self.rows.lock().unwrap();
        rows.push(LedgerRow {
            record,
            thread_ts: thread_ts.to_string(),
            description: None,
        });
        FIRST_DATA_ROW + (rows.len() as u32 - 1)
    }

    pub fn fail_append_for(&self, merchant: &str) {
        *self.append_fails_for.lock().unwrap() = Some(merchant.to_string());
    }

    pub fn fail_recent_keys(&self, fail: bool) {
        self.recent_keys_fail.store(fail, Ordering::SeqCst);
    }

    pub fn description(&self, row: u32) -> Option<String> {
        let rows = self.rows.lock().unwrap();
        rows.get((row - FIRST_DATA_ROW) as usize)
            .and_then(|r| r.description.clone())
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn append(&self, record: &TransactionRecord, thread_ts: &str) -> Result<u32> {
        if let Some(merchant) = self.append_fails_for.lock().unwrap().as_deref() {
            if record.merchant == merchant {
                bail!("sheets api unavailable");
            }
        }
        Ok(self.seed_row(record.clone(), thread_ts))
    }

    async fn recent_keys(&self, _max_rows: usize) -> Result<DedupIndex> {
        if self.recent_keys_fail.load(Ordering::SeqCst) {
            bail!("sheets api unavailable");
        }
        let mut index = DedupIndex::default();
        for key in self.seeded_keys.lock().unwrap().iter() {
            index.insert_key(key.clone());
        }
        for row in self.rows.lock().unwrap().iter() {
            index.insert(&row.record);
        }
        Ok(index)
    }

    async fn pending_descriptions(&self, limit: usize) -> Result<Vec<PendingRow>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, row)| row.description.is_none() && !row.thread_ts.is_empty())
            .take(limit)
            .map(|(i, row)| PendingRow {
                row: FIRST_DATA_ROW + i as u32,
                thread_ts: row.thread_ts.clone(),
            })
            .collect())
    }

    async fn set_description(&self, row: u32, text: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let Some(entry) = rows.get_mut((row - FIRST_DATA_ROW) as usize) else {
            bail!("row {row} does not exist");
        };
        entry.description = Some(text.to_string());
        Ok(())
    }
}
