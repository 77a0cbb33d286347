//! centavo-clients: collaborator interfaces and provider clients.
//!
//! The pipeline consumes mail, chat and ledger collaborators only
//! through the narrow traits defined here; the Gmail, Slack and Google
//! Sheets implementations live alongside them.

pub mod google_auth;
pub mod ledger;
pub mod mail;
pub mod notify;
pub mod retry;

pub use google_auth::GoogleAuth;
pub use ledger::{Ledger, PendingRow, SheetsLedger};
pub use mail::{GmailMailbox, InboundEmail, Mailbox};
pub use notify::{Notifier, NotifyOutcome, SlackNotifier, ThreadReplies};
pub use retry::RetryPolicy;
