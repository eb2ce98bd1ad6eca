//! Client side of the bulk outline generation API.
//!
//! [`board::JobBoard`] is the entry point for job tracking: it holds the
//! latest job snapshot, refreshes it every few seconds while any job is still
//! pending or processing, and issues cancel / retry commands. Keyword drafts
//! persist locally through [`drafts::DraftStore`].

pub mod api;
pub mod backoff;
pub mod board;
pub mod config;
pub mod drafts;
pub mod error;
pub mod logging;
mod migrations;
pub mod notifier;
pub mod state;
pub mod templates;

#[cfg(test)]
mod testing;

pub use api::{BulkApi, HttpBulkApi};
pub use board::{BoardConfig, Command, JobBoard};
pub use config::Config;
pub use drafts::{DraftAutosave, DraftStore, KeywordDraft, SharedDraftStore};
pub use error::{Error, Result};
pub use notifier::{Notice, NoticeLevel, Notifier};
pub use state::{diff_snapshots, JobEvent, JobListState};
