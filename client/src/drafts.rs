//! Versioned local drafts for unsubmitted input.
//!
//! Each payload type owns one slot keyed by [`DraftPayload::KEY`]. A stored
//! draft is only handed back while it is younger than the store TTL and was
//! written with the payload's current [`DraftPayload::VERSION`]; anything
//! else is dropped on read.

use crate::api::BulkApi;
use crate::board::JobBoard;
use crate::error::{Error, Result};
use crate::migrations::Migrator;
use chrono::{DateTime, TimeZone, Utc};
use common::BulkJob;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait DraftPayload: Serialize + DeserializeOwned {
    const KEY: &'static str;
    const VERSION: u32;
}

/// Keyword batch typed into `compose`/`draft save`, not yet submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordDraft {
    pub keywords_text: String,
    #[serde(default)]
    pub template_id: Option<String>,
}

impl DraftPayload for KeywordDraft {
    const KEY: &'static str = "bulk.outline.keywords";
    const VERSION: u32 = 1;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draft<T> {
    pub data: T,
    pub saved_at: DateTime<Utc>,
}

pub struct DraftStore {
    conn: Connection,
    ttl: Duration,
}

impl DraftStore {
    pub fn open(path: &Path, ttl: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?, ttl)
    }

    pub fn in_memory(ttl: Duration) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, ttl)
    }

    fn with_connection(conn: Connection, ttl: Duration) -> Result<Self> {
        let mut migrator = Migrator::new(conn);
        migrator.run_migrations()?;
        let store = Self {
            conn: migrator.into_connection(),
            ttl,
        };
        store.purge_expired()?;
        Ok(store)
    }

    /// Delete every draft older than the TTL, whatever its key.
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now.timestamp_millis().saturating_sub(self.ttl_ms());
        let removed = self
            .conn
            .execute("DELETE FROM drafts WHERE saved_at_ms < ?1", params![cutoff])?;
        if removed > 0 {
            log::info!("Purged {} expired drafts", removed);
        }
        Ok(removed)
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn load<T: DraftPayload>(&self) -> Result<Option<Draft<T>>> {
        self.load_at(Utc::now())
    }

    pub fn load_at<T: DraftPayload>(&self, now: DateTime<Utc>) -> Result<Option<Draft<T>>> {
        let row: Option<(u32, String, i64)> = self
            .conn
            .query_row(
                "SELECT payload_version, payload, saved_at_ms FROM drafts WHERE key = ?1",
                params![T::KEY],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((version, payload, saved_at_ms)) = row else {
            return Ok(None);
        };

        if version != T::VERSION {
            log::info!(
                "Discarding draft {} saved with version {} (current {})",
                T::KEY, version, T::VERSION
            );
            self.clear_key(T::KEY)?;
            return Ok(None);
        }

        if now.timestamp_millis().saturating_sub(saved_at_ms) > self.ttl_ms() {
            log::info!("Discarding expired draft {}", T::KEY);
            self.clear_key(T::KEY)?;
            return Ok(None);
        }

        let data = match serde_json::from_str::<T>(&payload) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Discarding unreadable draft {}: {}", T::KEY, e);
                self.clear_key(T::KEY)?;
                return Ok(None);
            }
        };

        let saved_at = Utc
            .timestamp_millis_opt(saved_at_ms)
            .single()
            .unwrap_or(now);
        Ok(Some(Draft { data, saved_at }))
    }

    pub fn save<T: DraftPayload>(&self, data: &T) -> Result<()> {
        self.save_at(data, Utc::now())
    }

    pub fn save_at<T: DraftPayload>(&self, data: &T, now: DateTime<Utc>) -> Result<()> {
        let payload = serde_json::to_string(data)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO drafts (key, payload_version, payload, saved_at_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![T::KEY, T::VERSION, payload, now.timestamp_millis()],
        )?;
        log::debug!("Saved draft {}", T::KEY);
        Ok(())
    }

    /// Returns whether a draft existed.
    pub fn clear<T: DraftPayload>(&self) -> Result<bool> {
        self.clear_key(T::KEY)
    }

    fn clear_key(&self, key: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM drafts WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

pub type SharedDraftStore = Arc<Mutex<DraftStore>>;

pub fn with_store<R>(store: &SharedDraftStore, f: impl FnOnce(&DraftStore) -> Result<R>) -> Result<R> {
    let guard = store.lock().map_err(|_| Error::DraftStoreUnavailable)?;
    f(&guard)
}

/// Submit a keyword draft through the board. The stored draft is cleared
/// only once the job has been created; on any error it is kept.
pub async fn submit_keyword_draft<A: BulkApi + 'static>(
    board: &JobBoard<A>,
    store: &SharedDraftStore,
    draft: &KeywordDraft,
) -> Result<BulkJob> {
    let job = board
        .submit(&draft.keywords_text, draft.template_id.clone())
        .await?;
    with_store(store, |s| s.clear::<KeywordDraft>())?;
    Ok(job)
}

/// Debounced writer: only the last value of a burst of updates is stored,
/// once the input has been quiet for the debounce period.
pub struct DraftAutosave<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: DraftPayload + Send + 'static> DraftAutosave<T> {
    pub fn spawn(store: SharedDraftStore, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_autosave(store, debounce, rx));
        Self { tx, task }
    }

    pub fn update(&self, data: T) {
        if self.tx.send(data).is_err() {
            log::warn!("Draft autosave for {} has stopped", T::KEY);
        }
    }

    /// Write any pending value and stop.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            log::error!("Draft autosave task failed: {}", e);
        }
    }
}

async fn run_autosave<T: DraftPayload>(
    store: SharedDraftStore,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<T>,
) {
    while let Some(mut latest) = rx.recv().await {
        let mut closed = false;
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(data) => latest = data,
                    None => {
                        closed = true;
                        break;
                    }
                },
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        if let Err(e) = with_store(&store, |s| s.save(&latest)) {
            log::warn!("Failed to autosave draft {}: {}", T::KEY, e);
        }
        if closed {
            break;
        }
    }
}
