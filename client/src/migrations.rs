use rusqlite::{params, Connection, Result};
const SCHEMA_VERSION: i32 = 2;

pub struct Migrator {
    conn: Connection,
}

impl Migrator {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn run_migrations(&mut self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        let current_version = self.current_version()?;
        log::debug!("Draft store schema version: {}", current_version);

        if current_version < SCHEMA_VERSION {
            log::info!("Migrating draft store from version {} to {}", current_version, SCHEMA_VERSION);
            self.migrate_from(current_version)?;
        }

        Ok(())
    }

    pub fn current_version(&self) -> Result<i32> {
        let version: Option<i32> = self.conn.query_row(
            "SELECT MAX(version) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version.unwrap_or(0))
    }

    fn migrate_from(&mut self, from_version: i32) -> Result<()> {
        let tx = self.conn.transaction()?;

        for version in (from_version + 1)..=SCHEMA_VERSION {
            log::debug!("Applying draft store migration {}", version);
            match version {
                1 => Self::migrate_to_v1(&tx)?,
                2 => Self::migrate_to_v2(&tx)?,
                _ => return Err(rusqlite::Error::InvalidQuery),
            }

            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![version],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn migrate_to_v1(tx: &rusqlite::Transaction) -> Result<()> {
        tx.execute(
            "CREATE TABLE IF NOT EXISTS drafts (
                key TEXT PRIMARY KEY,
                payload_version INTEGER NOT NULL,
                payload TEXT NOT NULL,
                saved_at_ms INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn migrate_to_v2(tx: &rusqlite::Transaction) -> Result<()> {
        // DraftStore::purge_expired deletes by age
        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_drafts_saved_at ON drafts(saved_at_ms)",
            [],
        )?;
        Ok(())
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}
