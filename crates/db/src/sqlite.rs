//! SQLite database handle with a module migration ledger
//!
//! The connection lives behind a mutex and all statements run on Tokio's
//! blocking pool through [`Database::call`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use folio_kernel::Migration;

use crate::{Result, StoreError};

const LEDGER_DDL: &str = "
    CREATE TABLE IF NOT EXISTS _folio_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        PRIMARY KEY (module, id)
    );
";

/// Shared SQLite connection
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite database at {:?}", path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(LEDGER_DDL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }

    /// Apply every migration not yet recorded in the ledger.
    ///
    /// Returns the number of migrations applied by this call. Each migration
    /// runs in its own transaction together with its ledger row.
    pub async fn migrate(&self, migrations: Vec<(String, Migration)>) -> Result<usize> {
        self.call(move |conn| apply_migrations(conn, &migrations)).await
    }
}

fn apply_migrations(conn: &Connection, migrations: &[(String, Migration)]) -> Result<usize> {
    let mut applied = 0;

    for (module, migration) in migrations {
        let already: Option<String> = conn
            .query_row(
                "SELECT id FROM _folio_migrations WHERE module = ?1 AND id = ?2",
                params![module, migration.id],
                |row| row.get(0),
            )
            .optional()?;

        if already.is_some() {
            debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let wrap = |source| StoreError::Migration {
            module: module.clone(),
            id: migration.id.to_string(),
            source,
        };

        conn.execute_batch("BEGIN").map_err(wrap)?;
        let result = conn.execute_batch(migration.up).and_then(|_| {
            conn.execute(
                "INSERT INTO _folio_migrations (module, id) VALUES (?1, ?2)",
                params![module, migration.id],
            )
        });

        match result {
            Ok(_) => conn.execute_batch("COMMIT").map_err(wrap)?,
            Err(source) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(wrap(source));
            }
        }

        info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
