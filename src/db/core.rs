use std::sync::{mpsc::Receiver, Arc, RwLock};

use anyhow::Result;
use rusqlite::{Connection, Params, Transaction};
use rusqlite_migration::Migrations;

use crate::db::{transaction::DbTransaction, DbEntity, DbEvent};
use crate::notifier::Notifier;

#[derive(Clone)]
pub struct Db {
    conn: Arc<RwLock<Connection>>,
    notifier: Notifier<DbEvent>,
}

impl Db {
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn migrate(&self, migrations: &Migrations) -> Result<()> {
        let mut conn = self
            .conn
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock for migration"))?;

        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    /// Calls the supplied closure with a database transaction that can be
    /// used to perform writes to the database. Commits automatically
    /// if the closure returns Ok, otherwise rolls back. Observers are
    /// notified of saved rows only after a successful commit.
    pub fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&DbTransaction) -> Result<R>,
    {
        let mut conn = self
            .conn
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;

        let txn = conn.transaction()?;
        let db_txn = DbTransaction::new(self, &txn);
        let result = f(&db_txn)?;
        let events = db_txn.take_pending_events();
        txn.commit()?;

        for event in events {
            self.notifier.notify(event);
        }

        Ok(result)
    }

    /// Shortcut to create a transaction and save a single entity.
    /// See DbTransaction.save()
    pub fn save<E: DbEntity>(&self, entity: &E) -> Result<E> {
        self.transaction(|t| t.save(entity))
    }

    /// Shortcut to create a transaction and execute a query.
    /// See DbTransaction.query()
    pub fn query<E: DbEntity, P: Params>(&self, sql: &str, params: P) -> Result<Vec<E>> {
        self.transaction(|t| t.query(sql, params))
    }

    pub fn get<E: DbEntity>(&self, id: &str) -> Result<Option<E>> {
        self.transaction(|t| t.get(id))
    }

    /// Receives an event for every row saved by a committed transaction.
    pub fn observer(&self) -> Receiver<DbEvent> {
        self.notifier.observer()
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("DB OPEN: journal_mode={}", mode);
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Db {
            conn: Arc::new(RwLock::new(conn)),
            notifier: Notifier::new(),
        })
    }

    pub(crate) fn table_name_for_type<T>(&self) -> Result<String> {
        let full_name = std::any::type_name::<T>();
        // e.g. "entity_forms::db::forms::FormField" -> "FormField"
        Ok(full_name.split("::").last().unwrap_or(full_name).to_string())
    }

    pub(crate) fn table_column_names(&self, txn: &Transaction, table_name: &str) -> Result<Vec<String>> {
        let mut stmt = txn.prepare(&format!("PRAGMA table_info({})", table_name))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(anyhow::anyhow!("Table '{}' not found or has no columns", table_name));
        }

        Ok(columns)
    }
}
