use std::cell::RefCell;

use anyhow::Result;
use rusqlite::{params, Params, Transaction};
use uuid::Uuid;

use crate::db::{Db, DbEntity, DbEvent};

pub struct DbTransaction<'a> {
    db: &'a Db,
    txn: &'a Transaction<'a>,
    pending_events: RefCell<Vec<DbEvent>>,
}

impl<'a> DbTransaction<'a> {
    pub(crate) fn new(db: &'a Db, txn: &'a Transaction<'a>) -> Self {
        Self {
            db,
            txn,
            pending_events: RefCell::new(Vec::new()),
        }
    }

    /// Saves the entity to the database.
    ///
    /// The entity's type name is used for the table name, and the table
    /// columns are mapped to the entity fields using serde_rusqlite. If a
    /// row with the same id already exists it is updated, otherwise a new
    /// row is inserted, with a new uuidv7 for its id if it has none. The
    /// stored entity is read back and returned.
    ///
    /// Note that only fields present in both the table and entity are mapped.
    pub fn save<E: DbEntity>(&self, entity: &E) -> Result<E> {
        let event = self.upsert(entity)?;
        let id = match &event {
            DbEvent::Insert(_, id) | DbEvent::Update(_, id) => id,
        };
        self.get::<E>(id)?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve saved entity"))
    }

    /// Like save() but returns whether the row was inserted or updated
    /// instead of reading it back.
    pub fn upsert<E: DbEntity>(&self, entity: &E) -> Result<DbEvent> {
        let table_name = self.db.table_name_for_type::<E>()?;
        let column_names = self.db.table_column_names(self.txn, &table_name)?;

        // Convert the entity to a JSON Value so we can manipulate it
        // generically without needing more than Serialize.
        let mut value = serde_json::to_value(entity)?;
        let id = self.ensure_entity_id(&mut value)?;
        let columns = column_names
            .into_iter()
            .filter(|col| value.get(col).is_some())
            .collect::<Vec<_>>();

        let check_sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", table_name);
        let exists: bool = self
            .txn
            .query_row(&check_sql, params![&id], |row| row.get::<_, i64>(0).map(|count| count > 0))?;

        let event = if exists {
            self.update_entity(&table_name, &columns, &value)?;
            DbEvent::Update(table_name, id)
        } else {
            self.insert_entity(&table_name, &columns, &value)?;
            DbEvent::Insert(table_name, id)
        };
        log::debug!("DB SAVE: {:?}", event);

        // Queue event for notification after commit
        self.pending_events.borrow_mut().push(event.clone());
        Ok(event)
    }

    pub fn query<E: DbEntity, P: Params>(&self, sql: &str, params: P) -> Result<Vec<E>> {
        let mut stmt = self.txn.prepare(sql)?;
        let entities = serde_rusqlite::from_rows::<E>(stmt.query(params)?)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    pub fn get<E: DbEntity>(&self, id: &str) -> Result<Option<E>> {
        let table_name = self.db.table_name_for_type::<E>()?;
        let sql = format!("SELECT * FROM {} WHERE id = ? LIMIT 1", table_name);
        Ok(self.query::<E, _>(&sql, [id])?.into_iter().next())
    }

    fn ensure_entity_id(&self, entity_value: &mut serde_json::Value) -> Result<String> {
        if !entity_value.is_object() {
            return Err(anyhow::anyhow!("Entity must serialize to a struct or map"));
        }
        match entity_value.get("id").and_then(|v| v.as_str()) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => {
                let new_id = Uuid::now_v7().to_string();
                entity_value["id"] = serde_json::Value::String(new_id.clone());
                Ok(new_id)
            }
        }
    }

    fn update_entity(&self, table_name: &str, column_names: &[String], entity_value: &serde_json::Value) -> Result<()> {
        let set_clause = column_names
            .iter()
            .filter(|col| *col != "id")
            .map(|col| format!("{} = :{}", col, col))
            .collect::<Vec<_>>()
            .join(", ");

        if set_clause.is_empty() {
            return Ok(()); // Nothing to update
        }

        let sql = format!("UPDATE {} SET {} WHERE id = :id", table_name, set_clause);
        self.execute_with_named_params(&sql, entity_value, column_names)
    }

    fn insert_entity(&self, table_name: &str, column_names: &[String], entity_value: &serde_json::Value) -> Result<()> {
        let placeholders = column_names
            .iter()
            .map(|col| format!(":{}", col))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table_name,
            column_names.join(", "),
            placeholders
        );
        self.execute_with_named_params(&sql, entity_value, column_names)
    }

    fn execute_with_named_params(&self, sql: &str, entity_value: &serde_json::Value, column_names: &[String]) -> Result<()> {
        let mut stmt = self.txn.prepare(sql)?;
        let str_refs: Vec<&str> = column_names.iter().map(|s| s.as_str()).collect();
        let params = serde_rusqlite::to_params_named_with_fields(entity_value, &str_refs)?;
        stmt.execute(params.to_slice().as_slice())?;
        Ok(())
    }

    pub(crate) fn take_pending_events(&self) -> Vec<DbEvent> {
        std::mem::take(&mut *self.pending_events.borrow_mut())
    }
}
