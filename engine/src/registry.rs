//! # Registry Module
//!
//! The in-memory mirror of the `collections` system table: every read of a
//! collection's shape goes through this `RwLock`-guarded map rather than
//! touching the database, so a hot request path never pays for a schema
//! lookup. Every write goes through the database first — the system table
//! row is the source of truth, the in-memory map is a cache kept
//! synchronously consistent with it inside the same transaction that
//! changes the physical table.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::collection::CollectionDef;
use crate::column::Column;
use crate::database::Database;
use crate::errors::Error;
use crate::query_builder::QueryBuilder;

/// The system collection that stores every user-defined collection's shape
/// as a JSON-encoded column list, so the registry can rebuild its in-memory
/// map from the database alone after a restart.
const COLLECTIONS_TABLE: &str = "collections";

pub struct Registry {
    db: Database,
    collections: RwLock<HashMap<String, CollectionDef>>,
}

impl Registry {
    pub fn new(db: Database) -> Self {
        Self { db, collections: RwLock::new(HashMap::new()) }
    }

    /// Loads every row of the `collections` system table into memory. Called
    /// once at startup, after [`crate::bootstrap`] has ensured the system
    /// tables exist.
    pub async fn load(&self) -> Result<(), Error> {
        let qb = QueryBuilder::new(self.db.dialect());
        let (sql, args) = qb.select(COLLECTIONS_TABLE, &[], &[], &[], None, None);
        let rows = self.db.query(&sql, args).await?;

        let mut map = HashMap::new();
        for row in rows {
            use sqlx::Row;
            let name: String = row.try_get("name").map_err(|e| Error::Database(e))?;
            let schema_json: String = row.try_get("schema").map_err(|e| Error::Database(e))?;
            let columns: Vec<Column> = serde_json::from_str(&schema_json)
                .map_err(|e| Error::Internal(format!("corrupt schema for collection '{name}': {e}")))?;
            map.insert(name.clone(), CollectionDef::new(name, columns));
        }

        *self.collections.write().expect("registry lock poisoned") = map;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<CollectionDef> {
        self.collections.read().expect("registry lock poisoned").get(name).cloned()
    }

    pub fn list(&self) -> Vec<CollectionDef> {
        let mut defs: Vec<CollectionDef> = self.collections.read().expect("registry lock poisoned").values().cloned().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn exists(&self, name: &str) -> bool {
        self.collections.read().expect("registry lock poisoned").contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.collections.read().expect("registry lock poisoned").len()
    }

    /// Registers a brand-new collection: validates the definition, creates
    /// its physical table, records its shape in the `collections` system
    /// table, and only then makes it visible in memory. All three happen
    /// inside one transaction; a failure at any step leaves nothing behind.
    pub async fn register(&self, def: CollectionDef) -> Result<CollectionDef, Error> {
        def.validate()?;
        if self.exists(&def.name) {
            return Err(Error::conflict(format!("collection '{}' already exists", def.name)));
        }

        let qb = QueryBuilder::new(self.db.dialect());
        let create_sql = qb.create_table(&def);
        let schema_json = serde_json::to_string(&def.columns)
            .map_err(|e| Error::Internal(format!("could not serialize schema: {e}")))?;
        let record_id = crate::collection::new_record_id();
        let (insert_sql, insert_args) = qb.insert(
            COLLECTIONS_TABLE,
            &["id".to_string(), "name".to_string(), "schema".to_string()],
            &[
                crate::value_binding::ScannedValue::String(record_id),
                crate::value_binding::ScannedValue::String(def.name.clone()),
                crate::value_binding::ScannedValue::String(schema_json),
            ],
        );

        let mut tx = self.db.begin().await?;
        tx.exec(&create_sql, Default::default()).await?;
        tx.exec(&insert_sql, insert_args).await?;
        tx.commit().await?;

        self.collections.write().expect("registry lock poisoned").insert(def.name.clone(), def.clone());
        Ok(def)
    }

    /// Renames a collection. Both the physical table and the system-table
    /// row are updated inside one transaction.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<CollectionDef, Error> {
        let new_name = CollectionDef::normalize_name(new_name)?;
        let mut def = self.get(old_name).ok_or_else(|| Error::not_found(format!("collection '{old_name}' not found")))?;
        if self.exists(&new_name) {
            return Err(Error::conflict(format!("collection '{new_name}' already exists")));
        }

        let qb = QueryBuilder::new(self.db.dialect());
        let rename_sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            self.db.dialect().quote_identifier(old_name),
            self.db.dialect().quote_identifier(&new_name)
        );
        let (update_sql, update_args) = qb.update(
            COLLECTIONS_TABLE,
            &[("name".to_string(), crate::value_binding::ScannedValue::String(new_name.clone()))],
            &[single_eq_condition("name", old_name)],
        )?;

        let mut tx = self.db.begin().await?;
        tx.exec(&rename_sql, Default::default()).await?;
        tx.exec(&update_sql, update_args).await?;
        tx.commit().await?;

        def.name = new_name.clone();
        let mut guard = self.collections.write().expect("registry lock poisoned");
        guard.remove(old_name);
        guard.insert(new_name, def.clone());
        Ok(def)
    }

    /// Adds a column to an existing collection.
    pub async fn add_column(&self, collection: &str, column: Column) -> Result<CollectionDef, Error> {
        column.validate()?;
        let mut def = self.get(collection).ok_or_else(|| Error::not_found(format!("collection '{collection}' not found")))?;
        if def.column(&column.name).is_some() {
            return Err(Error::conflict(format!("column '{}' already exists", column.name)));
        }
        def.columns.push(column.clone());

        let qb = QueryBuilder::new(self.db.dialect());
        let alter_sql = qb.alter_add_column(collection, &column);
        self.persist_schema_change(collection, &def, &[alter_sql]).await?;
        Ok(def)
    }

    /// Drops a column from an existing collection.
    pub async fn drop_column(&self, collection: &str, column: &str) -> Result<CollectionDef, Error> {
        let mut def = self.get(collection).ok_or_else(|| Error::not_found(format!("collection '{collection}' not found")))?;
        if def.column(column).is_none() {
            return Err(Error::not_found(format!("column '{column}' not found")));
        }

        let qb = QueryBuilder::new(self.db.dialect());
        let alter_statements = qb.alter_drop_column(&def, column);
        def.columns.retain(|c| c.name != column);
        self.persist_schema_change(collection, &def, &alter_statements).await?;
        Ok(def)
    }

    /// Drops an entire collection: physical table, system-table row, and
    /// in-memory entry, all inside one transaction.
    pub async fn drop(&self, collection: &str) -> Result<(), Error> {
        if !self.exists(collection) {
            return Err(Error::not_found(format!("collection '{collection}' not found")));
        }

        let qb = QueryBuilder::new(self.db.dialect());
        let drop_sql = qb.drop_table(collection);
        let (delete_sql, delete_args) = qb.delete(COLLECTIONS_TABLE, &[single_eq_condition("name", collection)])?;

        let mut tx = self.db.begin().await?;
        tx.exec(&drop_sql, Default::default()).await?;
        tx.exec(&delete_sql, delete_args).await?;
        tx.commit().await?;

        self.collections.write().expect("registry lock poisoned").remove(collection);
        Ok(())
    }

    /// Runs a set of DDL statements against the physical table and persists
    /// the updated schema JSON to the system table, then updates the
    /// in-memory map — used by `add_column`/`drop_column`.
    async fn persist_schema_change(&self, collection: &str, def: &CollectionDef, ddl: &[String]) -> Result<(), Error> {
        let qb = QueryBuilder::new(self.db.dialect());
        let schema_json = serde_json::to_string(&def.columns)
            .map_err(|e| Error::Internal(format!("could not serialize schema: {e}")))?;
        let (update_sql, update_args) = qb.update(
            COLLECTIONS_TABLE,
            &[("schema".to_string(), crate::value_binding::ScannedValue::String(schema_json))],
            &[single_eq_condition("name", collection)],
        )?;

        let mut tx = self.db.begin().await?;
        for statement in ddl {
            tx.exec(statement, Default::default()).await?;
        }
        tx.exec(&update_sql, update_args).await?;
        tx.commit().await?;

        self.collections.write().expect("registry lock poisoned").insert(collection.to_string(), def.clone());
        Ok(())
    }

    /// Returns the `CollectionDef` describing the `collections` system table
    /// itself, used by bootstrap to create it before anything else.
    pub fn system_collections_def() -> CollectionDef {
        let mut name_col = Column::new("name", crate::types::ColumnType::String);
        name_col.nullable = false;
        name_col.unique = true;
        let mut schema_col = Column::new("schema", crate::types::ColumnType::Text);
        schema_col.nullable = false;

        CollectionDef::new(COLLECTIONS_TABLE, vec![name_col, schema_col])
    }
}

fn single_eq_condition(field: &str, value: &str) -> crate::filter::Condition {
    crate::filter::Condition {
        field: field.to_string(),
        operator: crate::filter::Operator::Eq,
        null_polarity: true,
        values: vec![crate::value_binding::ScannedValue::String(value.to_string())],
    }
}
