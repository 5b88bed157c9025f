//! # Bootstrap Module
//!
//! Creates the three system collections (`collections`, `users`, `apikeys`)
//! on first start, and inserts the first administrator if a bootstrap
//! configuration block is present. Both steps are idempotent: a duplicate
//! run against an already-initialized database is a no-op rather than an
//! error, so a server restart never fails bootstrap.

use sqlx::Row;

use crate::auth::password::hash_password;
use crate::collection::{new_record_id, CollectionDef};
use crate::column::Column;
use crate::database::Database;
use crate::errors::Error;
use crate::query_builder::{AggregateOp, QueryBuilder};
use crate::registry::Registry;
use crate::types::ColumnType;
use crate::value_binding::ScannedValue;

pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The `users` system collection's shape: identity attributes per the data
/// model, plus the bcrypt-family password hash.
pub fn users_collection_def() -> CollectionDef {
    let mut username = Column::new("username", ColumnType::String);
    username.nullable = false;
    username.unique = true;
    let mut email = Column::new("email", ColumnType::String);
    email.nullable = false;
    email.unique = true;
    let mut password_hash = Column::new("password_hash", ColumnType::String);
    password_hash.nullable = false;
    let mut role = Column::new("role", ColumnType::String);
    role.nullable = false;
    let mut can_write = Column::new("can_write", ColumnType::Boolean);
    can_write.nullable = false;

    CollectionDef::new("users", vec![username, email, password_hash, role, can_write])
}

/// The `apikeys` system collection's shape: a display name, the lookup
/// prefix, the constant-time-compared digest, and the capability pair the
/// key carries independent of any user.
pub fn apikeys_collection_def() -> CollectionDef {
    let mut name = Column::new("name", ColumnType::String);
    name.nullable = false;
    let description = Column::new("description", ColumnType::String);
    let mut prefix = Column::new("prefix", ColumnType::String);
    prefix.nullable = false;
    let mut hash = Column::new("hash", ColumnType::String);
    hash.nullable = false;
    let mut role = Column::new("role", ColumnType::String);
    role.nullable = false;
    let mut can_write = Column::new("can_write", ColumnType::Boolean);
    can_write.nullable = false;
    let mut created_at = Column::new("created_at", ColumnType::Datetime);
    created_at.nullable = false;
    let last_used_at = Column::new("last_used_at", ColumnType::Datetime);

    CollectionDef::new("apikeys", vec![name, description, prefix, hash, role, can_write, created_at, last_used_at])
}

/// Creates every system table that does not yet physically exist, then
/// loads the registry from the (now guaranteed to exist) `collections`
/// table.
pub async fn ensure_system_tables(db: &Database, registry: &Registry) -> Result<(), Error> {
    let physical = db.list_physical_tables().await?;
    let qb = QueryBuilder::new(db.dialect());

    for def in [Registry::system_collections_def(), users_collection_def(), apikeys_collection_def()] {
        if !physical.contains(&def.name) {
            let sql = qb.create_table(&def);
            db.exec(&sql, Default::default()).await?;
        }
    }

    registry.load().await
}

/// Inserts the first administrator if the `users` table is empty. A
/// duplicate run (users table already populated) is a no-op.
pub async fn bootstrap_admin(db: &Database, admin: &BootstrapAdmin) -> Result<(), Error> {
    let qb = QueryBuilder::new(db.dialect());
    let (count_sql, count_args) = qb.aggregate("users", AggregateOp::Count, None, false, &[])?;
    let row = db.query_row(&count_sql, count_args).await?;
    let count: i64 = row.map(|r| r.try_get::<i64, _>("value").unwrap_or(0)).unwrap_or(0);
    if count > 0 {
        return Ok(());
    }

    let hash = hash_password(&admin.password)?;
    let id = new_record_id();
    let (insert_sql, insert_args) = qb.insert(
        "users",
        &["id".to_string(), "username".to_string(), "email".to_string(), "password_hash".to_string(), "role".to_string(), "can_write".to_string()],
        &[
            ScannedValue::String(id),
            ScannedValue::String(admin.username.clone()),
            ScannedValue::String(admin.email.clone()),
            ScannedValue::String(hash),
            ScannedValue::String("admin".to_string()),
            ScannedValue::Boolean(true),
        ],
    );

    let mut tx = db.begin().await?;
    tx.exec(&insert_sql, insert_args).await?;
    tx.commit().await?;
    Ok(())
}
