//! # Transaction Module
//!
//! A thin wrapper around a `sqlx::Any` transaction shared by the registry,
//! reconciler, and auth bootstrap/rotation paths — every place the spec
//! requires a consistency-affecting operation to be atomic.
//!
//! Dropping a `Transaction` without calling [`Transaction::commit`] rolls it
//! back automatically (sqlx's own drop behavior), so a cancelled request
//! never leaves a half-applied DDL change behind.

use sqlx::any::AnyArguments;

use crate::database::Dialect;
use crate::errors::{classify_database_error, Error};

pub struct Transaction<'a> {
    tx: sqlx::Transaction<'a, sqlx::Any>,
    dialect: Dialect,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(tx: sqlx::Transaction<'a, sqlx::Any>, dialect: Dialect) -> Self {
        Self { tx, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn exec(&mut self, sql: &str, args: AnyArguments<'_>) -> Result<u64, Error> {
        sqlx::query_with(sql, args)
            .execute(&mut *self.tx)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| classify_database_error(e, self.dialect))
    }

    pub async fn query(&mut self, sql: &str, args: AnyArguments<'_>) -> Result<Vec<sqlx::any::AnyRow>, Error> {
        sqlx::query_with(sql, args)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| classify_database_error(e, self.dialect))
    }

    pub async fn query_row(&mut self, sql: &str, args: AnyArguments<'_>) -> Result<Option<sqlx::any::AnyRow>, Error> {
        sqlx::query_with(sql, args)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| classify_database_error(e, self.dialect))
    }

    pub async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await.map_err(|e| classify_database_error(e, self.dialect))
    }

    pub async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await.map_err(|e| classify_database_error(e, self.dialect))
    }
}
