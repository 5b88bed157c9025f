//! # Consistency Reconciler Module
//!
//! At startup, the registry's view of the world (what `collections` says
//! should exist) and the database's view of the world (what tables and
//! columns are physically present) can drift apart — a crash mid-migration,
//! a manual `DROP TABLE`, a restore from an older backup. This module
//! diffs the two and, depending on configuration, repairs the gap or just
//! reports it.

use std::time::Duration;

use serde::Serialize;

use crate::collection::{ID_COLUMN, ROWID_COLUMN};
use crate::database::Database;
use crate::errors::Error;
use crate::query_builder::QueryBuilder;
use crate::registry::Registry;

#[derive(Clone, Copy, Debug)]
pub struct ReconcilerConfig {
    /// Create physical tables/columns the registry knows about but the
    /// database is missing.
    pub auto_repair: bool,
    /// Drop physical tables present in the database but absent from the
    /// registry. Off by default — an orphan table is more likely a
    /// mid-migration artifact worth a human looking at than garbage.
    pub drop_orphans: bool,
    /// Upper bound on how long the startup check is allowed to run before
    /// it gives up and reports what it found so far.
    pub check_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { auto_repair: true, drop_orphans: false, check_timeout: Duration::from_secs(30) }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    MissingTable,
    MissingColumn,
    OrphanTable,
}

#[derive(Clone, Debug, Serialize)]
pub struct DriftEntry {
    pub kind: DriftKind,
    pub name: String,
    pub repaired: bool,
}

#[derive(Clone, Debug, Serialize, Default)]
pub struct ReconcileReport {
    pub entries: Vec<DriftEntry>,
    pub timed_out: bool,
}

/// Compares the registry's declared collections against the database's
/// physical tables/columns and repairs or reports the difference per
/// `config`. The whole pass runs under `config.check_timeout`; a deadline
/// that elapses mid-pass yields a report with `timed_out: true` rather than
/// an error, so a caller with `auto_repair=false` can still proceed with
/// whatever was found so far.
pub async fn reconcile(db: &Database, registry: &Registry, config: ReconcilerConfig) -> Result<ReconcileReport, Error> {
    match tokio::time::timeout(config.check_timeout, reconcile_pass(db, registry, config)).await {
        Ok(result) => result,
        Err(_elapsed) => Ok(ReconcileReport { entries: Vec::new(), timed_out: true }),
    }
}

async fn reconcile_pass(db: &Database, registry: &Registry, config: ReconcilerConfig) -> Result<ReconcileReport, Error> {
    let mut report = ReconcileReport::default();

    let physical_tables = db.list_physical_tables().await?;
    let declared = registry.list();

    for def in &declared {
        if !physical_tables.contains(&def.name) {
            let repaired = if config.auto_repair {
                let qb = QueryBuilder::new(db.dialect());
                let sql = qb.create_table(def);
                db.exec(&sql, Default::default()).await?;
                true
            } else {
                false
            };
            report.entries.push(DriftEntry { kind: DriftKind::MissingTable, name: def.name.clone(), repaired });
            continue;
        }

        let physical_columns = db.list_physical_columns(&def.name).await?;
        for col in &def.columns {
            if !physical_columns.iter().any(|c| c == &col.name) {
                let repaired = if config.auto_repair {
                    let qb = QueryBuilder::new(db.dialect());
                    let sql = qb.alter_add_column(&def.name, col);
                    db.exec(&sql, Default::default()).await?;
                    true
                } else {
                    false
                };
                report.entries.push(DriftEntry {
                    kind: DriftKind::MissingColumn,
                    name: format!("{}.{}", def.name, col.name),
                    repaired,
                });
            }
        }

        let expected_system_cols = [ID_COLUMN, ROWID_COLUMN];
        for sys_col in expected_system_cols {
            if !physical_columns.iter().any(|c| c == sys_col) {
                report.entries.push(DriftEntry {
                    kind: DriftKind::MissingColumn,
                    name: format!("{}.{}", def.name, sys_col),
                    repaired: false,
                });
            }
        }
    }

    let declared_names: Vec<&str> = declared.iter().map(|d| d.name.as_str()).collect();
    for table in &physical_tables {
        if table == "collections" || table == "users" || table == "apikeys" {
            continue;
        }
        if declared_names.contains(&table.as_str()) {
            continue;
        }
        let repaired = if config.drop_orphans {
            let qb = QueryBuilder::new(db.dialect());
            let sql = qb.drop_table(table);
            db.exec(&sql, Default::default()).await?;
            true
        } else {
            false
        };
        report.entries.push(DriftEntry { kind: DriftKind::OrphanTable, name: table.clone(), repaired });
    }

    Ok(report)
}
