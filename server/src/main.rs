//! `cellard` — binds the engine's subsystems to an HTTP surface. Startup
//! order mirrors spec §6: load configuration, connect, ensure the system
//! tables exist, bootstrap the first administrator if configured, reconcile
//! the registry against the live database, then serve.

use std::sync::Arc;

use cellar_engine::{bootstrap, reconcile, Database, ReconcilerConfig, Registry};

use cellar_server::config::Config;
use cellar_server::http;
use cellar_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        log::error!("configuration error: {e}");
        e
    })?;

    let db = Database::builder()
        .max_connections(config.database.max_connections)
        .connect(config.database.connection_string())
        .await
        .map_err(|e| {
            log::error!("database connection failed: {e}");
            e
        })?;
    db.ping().await?;

    let registry = Arc::new(Registry::new(db.clone()));
    bootstrap::ensure_system_tables(&db, &registry).await?;

    if let Some(admin) = &config.bootstrap {
        bootstrap::bootstrap_admin(
            &db,
            &bootstrap::BootstrapAdmin {
                username: admin.username.clone(),
                email: admin.email.clone(),
                password: admin.password.clone(),
            },
        )
        .await?;
        log::info!("bootstrap admin ensured for username '{}'", admin.username);
    }

    let reconciler_config = ReconcilerConfig {
        auto_repair: config.recovery.auto_repair,
        drop_orphans: config.recovery.drop_orphans,
        check_timeout: config.recovery.check_timeout,
    };
    let report = reconcile(&db, &registry, reconciler_config).await?;
    if report.timed_out {
        log::warn!("reconciler timed out after {:?}", config.recovery.check_timeout);
        if reconciler_config.auto_repair {
            return Err("reconciler timed out with auto_repair enabled; aborting startup".into());
        }
    }
    for entry in &report.entries {
        log::warn!("drift detected: {:?} '{}' repaired={}", entry.kind, entry.name, entry.repaired);
    }

    let state = Arc::new(AppState::new(db, registry, config.clone()));
    let app = http::dispatch::router(state);

    let listener = tokio::net::TcpListener::bind((config.host.host.as_str(), config.host.port)).await?;
    log::info!("cellard listening on {}:{}", config.host.host, config.host.port);
    axum::serve(listener, app).await?;

    Ok(())
}
