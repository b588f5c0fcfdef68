//! # Authorization Backend Application
//!
//! Entry point for the multi-tenant RBAC service. Startup sequence:
//!
//! 1. Structured logging (tracing, env-filter honored)
//! 2. `.env` loading and typed settings (`Settings::from_env`)
//! 3. Database pool + idempotent migrations
//! 4. Shared application state (settings, store, audit logger)
//! 5. Router assembly and network bind
//!
//! Exit codes: `0` clean shutdown, `1` configuration error, `2` store
//! unreachable at startup.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use auth_backend::audit::AuditLogger;
use auth_backend::config::Settings;
use auth_backend::crypto::FieldCipher;
use auth_backend::database::{self, AuthStore, Tables};
use auth_backend::handlers::{self, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenv::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!("configuration error: {}", err);
            return ExitCode::from(1);
        }
    };

    let pool = match database::init_database(&settings).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!("store unreachable: {}", err);
            return ExitCode::from(2);
        }
    };

    let tables = Tables::new(settings.database_schema.as_deref());
    let cipher = FieldCipher::new(settings.enable_encryption, &settings.encryption_key);
    let store = AuthStore::new(pool.clone(), tables.clone(), cipher);
    let audit = AuditLogger::new(pool.clone(), tables.audit_log.clone(), settings.enable_audit_logging);

    let addr = settings.bind_addr();
    let state = Arc::new(AppState {
        settings,
        store,
        audit,
    });

    let app = handlers::router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind {}: {}", addr, err);
            return ExitCode::from(1);
        }
    };
    tracing::info!("server running at http://{}", addr);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", err);
        return ExitCode::from(1);
    }

    // Documented teardown: the pool closes when the last handle drops, but
    // close it explicitly so in-flight connections drain before exit.
    pool.close().await;
    ExitCode::SUCCESS
}
