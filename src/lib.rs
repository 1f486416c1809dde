//! Safety Templates Core
//!
//! Closed-inspection template management: checklist templates, their
//! questions, and the synchronization of edits with a remote template
//! service.
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and implementations
//! - commands: Template operations over the repositories

use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod domain;
pub mod repository;

pub use commands::{DeleteReport, SaveReport, SyncReport, TemplateManager};
pub use config::AppConfig;
pub use domain::{DomainError, DomainResult};

use repository::{
    init_db, DbState, HttpTemplateStore, LocalTemplateRepository, RemoteTemplateStore,
    SqliteKvStore,
};

/// Log file stem under the configured log directory
pub const APP_NAME: &str = "SafetyTemplates";

/// Application state shared by every caller
pub struct AppState {
    pub config: AppConfig,
    pub db_state: DbState,
    pub templates: TemplateManager,
    pub local: LocalTemplateRepository<SqliteKvStore>,
}

/// Wire the logger, the local database and the HTTP template store
pub async fn init(config: AppConfig) -> DomainResult<AppState> {
    let remote = HttpTemplateStore::from_config(&config)?;
    init_with_store(config, Arc::new(remote)).await
}

/// Same as [`init`], with a caller-supplied remote store
pub async fn init_with_store(
    config: AppConfig,
    remote: Arc<dyn RemoteTemplateStore>,
) -> DomainResult<AppState> {
    init_logging(&config)?;

    let db_path = config.db_path();
    let db_state = init_db(&db_path).await?;
    let _ = rolling_logger::info(&format!("Local database ready at {}", db_path.display()));

    let templates = TemplateManager::from_config(remote, &config);
    let local = LocalTemplateRepository::new(SqliteKvStore::new(db_state.conn.clone()));

    tracing::info!(
        user_id = %config.user_id,
        page_size = config.page_size,
        "template core initialized"
    );
    Ok(AppState {
        config,
        db_state,
        templates,
        local,
    })
}

fn init_logging(config: &AppConfig) -> DomainResult<()> {
    if rolling_logger::is_initialized() {
        tracing::debug!("logger already initialized, keeping it");
        return Ok(());
    }

    let options = rolling_logger::LoggerOptions {
        level: config.log_level.clone(),
        ..Default::default()
    };
    match rolling_logger::init_logger_with(config.log_dir(), APP_NAME, options) {
        Ok(()) => Ok(()),
        // a concurrent init got there first
        Err(_) if rolling_logger::is_initialized() => Ok(()),
        Err(e) => Err(DomainError::Config(format!("Failed to init logger: {}", e))),
    }
}
