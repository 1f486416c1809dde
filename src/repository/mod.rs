//! Repository Layer
//!
//! Collaborator contracts and their implementations.

mod db;
mod local_repo;
mod memory_repo;
mod remote_repo;
mod traits;


pub use db::{init_db, DbState, SqliteKvStore, IN_MEMORY_PATH};
pub use local_repo::{LocalTemplate, LocalTemplateRepository, CUSTOM_CATEGORIES_KEY, TEMPLATES_KEY};
pub use memory_repo::{MemoryTemplateStore, StoreCall, StoreOp};
pub use remote_repo::{status_error, HttpTemplateStore};
pub use traits::{KeyValueStore, RemoteTemplateStore};
