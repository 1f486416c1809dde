//! Repository Layer - Core Traits
//!
//! Contracts for the two collaborators the core talks to. Implementations can
//! be HTTP, SQLite, in-memory, etc.

use async_trait::async_trait;

use crate::domain::{
    DomainResult, ItemPatch, ItemRecord, NewItem, NewTemplate, RemoteResult, TemplatePatch,
    TemplateRecord,
};

/// Paginated CRUD service for templates and their items
///
/// The store does not cascade: deleting a template leaves its items behind,
/// so callers delete items first.
#[async_trait]
pub trait RemoteTemplateStore: Send + Sync {
    /// One page of the user's templates (pages start at 1)
    async fn list_templates_by_user(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> RemoteResult<Vec<TemplateRecord>>;

    /// Create a template; the store assigns the id
    async fn create_template(&self, template: &NewTemplate) -> RemoteResult<TemplateRecord>;

    async fn update_template(&self, id: &str, patch: &TemplatePatch) -> RemoteResult<()>;

    async fn delete_template(&self, id: &str) -> RemoteResult<()>;

    async fn list_items_by_template(&self, template_id: &str) -> RemoteResult<Vec<ItemRecord>>;

    /// Create a single item; the store assigns the id
    async fn create_item(&self, item: &NewItem) -> RemoteResult<ItemRecord>;

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> RemoteResult<()>;

    async fn delete_item(&self, id: &str) -> RemoteResult<()>;
}

/// Local string-keyed persistence
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> DomainResult<()>;

    /// Remove several keys at once; missing keys are ignored
    async fn remove(&self, keys: &[&str]) -> DomainResult<()>;
}
