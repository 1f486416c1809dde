//! Template Commands
//!
//! `TemplateManager` owns the loaded template list and runs every template
//! mutation: create, diff-based save and child-first delete. Only one
//! mutation may be in flight at a time.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::sync_cmd::{delete_items_best_effort, plan_item_sync, sync_items, SkippedDelete, SyncReport};
use crate::config::AppConfig;
use crate::domain::{
    derive_categories, merge_custom_categories, sort_items, validate_template, CategoryFilter,
    CategoryOption, DomainError, DomainResult, ItemDraft, RemoteError, RemoteErrorKind, Template,
    TemplateDraft, TemplateItem, ValidationError,
};
use crate::repository::RemoteTemplateStore;

/// Default number of templates requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Outcome of saving an edited template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveReport {
    pub sync: SyncReport,
    /// False when the list could not be reloaded afterwards
    pub refreshed: bool,
}

/// Outcome of deleting a template
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeleteReport {
    pub items_deleted: usize,
    pub skipped_deletes: Vec<SkippedDelete>,
}

impl DeleteReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped_deletes.len()
    }
}

/// Releases the in-progress flag when the mutation ends, however it ends
pub(crate) struct MutationGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct TemplateManager {
    store: Arc<dyn RemoteTemplateStore>,
    user_id: String,
    created_by: String,
    page_size: u32,
    templates: RwLock<Vec<Template>>,
    busy: AtomicBool,
}

impl TemplateManager {
    pub fn new(
        store: Arc<dyn RemoteTemplateStore>,
        user_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            created_by: created_by.into(),
            page_size: DEFAULT_PAGE_SIZE,
            templates: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn from_config(store: Arc<dyn RemoteTemplateStore>, config: &AppConfig) -> Self {
        Self::new(store, config.user_id.clone(), config.created_by.clone())
            .with_page_size(config.page_size)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether a create/save/delete is currently running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn begin_mutation(&self) -> DomainResult<MutationGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DomainError::Conflict("Another template change is still in progress".to_string()))?;
        Ok(MutationGuard { flag: &self.busy })
    }

    // ========================
    // Reads
    // ========================

    pub async fn templates(&self) -> Vec<Template> {
        self.templates.read().await.clone()
    }

    pub async fn template(&self, id: &str) -> Option<Template> {
        self.templates.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Filter categories for the loaded templates, "All" first
    pub async fn categories(&self) -> Vec<CategoryOption> {
        derive_categories(&self.templates.read().await)
    }

    /// Derived categories plus user-defined ones
    pub async fn categories_with_custom(&self, custom: &[String]) -> Vec<CategoryOption> {
        merge_custom_categories(self.categories().await, custom)
    }

    pub async fn templates_in(&self, filter: &CategoryFilter) -> Vec<Template> {
        self.templates
            .read()
            .await
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Reload the first page of the user's templates with their item counts
    pub async fn load_templates(&self) -> DomainResult<Vec<Template>> {
        let records = self
            .store
            .list_templates_by_user(&self.user_id, 1, self.page_size)
            .await
            .map_err(|e| e.into_kind(RemoteErrorKind::ListFailed))?;

        let mut loaded = Vec::with_capacity(records.len());
        for record in records {
            let item_count = match self.store.list_items_by_template(&record.id).await {
                Ok(items) => items.len(),
                Err(e) => {
                    tracing::warn!(template_id = %record.id, error = %e, "item count unavailable");
                    0
                }
            };
            loaded.push(Template::from_record(record, item_count));
        }

        tracing::debug!(count = loaded.len(), "templates loaded");
        *self.templates.write().await = loaded.clone();
        Ok(loaded)
    }

    /// Questions of a template in display order
    pub async fn load_template_items(&self, template_id: &str) -> DomainResult<Vec<TemplateItem>> {
        let records = self
            .store
            .list_items_by_template(template_id)
            .await
            .map_err(|e| e.into_kind(RemoteErrorKind::ListFailed))?;
        let mut items: Vec<TemplateItem> = records.into_iter().map(TemplateItem::from).collect();
        sort_items(&mut items);
        Ok(items)
    }

    /// Edit buffer for a loaded template
    pub async fn edit_draft(&self, template_id: &str) -> DomainResult<TemplateDraft> {
        let template = self.require_template(template_id).await?;
        let items = self.load_template_items(template_id).await?;
        Ok(TemplateDraft::from_template(&template, &items))
    }

    async fn require_template(&self, template_id: &str) -> DomainResult<Template> {
        self.template(template_id)
            .await
            .ok_or_else(|| DomainError::NotFound(format!("Template {}", template_id)))
    }

    fn require_editable(&self, template: &Template) -> DomainResult<()> {
        if template.owner.can_edit(&self.user_id) {
            Ok(())
        } else {
            Err(ValidationError::ReadOnlyTemplate.into())
        }
    }

    async fn refresh(&self) -> bool {
        match self.load_templates().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "template list refresh failed");
                false
            }
        }
    }

    // ========================
    // Mutations
    // ========================

    /// Validate and create a template with its questions
    pub async fn create_template(&self, draft: &TemplateDraft) -> DomainResult<Template> {
        let _guard = self.begin_mutation()?;

        let existing = self.templates().await;
        let mut draft = validate_template(draft, &existing, None)?;
        draft.items = detach_items(&draft.items);

        let create_failed = |e: RemoteError| e.into_kind(RemoteErrorKind::CreateFailed);

        let record = self
            .store
            .create_template(&draft.to_new_template(&self.created_by, &self.user_id))
            .await
            .map_err(create_failed)?;
        let template_id = record.id.clone();

        let plan = plan_item_sync(&template_id, &[], &draft.items);
        for new_item in &plan.creates {
            self.store.create_item(new_item).await.map_err(create_failed)?;
        }

        let template = Template::from_record(record, plan.creates.len());
        tracing::info!(template_id = %template.id, items = template.item_count, "template created");

        if !self.refresh().await {
            self.templates.write().await.push(template.clone());
        }
        Ok(template)
    }

    /// Save an edited template, syncing its questions with minimal calls
    pub async fn save_template(&self, template_id: &str, draft: &TemplateDraft) -> DomainResult<SaveReport> {
        let _guard = self.begin_mutation()?;

        let template = self.require_template(template_id).await?;
        let existing = self.templates().await;
        let draft = validate_template(draft, &existing, Some(template_id))?;
        self.require_editable(&template)?;

        self.store
            .update_template(template_id, &draft.to_patch())
            .await
            .map_err(|e| e.into_kind(RemoteErrorKind::SaveFailed))?;

        let sync = sync_items(self.store.as_ref(), template_id, &draft.items).await?;
        let refreshed = self.refresh().await;

        tracing::info!(template_id, refreshed, "template saved");
        Ok(SaveReport { sync, refreshed })
    }

    /// Delete a template's questions, then the template itself
    pub async fn delete_template(&self, template_id: &str) -> DomainResult<DeleteReport> {
        let _guard = self.begin_mutation()?;

        let template = self.require_template(template_id).await?;
        self.require_editable(&template)?;

        let items = self
            .store
            .list_items_by_template(template_id)
            .await
            .map_err(|e| e.into_kind(RemoteErrorKind::DeleteFailed))?;
        let ids: Vec<String> = items.into_iter().map(|record| record.id).collect();

        let (items_deleted, skipped_deletes) =
            delete_items_best_effort(self.store.as_ref(), template_id, &ids).await;

        self.store
            .delete_template(template_id)
            .await
            .map_err(|e| e.into_kind(RemoteErrorKind::DeleteFailed))?;

        self.templates.write().await.retain(|t| t.id != template_id);
        tracing::info!(
            template_id,
            items_deleted,
            skipped = skipped_deletes.len(),
            "template deleted"
        );
        Ok(DeleteReport {
            items_deleted,
            skipped_deletes,
        })
    }
}

/// Strip ids so every question is created fresh (e.g. duplicating a template)
pub fn detach_items(items: &[ItemDraft]) -> Vec<ItemDraft> {
    items
        .iter()
        .cloned()
        .map(|mut item| {
            item.id = None;
            item
        })
        .collect()
}
