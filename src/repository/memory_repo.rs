//! In-Memory Template Store
//!
//! Process-local implementation of the remote contract. Assigns sequential
//! ids, records every call it receives, and can be told to fail specific
//! operations, which makes it the store of choice for offline wiring and
//! tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::traits::RemoteTemplateStore;
use crate::domain::{
    ItemPatch, ItemRecord, NewItem, NewTemplate, RemoteError, RemoteErrorKind, RemoteResult,
    TemplateOwner, TemplatePatch, TemplateRecord,
};

/// Remote operation, used for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListTemplates,
    CreateTemplate,
    UpdateTemplate,
    DeleteTemplate,
    ListItems,
    CreateItem,
    UpdateItem,
    DeleteItem,
}

/// A call received by the store, with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListTemplates { user_id: String, page: u32, page_size: u32 },
    CreateTemplate(NewTemplate),
    UpdateTemplate { id: String, patch: TemplatePatch },
    DeleteTemplate(String),
    ListItems(String),
    CreateItem(NewItem),
    UpdateItem { id: String, patch: ItemPatch },
    DeleteItem(String),
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::ListTemplates { .. } => StoreOp::ListTemplates,
            StoreCall::CreateTemplate(_) => StoreOp::CreateTemplate,
            StoreCall::UpdateTemplate { .. } => StoreOp::UpdateTemplate,
            StoreCall::DeleteTemplate(_) => StoreOp::DeleteTemplate,
            StoreCall::ListItems(_) => StoreOp::ListItems,
            StoreCall::CreateItem(_) => StoreOp::CreateItem,
            StoreCall::UpdateItem { .. } => StoreOp::UpdateItem,
            StoreCall::DeleteItem(_) => StoreOp::DeleteItem,
        }
    }
}

struct Failure {
    op: StoreOp,
    /// None fails every call of `op`
    target: Option<String>,
    error: RemoteError,
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    templates: Vec<TemplateRecord>,
    items: Vec<ItemRecord>,
    calls: Vec<StoreCall>,
    failures: Vec<Failure>,
}

impl MemoryState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn record(&mut self, call: StoreCall) {
        self.calls.push(call);
    }

    fn check(&self, op: StoreOp, target: Option<&str>) -> RemoteResult<()> {
        let failure = self.failures.iter().find(|f| {
            f.op == op && (f.target.is_none() || f.target.as_deref() == target)
        });
        match failure {
            Some(f) => Err(f.error.clone()),
            None => Ok(()),
        }
    }
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// In-memory remote template store
#[derive(Default)]
pub struct MemoryTemplateStore {
    state: Mutex<MemoryState>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a template directly, bypassing call recording
    pub async fn seed_template(&self, mut record: TemplateRecord) -> TemplateRecord {
        let mut state = self.state.lock().await;
        if record.id.is_empty() {
            record.id = state.next_id();
        }
        state.templates.push(record.clone());
        record
    }

    /// Insert an item directly, bypassing call recording
    pub async fn seed_item(&self, mut record: ItemRecord) -> ItemRecord {
        let mut state = self.state.lock().await;
        if record.id.is_empty() {
            record.id = state.next_id();
        }
        state.items.push(record.clone());
        record
    }

    /// Make calls of `op` fail, either for one target id or for all
    pub async fn fail_on(&self, op: StoreOp, target: Option<&str>, error: RemoteError) {
        self.state.lock().await.failures.push(Failure {
            op,
            target: target.map(str::to_string),
            error,
        });
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Number of recorded calls of one kind
    pub async fn count(&self, op: StoreOp) -> usize {
        self.state.lock().await.calls.iter().filter(|c| c.op() == op).count()
    }

    pub async fn templates(&self) -> Vec<TemplateRecord> {
        self.state.lock().await.templates.clone()
    }

    /// Items of a template in storage order, bypassing call recording
    pub async fn items_of(&self, template_id: &str) -> Vec<ItemRecord> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .filter(|i| i.template_id == template_id)
            .cloned()
            .collect()
    }
}

fn not_found(kind: RemoteErrorKind, what: &str, id: &str) -> RemoteError {
    RemoteError::fatal(kind, format!("{} {} not found", what, id))
}

#[async_trait]
impl RemoteTemplateStore for MemoryTemplateStore {
    async fn list_templates_by_user(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> RemoteResult<Vec<TemplateRecord>> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::ListTemplates {
            user_id: user_id.to_string(),
            page,
            page_size,
        });
        state.check(StoreOp::ListTemplates, None)?;

        let skip = (page.max(1) - 1) as usize * page_size as usize;
        Ok(state
            .templates
            .iter()
            .filter(|t| match TemplateOwner::from_remote(t.user_id.as_deref()) {
                TemplateOwner::User(owner) => owner == user_id,
                TemplateOwner::Shared => true,
            })
            .skip(skip)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn create_template(&self, template: &NewTemplate) -> RemoteResult<TemplateRecord> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::CreateTemplate(template.clone()));
        state.check(StoreOp::CreateTemplate, None)?;

        let stamp = now_stamp();
        let record = TemplateRecord {
            id: state.next_id(),
            title: template.title.clone(),
            description: Some(template.description.clone()),
            temp_category: Some(template.temp_category.clone()),
            user_id: Some(template.user_id.clone()),
            created_by: Some(template.created_by.clone()),
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
        };
        state.templates.push(record.clone());
        Ok(record)
    }

    async fn update_template(&self, id: &str, patch: &TemplatePatch) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::UpdateTemplate {
            id: id.to_string(),
            patch: patch.clone(),
        });
        state.check(StoreOp::UpdateTemplate, Some(id))?;

        let record = state
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(RemoteErrorKind::UpdateFailed, "template", id))?;
        if let Some(title) = &patch.title {
            record.title = title.clone();
        }
        if let Some(description) = &patch.description {
            record.description = Some(description.clone());
        }
        if let Some(category) = &patch.temp_category {
            record.temp_category = Some(category.clone());
        }
        record.updated_at = Some(now_stamp());
        Ok(())
    }

    async fn delete_template(&self, id: &str) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::DeleteTemplate(id.to_string()));
        state.check(StoreOp::DeleteTemplate, Some(id))?;

        let before = state.templates.len();
        state.templates.retain(|t| t.id != id);
        if state.templates.len() == before {
            return Err(not_found(RemoteErrorKind::DeleteFailed, "template", id));
        }
        Ok(())
    }

    async fn list_items_by_template(&self, template_id: &str) -> RemoteResult<Vec<ItemRecord>> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::ListItems(template_id.to_string()));
        state.check(StoreOp::ListItems, Some(template_id))?;

        Ok(state
            .items
            .iter()
            .filter(|i| i.template_id == template_id)
            .cloned()
            .collect())
    }

    async fn create_item(&self, item: &NewItem) -> RemoteResult<ItemRecord> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::CreateItem(item.clone()));
        state.check(StoreOp::CreateItem, None)?;

        if !state.templates.iter().any(|t| t.id == item.template_id) {
            return Err(not_found(RemoteErrorKind::CreateFailed, "template", &item.template_id));
        }

        let record = ItemRecord {
            id: state.next_id(),
            template_id: item.template_id.clone(),
            category: Some(item.category.clone()),
            question_index: Some(item.question_index),
            text: item.text.clone(),
            question_type: Some(item.question_type.clone()),
            sort_order: Some(item.sort_order),
            options: item.options.clone().unwrap_or_default(),
        };
        state.items.push(record.clone());
        Ok(record)
    }

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::UpdateItem {
            id: id.to_string(),
            patch: patch.clone(),
        });
        state.check(StoreOp::UpdateItem, Some(id))?;

        let record = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found(RemoteErrorKind::UpdateFailed, "item", id))?;
        record.category = Some(patch.category.clone());
        record.text = patch.text.clone();
        record.question_index = Some(patch.question_index);
        record.question_type = Some(patch.question_type.clone());
        record.sort_order = Some(patch.sort_order);
        record.options = patch.options.clone().unwrap_or_default();
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> RemoteResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::DeleteItem(id.to_string()));
        state.check(StoreOp::DeleteItem, Some(id))?;

        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if state.items.len() == before {
            return Err(not_found(RemoteErrorKind::DeleteFailed, "item", id));
        }
        Ok(())
    }
}
