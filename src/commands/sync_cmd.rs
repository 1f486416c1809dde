//! Item Synchronization
//!
//! Reconciles an edited question list against the remote store using only
//! per-item create/update/delete calls. Planning is pure; execution runs the
//! phases in order (delete, create, update), one awaited call at a time.

use serde::Serialize;

use crate::domain::{
    DomainResult, ItemDraft, ItemPatch, NewItem, RemoteError, RemoteErrorKind, TemplateItem,
};
use crate::repository::RemoteTemplateStore;

/// Remote calls needed to bring a template's items in line with the buffer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemSyncPlan {
    /// Remote ids missing from the buffer, in remote order
    pub deletes: Vec<String>,
    /// Buffer items without an id, appended after the existing ones
    pub creates: Vec<NewItem>,
    /// Buffer items with an id, renumbered densely from 1
    pub updates: Vec<(String, ItemPatch)>,
}

impl ItemSyncPlan {
    pub fn call_count(&self) -> usize {
        self.deletes.len() + self.creates.len() + self.updates.len()
    }
}

/// Build the minimal call plan for `items`, given the ids currently stored
///
/// `items` is expected to be validated. Every item whose id is currently
/// stored is updated, changed or not. An id the template does not hold, or
/// the second copy of a repeated id, is created as a new item.
pub fn plan_item_sync(template_id: &str, current_ids: &[String], items: &[ItemDraft]) -> ItemSyncPlan {
    let mut kept: Vec<&str> = Vec::new();
    let mut with_id: Vec<&ItemDraft> = Vec::new();
    let mut without_id: Vec<&ItemDraft> = Vec::new();
    for item in items {
        match item.id.as_deref() {
            Some(id) if current_ids.iter().any(|c| c == id) && !kept.contains(&id) => {
                kept.push(id);
                with_id.push(item);
            }
            _ => without_id.push(item),
        }
    }

    let deletes = current_ids
        .iter()
        .filter(|id| !kept.contains(&id.as_str()))
        .cloned()
        .collect();

    let offset = with_id.len();
    let creates = without_id
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let order = (offset + position + 1) as u32;
            NewItem {
                template_id: template_id.to_string(),
                category: item.category.clone(),
                question_index: order,
                text: item.text.clone(),
                question_type: item.question_type.as_str().to_string(),
                sort_order: order,
                options: item.payload_options(),
            }
        })
        .collect();

    let updates = with_id
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let id = item.id.clone()?;
            let order = (position + 1) as u32;
            Some((
                id,
                ItemPatch {
                    category: item.category.clone(),
                    text: item.text.clone(),
                    question_index: order,
                    question_type: item.question_type.as_str().to_string(),
                    sort_order: order,
                    options: item.payload_options(),
                },
            ))
        })
        .collect();

    ItemSyncPlan {
        deletes,
        creates,
        updates,
    }
}

/// A best-effort delete that failed and was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDelete {
    pub id: String,
    pub error: RemoteError,
}

/// Outcome of a synchronization run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub deleted: usize,
    pub created: Vec<TemplateItem>,
    pub updated: usize,
    pub skipped_deletes: Vec<SkippedDelete>,
}

impl SyncReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped_deletes.len()
    }

    /// Whether any skipped delete could succeed if tried again
    pub fn has_retryable_skips(&self) -> bool {
        self.skipped_deletes.iter().any(|s| s.error.retryable)
    }
}

/// Delete each id, logging and collecting failures instead of stopping
pub(crate) async fn delete_items_best_effort<S>(
    store: &S,
    template_id: &str,
    ids: &[String],
) -> (usize, Vec<SkippedDelete>)
where
    S: RemoteTemplateStore + ?Sized,
{
    let mut deleted = 0;
    let mut skipped = Vec::new();
    for id in ids {
        match store.delete_item(id).await {
            Ok(()) => deleted += 1,
            Err(error) => {
                tracing::warn!(
                    template_id,
                    item_id = %id,
                    retryable = error.retryable,
                    error = %error,
                    "item delete failed, skipping"
                );
                skipped.push(SkippedDelete {
                    id: id.clone(),
                    error,
                });
            }
        }
    }
    (deleted, skipped)
}

/// Apply `items` (already validated) to the template's remote item list
///
/// Create and update failures abort with `SaveFailed`; changes applied
/// before the failure stay applied.
pub async fn sync_items<S>(store: &S, template_id: &str, items: &[ItemDraft]) -> DomainResult<SyncReport>
where
    S: RemoteTemplateStore + ?Sized,
{
    let save_failed = |e: RemoteError| e.into_kind(RemoteErrorKind::SaveFailed);

    let current = store
        .list_items_by_template(template_id)
        .await
        .map_err(save_failed)?;
    let current_ids: Vec<String> = current.into_iter().map(|record| record.id).collect();

    let plan = plan_item_sync(template_id, &current_ids, items);
    tracing::debug!(
        template_id,
        deletes = plan.deletes.len(),
        creates = plan.creates.len(),
        updates = plan.updates.len(),
        "item sync planned"
    );

    let mut report = SyncReport::default();

    let (deleted, skipped) = delete_items_best_effort(store, template_id, &plan.deletes).await;
    report.deleted = deleted;
    report.skipped_deletes = skipped;

    for new_item in &plan.creates {
        let record = store.create_item(new_item).await.map_err(save_failed)?;
        report.created.push(TemplateItem::from(record));
    }

    for (id, patch) in &plan.updates {
        store.update_item(id, patch).await.map_err(save_failed)?;
        report.updated += 1;
    }

    tracing::info!(
        template_id,
        deleted = report.deleted,
        created = report.created.len(),
        updated = report.updated,
        skipped = report.skipped_count(),
        "item sync complete"
    );
    Ok(report)
}
