//! Commands Layer
//!
//! Template Management Core operations called by the presentation layer.

mod sync_cmd;
mod template_cmd;

#[cfg(test)]
mod tests;

pub use sync_cmd::{plan_item_sync, sync_items, ItemSyncPlan, SkippedDelete, SyncReport};
pub use template_cmd::{detach_items, DeleteReport, SaveReport, TemplateManager, DEFAULT_PAGE_SIZE};
