//! Template Entity
//!
//! A reusable named checklist definition with a category and a set of
//! questions.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::question::{ItemDraft, TemplateItem};
use super::records::{NewTemplate, TemplatePatch, TemplateRecord};

/// Remote `user_id` values that mark a template as shared
const SHARED_OWNER_SENTINELS: [&str; 3] = ["", "0", "global"];

/// Who owns a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum TemplateOwner {
    /// Owned and editable by this user
    User(String),
    /// Global template, read-only for everyone
    Shared,
}

impl TemplateOwner {
    pub fn from_remote(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !SHARED_OWNER_SENTINELS.contains(&id) => TemplateOwner::User(id.to_string()),
            _ => TemplateOwner::Shared,
        }
    }

    pub fn can_edit(&self, user_id: &str) -> bool {
        match self {
            TemplateOwner::User(owner) => owner == user_id,
            TemplateOwner::Shared => false,
        }
    }
}

/// A template ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Free-text grouping label (`temp_category` remotely)
    pub category: String,
    pub created_date: NaiveDate,
    pub last_modified: NaiveDate,
    /// Number of questions, fetched separately from the template itself
    pub item_count: usize,
    pub owner: TemplateOwner,
}

impl Template {
    pub fn from_record(record: TemplateRecord, item_count: usize) -> Self {
        let created_date = parse_remote_date(record.created_at.as_deref());
        let last_modified = match record.updated_at.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_remote_date(Some(raw)),
            _ => created_date,
        };

        Self {
            owner: TemplateOwner::from_remote(record.user_id.as_deref()),
            id: record.id,
            title: record.title,
            description: record.description.unwrap_or_default(),
            category: record.temp_category.unwrap_or_default(),
            created_date,
            last_modified,
            item_count,
        }
    }
}

/// Date used when the remote store gives no usable timestamp (1970-01-01)
pub fn fallback_date() -> NaiveDate {
    NaiveDate::default()
}

/// Calendar date of a remote timestamp
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS` (either separator) and bare
/// dates.
pub fn parse_remote_date(raw: Option<&str>) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback_date();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return dt.date();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap_or_else(|_| fallback_date())
}

/// Edit buffer for the create/edit modal
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub title: String,
    pub category: String,
    pub description: String,
    pub items: Vec<ItemDraft>,
}

impl TemplateDraft {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            description: description.into(),
            items: Vec::new(),
        }
    }

    /// Buffer pre-filled from a loaded template and its questions
    pub fn from_template(template: &Template, items: &[TemplateItem]) -> Self {
        Self {
            title: template.title.clone(),
            category: template.category.clone(),
            description: template.description.clone(),
            items: items.iter().map(ItemDraft::from).collect(),
        }
    }

    pub fn with_item(mut self, item: ItemDraft) -> Self {
        self.items.push(item);
        self
    }

    /// Append a blank text question and return it for editing
    pub fn add_item(&mut self, category: impl Into<String>) -> &mut ItemDraft {
        self.items.push(ItemDraft::text(category, ""));
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    pub fn remove_item(&mut self, index: usize) -> Option<ItemDraft> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn to_new_template(&self, created_by: &str, user_id: &str) -> NewTemplate {
        NewTemplate {
            title: self.title.clone(),
            description: self.description.clone(),
            temp_category: self.category.clone(),
            created_by: created_by.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn to_patch(&self) -> TemplatePatch {
        TemplatePatch {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            temp_category: Some(self.category.clone()),
        }
    }
}
