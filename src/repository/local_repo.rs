//! Local Template Repository
//!
//! Legacy/offline template list and user-defined categories, stored as JSON
//! documents in the key-value store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::KeyValueStore;
use crate::domain::{DomainError, DomainResult, Template, TemplateItem, ValidationError};

pub const TEMPLATES_KEY: &str = "closed_templates";
pub const CUSTOM_CATEGORIES_KEY: &str = "custom_categories";

/// A template kept on the device together with its questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTemplate {
    pub template: Template,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

pub struct LocalTemplateRepository<K: KeyValueStore> {
    store: K,
}

impl<K: KeyValueStore> LocalTemplateRepository<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// Missing keys read as the empty value; corrupt documents are errors
    async fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> DomainResult<T> {
        match self.store.get(key).await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .map_err(|e| DomainError::Storage(format!("Corrupt '{}' document: {}", key, e))),
            _ => Ok(T::default()),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DomainResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw).await
    }

    // ========================
    // Templates
    // ========================

    pub async fn list_templates(&self) -> DomainResult<Vec<LocalTemplate>> {
        self.read_json(TEMPLATES_KEY).await
    }

    /// Insert or replace by id; a template without an id gets a local one
    pub async fn save_template(&self, mut entry: LocalTemplate) -> DomainResult<LocalTemplate> {
        let mut templates = self.list_templates().await?;

        if entry.template.id.trim().is_empty() {
            entry.template.id = next_local_id(&templates);
        }
        entry.template.item_count = entry.items.len();
        entry.template.last_modified = chrono::Local::now().date_naive();
        for item in entry.items.iter_mut() {
            item.template_id = entry.template.id.clone();
        }

        match templates.iter_mut().find(|t| t.template.id == entry.template.id) {
            Some(existing) => *existing = entry.clone(),
            None => templates.push(entry.clone()),
        }

        self.write_json(TEMPLATES_KEY, &templates).await?;
        tracing::debug!(template_id = %entry.template.id, "local template saved");
        Ok(entry)
    }

    /// Returns whether a template was removed
    pub async fn remove_template(&self, id: &str) -> DomainResult<bool> {
        let mut templates = self.list_templates().await?;
        let before = templates.len();
        templates.retain(|t| t.template.id != id);
        if templates.len() == before {
            return Ok(false);
        }
        self.write_json(TEMPLATES_KEY, &templates).await?;
        Ok(true)
    }

    // ========================
    // Custom categories
    // ========================

    pub async fn list_custom_categories(&self) -> DomainResult<Vec<String>> {
        self.read_json(CUSTOM_CATEGORIES_KEY).await
    }

    /// Returns false when the category already exists (case-insensitive)
    pub async fn add_custom_category(&self, name: &str) -> DomainResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyCategory.into());
        }

        let mut categories = self.list_custom_categories().await?;
        let lowered = name.to_lowercase();
        if categories.iter().any(|c| c.to_lowercase() == lowered) {
            return Ok(false);
        }
        categories.push(name.to_string());
        self.write_json(CUSTOM_CATEGORIES_KEY, &categories).await?;
        Ok(true)
    }

    pub async fn remove_custom_category(&self, name: &str) -> DomainResult<bool> {
        let mut categories = self.list_custom_categories().await?;
        let lowered = name.trim().to_lowercase();
        let before = categories.len();
        categories.retain(|c| c.to_lowercase() != lowered);
        if categories.len() == before {
            return Ok(false);
        }
        self.write_json(CUSTOM_CATEGORIES_KEY, &categories).await?;
        Ok(true)
    }

    /// Drop all locally stored templates and categories
    pub async fn clear(&self) -> DomainResult<()> {
        self.store.remove(&[TEMPLATES_KEY, CUSTOM_CATEGORIES_KEY]).await
    }
}

fn next_local_id(existing: &[LocalTemplate]) -> String {
    let base = format!("local-{}", chrono::Utc::now().timestamp_millis());
    let mut candidate = base.clone();
    let mut suffix = 1;
    while existing.iter().any(|t| t.template.id == candidate) {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    candidate
}
