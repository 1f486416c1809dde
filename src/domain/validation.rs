//! Template Validation
//!
//! Gate for create and edit submissions. Runs entirely locally, before any
//! remote call, and returns the trimmed draft that will be submitted.

use std::collections::HashSet;

use super::error::ValidationError;
use super::question::{ItemDraft, MIN_CHOICE_OPTIONS};
use super::template::{Template, TemplateDraft};

/// Validate a draft against the loaded templates
///
/// `editing_id` excludes the template being edited from the duplicate check.
/// Only `existing` is consulted, so duplicates beyond the loaded page go
/// undetected.
pub fn validate_template(
    draft: &TemplateDraft,
    existing: &[Template],
    editing_id: Option<&str>,
) -> Result<TemplateDraft, ValidationError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let category = draft.category.trim();
    if category.is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    let description = draft.description.trim();
    if description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    if draft.items.is_empty()
        || draft
            .items
            .iter()
            .any(|item| item.text.trim().is_empty() || item.category.trim().is_empty())
    {
        return Err(ValidationError::NoItems);
    }

    if draft.items.iter().any(|item| !choice_options_valid(item)) {
        return Err(ValidationError::InvalidChoiceOptions);
    }

    if has_repeated_ids(&draft.items) {
        return Err(ValidationError::RepeatedItem);
    }

    if is_duplicate(title, category, existing, editing_id) {
        return Err(ValidationError::DuplicateTemplate);
    }

    Ok(TemplateDraft {
        title: title.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        items: draft.items.iter().map(normalize_item).collect(),
    })
}

fn choice_options_valid(item: &ItemDraft) -> bool {
    if !item.question_type.is_choice() {
        return true;
    }
    item.options.len() >= MIN_CHOICE_OPTIONS && item.options.iter().all(|o| !o.trim().is_empty())
}

fn has_repeated_ids(items: &[ItemDraft]) -> bool {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| item.id.as_deref().map(str::trim))
        .filter(|id| !id.is_empty())
        .any(|id| !seen.insert(id))
}

fn is_duplicate(title: &str, category: &str, existing: &[Template], editing_id: Option<&str>) -> bool {
    let title = title.to_lowercase();
    let category = category.to_lowercase();
    existing
        .iter()
        .filter(|t| editing_id != Some(t.id.as_str()))
        .any(|t| {
            t.title.trim().to_lowercase() == title && t.category.trim().to_lowercase() == category
        })
}

fn normalize_item(item: &ItemDraft) -> ItemDraft {
    let options = if item.question_type.is_choice() {
        item.options.iter().map(|o| o.trim().to_string()).collect()
    } else {
        Vec::new()
    };

    ItemDraft {
        id: item
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        category: item.category.trim().to_string(),
        text: item.text.trim().to_string(),
        question_type: item.question_type,
        options,
    }
}
