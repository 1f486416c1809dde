//! Category Derivation
//!
//! Filter categories are not a fixed list: they come from whatever templates
//! are currently loaded, with a synthetic "All" entry always first.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::question::TemplateItem;
use super::template::Template;

/// Display label of the synthetic all-categories entry
pub const ALL_LABEL: &str = "All";

/// A selectable category filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CategoryFilter {
    All,
    Named(String),
}

impl CategoryFilter {
    pub fn matches(&self, template: &Template) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => template.category == *name,
        }
    }
}

/// A category entry as shown in the filter bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub filter: CategoryFilter,
    pub label: String,
}

impl CategoryOption {
    fn all() -> Self {
        Self {
            filter: CategoryFilter::All,
            label: ALL_LABEL.to_string(),
        }
    }

    fn named(value: &str) -> Self {
        Self {
            filter: CategoryFilter::Named(value.to_string()),
            label: value.to_string(),
        }
    }
}

/// "All" followed by each distinct non-blank category, sorted
pub fn derive_categories(templates: &[Template]) -> Vec<CategoryOption> {
    let unique: BTreeSet<&str> = templates
        .iter()
        .map(|t| t.category.as_str())
        .filter(|c| !c.trim().is_empty())
        .collect();

    std::iter::once(CategoryOption::all())
        .chain(unique.into_iter().map(CategoryOption::named))
        .collect()
}

/// Add user-defined categories that no loaded template uses yet
pub fn merge_custom_categories(
    mut derived: Vec<CategoryOption>,
    custom: &[String],
) -> Vec<CategoryOption> {
    let mut names: BTreeSet<String> = derived
        .iter()
        .filter_map(|option| match &option.filter {
            CategoryFilter::Named(name) => Some(name.clone()),
            CategoryFilter::All => None,
        })
        .collect();
    names.extend(
        custom
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    );

    derived.truncate(1);
    derived.extend(names.iter().map(|n| CategoryOption::named(n)));
    derived
}

pub fn filter_templates<'a>(templates: &'a [Template], filter: &CategoryFilter) -> Vec<&'a Template> {
    templates.iter().filter(|t| filter.matches(t)).collect()
}

/// Questions sharing a category, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub category: String,
    pub items: Vec<TemplateItem>,
}

/// Group questions by category, groups ordered by first appearance
pub fn group_items_by_category(items: &[TemplateItem]) -> Vec<ItemGroup> {
    let mut groups: Vec<ItemGroup> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|g| g.category == item.category) {
            Some(group) => group.items.push(item.clone()),
            None => groups.push(ItemGroup {
                category: item.category.clone(),
                items: vec![item.clone()],
            }),
        }
    }
    groups
}
