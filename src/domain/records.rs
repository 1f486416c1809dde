//! Remote Records
//!
//! Shapes exchanged with the remote template store. Field names follow the
//! remote API (`temp_category`, `user_id`, ...); mapping into display types
//! lives next to those types.

use serde::{Deserialize, Serialize};

use super::lenient;

/// Template as returned by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub temp_category: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string_or_number")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string_or_number")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Template item as returned by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub template_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_u32")]
    pub question_index: Option<u32>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub text: String,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_u32")]
    pub sort_order: Option<u32>,
    #[serde(default, deserialize_with = "lenient::options_list")]
    pub options: Vec<String>,
}

/// Payload for `createTemplate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub title: String,
    pub description: String,
    pub temp_category: String,
    pub created_by: String,
    pub user_id: String,
}

/// Payload for `updateTemplate`; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_category: Option<String>,
}

/// Payload for `createItem`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub template_id: String,
    pub category: String,
    pub question_index: u32,
    pub text: String,
    pub question_type: String,
    pub sort_order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Payload for `updateItem`
///
/// `options` is always sent: `null` clears options left over from a
/// previous choice type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub category: String,
    pub text: String,
    pub question_index: u32,
    pub question_type: String,
    pub sort_order: u32,
    pub options: Option<Vec<String>>,
}
