//! Domain Layer
//!
//! Templates, questions, drafts and the pure rules over them (category
//! derivation, validation). No I/O happens here.

mod category;
mod error;
pub mod lenient;
mod question;
mod records;
mod template;
mod validation;

pub use category::{
    derive_categories, filter_templates, group_items_by_category, merge_custom_categories,
    CategoryFilter, CategoryOption, ItemGroup, ALL_LABEL,
};
pub use error::{
    DomainError, DomainResult, RemoteError, RemoteErrorKind, RemoteResult, ValidationError,
};
pub use question::{sort_items, ItemDraft, QuestionType, TemplateItem, MIN_CHOICE_OPTIONS};
pub use records::{ItemPatch, ItemRecord, NewItem, NewTemplate, TemplatePatch, TemplateRecord};
pub use template::{fallback_date, parse_remote_date, Template, TemplateDraft, TemplateOwner};
pub use validation::validate_template;
