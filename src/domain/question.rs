//! Question Entity
//!
//! A single checklist entry belonging to a template, plus the editable draft
//! used by the create/edit modal.

use serde::{Deserialize, Serialize};

use super::records::ItemRecord;

/// Minimum number of options a choice question must carry
pub const MIN_CHOICE_OPTIONS: usize = 2;

/// Question type determines how an answer is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Free-text answer
    #[default]
    Text,
    /// Pick exactly one option
    SingleChoice,
    /// Pick any number of options
    MultipleChoice,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
        }
    }

    /// Unknown values fall back to `Text`
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "single_choice" => QuestionType::SingleChoice,
            "multiple_choice" => QuestionType::MultipleChoice,
            _ => QuestionType::Text,
        }
    }

    pub fn is_choice(&self) -> bool {
        !matches!(self, QuestionType::Text)
    }
}

/// A persisted question, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    /// Remote identifier (None until persisted)
    pub id: Option<String>,
    /// Owning template
    pub template_id: String,
    /// Sub-group within the template, used for display grouping
    pub category: String,
    /// Question prompt
    pub text: String,
    pub question_type: QuestionType,
    /// Choices; always empty for text questions
    pub options: Vec<String>,
    /// 1-based position
    pub question_index: u32,
    /// 1-based position, kept equal to `question_index`
    pub sort_order: u32,
}

impl From<ItemRecord> for TemplateItem {
    fn from(record: ItemRecord) -> Self {
        let question_type = record
            .question_type
            .as_deref()
            .map(QuestionType::from_str)
            .unwrap_or_default();
        let options = if question_type.is_choice() {
            record.options
        } else {
            Vec::new()
        };
        let sort_order = record.sort_order.or(record.question_index).unwrap_or(0);

        Self {
            id: Some(record.id).filter(|id| !id.trim().is_empty()),
            template_id: record.template_id,
            category: record.category.unwrap_or_default(),
            text: record.text,
            question_type,
            options,
            question_index: record.question_index.unwrap_or(sort_order),
            sort_order,
        }
    }
}

/// Sort items into display order
pub fn sort_items(items: &mut [TemplateItem]) {
    items.sort_by_key(|item| (item.sort_order, item.question_index));
}

/// One question in the edit buffer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    /// Present when the question already exists remotely
    pub id: Option<String>,
    pub category: String,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
}

impl ItemDraft {
    /// A new free-text question
    pub fn text(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            category: category.into(),
            text: text.into(),
            question_type: QuestionType::Text,
            options: Vec::new(),
        }
    }

    /// A new choice question
    pub fn choice<I, S>(
        category: impl Into<String>,
        text: impl Into<String>,
        question_type: QuestionType,
        options: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            category: category.into(),
            text: text.into(),
            question_type,
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Change the type, keeping the options consistent with it
    pub fn set_question_type(&mut self, question_type: QuestionType) {
        self.question_type = question_type;
        if question_type.is_choice() {
            while self.options.len() < MIN_CHOICE_OPTIONS {
                self.options.push(String::new());
            }
        } else {
            self.options.clear();
        }
    }

    /// Append a blank option (choice questions only)
    pub fn add_option(&mut self) -> bool {
        if !self.question_type.is_choice() {
            return false;
        }
        self.options.push(String::new());
        true
    }

    pub fn set_option(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.options.get_mut(index) {
            Some(option) => {
                *option = value.into();
                true
            }
            None => false,
        }
    }

    /// Remove an option; a choice question never drops below the minimum
    pub fn remove_option(&mut self, index: usize) -> bool {
        if index >= self.options.len() {
            return false;
        }
        if self.question_type.is_choice() && self.options.len() <= MIN_CHOICE_OPTIONS {
            return false;
        }
        self.options.remove(index);
        true
    }

    /// Options to send to the remote store for the current type
    pub fn payload_options(&self) -> Option<Vec<String>> {
        self.question_type.is_choice().then(|| self.options.clone())
    }
}

impl From<&TemplateItem> for ItemDraft {
    fn from(item: &TemplateItem) -> Self {
        Self {
            id: item.id.clone(),
            category: item.category.clone(),
            text: item.text.clone(),
            question_type: item.question_type,
            options: item.options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question_type: &str, options: Vec<&str>) -> ItemRecord {
        ItemRecord {
            id: "9".to_string(),
            template_id: "t1".to_string(),
            category: Some("General".to_string()),
            question_index: Some(2),
            text: "Exits clear?".to_string(),
            question_type: Some(question_type.to_string()),
            sort_order: Some(2),
            options: options.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_question_type_parsing() {
        assert_eq!(QuestionType::from_str("single_choice"), QuestionType::SingleChoice);
        assert_eq!(QuestionType::from_str("multiple_choice"), QuestionType::MultipleChoice);
        assert_eq!(QuestionType::from_str("rating"), QuestionType::Text);
        assert_eq!(QuestionType::MultipleChoice.as_str(), "multiple_choice");
    }

    #[test]
    fn test_record_mapping_drops_options_for_text() {
        let item = TemplateItem::from(record("text", vec!["stale"]));
        assert_eq!(item.question_type, QuestionType::Text);
        assert!(item.options.is_empty());
        assert_eq!(item.id.as_deref(), Some("9"));
        assert_eq!(item.sort_order, 2);
    }

    #[test]
    fn test_record_mapping_keeps_choice_options() {
        let item = TemplateItem::from(record("single_choice", vec!["Yes", "No"]));
        assert_eq!(item.options, vec!["Yes", "No"]);
    }

    #[test]
    fn test_switch_to_choice_seeds_options() {
        let mut draft = ItemDraft::text("General", "Extinguisher present?");
        draft.set_question_type(QuestionType::SingleChoice);
        assert_eq!(draft.options, vec![String::new(), String::new()]);

        draft.set_option(0, "Yes");
        draft.set_question_type(QuestionType::MultipleChoice);
        assert_eq!(draft.options[0], "Yes");

        draft.set_question_type(QuestionType::Text);
        assert!(draft.options.is_empty());
        assert_eq!(draft.payload_options(), None);
    }

    #[test]
    fn test_remove_option_keeps_minimum() {
        let mut draft = ItemDraft::choice("G", "Q", QuestionType::SingleChoice, ["A", "B"]);
        assert!(!draft.remove_option(0));
        assert!(draft.add_option());
        assert!(draft.remove_option(0));
        assert_eq!(draft.options, vec!["B".to_string(), String::new()]);
    }

    #[test]
    fn test_add_option_on_text_is_rejected() {
        let mut draft = ItemDraft::text("G", "Q");
        assert!(!draft.add_option());
        assert!(draft.options.is_empty());
    }
}
