//! Command Integration Tests
//!
//! `TemplateManager` flows against the in-memory remote store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::commands::{TemplateManager, DEFAULT_PAGE_SIZE};
    use crate::domain::{
        CategoryFilter, DomainError, ItemDraft, ItemRecord, QuestionType, RemoteError,
        RemoteErrorKind, TemplateDraft, TemplateRecord, ValidationError,
    };
    use crate::repository::{MemoryTemplateStore, RemoteTemplateStore, StoreOp};

    const USER: &str = "u1";

    fn setup() -> (Arc<MemoryTemplateStore>, TemplateManager) {
        let store = Arc::new(MemoryTemplateStore::new());
        let remote: Arc<dyn RemoteTemplateStore> = store.clone();
        let manager = TemplateManager::new(remote, USER, "Inspector");
        (store, manager)
    }

    fn draft(title: &str, category: &str, questions: &[&str]) -> TemplateDraft {
        questions.iter().fold(
            TemplateDraft::new(title, category, "Monthly walkthrough"),
            |draft, text| draft.with_item(ItemDraft::text("General", *text)),
        )
    }

    fn shared_record(title: &str, category: &str) -> TemplateRecord {
        TemplateRecord {
            id: String::new(),
            title: title.to_string(),
            description: Some("Provided by the platform".to_string()),
            temp_category: Some(category.to_string()),
            user_id: Some("global".to_string()),
            created_by: None,
            created_at: Some("2024-01-02".to_string()),
            updated_at: None,
        }
    }

    fn sorted_orders(items: &[ItemRecord]) -> Vec<u32> {
        let mut orders: Vec<u32> = items.iter().filter_map(|i| i.sort_order).collect();
        orders.sort_unstable();
        orders
    }

    // ========================
    // Create
    // ========================

    #[tokio::test]
    async fn test_create_template_with_items() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Fire Safety", "safety", &["Exits clear?", "Extinguisher tagged?"]))
            .await
            .unwrap();

        assert_eq!(created.item_count, 2);
        assert_eq!(store.count(StoreOp::CreateTemplate).await, 1);
        assert_eq!(store.count(StoreOp::CreateItem).await, 2);
        assert_eq!(sorted_orders(&store.items_of(&created.id).await), vec![1, 2]);

        let listed = manager.templates().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item_count, 2);
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_create_sends_owner_fields() {
        let (store, manager) = setup();
        manager
            .create_template(&draft("  Fire Safety ", " safety", &["Q"]))
            .await
            .unwrap();

        let record = &store.templates().await[0];
        assert_eq!(record.title, "Fire Safety");
        assert_eq!(record.temp_category.as_deref(), Some("safety"));
        assert_eq!(record.user_id.as_deref(), Some(USER));
        assert_eq!(record.created_by.as_deref(), Some("Inspector"));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_remote_calls() {
        let (store, manager) = setup();
        let err = manager
            .create_template(&draft("", "safety", &["Q"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::EmptyTitle)));

        let err = manager
            .create_template(&draft("Fire Safety", "safety", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::NoItems)));

        let bad_choice = TemplateDraft::new("Fire Safety", "safety", "d").with_item(ItemDraft::choice(
            "General",
            "Pick one",
            QuestionType::SingleChoice,
            ["Only"],
        ));
        let err = manager.create_template(&bad_choice).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::InvalidChoiceOptions)));

        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_title_and_category_rejected() {
        let (store, manager) = setup();
        manager
            .create_template(&draft("Fire Safety", "safety", &["Q"]))
            .await
            .unwrap();
        store.clear_calls().await;

        let err = manager
            .create_template(&draft("Fire Safety", "safety", &["Other"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::DuplicateTemplate)));
        assert!(store.calls().await.is_empty());

        manager
            .create_template(&draft("Fire Safety", "hygiene", &["Q"]))
            .await
            .unwrap();
        assert_eq!(manager.templates().await.len(), 2);
    }

    #[tokio::test]
    async fn test_create_item_failure_reports_create_failed() {
        let (store, manager) = setup();
        store
            .fail_on(
                StoreOp::CreateItem,
                None,
                RemoteError::retryable(RemoteErrorKind::UpdateFailed, "503"),
            )
            .await;

        let err = manager
            .create_template(&draft("Fire Safety", "safety", &["Q"]))
            .await
            .unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::CreateFailed));
        // the template itself is not rolled back
        assert_eq!(store.templates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_keeps_template_when_refresh_fails() {
        let (store, manager) = setup();
        store
            .fail_on(
                StoreOp::ListTemplates,
                None,
                RemoteError::retryable(RemoteErrorKind::ListFailed, "timeout"),
            )
            .await;

        let created = manager
            .create_template(&draft("Fire Safety", "safety", &["Q"]))
            .await
            .unwrap();
        assert_eq!(manager.template(&created.id).await, Some(created));
    }

    // ========================
    // Save
    // ========================

    #[tokio::test]
    async fn test_fire_safety_edit_scenario() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Fire Safety", "safety", &["Q1"]))
            .await
            .unwrap();
        let first = store.items_of(&created.id).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].sort_order, Some(1));

        let mut edit = manager.edit_draft(&created.id).await.unwrap();
        edit.remove_item(0);
        edit.items.push(ItemDraft::choice(
            "General",
            "Q2",
            QuestionType::SingleChoice,
            ["Yes", "No"],
        ));
        store.clear_calls().await;

        let report = manager.save_template(&created.id, &edit).await.unwrap();
        assert_eq!(report.sync.deleted, 1);
        assert_eq!(report.sync.created.len(), 1);
        assert_eq!(report.sync.updated, 0);
        assert_eq!(report.sync.created[0].sort_order, 1);
        assert!(report.refreshed);

        let items = store.items_of(&created.id).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Q2");
        assert_eq!(items[0].question_type.as_deref(), Some("single_choice"));
        assert_eq!(items[0].options, vec!["Yes", "No"]);

        assert_eq!(manager.template(&created.id).await.unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn test_save_issues_minimal_item_calls() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["one", "two", "three"]))
            .await
            .unwrap();
        let remote = store.items_of(&created.id).await;
        let removed_id = remote[1].id.clone();

        let mut edit = manager.edit_draft(&created.id).await.unwrap();
        edit.remove_item(1);
        edit.add_item("General").text = "four".to_string();
        store.clear_calls().await;

        let report = manager.save_template(&created.id, &edit).await.unwrap();
        assert_eq!(store.count(StoreOp::UpdateTemplate).await, 1);
        assert_eq!(store.count(StoreOp::DeleteItem).await, 1);
        assert_eq!(store.count(StoreOp::CreateItem).await, 1);
        assert_eq!(store.count(StoreOp::UpdateItem).await, 2);
        assert_eq!(report.sync.deleted, 1);

        let items = store.items_of(&created.id).await;
        assert!(items.iter().all(|i| i.id != removed_id));
        assert_eq!(sorted_orders(&items), vec![1, 2, 3]);

        let reloaded = manager.load_template_items(&created.id).await.unwrap();
        let texts: Vec<&str> = reloaded.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three", "four"]);
    }

    #[tokio::test]
    async fn test_unchanged_save_only_updates() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a", "b", "c"]))
            .await
            .unwrap();
        let edit = manager.edit_draft(&created.id).await.unwrap();
        store.clear_calls().await;

        let report = manager.save_template(&created.id, &edit).await.unwrap();
        assert_eq!(store.count(StoreOp::CreateItem).await, 0);
        assert_eq!(store.count(StoreOp::DeleteItem).await, 0);
        assert_eq!(store.count(StoreOp::UpdateItem).await, 3);
        assert_eq!(report.sync.updated, 3);
        assert_eq!(sorted_orders(&store.items_of(&created.id).await), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_save_keeps_own_title_and_category() {
        let (_store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a"]))
            .await
            .unwrap();
        let mut edit = manager.edit_draft(&created.id).await.unwrap();
        edit.description = "Quarterly".to_string();

        manager.save_template(&created.id, &edit).await.unwrap();
        assert_eq!(manager.template(&created.id).await.unwrap().description, "Quarterly");
    }

    #[tokio::test]
    async fn test_failed_delete_is_skipped_during_save() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a", "b"]))
            .await
            .unwrap();
        let remote = store.items_of(&created.id).await;
        store
            .fail_on(
                StoreOp::DeleteItem,
                Some(&remote[0].id),
                RemoteError::fatal(RemoteErrorKind::DeleteFailed, "404"),
            )
            .await;

        let edit = draft("Ladders", "safety", &["replacement"]);
        let report = manager.save_template(&created.id, &edit).await.unwrap();

        assert_eq!(report.sync.deleted, 1);
        assert_eq!(report.sync.skipped_count(), 1);
        assert_eq!(report.sync.skipped_deletes[0].id, remote[0].id);
        assert!(!report.sync.has_retryable_skips());
        assert_eq!(report.sync.created.len(), 1);
    }

    #[tokio::test]
    async fn test_update_failure_is_save_failed_without_rollback() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a", "b"]))
            .await
            .unwrap();
        let remote = store.items_of(&created.id).await;
        store
            .fail_on(
                StoreOp::UpdateItem,
                Some(&remote[1].id),
                RemoteError::retryable(RemoteErrorKind::UpdateFailed, "503"),
            )
            .await;

        let mut edit = manager.edit_draft(&created.id).await.unwrap();
        edit.add_item("General").text = "c".to_string();

        let err = manager.save_template(&created.id, &edit).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::SaveFailed));
        match err {
            DomainError::Remote(remote_err) => assert!(remote_err.retryable),
            other => panic!("unexpected error: {}", other),
        }
        // the created item stays
        assert_eq!(store.items_of(&created.id).await.len(), 3);
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_save_rejects_repeated_question() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a", "b"]))
            .await
            .unwrap();
        let remote = store.items_of(&created.id).await;
        store.clear_calls().await;

        let edit = TemplateDraft::new("Ladders", "safety", "Monthly walkthrough")
            .with_item(ItemDraft::text("General", "a").with_id(remote[0].id.clone()))
            .with_item(ItemDraft::text("General", "a again").with_id(remote[0].id.clone()));
        let err = manager.save_template(&created.id, &edit).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(ValidationError::RepeatedItem)));
        assert!(store.calls().await.is_empty());
        assert_eq!(sorted_orders(&store.items_of(&created.id).await), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_save_never_touches_other_templates_items() {
        let (store, manager) = setup();
        let ladders = manager
            .create_template(&draft("Ladders", "safety", &["a"]))
            .await
            .unwrap();
        let kitchen = manager
            .create_template(&draft("Kitchen", "hygiene", &["fridge"]))
            .await
            .unwrap();
        let foreign = store.items_of(&kitchen.id).await[0].clone();

        let mut edit = manager.edit_draft(&ladders.id).await.unwrap();
        edit.items
            .push(ItemDraft::text("General", "borrowed").with_id(foreign.id.clone()));
        store.clear_calls().await;

        let report = manager.save_template(&ladders.id, &edit).await.unwrap();
        assert_eq!(report.sync.updated, 1);
        assert_eq!(report.sync.created.len(), 1);
        assert_eq!(store.count(StoreOp::UpdateItem).await, 1);

        assert_eq!(store.items_of(&kitchen.id).await, vec![foreign]);
        let items = store.items_of(&ladders.id).await;
        assert_eq!(sorted_orders(&items), vec![1, 2]);
        assert!(items.iter().any(|i| i.text == "borrowed"));
    }

    #[tokio::test]
    async fn test_save_unknown_template_not_found() {
        let (store, manager) = setup();
        let err = manager
            .save_template("missing", &draft("T", "C", &["Q"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(store.calls().await.is_empty());
    }

    // ========================
    // Delete
    // ========================

    #[tokio::test]
    async fn test_delete_removes_items_first() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a", "b"]))
            .await
            .unwrap();
        store.clear_calls().await;

        let report = manager.delete_template(&created.id).await.unwrap();
        assert_eq!(report.items_deleted, 2);
        assert_eq!(report.skipped_count(), 0);

        let ops: Vec<StoreOp> = store.calls().await.iter().map(|c| c.op()).collect();
        assert_eq!(
            ops,
            vec![
                StoreOp::ListItems,
                StoreOp::DeleteItem,
                StoreOp::DeleteItem,
                StoreOp::DeleteTemplate
            ]
        );
        assert!(manager.templates().await.is_empty());
        assert!(store.templates().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_template_failure() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a"]))
            .await
            .unwrap();
        store
            .fail_on(
                StoreOp::DeleteTemplate,
                Some(&created.id),
                RemoteError::retryable(RemoteErrorKind::DeleteFailed, "502"),
            )
            .await;

        let err = manager.delete_template(&created.id).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::DeleteFailed));
        assert!(manager.template(&created.id).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_aborts_when_items_cannot_be_listed() {
        let (store, manager) = setup();
        let created = manager
            .create_template(&draft("Ladders", "safety", &["a"]))
            .await
            .unwrap();
        store
            .fail_on(
                StoreOp::ListItems,
                Some(&created.id),
                RemoteError::fatal(RemoteErrorKind::ListFailed, "500"),
            )
            .await;
        store.clear_calls().await;

        let err = manager.delete_template(&created.id).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::DeleteFailed));
        assert_eq!(store.count(StoreOp::DeleteTemplate).await, 0);
    }

    // ========================
    // Ownership and concurrency
    // ========================

    #[tokio::test]
    async fn test_shared_templates_are_read_only() {
        let (store, manager) = setup();
        let shared = store.seed_template(shared_record("Platform Audit", "audit")).await;
        manager.load_templates().await.unwrap();
        store.clear_calls().await;

        let edit = draft("Platform Audit", "audit", &["Q"]);
        let err = manager.save_template(&shared.id, &edit).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::ReadOnlyTemplate)));

        let err = manager.delete_template(&shared.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::ReadOnlyTemplate)));
        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_are_exclusive() {
        let (store, manager) = setup();
        {
            let _guard = manager.begin_mutation().unwrap();
            assert!(manager.is_busy());
            let err = manager
                .create_template(&draft("Ladders", "safety", &["a"]))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Conflict(_)));
        }
        assert!(!manager.is_busy());
        assert!(store.calls().await.is_empty());

        manager
            .create_template(&draft("Ladders", "safety", &["a"]))
            .await
            .unwrap();
    }

    // ========================
    // Loading and categories
    // ========================

    #[tokio::test]
    async fn test_load_templates_with_counts_and_categories() {
        let (store, manager) = setup();
        let own = store
            .seed_template(TemplateRecord {
                user_id: Some(USER.to_string()),
                ..shared_record("Kitchen", "hygiene")
            })
            .await;
        store
            .seed_item(ItemRecord {
                id: String::new(),
                template_id: own.id.clone(),
                category: Some("General".to_string()),
                question_index: Some(1),
                text: "Fridge below 5C?".to_string(),
                question_type: None,
                sort_order: Some(1),
                options: Vec::new(),
            })
            .await;
        store.seed_template(shared_record("Platform Audit", "audit")).await;
        store.seed_template(shared_record("Untitled", "")).await;
        store
            .seed_template(TemplateRecord {
                user_id: Some("someone-else".to_string()),
                ..shared_record("Private", "secret")
            })
            .await;

        let loaded = manager.load_templates().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(manager.template(&own.id).await.unwrap().item_count, 1);

        let labels: Vec<String> = manager.categories().await.into_iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["All", "audit", "hygiene"]);

        let hygiene = manager
            .templates_in(&CategoryFilter::Named("hygiene".to_string()))
            .await;
        assert_eq!(hygiene.len(), 1);
        assert_eq!(manager.templates_in(&CategoryFilter::All).await.len(), 3);

        let with_custom = manager.categories_with_custom(&["Ergonomics".to_string()]).await;
        assert!(with_custom.iter().any(|c| c.label == "Ergonomics"));
    }

    #[tokio::test]
    async fn test_load_failure_is_list_failed() {
        let (store, manager) = setup();
        store
            .fail_on(
                StoreOp::ListTemplates,
                None,
                RemoteError::retryable(RemoteErrorKind::ListFailed, "timeout"),
            )
            .await;
        let err = manager.load_templates().await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::ListFailed));
    }

    #[tokio::test]
    async fn test_page_size_is_forwarded() {
        let (store, manager) = setup();
        manager.load_templates().await.unwrap();
        let manager = manager.with_page_size(0);
        manager.load_templates().await.unwrap();

        let sizes: Vec<u32> = store
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                crate::repository::StoreCall::ListTemplates { page_size, .. } => Some(page_size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![DEFAULT_PAGE_SIZE, 1]);
    }
}
