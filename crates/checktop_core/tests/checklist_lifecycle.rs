use checktop_core::{
    ChecklistService, ItemDraft, ItemId, ItemKind, ItemStatus, ItemValue, NotificationKind,
    ServiceError, SqliteCollectionStore, TemplateDraft, TemplateId,
};
use uuid::Uuid;

#[test]
fn completing_with_non_conformity_alerts_each_subscriber() {
    let mut service = service();
    let (template_id, item_id) = safety_template(&mut service);
    let admin = service.users()[0].id;
    let operator = service.users()[1].id;
    assert!(service.toggle_subscriber(template_id, admin));
    assert!(service.toggle_subscriber(template_id, operator));

    let instance_id = service.start_checklist(template_id).unwrap();
    assert_eq!(
        service.instance(instance_id).unwrap().items[0].status,
        ItemStatus::Pending
    );

    service
        .update_item_status(instance_id, item_id, ItemStatus::NonConforming)
        .unwrap();
    service.complete_checklist(instance_id);

    assert!(service.instance(instance_id).unwrap().completed);
    let notifications = service.notifications();
    assert_eq!(notifications.len(), 2);
    let recipients: Vec<_> = notifications
        .iter()
        .map(|notification| notification.user_id)
        .collect();
    assert!(recipients.contains(&admin));
    assert!(recipients.contains(&operator));
    for notification in notifications {
        assert_eq!(notification.kind, NotificationKind::Alert);
        assert_eq!(notification.template_id, Some(template_id));
        assert!(notification.message.contains("Safety"));
        assert!(notification.message.contains("1 non-conformity"));
        assert!(!notification.read);
    }
}

#[test]
fn complete_checklist_is_idempotent() {
    let mut service = service();
    let (template_id, item_id) = safety_template(&mut service);
    let admin = service.users()[0].id;
    service.toggle_subscriber(template_id, admin);

    let instance_id = service.start_checklist(template_id).unwrap();
    service
        .update_item_status(instance_id, item_id, ItemStatus::Conforming)
        .unwrap();

    service.complete_checklist(instance_id);
    service.complete_checklist(instance_id);

    assert!(service.instance(instance_id).unwrap().completed);
    assert_eq!(service.notifications().len(), 1);
    assert_eq!(service.notifications()[0].kind, NotificationKind::Success);
}

#[test]
fn completed_run_rejects_item_updates() {
    let mut service = service();
    let (template_id, item_id) = safety_template(&mut service);
    let instance_id = service.start_checklist(template_id).unwrap();
    service.complete_checklist(instance_id);

    let err = service
        .update_item_status(instance_id, item_id, ItemStatus::Conforming)
        .unwrap_err();
    assert!(matches!(err, ServiceError::InstanceCompleted(id) if id == instance_id));

    let err = service
        .update_item_value(instance_id, item_id, None)
        .unwrap_err();
    assert!(matches!(err, ServiceError::InstanceCompleted(id) if id == instance_id));

    assert_eq!(
        service.instance(instance_id).unwrap().items[0].status,
        ItemStatus::Pending
    );
}

#[test]
fn update_item_value_rejects_mismatched_kind() {
    let mut service = service();
    let (template_id, item_id) = remarks_template(&mut service);
    let instance_id = service.start_checklist(template_id).unwrap();

    let err = service
        .update_item_value(
            instance_id,
            item_id,
            Some(ItemValue::Number("12".to_string())),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::ValueKindMismatch {
            expected: ItemKind::Text,
            got: ItemKind::Number,
            ..
        }
    ));

    let item = &service.instance(instance_id).unwrap().items[0];
    assert_eq!(item.status, ItemStatus::Pending);
    assert!(item.value.is_none());
}

#[test]
fn update_item_value_derives_status_and_clearing_returns_to_pending() {
    let mut service = service();
    let (template_id, item_id) = remarks_template(&mut service);
    let instance_id = service.start_checklist(template_id).unwrap();

    service
        .update_item_value(
            instance_id,
            item_id,
            Some(ItemValue::Text("all good".to_string())),
        )
        .unwrap();
    assert_eq!(
        service.instance(instance_id).unwrap().items[0].status,
        ItemStatus::Conforming
    );

    service
        .update_item_value(instance_id, item_id, Some(ItemValue::Text("   ".to_string())))
        .unwrap();
    assert_eq!(
        service.instance(instance_id).unwrap().items[0].status,
        ItemStatus::Pending
    );

    service
        .update_item_value(instance_id, item_id, None)
        .unwrap();
    let item = &service.instance(instance_id).unwrap().items[0];
    assert_eq!(item.status, ItemStatus::Pending);
    assert!(item.value.is_none());
}

#[test]
fn number_bounds_decide_between_pending_and_conforming() {
    let mut service = service();
    let (strict_template, strict_item) = number_template(&mut service, Some(3), None);
    let (loose_template, loose_item) = number_template(&mut service, Some(2), Some(4));
    let strict_run = service.start_checklist(strict_template).unwrap();
    let loose_run = service.start_checklist(loose_template).unwrap();

    service
        .update_item_value(
            strict_run,
            strict_item,
            Some(ItemValue::Number("12".to_string())),
        )
        .unwrap();
    assert_eq!(
        service.instance(strict_run).unwrap().items[0].status,
        ItemStatus::Pending
    );

    service
        .update_item_value(
            loose_run,
            loose_item,
            Some(ItemValue::Number("12".to_string())),
        )
        .unwrap();
    assert_eq!(
        service.instance(loose_run).unwrap().items[0].status,
        ItemStatus::Conforming
    );
}

#[test]
fn unknown_run_and_item_ids_are_ignored() {
    let mut service = service();
    let (template_id, item_id) = safety_template(&mut service);
    let instance_id = service.start_checklist(template_id).unwrap();

    service
        .update_item_status(Uuid::new_v4(), item_id, ItemStatus::Conforming)
        .unwrap();
    service
        .update_item_value(
            instance_id,
            Uuid::new_v4(),
            Some(ItemValue::Text("stray".to_string())),
        )
        .unwrap();
    service.complete_checklist(Uuid::new_v4());

    let run = service.instance(instance_id).unwrap();
    assert!(!run.completed);
    assert_eq!(run.items[0].status, ItemStatus::Pending);
    assert!(service.notifications().is_empty());
}

#[test]
fn deleted_template_still_completes_without_notifications() {
    let mut service = service();
    let (template_id, item_id) = safety_template(&mut service);
    let admin = service.users()[0].id;
    service.toggle_subscriber(template_id, admin);

    let instance_id = service.start_checklist(template_id).unwrap();
    service
        .update_item_status(instance_id, item_id, ItemStatus::NonConforming)
        .unwrap();
    service.delete_template(template_id);
    service.complete_checklist(instance_id);

    assert!(service.instance(instance_id).unwrap().completed);
    assert!(service.notifications().is_empty());
}

#[test]
fn completion_reads_subscribers_at_completion_time() {
    let mut service = service();
    let (template_id, item_id) = safety_template(&mut service);
    let instance_id = service.start_checklist(template_id).unwrap();
    service
        .update_item_status(instance_id, item_id, ItemStatus::Conforming)
        .unwrap();

    // Subscribed only after the run started.
    let admin = service.users()[0].id;
    service.toggle_subscriber(template_id, admin);
    service.complete_checklist(instance_id);

    assert_eq!(service.notifications().len(), 1);
    assert_eq!(service.notifications()[0].user_id, admin);
    assert_eq!(service.notifications()[0].kind, NotificationKind::Success);
    assert!(service.notifications()[0]
        .message
        .contains("All items conform."));
}

fn service() -> ChecklistService<SqliteCollectionStore> {
    let conn = checktop_core::open_store_in_memory().unwrap();
    let store = SqliteCollectionStore::try_new(conn).unwrap();
    ChecklistService::open(store)
}

fn safety_template(service: &mut ChecklistService<SqliteCollectionStore>) -> (TemplateId, ItemId) {
    let draft = TemplateDraft {
        title: "Safety".to_string(),
        description: String::new(),
        items: vec![ItemDraft::new(ItemKind::ConformityCheck, "Exit clear")],
    };
    let template = service.create_template(&draft).unwrap();
    (template.id, template.items[0].id)
}

fn remarks_template(service: &mut ChecklistService<SqliteCollectionStore>) -> (TemplateId, ItemId) {
    let draft = TemplateDraft {
        title: "Shift remarks".to_string(),
        description: String::new(),
        items: vec![ItemDraft::new(ItemKind::Text, "Operator remarks")],
    };
    let template = service.create_template(&draft).unwrap();
    (template.id, template.items[0].id)
}

fn number_template(
    service: &mut ChecklistService<SqliteCollectionStore>,
    min: Option<u32>,
    max: Option<u32>,
) -> (TemplateId, ItemId) {
    let mut item = ItemDraft::new(ItemKind::Number, "Batch code");
    item.min = min;
    item.max = max;
    let draft = TemplateDraft {
        title: "Batch intake".to_string(),
        description: String::new(),
        items: vec![item],
    };
    let template = service.create_template(&draft).unwrap();
    (template.id, template.items[0].id)
}
