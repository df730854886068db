//! Checklist lifecycle engine.
//!
//! # Responsibility
//! - Own the in-memory collections and the storage handle.
//! - Apply template, run, user and notification mutations, persisting each
//!   affected collection after the mutation is accepted.
//!
//! # Invariants
//! - Drafts are validated before any collection is touched.
//! - Completed runs never change again through the item update paths.
//! - In-memory state stays authoritative even when a save fails.

use crate::model::checklist::{
    ChecklistInstance, ChecklistTemplate, InstanceId, ItemDefinition, ItemDraft, ItemId, ItemKind,
    ItemStatus, ItemValue, TemplateDraft, TemplateId, TemplateValidationError,
};
use crate::model::notification::{
    AppNotification, NotificationId, NotificationKind, SubscriptionMap,
};
use crate::model::user::{Role, User, UserDraft, UserId, UserValidationError, LEGACY_OPERATOR_ROLE};
use crate::store::{load_collection, save_collection, CollectionKey, CollectionStore};
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Title shared by all completion notifications.
pub const COMPLETION_TITLE: &str = "Checklist completed";

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error raised by lifecycle operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Starting a run requires an existing template.
    TemplateNotFound(TemplateId),
    /// Item updates are rejected once a run is completed.
    InstanceCompleted(InstanceId),
    /// Item value variant does not match the item's kind.
    ValueKindMismatch {
        item: ItemId,
        expected: ItemKind,
        got: ItemKind,
    },
    InvalidTemplate(TemplateValidationError),
    InvalidUser(UserValidationError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::InstanceCompleted(id) => {
                write!(f, "checklist instance already completed: {id}")
            }
            Self::ValueKindMismatch {
                item,
                expected,
                got,
            } => write!(
                f,
                "value kind `{got}` does not match `{expected}` for item {item}"
            ),
            Self::InvalidTemplate(err) => write!(f, "{err}"),
            Self::InvalidUser(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TemplateNotFound(_) => None,
            Self::InstanceCompleted(_) => None,
            Self::ValueKindMismatch { .. } => None,
            Self::InvalidTemplate(err) => Some(err),
            Self::InvalidUser(err) => Some(err),
        }
    }
}

impl From<TemplateValidationError> for ServiceError {
    fn from(value: TemplateValidationError) -> Self {
        Self::InvalidTemplate(value)
    }
}

impl From<UserValidationError> for ServiceError {
    fn from(value: UserValidationError) -> Self {
        Self::InvalidUser(value)
    }
}

/// Application-state service owning the collections and their store.
///
/// Collections are loaded once at construction; every accepted mutation
/// re-serializes the affected collection(s) through the store.
pub struct ChecklistService<S: CollectionStore> {
    store: S,
    templates: Vec<ChecklistTemplate>,
    instances: Vec<ChecklistInstance>,
    users: Vec<User>,
    subscriptions: SubscriptionMap,
    notifications: Vec<AppNotification>,
}

impl<S: CollectionStore> ChecklistService<S> {
    /// Loads every collection from `store`, installing defaults where a
    /// collection is absent or unreadable.
    pub fn open(store: S) -> Self {
        let templates = load_collection(&store, CollectionKey::Templates, seed_templates);
        let instances = load_collection(&store, CollectionKey::Instances, Vec::new);
        let users = load_collection(&store, CollectionKey::Users, seed_users);
        let subscriptions =
            load_collection(&store, CollectionKey::Subscriptions, SubscriptionMap::new);
        let notifications = load_collection(&store, CollectionKey::Notifications, Vec::new);

        info!(
            "event=service_open module=service status=ok templates={} instances={} users={} notifications={}",
            templates.len(),
            instances.len(),
            users.len(),
            notifications.len()
        );

        Self {
            store,
            templates,
            instances,
            users,
            subscriptions,
            notifications,
        }
    }

    pub fn templates(&self) -> &[ChecklistTemplate] {
        &self.templates
    }

    pub fn instances(&self) -> &[ChecklistInstance] {
        &self.instances
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn notifications(&self) -> &[AppNotification] {
        &self.notifications
    }

    pub fn subscriptions(&self) -> &SubscriptionMap {
        &self.subscriptions
    }

    /// Looks up a template by id.
    pub fn template(&self, id: TemplateId) -> Option<&ChecklistTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    /// Looks up a run by id.
    pub fn instance(&self, id: InstanceId) -> Option<&ChecklistInstance> {
        self.instances.iter().find(|instance| instance.id == id)
    }

    /// Creates a template from a validated draft.
    ///
    /// Caller-supplied item ids are discarded; every stored item gets a
    /// fresh id.
    pub fn create_template(&mut self, draft: &TemplateDraft) -> ServiceResult<&ChecklistTemplate> {
        draft.validate()?;

        let template = ChecklistTemplate {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            items: fresh_items(&draft.items),
        };
        info!(
            "event=template_create module=service status=ok template_id={} items={}",
            template.id,
            template.items.len()
        );

        let index = self.templates.len();
        self.templates.push(template);
        self.persist_templates();
        Ok(&self.templates[index])
    }

    /// Replaces title, description and items of an existing template.
    ///
    /// Unknown template ids are ignored. Draft items keep their id when
    /// they carry one; items without an id are treated as new.
    pub fn update_template(&mut self, id: TemplateId, draft: &TemplateDraft) -> ServiceResult<()> {
        draft.validate()?;

        let template = match self.templates.iter_mut().find(|template| template.id == id) {
            Some(template) => template,
            None => return Ok(()),
        };
        template.title = draft.title.clone();
        template.description = draft.description.clone();
        template.items = merged_items(&draft.items);

        info!("event=template_update module=service status=ok template_id={id}");
        self.persist_templates();
        Ok(())
    }

    /// Removes a template. Unknown ids are ignored.
    ///
    /// Runs of the template are untouched; they keep their copied items
    /// and show up in history as orphans.
    pub fn delete_template(&mut self, id: TemplateId) {
        let before = self.templates.len();
        self.templates.retain(|template| template.id != id);
        if self.templates.len() == before {
            return;
        }

        info!("event=template_delete module=service status=ok template_id={id}");
        self.persist_templates();
    }

    /// Starts a new run of `template_id` and files it most-recent-first.
    ///
    /// # Errors
    /// - [`ServiceError::TemplateNotFound`] when the template does not
    ///   exist.
    pub fn start_checklist(&mut self, template_id: TemplateId) -> ServiceResult<InstanceId> {
        let instance = match self.template(template_id) {
            Some(template) => ChecklistInstance::from_template(template, Utc::now()),
            None => return Err(ServiceError::TemplateNotFound(template_id)),
        };
        let instance_id = instance.id;

        info!(
            "event=checklist_start module=service status=ok template_id={template_id} instance_id={instance_id}"
        );
        self.instances.insert(0, instance);
        self.persist_instances();
        Ok(instance_id)
    }

    /// Sets the status of one item in an open run.
    ///
    /// Unknown run or item ids are ignored.
    ///
    /// # Errors
    /// - [`ServiceError::InstanceCompleted`] when the run is completed.
    pub fn update_item_status(
        &mut self,
        instance_id: InstanceId,
        item_id: ItemId,
        status: ItemStatus,
    ) -> ServiceResult<()> {
        let instance = match self
            .instances
            .iter_mut()
            .find(|instance| instance.id == instance_id)
        {
            Some(instance) => instance,
            None => return Ok(()),
        };
        if instance.completed {
            return Err(ServiceError::InstanceCompleted(instance_id));
        }
        let item = match instance.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => item,
            None => return Ok(()),
        };
        item.status = status;

        info!(
            "event=item_status module=service status=ok instance_id={instance_id} item_id={item_id}"
        );
        self.persist_instances();
        Ok(())
    }

    /// Stores an item's value and derives its status from it.
    ///
    /// Unknown run or item ids are ignored. See [`derive_status`] for the
    /// derivation rules.
    ///
    /// # Errors
    /// - [`ServiceError::InstanceCompleted`] when the run is completed.
    /// - [`ServiceError::ValueKindMismatch`] when the value variant does
    ///   not match the item's kind.
    pub fn update_item_value(
        &mut self,
        instance_id: InstanceId,
        item_id: ItemId,
        value: Option<ItemValue>,
    ) -> ServiceResult<()> {
        let instance = match self
            .instances
            .iter_mut()
            .find(|instance| instance.id == instance_id)
        {
            Some(instance) => instance,
            None => return Ok(()),
        };
        if instance.completed {
            return Err(ServiceError::InstanceCompleted(instance_id));
        }
        let item = match instance.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => item,
            None => return Ok(()),
        };
        if let Some(ref new_value) = value {
            if new_value.kind() != item.kind {
                return Err(ServiceError::ValueKindMismatch {
                    item: item_id,
                    expected: item.kind,
                    got: new_value.kind(),
                });
            }
        }
        item.status = derive_status(item.kind, item.min, item.max, value.as_ref());
        item.value = value;

        info!(
            "event=item_value module=service status=ok instance_id={instance_id} item_id={item_id}"
        );
        self.persist_instances();
        Ok(())
    }

    /// Marks a run completed and fans out subscriber notifications.
    ///
    /// Idempotent: unknown or already-completed runs are left alone. When
    /// the run's template has been deleted no subscribers can be resolved
    /// and no notifications are generated; the run still completes.
    pub fn complete_checklist(&mut self, instance_id: InstanceId) {
        let batch = {
            let instance = match self
                .instances
                .iter_mut()
                .find(|instance| instance.id == instance_id)
            {
                Some(instance) => instance,
                None => return,
            };
            if instance.completed {
                return;
            }
            instance.completed = true;

            match self
                .templates
                .iter()
                .find(|template| template.id == instance.template_id)
            {
                Some(template) => {
                    let subscribers: &[UserId] = match self.subscriptions.get(&template.id) {
                        Some(subscribers) => subscribers,
                        None => &[],
                    };
                    completion_notifications(template, instance, subscribers, Utc::now())
                }
                None => Vec::new(),
            }
        };

        info!(
            "event=checklist_complete module=service status=ok instance_id={instance_id} notifications={}",
            batch.len()
        );

        let created = !batch.is_empty();
        self.notifications.splice(0..0, batch);
        self.persist_instances();
        if created {
            self.persist_notifications();
        }
    }

    /// Adds a user from a validated draft.
    pub fn add_user(&mut self, draft: &UserDraft) -> ServiceResult<&User> {
        draft.validate()?;

        let user = User::from_draft(draft);
        info!(
            "event=user_create module=service status=ok user_id={}",
            user.id
        );

        let index = self.users.len();
        self.users.push(user);
        self.persist_users();
        Ok(&self.users[index])
    }

    /// Replaces name, email, role and permissions of an existing user.
    ///
    /// Unknown ids are ignored.
    pub fn update_user(&mut self, id: UserId, draft: &UserDraft) -> ServiceResult<()> {
        draft.validate()?;

        let user = match self.users.iter_mut().find(|user| user.id == id) {
            Some(user) => user,
            None => return Ok(()),
        };
        user.name = draft.name.clone();
        user.email = draft.email.clone();
        user.role = draft.role.clone();
        user.permissions = draft.permissions.clone();

        info!("event=user_update module=service status=ok user_id={id}");
        self.persist_users();
        Ok(())
    }

    /// Removes a user. Unknown ids are ignored.
    ///
    /// The user's notifications and subscription entries are left as-is.
    pub fn delete_user(&mut self, id: UserId) {
        let before = self.users.len();
        self.users.retain(|user| user.id != id);
        if self.users.len() == before {
            return;
        }

        info!("event=user_delete module=service status=ok user_id={id}");
        self.persist_users();
    }

    /// Flips a user's completion-notification subscription for a template.
    ///
    /// Returns the new membership state. The template's entry stays in the
    /// map even when its last subscriber leaves.
    pub fn toggle_subscriber(&mut self, template_id: TemplateId, user_id: UserId) -> bool {
        let subscribers = self.subscriptions.entry(template_id).or_default();
        let subscribed = match subscribers.iter().position(|id| *id == user_id) {
            Some(position) => {
                subscribers.remove(position);
                false
            }
            None => {
                subscribers.push(user_id);
                true
            }
        };

        info!(
            "event=subscription_toggle module=service status=ok template_id={template_id} user_id={user_id} subscribed={subscribed}"
        );
        self.persist_subscriptions();
        subscribed
    }

    /// Marks one notification as read.
    ///
    /// Unknown ids and already-read notifications are left untouched.
    pub fn mark_notification_read(&mut self, notification_id: NotificationId) {
        let notification = match self
            .notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
        {
            Some(notification) => notification,
            None => return,
        };
        if notification.read {
            return;
        }
        notification.read = true;

        info!(
            "event=notification_read module=service status=ok notification_id={notification_id}"
        );
        self.persist_notifications();
    }

    /// Removes every notification addressed to `user_id`.
    pub fn clear_notifications(&mut self, user_id: UserId) {
        let before = self.notifications.len();
        self.notifications
            .retain(|notification| notification.user_id != user_id);
        if self.notifications.len() == before {
            return;
        }

        info!("event=notifications_clear module=service status=ok user_id={user_id}");
        self.persist_notifications();
    }

    fn persist_templates(&mut self) {
        save_collection(&mut self.store, CollectionKey::Templates, &self.templates);
    }

    fn persist_instances(&mut self) {
        save_collection(&mut self.store, CollectionKey::Instances, &self.instances);
    }

    fn persist_users(&mut self) {
        save_collection(&mut self.store, CollectionKey::Users, &self.users);
    }

    fn persist_subscriptions(&mut self) {
        save_collection(
            &mut self.store,
            CollectionKey::Subscriptions,
            &self.subscriptions,
        );
    }

    fn persist_notifications(&mut self) {
        save_collection(
            &mut self.store,
            CollectionKey::Notifications,
            &self.notifications,
        );
    }
}

/// Derives an item's status from its entered value.
///
/// Blank input keeps the item `Pending`. Anything else conforms, except a
/// number entry whose digit count falls outside the item's `[min, max]`
/// bounds; that stays `Pending` as incomplete rather than becoming
/// non-conforming. `NonConforming` and `NotApplicable` are only ever set
/// explicitly through the status path.
pub fn derive_status(
    kind: ItemKind,
    min: Option<u32>,
    max: Option<u32>,
    value: Option<&ItemValue>,
) -> ItemStatus {
    let value = match value {
        Some(value) if !value.is_blank() => value,
        _ => return ItemStatus::Pending,
    };

    if kind == ItemKind::Number {
        if let ItemValue::Number(digits) = value {
            // Bounds apply to the entered string as typed, untrimmed.
            let length = digits.chars().count();
            if min.map_or(false, |min| length < min as usize) {
                return ItemStatus::Pending;
            }
            if max.map_or(false, |max| length > max as usize) {
                return ItemStatus::Pending;
            }
        }
    }

    ItemStatus::Conforming
}

fn fresh_items(drafts: &[ItemDraft]) -> Vec<ItemDefinition> {
    drafts
        .iter()
        .map(|draft| ItemDefinition {
            id: Uuid::new_v4(),
            text: draft.text.clone(),
            kind: draft.kind,
            min: draft.min,
            max: draft.max,
        })
        .collect()
}

fn merged_items(drafts: &[ItemDraft]) -> Vec<ItemDefinition> {
    drafts
        .iter()
        .map(|draft| ItemDefinition {
            id: draft.id.unwrap_or_else(Uuid::new_v4),
            text: draft.text.clone(),
            kind: draft.kind,
            min: draft.min,
            max: draft.max,
        })
        .collect()
}

fn completion_notifications(
    template: &ChecklistTemplate,
    instance: &ChecklistInstance,
    subscribers: &[UserId],
    date: DateTime<Utc>,
) -> Vec<AppNotification> {
    let non_conforming = instance.non_conforming_count();
    let detail = match non_conforming {
        0 => "All items conform.".to_string(),
        1 => "Attention: 1 non-conformity found.".to_string(),
        count => format!("Attention: {count} non-conformities found."),
    };
    let message = format!(
        "The checklist \"{}\" has been completed. {detail}",
        template.title
    );
    let kind = if non_conforming > 0 {
        NotificationKind::Alert
    } else {
        NotificationKind::Success
    };

    subscribers
        .iter()
        .map(|user_id| AppNotification {
            id: Uuid::new_v4(),
            user_id: *user_id,
            template_id: Some(template.id),
            title: COMPLETION_TITLE.to_string(),
            message: message.clone(),
            date,
            read: false,
            kind,
        })
        .collect()
}

fn seed_item(kind: ItemKind, text: &str) -> ItemDefinition {
    ItemDefinition {
        id: Uuid::new_v4(),
        text: text.to_string(),
        kind,
        min: None,
        max: None,
    }
}

fn seed_templates() -> Vec<ChecklistTemplate> {
    vec![
        ChecklistTemplate {
            id: Uuid::new_v4(),
            title: "Weekly Safety Audit".to_string(),
            description: "Check every safety point of the production floor.".to_string(),
            items: vec![
                seed_item(
                    ItemKind::ConformityCheck,
                    "Fire extinguishers are unobstructed and within their inspection date.",
                ),
                seed_item(
                    ItemKind::ConformityCheck,
                    "Emergency exits are clear and signposted.",
                ),
                seed_item(ItemKind::Text, "Inspector name"),
                seed_item(ItemKind::Signature, "Inspector signature"),
            ],
        },
        ChecklistTemplate {
            id: Uuid::new_v4(),
            title: "Product Quality Inspection".to_string(),
            description: "Check final product quality before shipping.".to_string(),
            items: vec![
                seed_item(ItemKind::ConformityCheck, "Packaging free of damage."),
                seed_item(
                    ItemKind::ConformityCheck,
                    "Product matches color and size specifications.",
                ),
                ItemDefinition {
                    id: Uuid::new_v4(),
                    text: "Batch number".to_string(),
                    kind: ItemKind::Number,
                    min: Some(1),
                    max: None,
                },
                seed_item(ItemKind::Photo, "Label photo"),
            ],
        },
    ]
}

fn seed_users() -> Vec<User> {
    vec![
        User {
            id: Uuid::new_v4(),
            name: "Administrator".to_string(),
            email: "admin@checktop.example".to_string(),
            role: Role::Administrator.title().to_string(),
            permissions: Role::Administrator.default_permissions(),
        },
        // Legacy role label, kept verbatim as older data would carry it.
        User {
            id: Uuid::new_v4(),
            name: "Carlos Prado".to_string(),
            email: "carlos@checktop.example".to_string(),
            role: LEGACY_OPERATOR_ROLE.to_string(),
            permissions: Role::Operator.default_permissions(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{completion_notifications, derive_status, COMPLETION_TITLE};
    use crate::model::checklist::{
        ChecklistInstance, ChecklistTemplate, ItemDefinition, ItemKind, ItemStatus, ItemValue,
    };
    use crate::model::notification::NotificationKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn one_item_template() -> ChecklistTemplate {
        ChecklistTemplate {
            id: Uuid::new_v4(),
            title: "Line start-up".to_string(),
            description: String::new(),
            items: vec![ItemDefinition {
                id: Uuid::new_v4(),
                text: "Guards in place".to_string(),
                kind: ItemKind::ConformityCheck,
                min: None,
                max: None,
            }],
        }
    }

    #[test]
    fn derive_status_blank_input_stays_pending() {
        assert_eq!(
            derive_status(ItemKind::Text, None, None, None),
            ItemStatus::Pending
        );

        let blank = ItemValue::Text("   ".to_string());
        assert_eq!(
            derive_status(ItemKind::Text, None, None, Some(&blank)),
            ItemStatus::Pending
        );
    }

    #[test]
    fn derive_status_number_bounds_use_untrimmed_digit_count() {
        let short = ItemValue::Number("12".to_string());
        let fitting = ItemValue::Number("1234".to_string());
        let long = ItemValue::Number("123456".to_string());
        let padded = ItemValue::Number(" 12 ".to_string());

        assert_eq!(
            derive_status(ItemKind::Number, Some(3), Some(5), Some(&short)),
            ItemStatus::Pending
        );
        assert_eq!(
            derive_status(ItemKind::Number, Some(3), Some(5), Some(&fitting)),
            ItemStatus::Conforming
        );
        assert_eq!(
            derive_status(ItemKind::Number, Some(3), Some(5), Some(&long)),
            ItemStatus::Pending
        );
        assert_eq!(
            derive_status(ItemKind::Number, Some(3), Some(5), Some(&padded)),
            ItemStatus::Conforming
        );
    }

    #[test]
    fn derive_status_never_yields_non_conforming() {
        let rating = ItemValue::Rating(4);
        assert_eq!(
            derive_status(ItemKind::Rating, None, None, Some(&rating)),
            ItemStatus::Conforming
        );

        let text = ItemValue::Text("worn belt".to_string());
        assert_eq!(
            derive_status(ItemKind::Text, None, None, Some(&text)),
            ItemStatus::Conforming
        );
    }

    #[test]
    fn completion_notifications_alert_on_non_conformities() {
        let template = one_item_template();
        let mut instance = ChecklistInstance::from_template(&template, Utc::now());
        instance.items[0].status = ItemStatus::NonConforming;

        let subscriber = Uuid::new_v4();
        let batch = completion_notifications(&template, &instance, &[subscriber], Utc::now());

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].user_id, subscriber);
        assert_eq!(batch[0].template_id, Some(template.id));
        assert_eq!(batch[0].title, COMPLETION_TITLE);
        assert_eq!(batch[0].kind, NotificationKind::Alert);
        assert!(batch[0].message.contains(&template.title));
        assert!(batch[0].message.contains("1 non-conformity"));
        assert!(!batch[0].read);
    }

    #[test]
    fn completion_notifications_success_when_all_conform() {
        let template = one_item_template();
        let mut instance = ChecklistInstance::from_template(&template, Utc::now());
        instance.items[0].status = ItemStatus::Conforming;

        let subscribers = [Uuid::new_v4(), Uuid::new_v4()];
        let batch = completion_notifications(&template, &instance, &subscribers, Utc::now());

        assert_eq!(batch.len(), 2);
        for notification in &batch {
            assert_eq!(notification.kind, NotificationKind::Success);
            assert!(notification.message.contains("All items conform."));
        }
    }
}
