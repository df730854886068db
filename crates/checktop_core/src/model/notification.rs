//! In-app notifications and completion subscriptions.
//!
//! # Invariants
//! - A notification is addressed to exactly one user; broadcast fan-out
//!   happens at creation time, one record per subscriber.
//! - Subscription lists survive as empty vectors when their last member
//!   leaves, so a template's entry is never silently dropped.

use crate::model::checklist::TemplateId;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable identifier of a notification record.
pub type NotificationId = Uuid;

/// Per-template list of users who want completion notifications.
pub type SubscriptionMap = BTreeMap<TemplateId, Vec<UserId>>;

/// Visual severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Alert,
    Success,
}

/// One notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppNotification {
    pub id: NotificationId,
    pub user_id: UserId,
    /// Template that triggered this notification, when one did.
    pub template_id: Option<TemplateId>,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}
