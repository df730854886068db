//! Core domain logic for CheckTop.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod report;
pub mod service;
pub mod store;
pub mod suggest;

pub use db::{open_store, open_store_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::checklist::{
    ChecklistInstance, ChecklistTemplate, InstanceId, InstanceItem, ItemDefinition, ItemDraft,
    ItemId, ItemKind, ItemStatus, ItemValue, TemplateDraft, TemplateId, TemplateValidationError,
};
pub use model::notification::{AppNotification, NotificationId, NotificationKind, SubscriptionMap};
pub use model::user::{Permission, Role, User, UserDraft, UserId, UserValidationError};
pub use report::{ReportFilter, ReportWindow};
pub use service::checklist_service::{derive_status, ChecklistService, ServiceError, ServiceResult};
pub use store::{
    load_collection, save_collection, CollectionKey, CollectionStore, SqliteCollectionStore,
    StoreError, StoreResult,
};
pub use suggest::{CorrectiveActions, ProviderError, SuggestionProvider};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
