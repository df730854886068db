//! Checklist template and run models.
//!
//! # Responsibility
//! - Define templates, their item definitions and the per-run item state.
//! - Validate caller-supplied drafts before they become stored entities.
//!
//! # Invariants
//! - `ChecklistInstance.items` is fixed at instantiation time; items are
//!   never added or removed afterwards and item ids are copied verbatim
//!   from the source template.
//! - `min`/`max` on a `Number` item bound the digit-count of the entered
//!   value, not its numeric magnitude.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a checklist template.
pub type TemplateId = Uuid;

/// Stable identifier of a checklist run (one execution of a template).
pub type InstanceId = Uuid;

/// Stable identifier of a single item within a template or run.
pub type ItemId = Uuid;

/// Kind of answer an item collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Answered Yes/No/N-A rather than with free data.
    ConformityCheck,
    /// Free-form text entry.
    Text,
    /// Digit string with optional digit-count bounds.
    Number,
    /// Photo payload (URL or data blob).
    Photo,
    /// Signature payload (data blob).
    Signature,
    /// Star-style rating.
    Rating,
}

impl ItemKind {
    /// Wire name of the kind, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConformityCheck => "conformity_check",
            Self::Text => "text",
            Self::Number => "number",
            Self::Photo => "photo",
            Self::Signature => "signature",
            Self::Rating => "rating",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer state of a run item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Conforming,
    NonConforming,
    NotApplicable,
    Pending,
}

/// Typed payload of an answered item.
///
/// Each variant pairs with exactly one [`ItemKind`]; conformity-check items
/// never carry a value and are driven purely by [`ItemStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ItemValue {
    Text(String),
    /// Digit string as typed; bounds apply to its character length.
    Number(String),
    Photo(String),
    Signature(String),
    Rating(u8),
}

impl ItemValue {
    /// Returns the item kind this payload belongs to.
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Text(_) => ItemKind::Text,
            Self::Number(_) => ItemKind::Number,
            Self::Photo(_) => ItemKind::Photo,
            Self::Signature(_) => ItemKind::Signature,
            Self::Rating(_) => ItemKind::Rating,
        }
    }

    /// Returns whether the payload is empty after trimming.
    ///
    /// A rating always counts as a real answer.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) | Self::Number(text) | Self::Photo(text) | Self::Signature(text) => {
                text.trim().is_empty()
            }
            Self::Rating(_) => false,
        }
    }
}

/// One question/check inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemId,
    pub text: String,
    /// Serialized as `type` to match the stored collection schema.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Minimum digit count for `Number` items.
    pub min: Option<u32>,
    /// Maximum digit count for `Number` items.
    pub max: Option<u32>,
}

/// Caller-supplied item input for template create/edit.
///
/// The optional `id` lets an edit keep the identity of surviving items
/// while newly added ones receive a generated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub id: Option<ItemId>,
    pub text: String,
    pub kind: ItemKind,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl ItemDraft {
    /// Creates a draft without an id and without digit bounds.
    pub fn new(kind: ItemKind, text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            kind,
            min: None,
            max: None,
        }
    }
}

/// Reusable checklist definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    pub id: TemplateId,
    pub title: String,
    pub description: String,
    pub items: Vec<ItemDefinition>,
}

/// Caller-supplied template input for create/edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    pub title: String,
    pub description: String,
    pub items: Vec<ItemDraft>,
}

impl TemplateDraft {
    /// Checks the draft before it may touch stored state.
    ///
    /// # Errors
    /// - [`TemplateValidationError::BlankTitle`] when the title is empty
    ///   after trimming.
    /// - [`TemplateValidationError::BlankItemText`] for the first item
    ///   whose text is empty after trimming.
    pub fn validate(&self) -> Result<(), TemplateValidationError> {
        if self.title.trim().is_empty() {
            return Err(TemplateValidationError::BlankTitle);
        }
        for (position, item) in self.items.iter().enumerate() {
            if item.text.trim().is_empty() {
                return Err(TemplateValidationError::BlankItemText { position });
            }
        }
        Ok(())
    }
}

/// Validation failure for template drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateValidationError {
    BlankTitle,
    BlankItemText { position: usize },
}

impl Display for TemplateValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "template title must not be blank"),
            Self::BlankItemText { position } => {
                write!(f, "item text at position {position} must not be blank")
            }
        }
    }
}

impl Error for TemplateValidationError {}

/// One item inside a running checklist: the frozen definition plus the
/// answer collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceItem {
    pub id: ItemId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub status: ItemStatus,
    pub value: Option<ItemValue>,
}

impl InstanceItem {
    /// Copies a template item into its initial run state.
    pub fn from_definition(definition: &ItemDefinition) -> Self {
        Self {
            id: definition.id,
            text: definition.text.clone(),
            kind: definition.kind,
            min: definition.min,
            max: definition.max,
            status: ItemStatus::Pending,
            value: None,
        }
    }
}

/// One execution of a template, with per-item answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistInstance {
    pub id: InstanceId,
    pub template_id: TemplateId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<InstanceItem>,
    pub completed: bool,
}

impl ChecklistInstance {
    /// Builds a fresh run of `template` with every item pending.
    ///
    /// # Invariants
    /// - Item ids are copied verbatim from the template.
    /// - The item list length is fixed from this point on.
    pub fn from_template(template: &ChecklistTemplate, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_id: template.id,
            created_at,
            items: template.items.iter().map(InstanceItem::from_definition).collect(),
            completed: false,
        }
    }

    /// Number of items that have moved past `Pending`.
    pub fn answered_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status != ItemStatus::Pending)
            .count()
    }

    /// Whether every item has been answered.
    pub fn is_fully_answered(&self) -> bool {
        self.items.iter().all(|item| item.status != ItemStatus::Pending)
    }

    /// Number of items currently marked non-conforming.
    pub fn non_conforming_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::NonConforming)
            .count()
    }
}
