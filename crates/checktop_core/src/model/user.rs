//! User accounts, roles and permissions.
//!
//! # Responsibility
//! - Define the operator/manager/administrator account model.
//! - Map stored role labels, including legacy ones, onto canonical roles.
//!
//! # Invariants
//! - The stored `role` string is kept verbatim; canonicalization happens
//!   only when a caller asks for it.
//! - Permissions are an explicit per-user list, seeded from the role but
//!   editable independently afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a user account.
pub type UserId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Role label written by older clients; reads as [`Role::Operator`].
pub const LEGACY_OPERATOR_ROLE: &str = "Inspetor";

/// Capability granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageTemplates,
    ManageUsers,
    ExecuteChecklists,
    ViewReports,
}

/// Canonical account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Manager,
    Operator,
}

impl Role {
    /// Resolves a stored role label to its canonical role.
    ///
    /// Accepts the current titles plus [`LEGACY_OPERATOR_ROLE`]; returns
    /// `None` for anything else so callers can surface the raw label.
    pub fn canonical(label: &str) -> Option<Self> {
        match label {
            "Administrator" => Some(Self::Administrator),
            "Manager" => Some(Self::Manager),
            "Operator" | LEGACY_OPERATOR_ROLE => Some(Self::Operator),
            _ => None,
        }
    }

    /// Canonical display title of the role.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::Manager => "Manager",
            Self::Operator => "Operator",
        }
    }

    /// Permission set granted when a user is created with this role.
    pub fn default_permissions(&self) -> Vec<Permission> {
        match self {
            Self::Administrator => vec![
                Permission::ManageTemplates,
                Permission::ManageUsers,
                Permission::ExecuteChecklists,
                Permission::ViewReports,
            ],
            Self::Manager => vec![
                Permission::ManageTemplates,
                Permission::ExecuteChecklists,
                Permission::ViewReports,
            ],
            Self::Operator => vec![Permission::ExecuteChecklists],
        }
    }
}

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Role label as written; older data may hold [`LEGACY_OPERATOR_ROLE`].
    pub role: String,
    pub permissions: Vec<Permission>,
}

impl User {
    /// Materializes a validated draft into a stored account.
    pub fn from_draft(draft: &UserDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            role: draft.role.clone(),
            permissions: draft.permissions.clone(),
        }
    }
}

/// Caller-supplied input for creating or editing a user.
///
/// Permissions travel explicitly so an edit can grant or revoke individual
/// capabilities without re-deriving them from the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    /// Role label to store; normally one of the canonical titles.
    pub role: String,
    pub permissions: Vec<Permission>,
}

impl UserDraft {
    /// Creates a draft for `role` seeded with that role's default
    /// permissions.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: role.title().to_string(),
            permissions: role.default_permissions(),
        }
    }

    /// Checks the draft before it may touch stored state.
    ///
    /// # Errors
    /// - [`UserValidationError::BlankField`] when name, email or role is
    ///   empty after trimming.
    /// - [`UserValidationError::InvalidEmail`] when the email does not look
    ///   like `local@domain.tld`.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.name.trim().is_empty() {
            return Err(UserValidationError::BlankField("name"));
        }
        if self.email.trim().is_empty() {
            return Err(UserValidationError::BlankField("email"));
        }
        if self.role.trim().is_empty() {
            return Err(UserValidationError::BlankField("role"));
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Validation failure for user drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    BlankField(&'static str),
    InvalidEmail(String),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "user {field} must not be blank"),
            Self::InvalidEmail(email) => write!(f, "invalid email address: {email}"),
        }
    }
}

impl Error for UserValidationError {}
