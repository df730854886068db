//! Domain model for checklist templates, runs, users and notifications.
//!
//! # Responsibility
//! - Define the canonical data shapes shared by the lifecycle engine,
//!   persistence layer and read-only reporting views.
//! - Keep field-level validation next to the data it guards.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID-backed id type alias.
//! - Instance items are a frozen copy of their template items; template
//!   edits never reach past or in-progress runs.

pub mod checklist;
pub mod notification;
pub mod user;
