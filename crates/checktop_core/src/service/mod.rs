//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate collection lookups and mutations into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod checklist_service;
