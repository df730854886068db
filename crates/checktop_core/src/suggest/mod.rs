//! Corrective-action suggestions for non-conforming items.
//!
//! # Responsibility
//! - Gate suggestion requests on a configured provider credential.
//! - Map provider failures and blank answers to fixed user-facing text.
//!
//! # Invariants
//! - [`CorrectiveActions::suggestion_text`] never returns an error.
//! - The provider is not invoked when no credential is configured.

use log::error;
use std::env;
use std::fmt;

/// Environment variable holding the suggestion-provider credential.
pub const API_KEY_ENV: &str = "CHECKTOP_API_KEY";

/// Text returned when no credential is configured.
pub const MISSING_KEY_MESSAGE: &str = "Configuration error: API key not found. Set the CHECKTOP_API_KEY environment variable to enable suggestions.";

/// Text returned when the provider call fails.
pub const PROVIDER_FAILURE_MESSAGE: &str =
    "Could not fetch suggestions right now. Check your connection and the validity of the API key.";

/// Text returned when the provider answers with blank output.
pub const EMPTY_SUGGESTION_MESSAGE: &str = "No suggestion generated.";

/// Failure reported by a [`SuggestionProvider`].
#[derive(Debug)]
pub enum ProviderError {
    /// The provider has no usable credential.
    MissingCredential,
    /// The provider call failed; carries the transport's description.
    Provider(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing provider credential"),
            Self::Provider(detail) => write!(f, "provider error: {detail}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// External collaborator producing corrective-action text.
///
/// Implementations own their transport, prompt wording and credentials;
/// the checklist title and item text are the only domain inputs.
pub trait SuggestionProvider {
    fn suggest(&self, checklist_title: &str, item_text: &str) -> Result<String, ProviderError>;
}

/// Credential-gated wrapper around a [`SuggestionProvider`].
#[derive(Debug)]
pub struct CorrectiveActions<P> {
    provider: P,
    api_key: Option<String>,
}

impl<P: SuggestionProvider> CorrectiveActions<P> {
    /// Wraps `provider` with an explicit credential.
    ///
    /// A blank credential counts as absent.
    pub fn new(provider: P, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self { provider, api_key }
    }

    /// Wraps `provider` with the credential read from [`API_KEY_ENV`].
    pub fn from_env(provider: P) -> Self {
        Self::new(provider, env::var(API_KEY_ENV).ok())
    }

    /// Returns whether a credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Produces suggestion text for a non-conforming item.
    ///
    /// Every failure path yields a fixed descriptive message: a missing
    /// credential maps to [`MISSING_KEY_MESSAGE`] without invoking the
    /// provider, a provider error to [`PROVIDER_FAILURE_MESSAGE`] and a
    /// blank answer to [`EMPTY_SUGGESTION_MESSAGE`]. Any other answer
    /// passes through verbatim.
    pub fn suggestion_text(&self, checklist_title: &str, item_text: &str) -> String {
        if self.api_key.is_none() {
            error!("event=suggestion module=suggest status=error error_code=missing_credential");
            return MISSING_KEY_MESSAGE.to_string();
        }

        match self.provider.suggest(checklist_title, item_text) {
            Ok(text) => {
                if text.trim().is_empty() {
                    EMPTY_SUGGESTION_MESSAGE.to_string()
                } else {
                    text
                }
            }
            Err(err) => {
                error!(
                    "event=suggestion module=suggest status=error error_code=provider_failed error={err}"
                );
                PROVIDER_FAILURE_MESSAGE.to_string()
            }
        }
    }
}
