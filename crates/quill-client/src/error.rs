//! Client-side error taxonomy.

use thiserror::Error;

use quill_shared::FieldError;

/// Errors surfaced by the API client and the store.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a failure envelope.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<FieldError>,
    },

    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the envelope contract.
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl ClientError {
    /// The server-provided message when there is one, otherwise the
    /// per-operation fallback.
    pub fn server_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Field-level validation errors, if the server sent any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ClientError::Api { errors, .. } => errors,
            _ => &[],
        }
    }
}
