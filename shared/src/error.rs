use thiserror::Error;
use validator::ValidationErrors;

use crate::constants::{
    EMPTY_SECRET_ERROR, INVALID_PLAYER_ERROR, INVALID_REQUEST_ERROR, INVALID_SECONDS_ERROR,
    SECRET_TOO_LONG_ERROR,
};

/// Failures a display can surface to its operator.
///
/// Absent data (no timer snapshot yet, nothing persisted) is not an error and
/// is reported as `None` by the components that own it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("a spin is already in progress")]
    SpinInFlight,
    #[error("{0}")]
    SpinRejected(String),
    #[error("{0}")]
    Rejected(String),
    #[error("malformed {event} payload: {reason}")]
    MalformedPayload { event: String, reason: String },
    #[error("{0}")]
    InvalidRequest(String),
}

fn field_message(field: &str, code: &str) -> &'static str {
    match (field, code) {
        ("slave_id", _) => INVALID_PLAYER_ERROR,
        ("seconds", _) => INVALID_SECONDS_ERROR,
        (_, "empty_secret") => EMPTY_SECRET_ERROR,
        (_, "secret_too_long") => SECRET_TOO_LONG_ERROR,
        _ => INVALID_REQUEST_ERROR,
    }
}

impl From<ValidationErrors> for SessionError {
    fn from(err: ValidationErrors) -> Self {
        log::debug!("request failed validation: {}", err);
        // Field order in ValidationErrors is unspecified; sort for a stable message.
        let mut fields: Vec<_> = err.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        let message = fields
            .first()
            .and_then(|(field, errors)| errors.first().map(|e| field_message(field, &e.code)))
            .unwrap_or(INVALID_REQUEST_ERROR);
        SessionError::InvalidRequest(message.to_string())
    }
}
