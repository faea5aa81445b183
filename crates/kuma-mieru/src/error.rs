//! Error taxonomy for the resolution pipeline.

use std::error::Error as StdError;

/// Boxed cause carried inside a [`MieruError::Resolution`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Coarse error category. Callers branch on this, never on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Validation,
}

/// All errors that can occur while resolving a status page snapshot.
#[derive(thiserror::Error, Debug)]
pub enum MieruError {
    /// Identity or settings could not be resolved (unknown page id,
    /// malformed base URL, missing environment input).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The extraction chain failed: HTML endpoint unreachable or non-2xx,
    /// embedded payload unparseable, or the API fallback failed.
    #[error("Resolution error: {message}")]
    Resolution {
        message: String,
        endpoint: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    /// A parsed payload is missing a required field or has the wrong type.
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl MieruError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MieruError::Configuration(_) => ErrorKind::Configuration,
            MieruError::Resolution { .. } => ErrorKind::Resolution,
            MieruError::Validation { .. } => ErrorKind::Validation,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        MieruError::Configuration(message.into())
    }

    pub fn resolution(message: impl Into<String>, endpoint: impl Into<String>) -> Self {
        MieruError::Resolution {
            message: message.into(),
            endpoint: Some(endpoint.into()),
            source: None,
        }
    }

    /// Resolution error that keeps `cause` in the source chain.
    pub fn resolution_from(
        message: impl Into<String>,
        endpoint: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        MieruError::Resolution {
            message: message.into(),
            endpoint: Some(endpoint.into()),
            source: Some(cause.into()),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        MieruError::Validation {
            field: field.into(),
            reason: "required field is missing".to_string(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MieruError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Endpoint the failing request targeted, when known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            MieruError::Resolution { endpoint, .. } => endpoint.as_deref(),
            _ => None,
        }
    }

    /// Messages of this error and every error in its source chain.
    pub fn chain_messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }
        messages
    }
}

/// Convenience result type.
pub type MieruResult<T> = Result<T, MieruError>;
