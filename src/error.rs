//! Error types for spoditor

use thiserror::Error;

/// Main error type for spoditor operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pod is not a recognizable StatefulSet replica
    ///
    /// The pipeline recovers this locally as "not applicable"; it is never a
    /// reason to reject a pod.
    #[error("identity error: {0}")]
    Identity(String),

    /// A claimed annotation's value is not valid JSON for its payload shape
    #[error("failed to decode annotation '{annotation}': {source}")]
    Decode {
        /// Annotation name (without prefix or qualifier) that failed
        annotation: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Serialization/deserialization error at the admission boundary
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration (flags, TLS material)
    #[error("configuration error: {0}")]
    Config(String),

    /// The webhook server failed to bind or serve
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Create an identity error with the given message
    pub fn identity(msg: impl Into<String>) -> Self {
        Self::Identity(msg.into())
    }

    /// Create a decode error for the given annotation name
    pub fn decode(annotation: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            annotation: annotation.into(),
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a server error with the given message
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Whether this error only means "this pod is out of scope"
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::Identity(_))
    }
}
