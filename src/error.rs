//! Error types for the embedding engine

use crate::config::ParameterKey;
use thiserror::Error;

/// Result type for embedding operations
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while configuring or running an embedding
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    /// A parameter is missing, has the wrong type or is out of its domain
    #[error("configuration error for {key}: {message}")]
    Configuration { key: ParameterKey, message: String },

    /// A selector token did not name any known method
    #[error("{kind} method '{token}' is not supported")]
    UnsupportedMethod { kind: &'static str, token: String },

    /// Input data is malformed, ragged or empty
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The iterative eigensolver exhausted its iteration budget
    #[error("eigensolver did not converge after {iterations} iterations ({converged} of {requested} eigenpairs converged)")]
    ConvergenceFailure {
        iterations: usize,
        converged: usize,
        requested: usize,
    },

    /// The target dimension or neighbor count is incompatible with the data
    #[error("dimensionality error: {0}")]
    Dimensionality(String),
}

impl EmbeddingError {
    pub(crate) fn configuration(key: ParameterKey, message: impl Into<String>) -> Self {
        EmbeddingError::Configuration {
            key,
            message: message.into(),
        }
    }

    pub(crate) fn dimensionality(message: impl Into<String>) -> Self {
        EmbeddingError::Dimensionality(message.into())
    }
}
