/// Convenience result type used across imgchain.
pub type ChainResult<T> = Result<T, ChainError>;

/// Top-level error taxonomy used by editor and engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum ChainError {
    /// A node, link or kind lookup missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Attempt to delete or duplicate the Input or Output node.
    #[error("protected node: '{0}' cannot be deleted or duplicated")]
    ProtectedNode(String),

    /// Parameter key is not part of the node's schema.
    #[error("unknown parameter '{key}' on node '{node}'")]
    UnknownParameter {
        /// Display label of the node.
        node: String,
        /// Offending parameter key.
        key: String,
    },

    /// A node's transform failed while folding the chain.
    #[error("transform error in node '{node}': {cause:#}")]
    Transform {
        /// Display label of the failing node.
        node: String,
        /// Underlying failure reported by the transform.
        cause: anyhow::Error,
    },

    /// An undo/redo step could not be applied to the current state.
    #[error("history replay error: {0}")]
    HistoryReplay(String),

    /// Invalid user-provided data (ports, parameter types, descriptors).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing project data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChainError {
    /// Build a [`ChainError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`ChainError::ProtectedNode`] value.
    pub fn protected(node: impl Into<String>) -> Self {
        Self::ProtectedNode(node.into())
    }

    /// Build a [`ChainError::UnknownParameter`] value.
    pub fn unknown_parameter(node: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownParameter {
            node: node.into(),
            key: key.into(),
        }
    }

    /// Build a [`ChainError::Transform`] value.
    pub fn transform(node: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Transform {
            node: node.into(),
            cause,
        }
    }

    /// Build a [`ChainError::HistoryReplay`] value.
    pub fn history_replay(msg: impl Into<String>) -> Self {
        Self::HistoryReplay(msg.into())
    }

    /// Build a [`ChainError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ChainError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
