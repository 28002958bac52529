/// Convenience result type used across the decoder core.
pub type EnhanceResult<T> = Result<T, EnhanceError>;

/// Top-level error taxonomy used by decoder APIs.
#[derive(thiserror::Error, Debug)]
pub enum EnhanceError {
    /// Malformed coefficient, tile or command-buffer state, or an invalid argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// No kernel exists for a configuration, even after falling back to the generic table.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// Surface dimensions, stride or format do not match what a stage requires.
    #[error("surface error: {0}")]
    Surface(String),

    /// A frame failed because one or more of its work units failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EnhanceError {
    /// Build a [`EnhanceError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`EnhanceError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`EnhanceError::Surface`] value.
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    /// Build a [`EnhanceError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`EnhanceError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
