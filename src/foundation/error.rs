/// Convenience result type used across montage.
pub type MontageResult<T> = Result<T, MontageError>;

/// Top-level error taxonomy used by compiler, pipeline and engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum MontageError {
    /// Empty or invalid timeline, bad dimensions/duration/frame rate, missing output path.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A referenced file is missing or unreadable. Recoverable per item.
    #[error("resource error: {0}")]
    Resource(String),

    /// Read/process/write failure inside the raw-frame pipeline.
    #[error("pipeline error in {stage}: {message}")]
    Pipeline {
        /// Stage that failed first (`read`, `process`, `write`).
        stage: &'static str,
        /// Failure description.
        message: String,
    },

    /// The graph compiler produced no usable nodes.
    #[error("compilation error: {0}")]
    Compilation(String),

    /// The external media engine could not be started or exited unsuccessfully.
    #[error("engine error: {0}")]
    Engine(String),

    /// Errors when serializing or deserializing timelines.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MontageError {
    /// Build a [`MontageError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`MontageError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`MontageError::Pipeline`] value for `stage`.
    pub fn pipeline(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::Pipeline {
            stage,
            message: msg.into(),
        }
    }

    /// Build a [`MontageError::Compilation`] value.
    pub fn compilation(msg: impl Into<String>) -> Self {
        Self::Compilation(msg.into())
    }

    /// Build a [`MontageError::Engine`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Build a [`MontageError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors the compiler absorbs by dropping the affected item.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Resource(_))
    }

    /// Promote a per-item resource error to a fatal configuration error.
    ///
    /// Used when the failing item was the only thing left to compose.
    pub fn escalate(self) -> Self {
        match self {
            Self::Resource(msg) => Self::Configuration(format!("nothing to compose: {msg}")),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
