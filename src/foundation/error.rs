use std::path::PathBuf;

pub type NodeResult<T> = Result<T, NodeError>;

#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    #[error("{tool} not found. Install it and ensure it is in PATH.")]
    ToolNotFound { tool: String },

    /// Carries the tool's own diagnostic text, displayed verbatim.
    #[error("{message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("{tool} did not produce an output video at '{}'", path.display())]
    EncodeProducedNoOutput { tool: String, path: PathBuf },

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NodeError {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecutionFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn no_output(tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::EncodeProducedNoOutput {
            tool: tool.into(),
            path: path.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
