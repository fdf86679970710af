use std::time::Duration;

/// Failure of a single tool call.
///
/// The registry turns every variant into an error envelope, so none of these
/// ever reach a transport as a Rust error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The owning module does not declare this tool.
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    /// No registered module claims the tool name at all.
    #[error("no module registered for tool: {name}")]
    Unroutable { name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tool {name} timed out after {limit:?}")]
    Timeout { name: String, limit: Duration },

    #[error("tool {name} panicked while executing")]
    Panicked { name: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }
}

/// Configuration mistakes caught while building a [`ToolRegistry`](crate::ToolRegistry).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("module domain registered twice: {0}")]
    DuplicateDomain(String),

    #[error("tool {name} declared by both {first} and {second}")]
    DuplicateTool {
        name: String,
        first: String,
        second: String,
    },

    #[error("tool {name} does not carry the '{domain}_' prefix of its module")]
    PrefixMismatch { name: String, domain: String },
}
