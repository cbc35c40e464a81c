use thiserror::Error;

/// Failures talking to the course/order backend, the embedding API or the vector store.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("base url cannot carry path segments: {0}")]
    InvalidBaseUrl(String),

    #[error("embedding response contained no values")]
    EmptyEmbedding,
}

/// Why a single tool invocation could not be resolved.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: missing required argument `{argument}`")]
    MissingArgument { tool: String, argument: String },

    #[error("{tool}: argument `{argument}` must be {expected}, got {found}")]
    InvalidArgument {
        tool: String,
        argument: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{tool} failed: {source}")]
    Backend {
        tool: String,
        #[source]
        source: BackendError,
    },
}

impl ToolError {
    /// True for the argument validation failures.
    pub fn is_invalid_arguments(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. } | Self::InvalidArgument { .. }
        )
    }

    pub fn tool_name(&self) -> &str {
        match self {
            Self::UnknownTool(tool)
            | Self::MissingArgument { tool, .. }
            | Self::InvalidArgument { tool, .. }
            | Self::Backend { tool, .. } => tool,
        }
    }
}
