//! Unified error type for the reelgate application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`].

/// Unified error type covering all failure modes in reelgate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested file or resource could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// The resolved path escapes every allowed root, or the caller lacks
    /// permission for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A Range header was malformed or cannot be satisfied against the
    /// entity's size.
    #[error("Range not satisfiable: {0}")]
    RangeNotSatisfiable(String),

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// An external tool failed to execute.
    #[error("tool execution failed [{tool}]: {message}")]
    ToolFailed {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description (bounded diagnostic tail).
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Unauthorized => 401,
            Error::Forbidden(_) => 403,
            Error::Validation(_) => 400,
            Error::RangeNotSatisfiable(_) => 416,
            Error::ToolNotFound { .. } => 502,
            Error::ToolFailed { .. } => 502,
            Error::Io(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Create a new NotFound error.
    pub fn not_found(msg: impl std::fmt::Display) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Create a new Forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a new Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new RangeNotSatisfiable error.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::RangeNotSatisfiable(msg.into())
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
