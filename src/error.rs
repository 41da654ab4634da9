//! Error taxonomy for the analyst core.
//!
//! Two families, by who gets to see them: [`ToolError`] covers everything
//! that can go wrong while executing a model-proposed action and is fed
//! back into the conversation as an error ToolResult, so the model can
//! correct itself. [`RuntimeError`] covers failures of the orchestrator's
//! own infrastructure and is terminal for the current question.

use thiserror::Error;

/// A failed model-proposed tool call. Always recoverable: serialized into
/// the conversation, never allowed to end the process.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool arguments did not match the declared input schema.
    #[error("invalid arguments: {0}")]
    Validation(String),

    /// The model asked for a tool that is not registered.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// The statement contains a write or schema-changing verb.
    #[error("disallowed operation: {0}")]
    DisallowedOperation(String),

    /// More than one top-level statement in a single call.
    #[error("multiple SQL statements are not allowed; send exactly one")]
    MultipleStatements,

    /// The query ran past the configured budget and was interrupted.
    #[error("query timed out after {timeout_ms} ms")]
    QueryTimeout { timeout_ms: u64 },

    /// The engine rejected or failed the statement.
    #[error("query failed: {0}")]
    Query(String),

    /// Reading the database catalog failed.
    #[error("schema read failed: {0}")]
    Schema(String),
}

impl ToolError {
    /// Stable machine-readable kind for the wire payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnknownTool(_) => "unknown_tool",
            Self::DisallowedOperation(_) => "disallowed_operation",
            Self::MultipleStatements => "multiple_statements",
            Self::QueryTimeout { .. } => "query_timeout",
            Self::Query(_) => "query_error",
            Self::Schema(_) => "schema_error",
        }
    }
}

/// Infrastructure failure in the model-runtime exchange. Surfaced to the
/// user as a failed question, not fed back to the model.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The model runtime could not be reached at all.
    #[error("model runtime unreachable at {url}: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The runtime answered with something the bridge could not use.
    #[error("model runtime protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_kinds_are_stable() {
        assert_eq!(ToolError::Validation("x".into()).kind(), "validation_error");
        assert_eq!(ToolError::UnknownTool("f".into()).kind(), "unknown_tool");
        assert_eq!(
            ToolError::DisallowedOperation("no".into()).kind(),
            "disallowed_operation"
        );
        assert_eq!(ToolError::MultipleStatements.kind(), "multiple_statements");
        assert_eq!(
            ToolError::QueryTimeout { timeout_ms: 10 }.kind(),
            "query_timeout"
        );
        assert_eq!(ToolError::Query("boom".into()).kind(), "query_error");
        assert_eq!(ToolError::Schema("boom".into()).kind(), "schema_error");
    }

    #[test]
    fn timeout_message_names_the_budget() {
        let err = ToolError::QueryTimeout { timeout_ms: 2500 };
        assert!(err.to_string().contains("2500 ms"));
    }
}
