//! Tool registry: the closed set of operations the model may invoke.
//!
//! Tool-call arguments come from the model runtime and are treated as
//! untrusted input: names map onto [`ToolKind`] or fail, arguments are
//! validated against the declared schema before dispatch, and every
//! failure is folded into an error ToolResult instead of escalating.

use crate::db::{QueryExecutor, SchemaInspector};
use crate::error::ToolError;
use crate::types::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Definition of a tool exposed to the model runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The registered tools. A closed enum keeps dispatch exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    DescribeSchema,
    RunQuery,
}

impl ToolKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::DescribeSchema => "describe_schema",
            Self::RunQuery => "run_query",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "describe_schema" => Some(Self::DescribeSchema),
            "run_query" => Some(Self::RunQuery),
            _ => None,
        }
    }
}

/// Build the list of tool definitions declared to the model.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ToolKind::DescribeSchema.name().into(),
            description: "List every table in the database with its columns, declared types \
                          and nullability. Call this before writing any query."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: ToolKind::RunQuery.name().into(),
            description: "Execute a single read-only SQL SELECT against the database and \
                          return the matching rows. Write statements are rejected."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "One SQLite SELECT statement"
                    }
                },
                "required": ["sql"]
            }),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tool execution
// ---------------------------------------------------------------------------

/// Handles to the database-facing components the tools dispatch into.
pub struct ToolContext {
    pub inspector: SchemaInspector,
    pub executor: QueryExecutor,
}

/// Execute one model-requested call. Never fails upward: every error
/// becomes an error ToolResult carrying `{"error", "kind"}` so the model
/// can react to it on the next turn.
pub async fn execute_tool(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    match dispatch(ctx, call).await {
        Ok(output) => ToolResult {
            tool_call_id: call.id.clone(),
            output,
            success: true,
        },
        Err(e) => ToolResult {
            tool_call_id: call.id.clone(),
            output: json!({ "error": e.to_string(), "kind": e.kind() }).to_string(),
            success: false,
        },
    }
}

async fn dispatch(ctx: &ToolContext, call: &ToolCall) -> Result<String, ToolError> {
    let kind = ToolKind::from_name(&call.name)
        .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

    match kind {
        ToolKind::DescribeSchema => {
            let snapshot = ctx.inspector.describe().await?;
            Ok(serde_json::to_string(&snapshot).unwrap_or_default())
        }
        ToolKind::RunQuery => {
            let sql = require_str(&call.arguments, "sql")?;
            let result = ctx.executor.execute(sql).await?;
            Ok(serde_json::to_string(&result).unwrap_or_default())
        }
    }
}

/// Pull a required, non-empty string argument out of the call payload.
fn require_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    let value = args
        .get(key)
        .ok_or_else(|| ToolError::Validation(format!("missing required argument '{key}'")))?;
    let text = value
        .as_str()
        .ok_or_else(|| ToolError::Validation(format!("argument '{key}' must be a string")))?;
    if text.trim().is_empty() {
        return Err(ToolError::Validation(format!(
            "argument '{key}' must not be empty"
        )));
    }
    Ok(text)
}
