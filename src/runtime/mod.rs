//! Model-runtime boundary.

pub mod client;

pub use client::RuntimeClient;

use crate::error::RuntimeError;
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ModelReply};
use async_trait::async_trait;

/// A chat-completion runtime that can propose tool calls.
///
/// The production implementation is [`RuntimeClient`]; tests drive the
/// orchestrator with scripted implementations.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// One round-trip: conversation plus tool declarations in, either a
    /// final answer or tool-call requests out.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, RuntimeError>;
}
