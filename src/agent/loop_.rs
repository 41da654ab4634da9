//! Question/answer control loop: think, act, observe, bounded.
//!
//! Each cycle owns its conversation. Every model reply either finishes
//! the cycle with a final answer or requests tool calls, which are
//! executed one at a time in the order received, their results appended
//! as tool turns. The round-trip budget turns a looping model into a
//! degraded answer instead of a hang.

use crate::agent::system_prompt;
use crate::config::AnalystConfig;
use crate::error::RuntimeError;
use crate::runtime::ModelRuntime;
use crate::tools::{self, ToolContext};
use crate::types::*;
use tracing::{debug, info, warn};

/// Drive one question through the model until it produces an answer or
/// the round-trip budget runs out.
///
/// Tool failures never end the cycle; they are fed back as conversation
/// content. Only runtime-infrastructure failures surface as `Err`.
pub async fn run_cycle(
    config: &AnalystConfig,
    runtime: &dyn ModelRuntime,
    tool_ctx: &ToolContext,
    question: &str,
) -> Result<CycleReport, RuntimeError> {
    let tool_defs = tools::tool_definitions();
    let mut conversation = vec![
        ChatMessage::system(system_prompt::build_system_prompt(config)),
        ChatMessage::user(question),
    ];
    let mut usage = TokenUsage::default();

    for round in 1..=config.iteration_limit {
        debug!("Model round {}/{}", round, config.iteration_limit);

        let reply = runtime.chat(&conversation, &tool_defs).await?;
        usage.add(&reply.usage);

        if reply.tool_calls.is_empty() {
            let answer = reply.content.unwrap_or_default();
            info!("Answer ready after {} round(s)", round);
            conversation.push(ChatMessage::assistant(answer.clone()));
            return Ok(CycleReport {
                answer,
                complete: true,
                rounds: round,
                usage,
                conversation,
            });
        }

        conversation.push(ChatMessage::assistant_with_calls(
            reply.content.clone(),
            reply.tool_calls.clone(),
        ));

        for call in &reply.tool_calls {
            info!("Tool call: {}({})", call.name, call.arguments);
            let result = tools::execute_tool(tool_ctx, call).await;
            if result.success {
                debug!("Tool ok: {} bytes", result.output.len());
            } else {
                warn!("Tool error: {}", result.output);
            }
            conversation.push(ChatMessage::tool(&call.id, &result.output));
        }
    }

    warn!(
        "Iteration limit ({}) reached without a final answer",
        config.iteration_limit
    );
    let answer = format!(
        "I could not reach a conclusive answer within {} tool rounds. \
         Try asking a narrower question.",
        config.iteration_limit
    );
    Ok(CycleReport {
        answer,
        complete: false,
        rounds: config.iteration_limit,
        usage,
        conversation,
    })
}
