//! Agent executor: prompts the model for one task and runs its tool calls.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use scriptcrew_llm::{ChatMessage, ChatRequest, ToolCall, ToolDefinition};
use scriptcrew_shared::Result;

use crate::agents::AgentSpec;
use crate::tasks::{ExecutableTask, Inputs, interpolate};

/// Drives a single task to its final answer.
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    max_tool_iterations: usize,
}

impl AgentExecutor {
    pub fn new(max_tool_iterations: usize) -> Self {
        Self {
            max_tool_iterations,
        }
    }

    /// Execute `task` with `context` (the joined outputs of its upstream
    /// tasks) and return the agent's final answer.
    ///
    /// Tool calls are answered and fed back until the model replies without
    /// calling a tool. After `max_tool_iterations` rounds the tools are
    /// withdrawn and the model must answer.
    #[instrument(skip_all, fields(task = %task.id, agent = %task.agent.id))]
    pub async fn execute(
        &self,
        task: &ExecutableTask,
        context: &str,
        inputs: &Inputs,
    ) -> Result<String> {
        let agent = &task.agent;
        let loud = task.verbose || agent.verbose;
        let start = Instant::now();

        let mut messages = vec![
            ChatMessage::system(system_prompt(agent, inputs)),
            ChatMessage::user(task_prompt(task, context, inputs)),
        ];
        let tools: Vec<ToolDefinition> = agent
            .tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.input_schema(),
            })
            .collect();

        let mut rounds = 0;
        loop {
            let offer_tools = !tools.is_empty() && rounds < self.max_tool_iterations;
            let request = ChatRequest {
                messages: messages.clone(),
                tools: if offer_tools { tools.clone() } else { Vec::new() },
                json_mode: agent.output_json,
            };

            let response = agent.model.complete(&request).await?;
            debug!(
                round = rounds,
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                tool_calls = response.tool_calls.len(),
                "model replied"
            );

            if !offer_tools || response.tool_calls.is_empty() {
                let answer = response.text_or_empty().trim().to_string();
                if answer.is_empty() {
                    warn!("agent returned an empty answer");
                }
                let elapsed_ms = start.elapsed().as_millis() as u64;
                if loud {
                    info!(elapsed_ms, chars = answer.len(), "task complete");
                } else {
                    debug!(elapsed_ms, chars = answer.len(), "task complete");
                }
                return Ok(answer);
            }

            rounds += 1;
            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                if loud {
                    info!(tool = %call.name, "calling tool");
                } else {
                    debug!(tool = %call.name, "calling tool");
                }
                let output = call_tool(agent, call).await;
                messages.push(ChatMessage::tool_result(&call.id, output));
            }
        }
    }
}

fn system_prompt(agent: &AgentSpec, inputs: &Inputs) -> String {
    let mut prompt = format!(
        "You are {}. {}\nYour personal goal is: {}",
        interpolate(agent.role.trim(), inputs),
        interpolate(agent.backstory.trim(), inputs),
        interpolate(agent.goal.trim(), inputs),
    );
    if !agent.tools.is_empty() {
        prompt.push_str("\nUse the tools you have been given when you need fresh information.");
    }
    if agent.output_json {
        prompt.push_str("\nAlways answer with a single valid JSON object and nothing else.");
    }
    prompt
}

fn task_prompt(task: &ExecutableTask, context: &str, inputs: &Inputs) -> String {
    let mut prompt = format!(
        "Current task: {}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        interpolate(task.description.trim(), inputs),
        interpolate(task.expected_output.trim(), inputs),
    );
    if !context.trim().is_empty() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context.trim());
    }
    prompt
}

/// Run one requested tool call. Never fails: problems become the tool's
/// answer so the model can recover.
async fn call_tool(agent: &AgentSpec, call: &ToolCall) -> String {
    let Some(tool) = agent.tools.iter().find(|t| t.name() == call.name) else {
        let available: Vec<&str> = agent.tools.iter().map(|t| t.name()).collect();
        warn!(tool = %call.name, "model called an unknown tool");
        return format!(
            "Error: tool '{}' does not exist. Available tools: {}",
            call.name,
            available.join(", ")
        );
    };

    let input = tool_input(&call.arguments, tool.input_field());
    tool.run(&input).await
}

/// Pull the single string argument out of a tool call's JSON arguments.
fn tool_input(arguments: &str, field: &str) -> String {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => match map.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => map
                .values()
                .find_map(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
        },
        Ok(Value::String(s)) => s,
        _ => arguments.trim().to_string(),
    }
}
