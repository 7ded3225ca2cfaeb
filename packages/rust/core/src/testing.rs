//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scriptcrew_llm::{ChatModel, ChatRequest, ChatResponse, Role};
use scriptcrew_shared::{CrewDefinition, Result, ScriptCrewError, ToolKind};
use scriptcrew_tools::Tool;

use crate::agents::AgentSpec;

/// The crew definition shipped in `config/crew.yaml`.
pub fn crew_definition() -> CrewDefinition {
    CrewDefinition::from_yaml(include_str!("../../../../config/crew.yaml"))
        .expect("shipped crew definition parses")
}

/// Replies with the last user message.
pub struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let last = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse::text(last))
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}

/// Replies from a fixed queue and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_responses(replies.into_iter().map(ChatResponse::text).collect())
    }

    pub fn from_responses(replies: Vec<ChatResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScriptCrewError::Llm("scripted model has no replies left".into()))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Search-kind tool that answers with a fixed reply and records its inputs.
pub struct RecordingTool {
    reply: String,
    calls: Mutex<Vec<String>>,
}

impl RecordingTool {
    pub fn search(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchTool
    }

    fn description(&self) -> &str {
        "records queries"
    }

    fn input_field(&self) -> &str {
        "query"
    }

    fn input_description(&self) -> &str {
        "query"
    }

    async fn run(&self, input: &str) -> String {
        self.calls.lock().unwrap().push(input.to_string());
        self.reply.clone()
    }
}

pub fn agent(id: &str) -> Arc<AgentSpec> {
    agent_with_model(id, Arc::new(EchoModel))
}

pub fn agent_with_model(id: &str, model: Arc<dyn ChatModel>) -> Arc<AgentSpec> {
    Arc::new(AgentSpec {
        id: id.to_string(),
        role: format!("{id} role"),
        goal: format!("{id} goal"),
        backstory: format!("{id} backstory"),
        tools: Vec::new(),
        verbose: false,
        allow_delegation: false,
        output_json: false,
        model,
    })
}

pub fn agent_with_tool(
    id: &str,
    model: Arc<dyn ChatModel>,
    tool: Arc<RecordingTool>,
) -> Arc<AgentSpec> {
    Arc::new(AgentSpec {
        id: id.to_string(),
        role: format!("{id} role"),
        goal: format!("{id} goal"),
        backstory: format!("{id} backstory"),
        tools: vec![tool as Arc<dyn Tool>],
        verbose: false,
        allow_delegation: false,
        output_json: false,
        model,
    })
}
