// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat messages and stream parts.
//!
//! A finished stream arrives as a list of parts. Tool invocations are
//! polymorphic `dynamic-tool` parts matched on `{toolName, state,
//! output.success}`; completion detection scans newest-first.

use crate::agent::ThinkingLevel;
use crate::task::AgentReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOOL_AGENT_REPORT: &str = "agent_report";
pub const TOOL_PROPOSE_PLAN: &str = "propose_plan";
pub const TOOL_TASK: &str = "task";
pub const TOOL_TASK_AWAIT: &str = "task_await";
pub const TOOL_ASK_USER_QUESTION: &str = "ask_user_question";

/// Lifecycle state of a tool part within a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

/// One part of a streamed assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    DynamicTool {
        tool_name: String,
        state: ToolState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default)]
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }

    pub fn tool(tool_name: impl Into<String>, state: ToolState, input: Value) -> Self {
        MessagePart::DynamicTool {
            tool_name: tool_name.into(),
            state,
            tool_call_id: None,
            input,
            output: None,
        }
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        if let MessagePart::DynamicTool { tool_call_id, .. } = &mut self {
            *tool_call_id = Some(id.into());
        }
        self
    }

    pub fn with_output(mut self, value: Value) -> Self {
        if let MessagePart::DynamicTool { output, state, .. } = &mut self {
            *output = Some(value);
            *state = ToolState::OutputAvailable;
        }
        self
    }
}

/// A matched successful completion-tool invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompletionCall<'a> {
    pub tool_name: &'a str,
    pub input: &'a Value,
    pub output: &'a Value,
}

/// Scan `parts` newest-first for a successful invocation of `tool`.
///
/// A match requires `state == output-available` and `output.success == true`.
pub fn find_completion_call<'a>(parts: &'a [MessagePart], tool: &str) -> Option<CompletionCall<'a>> {
    parts.iter().rev().find_map(|part| match part {
        MessagePart::DynamicTool { tool_name, state, input, output: Some(output), .. }
            if tool_name == tool
                && *state == ToolState::OutputAvailable
                && output.get("success").and_then(Value::as_bool) == Some(true) =>
        {
            Some(CompletionCall { tool_name, input, output })
        }
        _ => None,
    })
}

/// Validate `agent_report` arguments: `reportMarkdown` must be a non-empty
/// string, `title` a string or null.
pub fn parse_agent_report(input: &Value) -> Option<AgentReport> {
    let report_markdown = input.get("reportMarkdown")?.as_str()?;
    if report_markdown.is_empty() {
        return None;
    }
    let title = match input.get("title") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return None,
    };
    Some(AgentReport { report_markdown: report_markdown.to_string(), title })
}

/// Extract `planPath` from a successful `propose_plan` output.
pub fn plan_path_from_output(output: &Value) -> Option<&str> {
    output.get("planPath").and_then(Value::as_str)
}

/// The last non-empty text part, newest-first.
pub fn last_text(parts: &[MessagePart]) -> Option<&str> {
    parts.iter().rev().find_map(|part| match part {
        MessagePart::Text { text } if !text.is_empty() => Some(text.as_str()),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Metadata carried alongside a chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
    /// Who triggered the compaction that produced this summary message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compacted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compaction_epoch: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub compaction_boundary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
}

/// A persisted chat message (one line of `chat.jsonl`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "MessageMetadata::is_empty")]
    pub metadata: MessageMetadata,
}

impl MessageMetadata {
    fn is_empty(&self) -> bool {
        self == &MessageMetadata::default()
    }
}

impl ChatMessage {
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            parts: vec![MessagePart::text(text)],
            metadata: MessageMetadata::default(),
        }
    }

    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            parts: vec![MessagePart::text(text)],
            metadata: MessageMetadata::default(),
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.metadata.synthetic = true;
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.metadata.agent_id = Some(agent_id.into());
        self
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let MessagePart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }
}

/// Render the synthetic report envelope appended to a parent workspace when
/// no `task` tool call is pending for the reporting child.
pub fn subagent_report_envelope(
    task_id: &str,
    agent_type: &str,
    title: Option<&str>,
    report_markdown: &str,
) -> String {
    format!(
        "<mux_subagent_report>\n\
         <task_id>{task_id}</task_id>\n\
         <agent_type>{agent_type}</agent_type>\n\
         <title>{}</title>\n\
         <report_markdown>\n{report_markdown}\n</report_markdown>\n\
         </mux_subagent_report>",
        title.unwrap_or_default(),
    )
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
