//! Core conversation types

use serde::{Deserialize, Serialize};

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role from its wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Content blocks in messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MessageContent {
    /// Text content
    Text { text: String },
    /// Image content (base64 encoded)
    Image { data: String, mime_type: String },
    /// Tool call request issued by the assistant
    ToolRequest {
        id: String,
        tool_call: serde_json::Value,
    },
    /// Result of a tool call
    ToolResponse {
        id: String,
        tool_result: serde_json::Value,
    },
    /// Thinking/reasoning content
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Reasoning the provider withheld
    RedactedThinking { data: String },
    /// The backend reported the context window is exhausted
    ContextLengthExceeded { msg: String },
    /// A compaction boundary
    SummarizationRequested { msg: String },
}

impl MessageContent {
    /// Create text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a compaction boundary block
    pub fn summarization_requested(msg: impl Into<String>) -> Self {
        Self::SummarizationRequested { msg: msg.into() }
    }

    /// Get text if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Check if this is a compaction boundary block
    pub fn is_summarization_requested(&self) -> bool {
        matches!(self, Self::SummarizationRequested { .. })
    }
}

fn default_true() -> bool {
    true
}

/// A conversation message as held by the host.
///
/// `display` and `send_to_llm` are independent: a message can be rendered
/// without being replayed to the model, or replayed without being rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    /// Creation time in unix seconds
    #[serde(default)]
    pub created: i64,
    pub content: Vec<MessageContent>,
    /// Render in the transcript
    #[serde(default = "default_true")]
    pub display: bool,
    /// Include when re-submitting history to the model
    #[serde(default = "default_true", rename = "sendToLLM")]
    pub send_to_llm: bool,
}

impl Message {
    /// Create a message with the given role and content, visible and sent
    pub fn new(role: Role, content: Vec<MessageContent>) -> Self {
        Self {
            id: None,
            role,
            created: chrono::Utc::now().timestamp(),
            content,
            display: true,
            send_to_llm: true,
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![MessageContent::text(text)])
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![MessageContent::text(text)])
    }

    /// Set the identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replace both visibility flags
    pub fn with_visibility(mut self, display: bool, send_to_llm: bool) -> Self {
        self.display = display;
        self.send_to_llm = send_to_llm;
        self
    }

    /// `(display, send_to_llm)`
    pub fn visibility(&self) -> (bool, bool) {
        (self.display, self.send_to_llm)
    }

    /// Whether any content block marks a compaction boundary
    pub fn has_summarization_marker(&self) -> bool {
        self.content
            .iter()
            .any(MessageContent::is_summarization_requested)
    }

    /// Get combined text content
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Messages that are replayed to the model, in order
pub fn messages_for_llm(messages: &[Message]) -> Vec<Message> {
    messages.iter().filter(|m| m.send_to_llm).cloned().collect()
}

/// Messages that are rendered in the transcript, in order
pub fn visible_messages(messages: &[Message]) -> Vec<Message> {
    messages.iter().filter(|m| m.display).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_to_true() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "role": "user",
            "created": 1,
            "content": [{"type": "text", "text": "hi"}]
        }))
        .unwrap();
        assert_eq!(msg.visibility(), (true, true));
        assert!(msg.id.is_none());
    }

    #[test]
    fn test_send_to_llm_wire_name() {
        let msg = Message::assistant("ok").with_visibility(true, false);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["sendToLLM"], false);
        assert_eq!(value["display"], true);
        assert_eq!(value["role"], "assistant");
    }

    #[test]
    fn test_content_tags_are_camel_case() {
        let block = MessageContent::summarization_requested("compacted");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "summarizationRequested");

        let image = MessageContent::Image {
            data: "abc".into(),
            mime_type: "image/png".into(),
        };
        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(value["mimeType"], "image/png");
    }

    #[test]
    fn test_tool_request_parses() {
        let block: MessageContent = serde_json::from_value(serde_json::json!({
            "type": "toolRequest",
            "id": "call_1",
            "toolCall": {"status": "success", "value": {"name": "shell"}}
        }))
        .unwrap();
        assert!(matches!(block, MessageContent::ToolRequest { ref id, .. } if id == "call_1"));
    }

    #[test]
    fn test_marker_detection() {
        let mut msg = Message::assistant("before");
        assert!(!msg.has_summarization_marker());
        msg.content.push(MessageContent::summarization_requested("x"));
        assert!(msg.has_summarization_marker());
    }

    #[test]
    fn test_text_joins_text_blocks_only() {
        let msg = Message::new(
            Role::Assistant,
            vec![
                MessageContent::text("a"),
                MessageContent::Thinking {
                    thinking: "hmm".into(),
                    signature: None,
                },
                MessageContent::text("b"),
            ],
        );
        assert_eq!(msg.text(), "ab");
    }

    #[test]
    fn test_history_filters() {
        let messages = vec![
            Message::user("shown and sent"),
            Message::assistant("marker").with_visibility(true, false),
            Message::user("summary").with_visibility(false, true),
        ];
        let sent: Vec<String> = messages_for_llm(&messages).iter().map(|m| m.text()).collect();
        assert_eq!(sent, vec!["shown and sent", "summary"]);
        let shown: Vec<String> = visible_messages(&messages).iter().map(|m| m.text()).collect();
        assert_eq!(shown, vec!["shown and sent", "marker"]);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
