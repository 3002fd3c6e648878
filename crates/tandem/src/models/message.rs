use super::role::Role;
use super::tool::ToolCall;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One turn in a conversation, to or from an LLM
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role) -> Self {
        Message {
            role,
            created: Utc::now().timestamp(),
            content: String::new(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Self::with_role(Role::User)
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Self::with_role(Role::Assistant)
    }

    /// Create a new system message with the current timestamp
    pub fn system() -> Self {
        Self::with_role(Role::System)
    }

    /// Create a tool result message answering the tool call `id`
    pub fn tool<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        let mut message = Self::with_role(Role::Tool);
        message.tool_call_id = Some(id.into());
        message.name = Some(name.into());
        message
    }

    /// Append text to the message content
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content.push_str(&text.into());
        self
    }

    /// Add a tool call descriptor to the message
    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_calls.push(tool_call);
        self
    }

    /// Add several tool call descriptors, keeping their order
    pub fn with_tool_calls<I: IntoIterator<Item = ToolCall>>(mut self, tool_calls: I) -> Self {
        self.tool_calls.extend(tool_calls);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Copy of the message with trailing whitespace removed from its text
    pub fn cleaned(&self) -> Self {
        let mut cleaned = self.clone();
        cleaned.content = self.content.trim_end().to_string();
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let message = Message::assistant()
            .with_text("Let me check")
            .with_tool_call(ToolCall::new("call_1", "terminal", json!({"command": "ls"})));
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Let me check");
        assert!(message.has_tool_calls());

        let result = Message::tool("call_1", "terminal").with_text("file.txt");
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(result.name.as_deref(), Some("terminal"));
    }

    #[test]
    fn test_cleaned_strips_trailing_whitespace_only() {
        let message = Message::user().with_text("  hello \n\t ");
        assert_eq!(message.cleaned().content, "  hello");
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let message = Message::user().with_text("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("tool_calls").is_none());
        assert!(value.get("tool_call_id").is_none());

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }
}
