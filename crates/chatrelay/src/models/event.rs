use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallNotice {
    pub function: FunctionName,
}

/// A frame relayed to the browser while a chat turn is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Text fragment appended to the current assistant message
    Content { content: String },
    /// A named tool has started
    ToolCall { tool_call: ToolCallNotice },
    Error { content: String },
}

impl ChatEvent {
    pub fn content<S: Into<String>>(content: S) -> Self {
        ChatEvent::Content {
            content: content.into(),
        }
    }

    pub fn tool_call<S: Into<String>>(name: S) -> Self {
        ChatEvent::ToolCall {
            tool_call: ToolCallNotice {
                function: FunctionName { name: name.into() },
            },
        }
    }

    pub fn error<S: Into<String>>(content: S) -> Self {
        ChatEvent::Error {
            content: content.into(),
        }
    }
}
