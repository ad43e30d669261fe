use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One element of a multi-part message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        url: String,
    },
    FileUrl {
        url: String,
        name: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_url<S: Into<String>>(url: S) -> Self {
        ContentPart::ImageUrl { url: url.into() }
    }

    /// Plain-text rendering for providers that only accept string content
    pub fn as_plain_text(&self) -> String {
        match self {
            ContentPart::Text { text } => text.clone(),
            ContentPart::ImageUrl { url } => format!("[Image: {}]", url),
            ContentPart::FileUrl {
                url,
                name,
                mime_type,
            } => format!("[File: {} ({}) {}]", name, mime_type, url),
        }
    }
}

/// Message body: either a plain string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }

    /// Flatten to a single string, joining parts with newlines
    pub fn to_plain_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(ContentPart::as_plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A message to or from an LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new<C: Into<MessageContent>>(role: Role, content: C) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    pub fn user() -> Self {
        Message::new(Role::User, MessageContent::default())
    }

    pub fn assistant() -> Self {
        Message::new(Role::Assistant, MessageContent::default())
    }

    pub fn system() -> Self {
        Message::new(Role::System, MessageContent::default())
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content = MessageContent::Text(text.into());
        self
    }

    /// Append a part, converting a plain-string body into its first part
    pub fn with_part(mut self, part: ContentPart) -> Self {
        self.content = match self.content {
            MessageContent::Text(text) if text.is_empty() => MessageContent::Parts(vec![part]),
            MessageContent::Text(text) => {
                MessageContent::Parts(vec![ContentPart::Text { text }, part])
            }
            MessageContent::Parts(mut parts) => {
                parts.push(part);
                MessageContent::Parts(parts)
            }
        };
        self
    }

    /// Append streamed text to the body
    pub fn push_text(&mut self, fragment: &str) {
        match &mut self.content {
            MessageContent::Text(text) => text.push_str(fragment),
            MessageContent::Parts(parts) => match parts.last_mut() {
                Some(ContentPart::Text { text }) => text.push_str(fragment),
                _ => parts.push(ContentPart::text(fragment)),
            },
        }
    }

    /// Rejects a part list with no entries
    pub fn validate(&self) -> Result<(), String> {
        match &self.content {
            MessageContent::Parts(parts) if parts.is_empty() => Err(format!(
                "{} message has an empty content part list",
                self.role.as_str()
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_plain_and_parts() {
        let plain: Message = serde_json::from_value(json!({
            "role": "user",
            "content": "hello"
        }))
        .unwrap();
        assert_eq!(plain, Message::user().with_text("hello"));

        let parts: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "look"},
                {"type": "image_url", "url": "https://img/x.png"},
                {"type": "file_url", "url": "upload://1", "name": "a.pdf", "mimeType": "application/pdf"}
            ]
        }))
        .unwrap();
        match &parts.content {
            MessageContent::Parts(p) => {
                assert_eq!(p.len(), 3);
                assert_eq!(
                    p[2],
                    ContentPart::FileUrl {
                        url: "upload://1".into(),
                        name: "a.pdf".into(),
                        mime_type: "application/pdf".into()
                    }
                );
            }
            _ => panic!("Expected parts"),
        }
    }

    #[test]
    fn test_plain_text_flattening() {
        let message = Message::user()
            .with_text("see this")
            .with_part(ContentPart::image_url("https://img/x.png"));
        assert_eq!(
            message.content.to_plain_text(),
            "see this\n[Image: https://img/x.png]"
        );
    }

    #[test]
    fn test_push_text_appends() {
        let mut message = Message::assistant();
        message.push_text("Hel");
        message.push_text("lo");
        assert_eq!(message.content, MessageContent::Text("Hello".into()));
    }

    #[test]
    fn test_validate_rejects_empty_parts() {
        let message = Message::new(Role::User, MessageContent::Parts(vec![]));
        assert!(message.validate().is_err());
        assert!(Message::user().with_text("ok").validate().is_ok());
    }
}
