use serde_json::{json, Value};

use crate::models::message::{ContentPart, Message, MessageContent, Role};
use crate::models::tool::Tool;

/// Convert internal messages to the OpenAI chat message specification.
///
/// `plain_content` flattens multi-part bodies into one string for
/// OpenAI-compatible endpoints that reject content arrays.
pub fn messages_to_openai_spec(messages: &[Message], plain_content: bool) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let content = match &message.content {
                MessageContent::Text(text) => json!(text),
                MessageContent::Parts(_) if plain_content => {
                    json!(message.content.to_plain_text())
                }
                MessageContent::Parts(parts) => {
                    Value::Array(parts.iter().map(part_to_openai_spec).collect())
                }
            };
            json!({
                "role": message.role.as_str(),
                "content": content,
            })
        })
        .collect()
}

fn part_to_openai_spec(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::ImageUrl { url } => json!({"type": "image_url", "image_url": {"url": url}}),
        ContentPart::FileUrl { .. } => json!({"type": "text", "text": part.as_plain_text()}),
    }
}

pub fn tools_to_openai_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}

/// Split messages into Anthropic's separate `system` string and its
/// user/assistant turn list. Bodies are flattened to text.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system = Vec::new();
    let mut turns = Vec::new();

    for message in messages {
        let text = message.content.to_plain_text();
        match message.role {
            Role::System => system.push(text),
            Role::User | Role::Assistant => {
                if text.is_empty() {
                    continue;
                }
                turns.push(json!({
                    "role": message.role.as_str(),
                    "content": text,
                }));
            }
        }
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.parameters,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tool() -> Tool {
        Tool::new(
            "wikipedia",
            "Look up a topic",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        )
    }

    #[test]
    fn test_messages_to_openai_spec() {
        let messages = vec![
            Message::system().with_text("be nice"),
            Message::user()
                .with_text("what is this")
                .with_part(ContentPart::image_url("https://img/cat.png")),
        ];
        let spec = messages_to_openai_spec(&messages, false);
        assert_eq!(spec[0], json!({"role": "system", "content": "be nice"}));
        assert_eq!(spec[1]["content"][1]["image_url"]["url"], "https://img/cat.png");

        let flat = messages_to_openai_spec(&messages, true);
        assert_eq!(
            flat[1]["content"],
            json!("what is this\n[Image: https://img/cat.png]")
        );
    }

    #[test]
    fn test_tools_to_openai_spec() {
        let spec = tools_to_openai_spec(&[sample_tool()]);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "wikipedia");
        assert_eq!(spec[0]["function"]["parameters"]["required"][0], "query");
    }

    #[test]
    fn test_messages_to_anthropic_spec() {
        let messages = vec![
            Message::system().with_text("instructions"),
            Message::user().with_text("hi"),
            Message::assistant().with_text(""),
            Message::assistant().with_text("hello"),
        ];
        let (system, turns) = messages_to_anthropic_spec(&messages);
        assert_eq!(system.as_deref(), Some("instructions"));
        assert_eq!(
            turns,
            vec![
                json!({"role": "user", "content": "hi"}),
                json!({"role": "assistant", "content": "hello"}),
            ]
        );
    }

    #[test]
    fn test_tools_to_anthropic_spec() {
        let spec = tools_to_anthropic_spec(&[sample_tool()]);
        assert_eq!(spec[0]["input_schema"]["properties"]["query"]["type"], "string");
        assert!(spec[0].get("parameters").is_none());
    }
}
