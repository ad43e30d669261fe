//! The `<tool>NAME</tool>PAYLOAD` text form of a tool call.
//!
//! Structured calls are turned into this form right before processing, and
//! models without function calling write it themselves. [`InlineScanner`]
//! watches relayed content so a self-written marker is captured instead of
//! being shown to the user.

use serde_json::Value;
use thiserror::Error;

use crate::models::tool::PendingToolCall;

pub const OPEN_TAG: &str = "<tool>";
pub const CLOSE_TAG: &str = "</tool>";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid tool arguments")]
pub struct InvalidArguments;

/// Trim and, for object text, cut after the first balanced object.
///
/// Some providers append a second copy of the arguments or stray tokens
/// after the object closes.
pub fn sanitize_arguments(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with('{') {
        return trimmed;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in trimmed.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &trimmed[..=index];
                }
            }
            _ => {}
        }
    }
    trimmed
}

/// Build the marker for a completed structured call.
///
/// With `field`, the payload is that argument's bare value; otherwise it is
/// the sanitized argument JSON.
pub fn synthesize_marker(
    call: &PendingToolCall,
    field: Option<&str>,
) -> Result<String, InvalidArguments> {
    let sanitized = sanitize_arguments(&call.arguments);
    let arguments: Value = serde_json::from_str(sanitized).map_err(|_| InvalidArguments)?;

    let payload = match field {
        Some(field) => match arguments.get(field) {
            Some(Value::String(value)) => value.clone(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
            _ => return Err(InvalidArguments),
        },
        None => sanitized.to_string(),
    };

    Ok(format!("{}{}{}{}", OPEN_TAG, call.name, CLOSE_TAG, payload))
}

/// What remained in the scanner when the stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEnd {
    Nothing,
    /// Held-back text that never became a marker
    Text(String),
    /// Everything from the opening tag onward
    Captured(String),
}

/// Splits streamed content into text that is safe to relay now and a
/// captured inline tool call.
///
/// A fragment ending in a partial `<tool>` is held back until the next
/// fragment decides it. Once the opening tag is seen, the rest of the turn
/// is captured.
#[derive(Debug, Default)]
pub struct InlineScanner {
    pending: String,
    capturing: bool,
}

impl InlineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Feed a fragment, returning the text that may be relayed
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.pending.push_str(fragment);
        if self.capturing {
            return None;
        }

        if let Some(start) = self.pending.find(OPEN_TAG) {
            self.capturing = true;
            let relay: String = self.pending.drain(..start).collect();
            return Some(relay).filter(|text| !text.is_empty());
        }

        let held = (1..OPEN_TAG.len())
            .rev()
            .find(|&len| self.pending.ends_with(&OPEN_TAG[..len]))
            .unwrap_or(0);
        let split = self.pending.len() - held;
        let relay: String = self.pending.drain(..split).collect();
        Some(relay).filter(|text| !text.is_empty())
    }

    pub fn finish(self) -> ScanEnd {
        match (self.capturing, self.pending.is_empty()) {
            (true, _) => ScanEnd::Captured(self.pending),
            (false, true) => ScanEnd::Nothing,
            (false, false) => ScanEnd::Text(self.pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_arguments() {
        assert_eq!(sanitize_arguments("  {\"a\":1}{\"a\":1} "), "{\"a\":1}");
        assert_eq!(sanitize_arguments("{\"q\":\"}{\"}tail"), "{\"q\":\"}{\"}");
        assert_eq!(sanitize_arguments("{\"a\":{\"b\":2}}"), "{\"a\":{\"b\":2}}");
        assert_eq!(sanitize_arguments("{\"a\":"), "{\"a\":");
        assert_eq!(sanitize_arguments(" plain "), "plain");
    }

    #[test]
    fn test_marker_uses_well_known_field() {
        let call = PendingToolCall::new("web_browser", "{\"url\": \"https://example.com\"}");
        assert_eq!(
            synthesize_marker(&call, Some("url")).unwrap(),
            "<tool>web_browser</tool>https://example.com"
        );

        let call = PendingToolCall::new("wikipedia", "{\"query\":\"Alan Turing\"}{\"query\":\"x\"}");
        assert_eq!(
            synthesize_marker(&call, Some("query")).unwrap(),
            "<tool>wikipedia</tool>Alan Turing"
        );
    }

    #[test]
    fn test_marker_carries_json_for_other_tools() {
        let call = PendingToolCall::new("calculator", " {\"expression\":\"2+2\"} ");
        assert_eq!(
            synthesize_marker(&call, None).unwrap(),
            "<tool>calculator</tool>{\"expression\":\"2+2\"}"
        );
    }

    #[test]
    fn test_marker_rejects_bad_arguments() {
        let truncated = PendingToolCall::new("calculator", "{\"expression\":");
        assert_eq!(synthesize_marker(&truncated, None), Err(InvalidArguments));

        let missing = PendingToolCall::new("web_browser", "{\"link\":\"x\"}");
        assert_eq!(synthesize_marker(&missing, Some("url")), Err(InvalidArguments));
    }

    #[test]
    fn test_scanner_relays_plain_text() {
        let mut scanner = InlineScanner::new();
        assert_eq!(scanner.push("Hello "), Some("Hello ".to_string()));
        assert_eq!(scanner.push("a < b"), Some("a < b".to_string()));
        assert_eq!(scanner.finish(), ScanEnd::Nothing);
    }

    #[test]
    fn test_scanner_holds_partial_tag() {
        let mut scanner = InlineScanner::new();
        assert_eq!(scanner.push("Sure <to"), Some("Sure ".to_string()));
        assert_eq!(scanner.push("day"), Some("<today".to_string()));

        let mut scanner = InlineScanner::new();
        assert_eq!(scanner.push("ends with <too"), Some("ends with ".to_string()));
        assert_eq!(scanner.finish(), ScanEnd::Text("<too".to_string()));
    }

    #[test]
    fn test_scanner_captures_marker_across_fragments() {
        let mut scanner = InlineScanner::new();
        assert_eq!(scanner.push("Let me check. <t"), Some("Let me check. ".to_string()));
        assert_eq!(scanner.push("ool>calcu"), None);
        assert!(scanner.is_capturing());
        assert_eq!(scanner.push("lator</tool>2+2"), None);
        assert_eq!(
            scanner.finish(),
            ScanEnd::Captured("<tool>calculator</tool>2+2".to_string())
        );
    }
}
