use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{ToolHandler, ToolOutput};
use crate::errors::ToolResult;
use crate::models::tool::Tool;

pub const INVALID_EXPRESSION: &str = "Error: Invalid mathematical expression";

/// Longest sanitized expression that is evaluated
const MAX_EXPRESSION_LEN: usize = 4096;
/// Deepest parenthesis nesting accepted
const MAX_DEPTH: usize = 256;

/// Arithmetic over `+ - * / ** ( )`. Everything else in the input is dropped.
pub struct Calculator {
    tool: Tool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "calculator",
                "Useful for performing mathematical calculations",
                json!({
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "The mathematical expression to evaluate"
                        }
                    },
                    "required": ["expression"]
                }),
            ),
        }
    }
}

#[async_trait]
impl ToolHandler for Calculator {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let expression = params
            .get("expression")
            .and_then(Value::as_str)
            .unwrap_or_default();
        info!(expression, "calculating");

        let text = match evaluate(expression) {
            Some(value) => format_number(value),
            None => INVALID_EXPRESSION.to_string(),
        };
        Ok(ToolOutput::Text(text))
    }
}

/// Evaluate after stripping every character that is not a digit, operator,
/// parenthesis or dot.
pub fn evaluate(expression: &str) -> Option<f64> {
    let sanitized: Vec<u8> = expression
        .bytes()
        .filter(|b| b.is_ascii_digit() || b"+-*/().".contains(b))
        .collect();
    if sanitized.len() > MAX_EXPRESSION_LEN {
        return None;
    }
    let mut parser = Parser {
        input: &sanitized,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.pos == sanitized.len() {
        Some(value)
    } else {
        None
    }
}

/// Render like a script engine would: integers without a fraction.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn starts_with(&self, token: &[u8]) -> bool {
        self.input[self.pos..].starts_with(token)
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == b'+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.power()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.power()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    value /= self.power()?;
                }
                _ => return Some(value),
            }
        }
    }

    /// Right-associative: `2 ** 3 ** 2` is `2 ** 9`
    fn power(&mut self) -> Option<f64> {
        let mut operands = vec![self.unary()?];
        while self.starts_with(b"**") {
            self.pos += 2;
            operands.push(self.unary()?);
        }
        operands
            .into_iter()
            .rev()
            .reduce(|exponent, base| base.powf(exponent))
    }

    fn unary(&mut self) -> Option<f64> {
        let mut negate = false;
        loop {
            match self.peek()? {
                b'-' => negate = !negate,
                b'+' => {}
                _ => break,
            }
            self.pos += 1;
        }
        let value = self.primary()?;
        Some(if negate { -value } else { value })
    }

    fn primary(&mut self) -> Option<f64> {
        if self.peek()? == b'(' {
            if self.depth == MAX_DEPTH {
                return None;
            }
            self.pos += 1;
            self.depth += 1;
            let value = self.expression()?;
            self.depth -= 1;
            if self.peek()? != b')' {
                return None;
            }
            self.pos += 1;
            return Some(value);
        }

        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'.') {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}
