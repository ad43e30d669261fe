use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::calculator::format_number;
use super::{OutputPolicy, ToolHandler, ToolOutput};
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// Renders tabular data as a fenced Mermaid chart.
pub struct ChartGenerator {
    tool: Tool,
}

impl Default for ChartGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartGenerator {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "chart_generator",
                "Useful for generating Mermaid charts from data",
                json!({
                    "type": "object",
                    "properties": {
                        "type": {
                            "type": "string",
                            "enum": ["line", "bar", "pie", "gantt", "sankey"],
                            "description": "Type of chart to generate"
                        },
                        "data": {
                            "type": "array",
                            "items": {
                                "type": "array",
                                "items": {"type": ["string", "number"]}
                            },
                            "description": "Array of data points. For line/bar: [[label, value], ...]. For pie: [[label, value], ...]. For sankey: [[source, target, value], ...]"
                        },
                        "title": {"type": "string", "description": "Chart title"},
                        "xLabel": {"type": "string", "description": "X-axis label"},
                        "yLabel": {"type": "string", "description": "Y-axis label"}
                    },
                    "required": ["type", "data"]
                }),
            ),
        }
    }
}

#[async_trait]
impl ToolHandler for ChartGenerator {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    fn output_policy(&self) -> OutputPolicy {
        OutputPolicy::Passthrough
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let kind = params.get("type").and_then(Value::as_str).unwrap_or_default();
        let rows = rows(params.get("data"))?;
        let title = params.get("title").and_then(Value::as_str);
        let x_label = params.get("xLabel").and_then(Value::as_str).unwrap_or_default();
        let y_label = params.get("yLabel").and_then(Value::as_str).unwrap_or_default();

        let code = match kind {
            "line" => line_chart(&rows, title, x_label, y_label),
            "bar" => bar_chart(&rows, title, x_label, y_label),
            "pie" => pie_chart(&rows, title),
            "gantt" => gantt_chart(&rows, title),
            "sankey" => sankey_chart(&rows),
            other => {
                return Err(ToolError::Execution(format!(
                    "Could not generate chart: unknown chart type {}",
                    other
                )))
            }
        };

        let chart = format!("```mermaid\n{}\n```", code.trim());
        debug!(%chart, "generated chart");
        Ok(ToolOutput::Text(chart))
    }
}

fn rows(data: Option<&Value>) -> ToolResult<Vec<Vec<Value>>> {
    let Some(Value::Array(rows)) = data else {
        return Err(ToolError::Execution(
            "Could not generate chart: data must be an array of rows".to_string(),
        ));
    };
    Ok(rows
        .iter()
        .map(|row| row.as_array().cloned().unwrap_or_default())
        .collect())
}

fn cell(row: &[Value], index: usize) -> String {
    match row.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.as_f64().map(format_number).unwrap_or_default(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn number(row: &[Value], index: usize) -> f64 {
    match row.get(index) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn axes(rows: &[Vec<Value>], title: Option<&str>, x_label: &str) -> (String, Vec<f64>) {
    let mut chart = String::from("xychart-beta\n");
    if let Some(title) = title {
        let _ = writeln!(chart, "title \"{}\"", title);
    }
    let labels: Vec<String> = rows
        .iter()
        .map(|row| format!("\"{}\"", cell(row, 0)))
        .collect();
    let _ = writeln!(chart, "x-axis \"{}\" [{}]", x_label, labels.join(","));
    let values = rows.iter().map(|row| number(row, 1)).collect();
    (chart, values)
}

fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(",")
}

fn line_chart(rows: &[Vec<Value>], title: Option<&str>, x_label: &str, y_label: &str) -> String {
    let (mut chart, values) = axes(rows, title, x_label);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let _ = writeln!(
        chart,
        "y-axis \"{}\" {} --> {}",
        y_label,
        format_number(min),
        format_number(max)
    );
    let _ = writeln!(chart, "line [{}]", join_values(&values));
    chart
}

fn bar_chart(rows: &[Vec<Value>], title: Option<&str>, x_label: &str, y_label: &str) -> String {
    let (mut chart, values) = axes(rows, title, x_label);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let _ = writeln!(
        chart,
        "y-axis \"{}\" 0 --> {}",
        y_label,
        format_number((max * 1.2).ceil())
    );
    let _ = writeln!(chart, "bar [{}]", join_values(&values));
    chart
}

fn pie_chart(rows: &[Vec<Value>], title: Option<&str>) -> String {
    let mut chart = String::from("pie\n");
    if let Some(title) = title {
        let _ = writeln!(chart, "    title \"{}\"", title);
    }
    for row in rows {
        let _ = writeln!(chart, "    \"{}\" : {}", cell(row, 0), cell(row, 1));
    }
    chart
}

fn gantt_chart(rows: &[Vec<Value>], title: Option<&str>) -> String {
    let mut chart = String::from("gantt\n");
    if let Some(title) = title {
        let _ = writeln!(chart, "    title \"{}\"", title);
    }
    chart.push_str("    dateFormat YYYY-MM-DD\n");
    for row in rows {
        let _ = writeln!(
            chart,
            "    {} : {}, {}",
            cell(row, 0),
            cell(row, 1),
            cell(row, 2)
        );
    }
    chart
}

fn sankey_chart(rows: &[Vec<Value>]) -> String {
    let mut chart = String::from("sankey-beta\n");
    for row in rows {
        let _ = writeln!(chart, "{},{},{}", cell(row, 0), cell(row, 1), cell(row, 2));
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    async fn chart(params: Value) -> String {
        let Value::Object(params) = params else {
            panic!("params must be an object");
        };
        match ChartGenerator::new().execute(params).await.unwrap() {
            ToolOutput::Text(text) => text,
            other => panic!("Expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bar_chart() {
        let output = chart(json!({
            "type": "bar",
            "title": "Sales",
            "xLabel": "Quarter",
            "yLabel": "Units",
            "data": [["Q1", 10], ["Q2", 25]]
        }))
        .await;
        assert_eq!(
            output,
            indoc! {r#"
                ```mermaid
                xychart-beta
                title "Sales"
                x-axis "Quarter" ["Q1","Q2"]
                y-axis "Units" 0 --> 30
                bar [10,25]
                ```"#}
        );
    }

    #[tokio::test]
    async fn test_line_chart_range() {
        let output = chart(json!({"type": "line", "data": [["a", 3], ["b", "1.5"], ["c", 7]]})).await;
        assert!(output.contains("y-axis \"\" 1.5 --> 7"));
        assert!(output.contains("line [3,1.5,7]"));
    }

    #[tokio::test]
    async fn test_pie_and_sankey() {
        let pie = chart(json!({"type": "pie", "title": "Pets", "data": [["Dogs", 60], ["Cats", 40]]})).await;
        assert_eq!(
            pie,
            "```mermaid\npie\n    title \"Pets\"\n    \"Dogs\" : 60\n    \"Cats\" : 40\n```"
        );

        let sankey = chart(json!({"type": "sankey", "data": [["Solar", "Grid", 12.5]]})).await;
        assert_eq!(sankey, "```mermaid\nsankey-beta\nSolar,Grid,12.5\n```");
    }

    #[tokio::test]
    async fn test_gantt_chart() {
        let gantt = chart(json!({
            "type": "gantt",
            "data": [["Design", "2024-01-01", "2024-01-10"]]
        }))
        .await;
        assert!(gantt.contains("dateFormat YYYY-MM-DD"));
        assert!(gantt.contains("Design : 2024-01-01, 2024-01-10"));
    }

    #[test]
    fn test_chart_is_offered_to_every_provider() {
        assert!(ChartGenerator::new().unsupported_providers().is_empty());
    }
}
