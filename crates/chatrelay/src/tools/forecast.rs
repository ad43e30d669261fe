use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::calculator::format_number;
use super::{ToolHandler, ToolOutput};
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// Fewest observations that leave two differences to correlate
const MIN_POINTS: usize = 3;
/// Keeps the differenced series stationary
const MAX_PHI: f64 = 0.99;
const Z_95: f64 = 1.96;

/// Forecasts a numeric series with an ARIMA(1,1,0) model plus drift.
pub struct Forecast {
    tool: Tool,
}

impl Default for Forecast {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecast {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "arima_forecast",
                "Useful for forecasting future values based on time series data using ARIMA model",
                json!({
                    "type": "object",
                    "properties": {
                        "data": {
                            "type": "array",
                            "items": {"type": "number"},
                            "description": "Array of numerical time series data points"
                        },
                        "periods": {
                            "type": "number",
                            "minimum": 1,
                            "maximum": 12,
                            "default": 5,
                            "description": "Number of periods to forecast (1-12)"
                        },
                        "interval": {
                            "type": "string",
                            "default": "days",
                            "description": "Time interval (days, weeks, months)"
                        }
                    },
                    "required": ["data"]
                }),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastReport {
    forecast: Vec<f64>,
    confidence_intervals: ConfidenceIntervals,
    interval: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ConfidenceIntervals {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

#[async_trait]
impl ToolHandler for Forecast {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let data: Vec<f64> = params
            .get("data")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();
        let periods = params
            .get("periods")
            .and_then(Value::as_f64)
            .map_or(5, |p| p.clamp(1.0, 12.0) as usize);
        let interval = params
            .get("interval")
            .and_then(Value::as_str)
            .unwrap_or("days")
            .to_string();
        info!(points = data.len(), periods, %interval, "forecasting");

        let model = fit(&data).ok_or_else(|| {
            ToolError::Execution(format!(
                "Could not generate forecast: need at least {} data points",
                MIN_POINTS
            ))
        })?;
        let forecast: Vec<f64> = model.project(&data, periods).into_iter().map(round2).collect();
        let margin = Z_95 * model.residual_std;

        let report = ForecastReport {
            confidence_intervals: ConfidenceIntervals {
                lower: forecast.iter().map(|v| round2(v - margin)).collect(),
                upper: forecast.iter().map(|v| round2(v + margin)).collect(),
            },
            message: format!(
                "Forecast for next {} {}: {}",
                periods,
                interval,
                forecast
                    .iter()
                    .map(|v| format_number(*v))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            forecast,
            interval,
        };
        serde_json::to_string(&report)
            .map(ToolOutput::Text)
            .map_err(|e| ToolError::Execution(e.to_string()))
    }
}

/// `(d[t] - drift) = phi * (d[t-1] - drift)` over first differences `d`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Model {
    drift: f64,
    phi: f64,
    residual_std: f64,
}

impl Model {
    fn project(&self, data: &[f64], periods: usize) -> Vec<f64> {
        let (mut level, mut step) = match data {
            [.., before, last] => (*last, last - before),
            _ => return Vec::new(),
        };
        (0..periods)
            .map(|_| {
                step = self.drift + self.phi * (step - self.drift);
                level += step;
                level
            })
            .collect()
    }
}

fn fit(data: &[f64]) -> Option<Model> {
    if data.len() < MIN_POINTS {
        return None;
    }
    let diffs: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let drift = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let centered: Vec<f64> = diffs.iter().map(|d| d - drift).collect();

    let (num, den) = centered
        .windows(2)
        .fold((0.0, 0.0), |(num, den), w| (num + w[0] * w[1], den + w[0] * w[0]));
    let phi = if den == 0.0 {
        0.0
    } else {
        (num / den).clamp(-MAX_PHI, MAX_PHI)
    };

    let residuals: Vec<f64> = centered.windows(2).map(|w| w[1] - phi * w[0]).collect();
    let residual_std =
        (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt();

    Some(Model {
        drift,
        phi,
        residual_std,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
