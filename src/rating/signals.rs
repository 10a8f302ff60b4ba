//! Session-quality signals derived from the plot state at decision time.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

impl AxisScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisScale::Linear => "linear",
            AxisScale::Log => "log",
        }
    }

    /// Lenient parse for client input; unknown modes fall back to linear.
    pub fn from_client(value: &str) -> Self {
        match value {
            "linear" => AxisScale::Linear,
            "log" => AxisScale::Log,
            other => {
                warn!("Invalid y axis scale {other:?}, assuming linear");
                AxisScale::Linear
            }
        }
    }
}

/// Axis state reported by the client when an outcome button is pressed.
///
/// Fields are kept as raw JSON so malformed telemetry still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSnapshot {
    #[serde(default)]
    pub x_range: Option<Value>,
    #[serde(default)]
    pub y_range: Option<Value>,
    #[serde(default)]
    pub y_autorange: Option<Value>,
    #[serde(default)]
    pub y_scale: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSignals {
    pub x_zoomed: bool,
    pub y_zoomed: bool,
    pub y_scale: AxisScale,
    pub x_range_start: Option<String>,
    pub x_range_end: Option<String>,
    pub y_range_start: Option<f64>,
    pub y_range_end: Option<f64>,
}

impl SessionSignals {
    /// Compare the displayed axes against the trial window `[start, end]`.
    pub fn derive(snapshot: &AxisSnapshot, start: NaiveDate, end: NaiveDate) -> Self {
        let mut signals = SessionSignals::default();

        if let Some(x_range) = &snapshot.x_range {
            match x_range.as_array().map(Vec::as_slice) {
                Some([x0, x1, ..]) => {
                    signals.x_range_start = Some(raw_text(x0));
                    signals.x_range_end = Some(raw_text(x1));
                    match (parse_axis_instant(x0), parse_axis_instant(x1)) {
                        (Some(x0), Some(x1)) => {
                            signals.x_zoomed = x0 != start.and_time(Default::default())
                                || x1 != end.and_time(Default::default());
                        }
                        _ => warn!("Invalid x range {x_range}, trial window {start}..{end}"),
                    }
                }
                _ => warn!("Encountered invalid x range {x_range}"),
            }
        } else {
            signals.x_range_start = Some(start.format("%Y-%m-%d").to_string());
            signals.x_range_end = Some(end.format("%Y-%m-%d").to_string());
        }

        if let Some(y_range) = &snapshot.y_range {
            match y_range.as_array().map(Vec::as_slice) {
                Some([y0, y1, ..]) if y0.is_number() && y1.is_number() => {
                    signals.y_range_start = y0.as_f64();
                    signals.y_range_end = y1.as_f64();
                }
                _ => warn!("Encountered invalid y range {y_range}"),
            }
        }

        signals.y_zoomed = matches!(snapshot.y_autorange, Some(Value::Bool(false)));

        signals.y_scale = match &snapshot.y_scale {
            None => AxisScale::Linear,
            Some(Value::String(scale)) => AxisScale::from_client(scale),
            Some(other) => {
                warn!("Invalid y axis scale {other}, assuming linear");
                AxisScale::Linear
            }
        };

        signals
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Plot axis values arrive as date strings in several shapes, or as epoch
/// milliseconds.
fn parse_axis_instant(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(text) => parse_axis_text(text.trim()),
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.naive_utc())
        }
        _ => None,
    }
}

fn parse_axis_text(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(Default::default()))
}
