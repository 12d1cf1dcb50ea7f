//! Inbound message validation.
//!
//! Every message from the stream (and every re-analysis response) passes
//! through here. The output is either a canonical update, a backend control
//! frame, or a `PayloadError`. Field-level problems never fail the whole
//! message: they are saturated or dropped per field / per element.

use serde_json::{Map, Value};

use super::state::{BoundingBox, Detection};
use crate::error::PayloadError;

pub const FALLBACK_PROMPT: &str = "Path is clear";
pub const DEFAULT_LABEL: &str = "obstacle";

pub const HAPTIC_MAX: i64 = 255;
pub const GRID_MAX: i64 = 1000;

/// A validated VisionPayload, ready to be folded into the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadUpdate {
    pub voice_prompt: String,
    pub haptic_intensity: u8,
    pub detections: Vec<Detection>,
    /// Source epoch seconds, display only.
    pub ts: Option<f64>,
}

impl PayloadUpdate {
    /// History line for an applied update.
    pub fn summary(&self) -> String {
        format!("{} | haptic={}", self.voice_prompt, self.haptic_intensity)
    }
}

/// Status frames the backend multiplexes onto the same stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFrame {
    pub kind: String,
    pub message: Option<String>,
}

impl ControlFrame {
    pub fn describe(&self) -> String {
        match (self.kind.as_str(), self.message.as_deref()) {
            ("error", Some(message)) => format!("Backend error: {message}"),
            ("error", None) => "Backend error: unknown error".to_string(),
            ("text", Some(text)) => format!("Backend: {text}"),
            (kind, _) => format!("Backend: {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Vision(PayloadUpdate),
    Control(ControlFrame),
}

/// Decode one raw stream frame.
pub fn parse_frame(raw: &str) -> Result<Inbound, PayloadError> {
    let value: Value = serde_json::from_str(raw)?;
    classify(&value)
}

/// Split a decoded object into control frame or vision payload.
pub fn classify(value: &Value) -> Result<Inbound, PayloadError> {
    let object = value.as_object().ok_or(PayloadError::NotAnObject)?;

    match object.get("type").and_then(Value::as_str) {
        Some(kind) if kind != "vision" => Ok(Inbound::Control(ControlFrame {
            kind: kind.to_string(),
            message: object
                .get("message")
                .or_else(|| object.get("text"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })),
        _ => Ok(Inbound::Vision(normalize_object(object))),
    }
}

/// Normalize a value that must be a VisionPayload (re-analysis responses).
pub fn normalize(value: &Value) -> Result<PayloadUpdate, PayloadError> {
    let object = value.as_object().ok_or(PayloadError::NotAnObject)?;
    Ok(normalize_object(object))
}

fn normalize_object(object: &Map<String, Value>) -> PayloadUpdate {
    PayloadUpdate {
        voice_prompt: normalize_prompt(object.get("voice_prompt")),
        haptic_intensity: normalize_haptic(object.get("haptic_intensity")),
        detections: normalize_detections(object.get("detections")),
        ts: object
            .get("ts")
            .and_then(Value::as_f64)
            .filter(|ts| ts.is_finite()),
    }
}

pub fn normalize_prompt(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => FALLBACK_PROMPT.to_string(),
    }
}

/// Saturate to [0,255]; absent or non-numeric is 0.
pub fn normalize_haptic(value: Option<&Value>) -> u8 {
    value
        .and_then(coerce_number)
        .map(|n| clamp_haptic(n.round() as i64))
        .unwrap_or(0)
}

pub fn clamp_haptic(value: i64) -> u8 {
    value.clamp(0, HAPTIC_MAX) as u8
}

/// Non-array input is an empty list. Bad elements are dropped individually.
pub fn normalize_detections(value: Option<&Value>) -> Vec<Detection> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items.iter().filter_map(normalize_detection).collect()
}

pub fn normalize_detection(value: &Value) -> Option<Detection> {
    let object = value.as_object()?;
    let bbox = normalize_box(object.get("box")?)?;

    let label = object
        .get("label")
        .and_then(Value::as_str)
        .map(|label| label.trim().to_lowercase())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| DEFAULT_LABEL.to_string());

    Some(Detection { label, bbox })
}

/// `[ymin, xmin, ymax, xmax]` on the 0-1000 grid.
/// Rounded, clamped, then rejected if degenerate.
pub fn normalize_box(value: &Value) -> Option<BoundingBox> {
    let coords = value.as_array()?;
    if coords.len() != 4 {
        return None;
    }

    let mut grid = [0u16; 4];
    for (slot, coord) in grid.iter_mut().zip(coords) {
        let n = coerce_number(coord)?;
        *slot = n.round().clamp(0.0, GRID_MAX as f64) as u16;
    }

    let [ymin, xmin, ymax, xmax] = grid;
    if ymax <= ymin || xmax <= xmin {
        return None;
    }

    Some(BoundingBox { ymin, xmin, ymax, xmax })
}

/// Numbers and numeric strings; everything else is non-numeric.
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
