use serde::{Deserialize, Serialize};

use super::payload::PayloadUpdate;

/// Normalized 0-1000 image-space box. Invariant: `ymax > ymin`, `xmax > xmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ymin: u16,
    pub xmin: u16,
    pub ymax: u16,
    pub xmax: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// The current best-known guidance state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Empty until the first payload lands.
    pub voice_prompt: String,
    pub haptic_intensity: u8,
    pub detections: Vec<Detection>,
}

/// Strict state delta. This is the ONLY way the snapshot mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    /// Full payload: prompt, intensity and detection set are replaced together.
    PayloadApplied(PayloadUpdate),
    /// Haptic pulse acknowledged: intensity only.
    HapticApplied(u8),
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        match delta {
            StateDelta::PayloadApplied(update) => {
                self.voice_prompt = update.voice_prompt;
                self.haptic_intensity = update.haptic_intensity;
                self.detections = update.detections;
            }
            StateDelta::HapticApplied(intensity) => {
                self.haptic_intensity = intensity;
            }
        }
    }

    /// Prompt to send to speech synthesis, if there is one.
    pub fn speakable_prompt(&self) -> Option<&str> {
        let prompt = self.voice_prompt.trim();
        (!prompt.is_empty()).then_some(prompt)
    }
}
