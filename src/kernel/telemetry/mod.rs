//! Session history.
//!
//! Entries are user-facing narrative text (connects, disconnects, applied
//! payloads, action results). The recorder is append-only and bounded;
//! nothing reads it back into decision logic.

pub mod event;
pub mod recorder;

pub use event::EventEntry;
pub use recorder::TelemetryRecorder;
