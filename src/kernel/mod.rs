//! Telemetry session core.
//!
//! Everything under `kernel` is synchronous and I/O free. The driver feeds
//! `Event`s in and executes the returned `SideEffect`s.

pub mod effect;
pub mod event;
pub mod gate;
pub mod payload;
pub mod reactor;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod time;
