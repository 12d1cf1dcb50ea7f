pub mod playback;

pub use playback::{AudioSink, CommandSink, NullSink, Playback};
