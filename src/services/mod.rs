pub mod backend;
pub mod stream;

pub use backend::{BackendClient, BackendPaths, GuidanceBackend, SpeechAudio};
pub use stream::{StreamConnector, StreamLink, WsConnector};
