use thiserror::Error;

/// Why an inbound message could not be turned into a snapshot update.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Failure of a one-shot request against the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio player configured")]
    NoPlayer,
    #[error("failed to start audio player `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("audio player i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio player exited with {0}")]
    ExitStatus(std::process::ExitStatus),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
}
