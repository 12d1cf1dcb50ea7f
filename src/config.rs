use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kernel::reactor::ReactorConfig;
use crate::kernel::session::SessionConfig;
use crate::services::backend::BackendPaths;

// ── Defaults ────────────────────────────────────────────────────────────────

fn default_port() -> u16 {
    8000
}

fn default_ws_path() -> String {
    "/stream/ws".to_string()
}

fn default_analyze_path() -> String {
    "/analyze".to_string()
}

fn default_haptic_path() -> String {
    "/haptic".to_string()
}

fn default_speak_path() -> String {
    "/tts".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_200
}

fn default_keepalive_interval_secs() -> u64 {
    15
}

fn default_history_capacity() -> usize {
    80
}

fn default_player() -> Vec<String> {
    ["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet", "-"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

// ── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Full stream URL. Wins over host/port/path.
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Base URL for the request/response endpoints.
    #[serde(default)]
    pub http_url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// LAN address of the backend machine; replaces loopback hosts.
    #[serde(default)]
    pub lan_ip: Option<String>,
    #[serde(default = "default_analyze_path")]
    pub analyze_path: String,
    #[serde(default = "default_haptic_path")]
    pub haptic_path: String,
    #[serde(default = "default_speak_path")]
    pub speak_path: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            http_url: None,
            host: None,
            port: default_port(),
            ws_path: default_ws_path(),
            lan_ip: None,
            analyze_path: default_analyze_path(),
            haptic_path: default_haptic_path(),
            speak_path: default_speak_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioSettings {
    /// Player command line; audio is piped to its stdin. Empty disables playback.
    #[serde(default = "default_player")]
    pub player: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            player: default_player(),
        }
    }
}

// ── Top-level config ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub audio: AudioSettings,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Host used when no explicit URL is given: backend host, else LAN IP, else loopback.
    fn resolved_host(&self) -> String {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
        non_empty(&self.backend.host)
            .or_else(|| non_empty(&self.backend.lan_ip))
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    /// Swaps a loopback host for the LAN IP. Only the authority is touched.
    fn rewrite_loopback(&self, url: &str) -> String {
        let Some(ip) = self.backend.lan_ip.as_deref().filter(|ip| !ip.is_empty()) else {
            return url.to_string();
        };
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        if !is_loopback_host(&parsed) || parsed.set_host(Some(ip)).is_err() {
            return url.to_string();
        }
        parsed.to_string()
    }

    pub fn stream_url(&self) -> String {
        if let Some(url) = self.backend.ws_url.as_deref().filter(|u| !u.is_empty()) {
            return self.rewrite_loopback(url);
        }

        let path = if self.backend.ws_path.starts_with('/') {
            self.backend.ws_path.clone()
        } else {
            format!("/{}", self.backend.ws_path)
        };
        format!("ws://{}:{}{}", self.resolved_host(), self.backend.port, path)
    }

    pub fn http_url(&self) -> String {
        if let Some(url) = self.backend.http_url.as_deref().filter(|u| !u.is_empty()) {
            return self.rewrite_loopback(url).trim_end_matches('/').to_string();
        }
        format!("http://{}:{}", self.resolved_host(), self.backend.port)
    }

    /// Remote sensing boards cannot reach a loopback backend.
    pub fn uses_loopback(&self) -> bool {
        points_at_loopback(&self.stream_url())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let stream = self.stream_url();
        if !(stream.starts_with("ws://") || stream.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl(stream));
        }
        let http = self.http_url();
        if !(http.starts_with("http://") || http.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(http));
        }
        Ok(())
    }

    pub fn backend_paths(&self) -> BackendPaths {
        BackendPaths {
            analyze: self.backend.analyze_path.clone(),
            haptic: self.backend.haptic_path.clone(),
            speak: self.backend.speak_path.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }

    pub fn reactor_config(&self) -> ReactorConfig {
        ReactorConfig {
            history_capacity: self.history.capacity,
            session: SessionConfig {
                reconnect_delay: Duration::from_millis(self.session.reconnect_delay_ms),
                keepalive_interval: Duration::from_secs(self.session.keepalive_interval_secs.max(1)),
            },
        }
    }
}

fn is_loopback_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| LOOPBACK_HOSTS.contains(&host.to_ascii_lowercase().as_str()))
}

fn points_at_loopback(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| is_loopback_host(&parsed))
}

// ── Command line / environment ──────────────────────────────────────────────

/// Live guidance telemetry console.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "echosight", version, about)]
pub struct Cli {
    /// TOML config file.
    #[arg(long, env = "ECHOSIGHT_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "BACKEND_WS_URL")]
    pub ws_url: Option<String>,
    #[arg(long, env = "BACKEND_HTTP_URL")]
    pub http_url: Option<String>,
    #[arg(long, env = "BACKEND_HOST")]
    pub host: Option<String>,
    #[arg(long, env = "BACKEND_PORT")]
    pub port: Option<u16>,
    #[arg(long, env = "BACKEND_WS_PATH")]
    pub ws_path: Option<String>,
    #[arg(long, env = "PC_LAN_IP")]
    pub lan_ip: Option<String>,
    #[arg(long)]
    pub history_capacity: Option<usize>,
    /// Audio player command line, e.g. "aplay -q". Empty string disables playback.
    #[arg(long, env = "ECHOSIGHT_AUDIO_PLAYER")]
    pub audio_player: Option<String>,
}

impl Cli {
    /// Defaults, then the config file, then flags and environment.
    pub fn resolve(&self) -> Result<DashboardConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::load(path)?,
            None => DashboardConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut DashboardConfig) {
        let backend = &mut config.backend;
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(&self.ws_url) {
            backend.ws_url = Some(url);
        }
        if let Some(url) = non_empty(&self.http_url) {
            backend.http_url = Some(url);
        }
        if let Some(host) = non_empty(&self.host) {
            backend.host = Some(host);
        }
        if let Some(port) = self.port {
            backend.port = port;
        }
        if let Some(path) = non_empty(&self.ws_path) {
            backend.ws_path = path;
        }
        if let Some(ip) = non_empty(&self.lan_ip) {
            backend.lan_ip = Some(ip);
        }
        if let Some(capacity) = self.history_capacity {
            config.history.capacity = capacity;
        }
        if let Some(player) = &self.audio_player {
            config.audio.player = player.split_whitespace().map(str::to_string).collect();
        }
    }
}
