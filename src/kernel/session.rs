use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1200);
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Connection lifecycle of the telemetry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

/// Everything that can move the session. Transport signals carry the
/// generation of the connection attempt that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Start,
    Opened { generation: u64 },
    Message { generation: u64, text: String },
    Closed { generation: u64 },
    Error { generation: u64, reason: String },
    ReconnectDue { generation: u64 },
    KeepaliveDue,
    Teardown,
}

/// What the session asks its surroundings to do. Transport effects go to the
/// driver; `Notify` and `Deliver` go to the reactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    Connect { generation: u64 },
    CloseTransport,
    StartKeepalive,
    StopKeepalive,
    SendProbe,
    ScheduleReconnect { generation: u64, delay: Duration },
    CancelReconnect,
    Notify(SessionNotice),
    Deliver(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Connected,
    Disconnected,
}

impl SessionNotice {
    pub fn text(&self) -> &'static str {
        match self {
            SessionNotice::Connected => "Stream connected",
            SessionNotice::Disconnected => "Stream disconnected; reconnecting",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub reconnect_delay: Duration,
    pub keepalive_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

/// The reconnecting stream session.
/// Pure: `step` decides, the driver performs. Owns the only copy of the
/// connection state; callers observe it through `state()`.
#[derive(Debug)]
pub struct StreamSession {
    state: ConnectionState,
    generation: u64,
    torn_down: bool,
    reconnect_pending: bool,
    config: SessionConfig,
}

impl StreamSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            generation: 0,
            torn_down: false,
            reconnect_pending: false,
            config,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn step(&mut self, input: SessionInput) -> Vec<SessionEffect> {
        match input {
            SessionInput::Start => self.begin_connect(),
            SessionInput::Opened { generation } => self.on_open(generation),
            SessionInput::Message { generation, text } => {
                if self.is_current(generation) && self.state == ConnectionState::Open {
                    vec![SessionEffect::Deliver(text)]
                } else {
                    debug!(generation, "dropping message from stale link");
                    Vec::new()
                }
            }
            SessionInput::Closed { generation } => self.on_close(generation, None),
            SessionInput::Error { generation, reason } => self.on_close(generation, Some(reason)),
            SessionInput::ReconnectDue { generation } => {
                if generation != self.generation || !self.reconnect_pending {
                    return Vec::new();
                }
                self.reconnect_pending = false;
                self.begin_connect()
            }
            SessionInput::KeepaliveDue => {
                if self.state == ConnectionState::Open && !self.torn_down {
                    vec![SessionEffect::SendProbe]
                } else {
                    Vec::new()
                }
            }
            SessionInput::Teardown => self.teardown(),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && generation == self.generation
    }

    /// Disconnected -> Connecting. No-op once torn down or already live.
    fn begin_connect(&mut self) -> Vec<SessionEffect> {
        if self.torn_down || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        info!(generation = self.generation, "stream connecting");
        vec![SessionEffect::Connect { generation: self.generation }]
    }

    fn on_open(&mut self, generation: u64) -> Vec<SessionEffect> {
        if !self.is_current(generation) || self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        self.state = ConnectionState::Open;
        info!(generation, "stream open");
        vec![
            SessionEffect::Notify(SessionNotice::Connected),
            SessionEffect::StartKeepalive,
        ]
    }

    /// Close and error converge here. An error additionally forces the
    /// transport shut.
    fn on_close(&mut self, generation: u64, error: Option<String>) -> Vec<SessionEffect> {
        if !self.is_current(generation) || self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let was_open = self.state == ConnectionState::Open;
        let mut effects = Vec::new();

        if let Some(reason) = error {
            info!(generation, %reason, "stream error; forcing close");
            effects.push(SessionEffect::CloseTransport);
        } else {
            info!(generation, "stream closed");
        }

        if was_open {
            effects.push(SessionEffect::StopKeepalive);
        }
        self.state = ConnectionState::Disconnected;
        effects.push(SessionEffect::Notify(SessionNotice::Disconnected));

        self.reconnect_pending = true;
        effects.push(SessionEffect::ScheduleReconnect {
            generation: self.generation,
            delay: self.config.reconnect_delay,
        });
        effects
    }

    fn teardown(&mut self) -> Vec<SessionEffect> {
        if self.torn_down {
            return Vec::new();
        }
        self.torn_down = true;
        info!("stream session teardown");

        let mut effects = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(SessionEffect::CancelReconnect);
        }
        match self.state {
            ConnectionState::Open => {
                effects.push(SessionEffect::StopKeepalive);
                effects.push(SessionEffect::CloseTransport);
            }
            ConnectionState::Connecting => effects.push(SessionEffect::CloseTransport),
            ConnectionState::Disconnected => {}
        }
        self.state = ConnectionState::Disconnected;
        effects
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
