use serde::Serialize;
use tracing::{debug, info, warn};

use super::effect::{ActionRequest, SideEffect};
use super::event::{ActionOutcome, CommandReply, Event, OperatorCommand, SpeechResult};
use super::gate::{ActionGate, ActionKind};
use super::payload::{self, clamp_haptic, Inbound};
use super::session::{SessionConfig, SessionEffect, SessionInput, StreamSession};
use super::state::{StateDelta, TelemetrySnapshot};
use super::telemetry::{EventEntry, TelemetryRecorder};
use super::telemetry::recorder::DEFAULT_CAPACITY;

#[derive(Debug, Clone, Copy)]
pub struct ReactorConfig {
    pub history_capacity: usize,
    pub session: SessionConfig,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            session: SessionConfig::default(),
        }
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub snapshot: TelemetrySnapshot,
    /// Newest first.
    pub history: Vec<EventEntry>,
    pub connected: bool,
    /// Lock token of the in-flight action, if any.
    pub busy: Option<String>,
}

/// The single state sink. Stream traffic and action results both land here
/// and mutate the same snapshot and history.
///
/// `handle` runs to completion and never awaits: all I/O is returned as
/// `SideEffect`s for the driver.
pub struct Reactor {
    pub snapshot: TelemetrySnapshot,
    pub history: TelemetryRecorder,
    pub session: StreamSession,
    pub gate: ActionGate,
}

impl Reactor {
    pub fn new(config: ReactorConfig) -> Self {
        Self {
            snapshot: TelemetrySnapshot::new(),
            history: TelemetryRecorder::with_capacity(config.history_capacity),
            session: StreamSession::new(config.session),
            gate: ActionGate::new(),
        }
    }

    pub fn handle(&mut self, event: Event) -> Vec<SideEffect> {
        match event {
            Event::Session(input) => self.on_session(input),
            Event::Operator { command, reply } => {
                let (answer, effects) = self.command(command);
                if let Some(reply) = reply {
                    let _ = reply.send(answer);
                }
                effects
            }
            Event::Action(outcome) => {
                self.on_action(outcome);
                Vec::new()
            }
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            snapshot: self.snapshot.clone(),
            history: self.history.entries(),
            connected: self.session.is_connected(),
            busy: self.gate.token(),
        }
    }

    // === Stream path ===

    fn on_session(&mut self, input: SessionInput) -> Vec<SideEffect> {
        let keepalive = self.session.config().keepalive_interval;
        let mut effects = Vec::new();

        for effect in self.session.step(input) {
            match effect {
                SessionEffect::Connect { generation } => {
                    effects.push(SideEffect::Connect { generation })
                }
                SessionEffect::CloseTransport => effects.push(SideEffect::CloseTransport),
                SessionEffect::StartKeepalive => effects.push(SideEffect::StartKeepalive(keepalive)),
                SessionEffect::StopKeepalive => effects.push(SideEffect::StopKeepalive),
                SessionEffect::SendProbe => effects.push(SideEffect::SendProbe),
                SessionEffect::ScheduleReconnect { generation, delay } => {
                    effects.push(SideEffect::ScheduleReconnect { generation, delay })
                }
                SessionEffect::CancelReconnect => effects.push(SideEffect::CancelReconnect),
                SessionEffect::Notify(notice) => {
                    self.history.append(notice.text(), None);
                }
                SessionEffect::Deliver(raw) => self.apply_frame(&raw),
            }
        }

        effects
    }

    fn apply_frame(&mut self, raw: &str) {
        match payload::parse_frame(raw) {
            Ok(Inbound::Vision(update)) => {
                let summary = update.summary();
                let ts = update.ts;
                debug!(detections = update.detections.len(), "payload applied");
                self.snapshot.reduce(StateDelta::PayloadApplied(update));
                self.history.append(summary, ts);
            }
            Ok(Inbound::Control(frame)) => {
                info!(kind = %frame.kind, "backend control frame");
                self.history.append(frame.describe(), None);
            }
            Err(error) => {
                warn!(%error, "invalid stream payload");
                self.history.append(format!("Invalid stream payload: {error}"), None);
            }
        }
    }

    // === Action path ===

    pub fn command(&mut self, command: OperatorCommand) -> (CommandReply, Vec<SideEffect>) {
        let (kind, request) = match command {
            OperatorCommand::Analyze => (ActionKind::Analyze, ActionRequest::Analyze),
            OperatorCommand::Haptic(raw) => {
                let intensity = clamp_haptic(raw);
                (ActionKind::Haptic(intensity), ActionRequest::Haptic(intensity))
            }
            OperatorCommand::Speak => match self.snapshot.speakable_prompt() {
                Some(prompt) => (ActionKind::Speak, ActionRequest::Speak(prompt.to_string())),
                None => {
                    debug!("speak skipped: no prompt");
                    return (CommandReply::Skipped, Vec::new());
                }
            },
        };

        if let Err(holder) = self.gate.try_acquire(kind) {
            warn!(requested = %kind, in_flight = %holder, "action rejected: gate busy");
            return (CommandReply::Busy(holder), Vec::new());
        }

        info!(action = %kind, "action dispatched");
        (CommandReply::Accepted(kind), vec![SideEffect::Dispatch(request)])
    }

    fn on_action(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::PlaybackStarted => {
                // Lock stays held until playback settles.
                self.history.append("Voice prompt playback started", None);
                return;
            }
            ActionOutcome::Analyzed(Ok(value)) => match payload::normalize(&value) {
                Ok(update) => {
                    let text = format!("Manual analysis: {}", update.summary());
                    let ts = update.ts;
                    self.snapshot.reduce(StateDelta::PayloadApplied(update));
                    self.history.append(text, ts);
                }
                Err(error) => {
                    warn!(%error, "analysis returned invalid payload");
                    self.history
                        .append(format!("Manual analysis returned invalid payload: {error}"), None);
                }
            },
            ActionOutcome::Analyzed(Err(error)) => {
                warn!(%error, "analysis failed");
                self.history.append(format!("Manual analysis failed: {error}"), None);
            }
            ActionOutcome::Pulsed { intensity, result: Ok(ack) } => {
                if ack.success == Some(false) {
                    let reason = ack.message.unwrap_or_else(|| "rejected by backend".to_string());
                    warn!(intensity, %reason, "haptic pulse rejected");
                    self.history.append(format!("Haptic pulse failed: {reason}"), None);
                } else {
                    self.snapshot.reduce(StateDelta::HapticApplied(intensity));
                    let text = match ack.message {
                        Some(message) => format!("Haptic pulse sent (intensity={intensity}): {message}"),
                        None => format!("Haptic pulse sent (intensity={intensity})"),
                    };
                    self.history.append(text, None);
                }
            }
            ActionOutcome::Pulsed { intensity, result: Err(error) } => {
                warn!(intensity, %error, "haptic pulse failed");
                self.history.append(format!("Haptic pulse failed: {error}"), None);
            }
            ActionOutcome::Spoken(Ok(SpeechResult::Played)) => {
                debug!("voice prompt playback finished");
            }
            ActionOutcome::Spoken(Ok(SpeechResult::NoContent)) => {
                self.history.append("Voice synthesis unavailable (no content)", None);
            }
            ActionOutcome::Spoken(Ok(SpeechResult::EmptyAudio)) => {
                self.history.append("Speech response contained no audio", None);
            }
            ActionOutcome::Spoken(Err(error)) => {
                warn!(%error, "speech failed");
                self.history.append(format!("Speech failed: {error}"), None);
            }
        }

        if let Some(kind) = self.gate.release() {
            debug!(action = %kind, "action settled");
        }
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new(ReactorConfig::default())
    }
}
