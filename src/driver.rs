use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::kernel::effect::{ActionRequest, SideEffect};
use crate::kernel::event::{ActionOutcome, CommandReply, Event, OperatorCommand, SpeechResult};
use crate::kernel::reactor::{DashboardView, Reactor};
use crate::kernel::session::SessionInput;
use crate::outputs::playback::AudioSink;
use crate::services::backend::{GuidanceBackend, SpeechAudio};
use crate::services::stream::{StreamConnector, StreamLink, PROBE_FRAME};

const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, thiserror::Error)]
#[error("dashboard session has stopped")]
pub struct SessionStopped;

/// Presentation-facing handle: read-only view plus the three action triggers.
#[derive(Clone)]
pub struct DashboardHandle {
    events: mpsc::Sender<Event>,
    view: watch::Receiver<DashboardView>,
    shutdown: CancellationToken,
}

impl DashboardHandle {
    pub async fn analyze(&self) -> Result<CommandReply, SessionStopped> {
        self.command(OperatorCommand::Analyze).await
    }

    pub async fn speak(&self) -> Result<CommandReply, SessionStopped> {
        self.command(OperatorCommand::Speak).await
    }

    pub async fn haptic(&self, intensity: i64) -> Result<CommandReply, SessionStopped> {
        self.command(OperatorCommand::Haptic(intensity)).await
    }

    pub async fn command(&self, command: OperatorCommand) -> Result<CommandReply, SessionStopped> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(Event::Operator { command, reply: Some(reply_tx) })
            .await
            .map_err(|_| SessionStopped)?;
        reply_rx.await.map_err(|_| SessionStopped)
    }

    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    /// Request teardown. The driver cancels its timers and closes the link.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Resolves once teardown has been requested by any handle.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await
    }
}

/// Cooperative event loop around the reactor.
///
/// One task consumes the event queue; every handler runs to completion before
/// the next event is taken. Transport pumps, timers and action calls run in
/// their own tasks and only ever talk back through the queue.
pub struct Driver {
    reactor: Reactor,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    connector: Arc<dyn StreamConnector>,
    backend: Arc<dyn GuidanceBackend>,
    sink: Arc<dyn AudioSink>,
    link: Option<StreamLink>,
    keepalive: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
    view_tx: watch::Sender<DashboardView>,
    shutdown: CancellationToken,
    session_id: Uuid,
}

impl Driver {
    pub fn new(
        reactor: Reactor,
        connector: Arc<dyn StreamConnector>,
        backend: Arc<dyn GuidanceBackend>,
        sink: Arc<dyn AudioSink>,
    ) -> (Self, DashboardHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (view_tx, view_rx) = watch::channel(reactor.view());
        let shutdown = CancellationToken::new();

        let handle = DashboardHandle {
            events: events_tx.clone(),
            view: view_rx,
            shutdown: shutdown.clone(),
        };

        let driver = Self {
            reactor,
            events_tx,
            events_rx,
            connector,
            backend,
            sink,
            link: None,
            keepalive: None,
            reconnect: None,
            view_tx,
            shutdown,
            session_id: Uuid::new_v4(),
        };

        (driver, handle)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Run until shutdown. Returns the reactor for inspection.
    pub async fn run(self) -> Reactor {
        let span = info_span!("dashboard", session_id = %self.session_id);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> Reactor {
        info!("dashboard session starting");
        self.dispatch(Event::Session(SessionInput::Start));

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                event = self.events_rx.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
            }
        }

        self.dispatch(Event::Session(SessionInput::Teardown));
        // Anything the session did not know about goes too.
        self.stop_keepalive();
        self.cancel_reconnect();
        self.close_link();
        info!("dashboard session stopped");
        self.reactor
    }

    fn dispatch(&mut self, event: Event) {
        let effects = self.reactor.handle(event);
        for effect in effects {
            self.execute(effect);
        }
        self.view_tx.send_replace(self.reactor.view());
    }

    fn execute(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::Connect { generation } => {
                self.close_link();
                self.link = Some(self.connector.open(generation, self.events_tx.clone()));
            }
            SideEffect::CloseTransport => self.close_link(),
            SideEffect::StartKeepalive(period) => self.start_keepalive(period),
            SideEffect::StopKeepalive => self.stop_keepalive(),
            SideEffect::SendProbe => {
                let sent = self.link.as_ref().is_some_and(|link| link.send(PROBE_FRAME));
                if !sent {
                    debug!("keepalive probe not sent: no live link");
                }
            }
            SideEffect::ScheduleReconnect { generation, delay } => {
                // The old link is finished; drop it before the next attempt.
                self.close_link();
                self.schedule_reconnect(generation, delay);
            }
            SideEffect::CancelReconnect => self.cancel_reconnect(),
            SideEffect::Dispatch(request) => self.spawn_action(request),
        }
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
        }
    }

    fn start_keepalive(&mut self, period: Duration) {
        self.stop_keepalive();
        let tx = self.events_tx.clone();
        self.keepalive = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(SessionInput::KeepaliveDue.into()).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_keepalive(&mut self) {
        if let Some(task) = self.keepalive.take() {
            task.abort();
        }
    }

    fn schedule_reconnect(&mut self, generation: u64, delay: Duration) {
        self.cancel_reconnect();
        info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let tx = self.events_tx.clone();
        self.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionInput::ReconnectDue { generation }.into()).await;
        }));
    }

    fn cancel_reconnect(&mut self) {
        if let Some(task) = self.reconnect.take() {
            task.abort();
        }
    }

    /// Runs the request in its own task. A supervisor posts a failed
    /// settlement if that task dies, so the gate always reopens.
    fn spawn_action(&self, request: ActionRequest) {
        let tx = self.events_tx.clone();
        let work = tokio::spawn(run_action(
            request.clone(),
            self.backend.clone(),
            self.sink.clone(),
            tx.clone(),
        ));

        tokio::spawn(async move {
            if let Err(join_error) = work.await {
                let reason = if join_error.is_panic() {
                    "action task panicked"
                } else {
                    "action task cancelled"
                };
                warn!(?request, reason, "action aborted");
                let _ = tx.send(failed(&request, reason.to_string()).into()).await;
            }
        });
    }
}

fn failed(request: &ActionRequest, reason: String) -> ActionOutcome {
    match request {
        ActionRequest::Analyze => ActionOutcome::Analyzed(Err(reason)),
        ActionRequest::Haptic(intensity) => ActionOutcome::Pulsed {
            intensity: *intensity,
            result: Err(reason),
        },
        ActionRequest::Speak(_) => ActionOutcome::Spoken(Err(reason)),
    }
}

async fn run_action(
    request: ActionRequest,
    backend: Arc<dyn GuidanceBackend>,
    sink: Arc<dyn AudioSink>,
    tx: mpsc::Sender<Event>,
) {
    let outcome = match request {
        ActionRequest::Analyze => {
            ActionOutcome::Analyzed(backend.analyze().await.map_err(|e| e.to_string()))
        }
        ActionRequest::Haptic(intensity) => ActionOutcome::Pulsed {
            intensity,
            result: backend.haptic(intensity).await.map_err(|e| e.to_string()),
        },
        ActionRequest::Speak(text) => ActionOutcome::Spoken(speak(&text, &*backend, &*sink, &tx).await),
    };

    let _ = tx.send(outcome.into()).await;
}

async fn speak(
    text: &str,
    backend: &dyn GuidanceBackend,
    sink: &dyn AudioSink,
    tx: &mpsc::Sender<Event>,
) -> Result<SpeechResult, String> {
    let audio = match backend.speak(text).await.map_err(|e| e.to_string())? {
        SpeechAudio::NoContent => return Ok(SpeechResult::NoContent),
        SpeechAudio::Audio(audio) if audio.is_empty() => return Ok(SpeechResult::EmptyAudio),
        SpeechAudio::Audio(audio) => audio,
    };

    let playback = sink.begin(audio).await.map_err(|e| e.to_string())?;
    let _ = tx.send(ActionOutcome::PlaybackStarted.into()).await;
    playback.finish().await.map_err(|e| e.to_string())?;
    Ok(SpeechResult::Played)
}
