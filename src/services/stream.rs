use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::kernel::event::Event;
use crate::kernel::session::SessionInput;

/// Liveness probe frame. The backend ignores its content.
pub const PROBE_FRAME: &str = "ping";

/// Opens transport links to the streaming endpoint.
///
/// An implementation must report, tagged with `generation`, exactly one of
/// `Opened` followed by messages and finally `Closed`/`Error`, or a single
/// `Error` when the connection never comes up. After `StreamLink::close` it
/// may stay silent.
pub trait StreamConnector: Send + Sync {
    fn open(&self, generation: u64, events: mpsc::Sender<Event>) -> StreamLink;
}

/// Handle to one live (or pending) transport connection.
#[derive(Debug)]
pub struct StreamLink {
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl StreamLink {
    pub fn new(outbound: mpsc::UnboundedSender<String>, cancel: CancellationToken) -> Self {
        Self { outbound, cancel }
    }

    /// Fire-and-forget. Returns false if the link is already gone.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.outbound.send(frame.into()).is_ok()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Websocket transport.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl StreamConnector for WsConnector {
    fn open(&self, generation: u64, events: mpsc::Sender<Event>) -> StreamLink {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(run_link(
            self.url.clone(),
            generation,
            events,
            outbound_rx,
            cancel.clone(),
        ));

        StreamLink::new(outbound_tx, cancel)
    }
}

async fn run_link(
    url: String,
    generation: u64,
    events: mpsc::Sender<Event>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    info!(generation, %url, "connecting stream");

    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connect_async(url.as_str()) => result,
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(error) => {
            let _ = events
                .send(SessionInput::Error { generation, reason: error.to_string() }.into())
                .await;
            return;
        }
    };

    if events.send(SessionInput::Opened { generation }.into()).await.is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();

    let failure = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return;
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return;
                };
                if let Err(error) = sink.send(WsMessage::Text(frame.into())).await {
                    // Surfaced through the read side when the socket dies.
                    debug!(generation, %error, "outbound frame dropped");
                }
            }
            incoming = source.next() => {
                let text = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(WsMessage::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                    Some(Ok(WsMessage::Close(_))) | None => break None,
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => break Some(error.to_string()),
                };
                if events.send(SessionInput::Message { generation, text }.into()).await.is_err() {
                    return;
                }
            }
        }
    };

    let signal = match failure {
        Some(reason) => SessionInput::Error { generation, reason },
        None => SessionInput::Closed { generation },
    };
    let _ = events.send(signal.into()).await;
}
