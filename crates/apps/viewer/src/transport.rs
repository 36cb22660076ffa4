//! WebSocket plumbing around the synchronous [`ViewerApp`].

use std::time::{Duration, Instant};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use layers::MapSurface;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use view::{OptionPanel, ViewportTracker};

use crate::app::{BundleJob, BundleOutput, ViewerApp};
use crate::config::ViewerConfig;
use crate::console::{execute, Command, CommandError, ConsolePanel, Effect, HeadlessMap};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type SocketSink = SplitSink<Socket, Message>;

/// Events fed back into the loop. Connection events carry the session
/// generation they belong to; bundles carry theirs inside the output.
pub enum LinkEvent<S = SocketSink> {
    Connected { generation: u64, sink: S },
    Frame { generation: u64, text: String },
    Closed { generation: u64, reason: String },
    Bundled(BundleOutput),
}

/// Connects and forwards inbound text frames until the socket ends.
pub fn spawn_link(
    url: String,
    generation: u64,
    events: mpsc::UnboundedSender<LinkEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let socket = match connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(err) => {
                let _ = events.send(LinkEvent::Closed {
                    generation,
                    reason: err.to_string(),
                });
                return;
            }
        };
        info!(%url, generation, "connected");
        let (sink, mut source) = socket.split();
        if events.send(LinkEvent::Connected { generation, sink }).is_err() {
            return;
        }

        let mut reason = "closed by server".to_string();
        while let Some(msg) = source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if events.send(LinkEvent::Frame { generation, text }).is_err() {
                        return;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    reason = err.to_string();
                    break;
                }
            }
        }
        let _ = events.send(LinkEvent::Closed { generation, reason });
    })
}

/// Runs a bundling job on the blocking pool and posts the result back.
pub fn spawn_bundling(job: BundleJob, events: mpsc::UnboundedSender<LinkEvent>) {
    debug!(generation = job.generation, sequence = job.sequence, "bundling off loop");
    tokio::task::spawn_blocking(move || {
        let _ = events.send(LinkEvent::Bundled(job.run()));
    });
}

/// Which session the loop is serving and its sink, once connected.
#[derive(Debug)]
pub struct LinkSlot<S> {
    generation: Option<u64>,
    sink: Option<S>,
}

impl<S> Default for LinkSlot<S> {
    fn default() -> Self {
        Self {
            generation: None,
            sink: None,
        }
    }
}

impl<S> LinkSlot<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    /// Switches to `generation`. Returns the previous sink for closing.
    pub fn attach(&mut self, generation: u64) -> Option<S> {
        self.generation = Some(generation);
        self.sink.take()
    }

    pub fn detach(&mut self) -> Option<S> {
        self.generation = None;
        self.sink.take()
    }
}

/// Applies one event to the app. Returns a sink the caller should close:
/// one that connected for a superseded session, or the sink of a session
/// that just ended.
pub fn handle_link_event<M, P, S>(
    app: &mut ViewerApp<M, P>,
    slot: &mut LinkSlot<S>,
    event: LinkEvent<S>,
    now: Instant,
) -> Option<S>
where
    M: ViewportTracker + MapSurface,
    P: OptionPanel,
{
    match event {
        LinkEvent::Connected { generation, sink } => {
            if slot.generation != Some(generation) {
                debug!(generation, "closing socket of superseded session");
                return Some(sink);
            }
            slot.sink = Some(sink);
            app.on_connected(generation, now);
            None
        }
        LinkEvent::Frame { generation, text } => {
            app.on_frame(generation, &text);
            None
        }
        LinkEvent::Closed { generation, reason } => {
            if !app.on_disconnected(generation) {
                return None;
            }
            warn!(%reason, "connection lost");
            slot.detach()
        }
        LinkEvent::Bundled(output) => {
            app.on_bundled(output);
            None
        }
    }
}

/// Outbound frames paired with the sink to write them to. Frames queued
/// while no socket is attached are dropped.
pub fn outbound<'a, M, P, S>(
    app: &mut ViewerApp<M, P>,
    slot: &'a mut LinkSlot<S>,
) -> Option<(&'a mut S, Vec<String>)>
where
    M: ViewportTracker + MapSurface,
    P: OptionPanel,
{
    let frames = app.take_outbound();
    if frames.is_empty() {
        return None;
    }
    match slot.sink.as_mut() {
        Some(sink) => Some((sink, frames)),
        None => {
            debug!(dropped = frames.len(), "no socket for outbound frames");
            None
        }
    }
}

async fn flush(app: &mut ViewerApp<HeadlessMap, ConsolePanel>, slot: &mut LinkSlot<SocketSink>) {
    let Some((sink, frames)) = outbound(app, slot) else {
        return;
    };
    for text in frames {
        if let Err(err) = sink.send(Message::Text(text)).await {
            warn!("send failed: {err}");
            break;
        }
    }
}

async fn close_sink(sink: Option<SocketSink>) {
    if let Some(mut sink) = sink {
        let _ = sink.close().await;
    }
}

/// Runs the viewer until stdin closes or `quit`.
pub async fn run(config: ViewerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let map = HeadlessMap::new(config.bounds, config.zoom);
    let panel = ConsolePanel::new(config.options, config.query.clone().unwrap_or_default());
    let mut app = ViewerApp::new(map, panel, config.settings());

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut slot: LinkSlot<SocketSink> = LinkSlot::new();
    let mut reader: Option<JoinHandle<()>> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = Vec::new();

    if config.query.is_some() {
        let ticket = app.draw();
        slot.attach(ticket.generation);
        reader = Some(spawn_link(
            config.server_url.clone(),
            ticket.generation,
            events_tx.clone(),
        ));
    }

    loop {
        let deadline = app
            .heartbeat_deadline()
            .map(tokio::time::Instant::from_std);
        let far = tokio::time::Instant::now() + Duration::from_secs(86_400);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(CommandError::Empty) => continue,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                match execute(&mut app, command, &mut out) {
                    Effect::None => {}
                    Effect::Quit => break,
                    Effect::Connect(ticket) => {
                        if let Some(task) = reader.take() {
                            task.abort();
                        }
                        close_sink(slot.attach(ticket.generation)).await;
                        reader = Some(spawn_link(
                            config.server_url.clone(),
                            ticket.generation,
                            events_tx.clone(),
                        ));
                    }
                }
                for line in out.drain(..) {
                    println!("{line}");
                }
            }
            Some(event) = events.recv() => {
                let stale = handle_link_event(&mut app, &mut slot, event, Instant::now());
                close_sink(stale).await;
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or(far)), if deadline.is_some() => {
                app.on_heartbeat(Instant::now());
            }
        }

        for job in app.take_bundle_jobs() {
            spawn_bundling(job, events_tx.clone());
        }
        flush(&mut app, &mut slot).await;
    }

    if let Some(task) = reader.take() {
        task.abort();
    }
    close_sink(slot.detach()).await;
    info!("viewer stopped");
    Ok(())
}
