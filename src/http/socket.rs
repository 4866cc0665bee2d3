use super::state::AppState;
use crate::ingest::{Acknowledgement, IngestError, RawSubmission};
use crate::protocol::{decode_binary_frame, ClientMessage, ServerEvent};
use crate::session::Session;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Outbound events buffered per connection
const OUTBOUND_BUFFER: usize = 64;

/// How long the writer gets to finish the close handshake
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Drive one client connection until it closes
///
/// Submissions run as their own tasks, so a slow transcode never holds up
/// this loop. Their acknowledgements come back through the connection's
/// writer task; once the connection is gone they are dropped.
pub async fn handle_socket(socket: WebSocket, state: AppState, remote_addr: Option<String>) {
    let session = Arc::new(Session::new(remote_addr));
    let live = state.register(Arc::clone(&session)).await;
    info!(
        "[conn] {} from {}, total: {}",
        session.id(),
        session.remote_addr().unwrap_or("unknown"),
        live
    );

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let mut writer = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                event = out_rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to serialize server event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }

        // Acks finishing after this point are dropped by their tasks
        out_rx.close();
        // Flushes the close reply queued when the client closed first
        if let Err(e) = sender.close().await {
            debug!("Socket close: {}", e);
        }
    });

    let hello = ServerEvent::Connected {
        session_id: session.id().to_string(),
        transcoder: state.pipeline.engine().readiness(),
    };
    if out_tx.send(hello).await.is_err() {
        warn!("Session {} closed before greeting", session.id());
    }

    let reason = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match ClientMessage::parse(&text) {
                ClientMessage::Submission(raw) => spawn_submission(&state, &session, &out_tx, Ok(raw)),
                ClientMessage::MalformedSubmission(reason) => spawn_submission(
                    &state,
                    &session,
                    &out_tx,
                    Err(IngestError::InvalidPayload(reason)),
                ),
                ClientMessage::Ping => {
                    let _ = out_tx.send(ServerEvent::Pong).await;
                }
                ClientMessage::Unrecognized(error) => {
                    debug!("Session {}: {}", session.id(), error);
                    let _ = out_tx.send(ServerEvent::Error { error }).await;
                }
            },
            Some(Ok(Message::Binary(frame))) => {
                spawn_submission(&state, &session, &out_tx, decode_binary_frame(&frame));
            }
            Some(Ok(Message::Close(frame))) => {
                break frame
                    .map(|f| format!("close {}: {}", f.code, f.reason))
                    .unwrap_or_else(|| "client close".to_string());
            }
            // Pings are answered by axum
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Err(e)) => break format!("transport error: {}", e),
            None => break "connection dropped".to_string(),
        }
    };

    session.mark_dead();
    let live = state.unregister(session.id()).await;
    info!("[disc] {} ({}), total: {}", session.id(), reason, live);

    drop(out_tx);
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        debug!("Session {} writer did not finish, aborting", session.id());
        writer.abort();
    }
}

fn spawn_submission(
    state: &AppState,
    session: &Arc<Session>,
    out_tx: &mpsc::Sender<ServerEvent>,
    submission: Result<RawSubmission, IngestError>,
) {
    let number = session.record_submission();
    let span = info_span!("submission", session = %session.id(), n = number);

    let pipeline = Arc::clone(&state.pipeline);
    let session = Arc::clone(session);
    let out_tx = out_tx.clone();

    tokio::spawn(
        async move {
            let ack = match submission {
                Ok(raw) => pipeline.run(raw).await,
                Err(e) => {
                    warn!("[FAIL] {}", e);
                    Acknowledgement::failed(&e)
                }
            };

            if out_tx.send(ServerEvent::SaveAck(ack)).await.is_ok() {
                session.record_ack_delivered();
            } else {
                debug!("Session {} gone, acknowledgement dropped", session.id());
            }
        }
        .instrument(span),
    );
}
