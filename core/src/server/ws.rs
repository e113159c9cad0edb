//! One WebSocket per practice session.
//!
//! The socket is split into a writer task that forwards session events and
//! transport frames, and a reader task that parses client frames into
//! session inputs. Whichever finishes first ends the connection; the
//! session is then told the client went away.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::practice::{InboundEvent, OutboundEvent, PracticeError, SessionHandle, Song};

use super::error::ApiError;
use super::AppState;

const TRANSPORT_BUFFER: usize = 8;

#[derive(Debug, Deserialize)]
pub struct PracticeQuery {
    session: Option<String>,
}

/// Frames owned by the transport rather than the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TransportFrame {
    Session {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "songId")]
        song_id: String,
        #[serde(rename = "totalWords")]
        total_words: usize,
    },
    Error {
        code: String,
        message: String,
    },
}

impl TransportFrame {
    fn error(code: &str, message: impl Into<String>) -> Self {
        TransportFrame::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

pub async fn practice_socket(
    ws: WebSocketUpgrade,
    Path(song_id): Path<String>,
    Query(query): Query<PracticeQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let song = state.catalog.song(&song_id).await?;
    if song.is_empty() {
        return Err(PracticeError::EmptySong(song_id).into());
    }

    let session_id = query
        .session
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(ws.on_upgrade(move |socket| run_socket(socket, state, session_id, song)))
}

async fn run_socket(socket: WebSocket, state: AppState, session_id: String, song: Arc<Song>) {
    let (mut sender, receiver) = socket.split();

    let (handle, events) = match state.registry.create(&session_id, Arc::clone(&song)).await {
        Ok(created) => created,
        Err(err) => {
            warn!(target: "transport", session_id = %session_id, %err, "could not start practice session");
            let frame = TransportFrame::error(err.code(), err.to_string());
            if send_json(&mut sender, &frame).await {
                let _ = sender.send(Message::Close(None)).await;
            }
            return;
        }
    };

    info!(
        target: "transport",
        session_id = %session_id,
        song_id = %song.id,
        "practice socket connected"
    );

    let opening = TransportFrame::Session {
        session_id: session_id.clone(),
        song_id: song.id.clone(),
        total_words: song.len(),
    };

    let (frames_tx, frames_rx) = mpsc::channel::<TransportFrame>(TRANSPORT_BUFFER);
    let mut send_task = tokio::spawn(write_frames(sender, opening, events, frames_rx));
    let mut recv_task = tokio::spawn(read_frames(receiver, handle.clone(), frames_tx));

    tokio::select! {
        _ = &mut send_task => {
            debug!(target: "transport", session_id = %session_id, "writer finished");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!(target: "transport", session_id = %session_id, "reader finished");
            send_task.abort();
        }
    }

    // Already terminal sessions have dropped their input channel.
    let _ = handle.disconnect().await;
    info!(target: "transport", session_id = %session_id, "practice socket closed");
}

async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    opening: TransportFrame,
    mut events: mpsc::Receiver<OutboundEvent>,
    mut frames: mpsc::Receiver<TransportFrame>,
) {
    if !send_json(&mut sender, &opening).await {
        return;
    }

    loop {
        tokio::select! {
            maybe_event = events.recv() => match maybe_event {
                Some(event) => {
                    if !send_json(&mut sender, &event).await {
                        return;
                    }
                }
                None => break,
            },
            Some(frame) = frames.recv() => {
                if !send_json(&mut sender, &frame).await {
                    return;
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

async fn read_frames(
    mut receiver: SplitStream<WebSocket>,
    handle: SessionHandle,
    frames: mpsc::Sender<TransportFrame>,
) {
    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                let frame = TransportFrame::error("INVALID_FRAME", "binary frames are not supported");
                let _ = frames.send(frame).await;
                continue;
            }
            Ok(Message::Close(_)) => {
                debug!(target: "transport", session_id = handle.session_id(), "client closed socket");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(err) => {
                warn!(target: "transport", session_id = handle.session_id(), %err, "socket error");
                break;
            }
        };

        let event = match parse_inbound(&text) {
            Ok(event) => event,
            Err(frame) => {
                let _ = frames.send(frame).await;
                continue;
            }
        };

        // A finished session closes the writer once its last events are flushed.
        if let Err(err) = handle.send(event).await {
            debug!(target: "transport", session_id = handle.session_id(), %err, "session no longer accepts input");
        }
    }
}

fn parse_inbound(text: &str) -> Result<InboundEvent, TransportFrame> {
    serde_json::from_str(text).map_err(|err| {
        debug!(target: "transport", %err, "unparseable client frame");
        TransportFrame::error("INVALID_FRAME", "frame is not a recognised practice event")
    })
}

/// Returns false once the socket can no longer be written to.
async fn send_json<T: Serialize>(sender: &mut SplitSink<WebSocket, Message>, value: &T) -> bool {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            warn!(target: "transport", %err, "failed to serialize frame");
            return true;
        }
    };
    sender.send(Message::Text(json)).await.is_ok()
}
