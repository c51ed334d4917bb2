//! WebSocket transport: `/acp/ws?session_id=...`, full duplex JSON-RPC
//! frames plus `session_update` notifications pushed from the
//! `NotificationHub`. Grounded on `acp/transport.rs`'s `handle_socket` select
//! loop (idle timeout + message pump), simplified to drop auth/connection-limit
//! concerns this spec leaves to the caller's own middleware.

use crate::jsonrpc::{Processor, RpcHandler};
use crate::transport::NotificationHub;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, Instant};

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_PROTOCOL_ERROR: u16 = 1011;

#[derive(Clone)]
pub struct WsState {
    pub handler: Arc<dyn RpcHandler>,
    pub notifications: Arc<NotificationHub>,
    pub idle_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    session_id: String,
}

pub fn router(state: WsState) -> Router {
    Router::new().route("/acp/ws", get(upgrade)).with_state(state)
}

async fn upgrade(State(state): State<WsState>, Query(query): Query<WsQuery>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run(socket, state, query.session_id))
}

async fn run(socket: WebSocket, state: WsState, session_id: String) {
    let processor = Processor::new();
    let (mut sender, mut receiver) = socket.split();
    let mut notifications = state.notifications.subscribe(&session_id);
    let idle_timer = sleep(state.idle_timeout);
    tokio::pin!(idle_timer);

    loop {
        tokio::select! {
            _ = &mut idle_timer => {
                let _ = sender.send(close_frame(CLOSE_NORMAL, "idle timeout")).await;
                break;
            }
            notification = notifications.recv() => {
                match notification {
                    Ok(value) => {
                        if sender.send(Message::Text(value.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => {
                        tracing::warn!(%session_id, "websocket notification receiver lagged, dropping missed updates");
                    }
                    Err(RecvError::Closed) => {}
                }
            }
            maybe_msg = receiver.next() => {
                match maybe_msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(response) = processor.process_line(state.handler.as_ref(), &text).await {
                            if sender.send(Message::Text(response)).await.is_err() {
                                break;
                            }
                        }
                        idle_timer.as_mut().reset(Instant::now() + state.idle_timeout);
                    }
                    Some(Ok(Message::Close(_))) => {
                        let _ = sender.send(close_frame(CLOSE_NORMAL, "client closed")).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {
                        let _ = sender.send(close_frame(CLOSE_PROTOCOL_ERROR, "protocol error")).await;
                        break;
                    }
                    None => break,
                }
            }
        }
    }
}

fn close_frame(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame { code, reason: reason.to_string().into() }))
}
