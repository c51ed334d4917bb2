//! HTTP transport: `POST /acp/rpc` for request/response and `GET
//! /acp/events` for the SSE notification stream, per §4.2. Grounded on
//! `handlers/sessions.rs`'s `stream_session_events` for the SSE shape.

use crate::jsonrpc::{Processor, RpcHandler};
use crate::transport::NotificationHub;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone)]
pub struct HttpState {
    pub handler: Arc<dyn RpcHandler>,
    pub notifications: Arc<NotificationHub>,
}

pub fn router(state: HttpState) -> Router {
    Router::new().route("/acp/rpc", post(rpc)).route("/acp/events", get(events)).with_state(state)
}

async fn rpc(State(state): State<HttpState>, body: String) -> String {
    let processor = Processor::new();
    processor.process_line(state.handler.as_ref(), &body).await.unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    session_id: String,
}

/// Each SSE event line is `data: <single-line JSON>\n\n`, delivered to the
/// caller that registered `session_id`.
async fn events(State(state): State<HttpState>, Query(query): Query<EventsQuery>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifications.subscribe(&query.session_id);
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(notification) => Some(Ok(Event::default().data(notification.to_string()))),
        Err(_lagged) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}

/// `/amplifier/health`: the minimal health endpoint carried along with
/// namespace switching (§2 SPEC_FULL.md supplemented ambient stack).
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}
