use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;

use crate::auth::Claims;
use crate::metrics::{
    SessionMetrics, WsMessageMetrics, WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED,
    WS_CONNECTION_DURATION,
};
use crate::server::AppState;
use crate::session::{ConnectionHandle, ConnectionId, SessionError};

use super::broadcast::{broadcast, broadcast_clients_updated};
use super::connection::{WsConnection, WsOutbound};
use super::message::{ClientMessage, ServerMessage};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
#[tracing::instrument(
    name = "ws.upgrade",
    skip(ws, state, query, headers),
    fields(has_query_token = query.token.is_some())
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = extract_token(&query, &headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing authentication token").into_response();
    };

    let claims = match state.jwt.validate(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "JWT validation failed");
            return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
        }
    };

    tracing::info!(user_id = %claims.sub, "WebSocket upgrade requested");

    ws.on_upgrade(move |socket| handle_socket(socket, state, claims))
}

/// Extract token from query parameter or Authorization header
fn extract_token(query: &WsQuery, headers: &HeaderMap) -> Option<String> {
    if let Some(ref token) = query.token {
        return Some(token.clone());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn rejection_reason(e: &SessionError) -> &'static str {
    match e {
        SessionError::PrincipalNotFound(_) | SessionError::ConnectionNotFound(_) => "not_found",
        SessionError::Inactive(_) => "inactive",
        SessionError::Lookup(_) => "lookup",
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, claims: Claims) {
    let (ws_sender, ws_receiver) = socket.split();
    run_connection(ws_sender, ws_receiver, state, claims).await;
}

/// Drive one authenticated connection from registration to cleanup.
#[tracing::instrument(
    name = "ws.connection",
    skip(ws_sender, ws_receiver, state, claims),
    fields(
        user_id = %claims.sub,
        otel.kind = "server"
    )
)]
async fn run_connection<S, R, E>(
    mut ws_sender: S,
    mut ws_receiver: R,
    state: AppState,
    claims: Claims,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let connection_id = ConnectionId::generate();
    let connection_start = std::time::Instant::now();

    let (handle, outbound) = WsConnection::new(state.settings.websocket.outbound_buffer);

    let registration = match state
        .sessions
        .register(connection_id.clone(), handle.clone(), claims.user_id())
        .await
    {
        Ok(registration) => registration,
        Err(e) => {
            SessionMetrics::record_rejected(rejection_reason(&e));
            tracing::warn!(user_id = %claims.sub, error = %e, "Connection rejected");

            let error_msg = ServerMessage::error("CONNECTION_REJECTED", e.to_string());
            send_frame(&mut ws_sender, &error_msg).await;
            let _ = ws_sender.close().await;
            return;
        }
    };

    SessionMetrics::record_registered();
    if registration.evicted.is_some() {
        SessionMetrics::record_evicted();
    }
    WS_CONNECTIONS_OPENED.inc();

    tracing::info!(
        connection_id = %connection_id,
        user_id = %registration.principal.id,
        evicted = ?registration.evicted,
        "WebSocket connection established"
    );

    broadcast_clients_updated(&state.sessions);

    let mut send_task = tokio::spawn(forward_outbound(ws_sender, outbound));

    let state_clone = state.clone();
    let recv_connection_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &recv_connection_id, &handle) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Whichever side finishes first ends the connection
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
        }
    }

    // An evicted connection is already gone from the registry
    if state.sessions.remove(&connection_id) {
        broadcast_clients_updated(&state.sessions);
    }

    WS_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        user_id = %claims.sub,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Drain the outbound queue into the socket until the queue closes or a
/// disconnect is requested. Frames queued before the disconnect request are
/// written before the close frame.
async fn forward_outbound<S>(mut ws_sender: S, mut outbound: WsOutbound)
where
    S: Sink<Message> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            msg = outbound.messages.recv() => {
                let Some(msg) = msg else { break };
                if !send_frame(&mut ws_sender, &msg).await {
                    break;
                }
            }
            changed = outbound.close.changed() => {
                if changed.is_err() || *outbound.close.borrow() {
                    while let Ok(msg) = outbound.messages.try_recv() {
                        if !send_frame(&mut ws_sender, &msg).await {
                            return;
                        }
                    }
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
}

/// Write one frame. Returns false once the socket is gone; a frame that
/// fails to serialize is logged and skipped.
async fn send_frame<S>(ws_sender: &mut S, msg: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(msg) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, kind = msg.kind(), "Failed to serialize message");
            return true;
        }
    };

    ws_sender.send(Message::Text(text.into())).await.is_ok()
}

/// Process a received WebSocket message
/// Returns false if the connection should be closed
fn process_message(
    msg: Message,
    state: &AppState,
    connection_id: &ConnectionId,
    handle: &Arc<WsConnection>,
) -> bool {
    match msg {
        Message::Text(text) => {
            let client_msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(e) => {
                    WsMessageMetrics::record_invalid();
                    tracing::warn!(error = %e, "Failed to parse client message");
                    let _ = handle.send(ServerMessage::error("INVALID_MESSAGE", e.to_string()));
                    return true;
                }
            };

            handle_client_message(client_msg, state, connection_id, handle);
            true
        }
        Message::Binary(_) => {
            WsMessageMetrics::record_invalid();
            let _ = handle.send(ServerMessage::error(
                "UNSUPPORTED_FORMAT",
                "Binary messages are not supported",
            ));
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Received close frame");
            false
        }
    }
}

/// Handle a parsed client message
#[tracing::instrument(
    name = "ws.message",
    skip(state, connection_id, handle),
    fields(connection_id = %connection_id)
)]
fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    connection_id: &ConnectionId,
    handle: &Arc<WsConnection>,
) {
    match msg {
        ClientMessage::MessageFromClient { message } => {
            WsMessageMetrics::record_chat();

            let full_name = match state.sessions.display_name(connection_id) {
                Ok(name) => name,
                Err(e) => {
                    // evicted while the frame was in flight
                    tracing::debug!(error = %e, "Dropping message from unregistered connection");
                    return;
                }
            };

            let result = broadcast(&state.sessions, &ServerMessage::chat(full_name, message));
            tracing::debug!(
                delivered = result.delivered,
                failed = result.failed,
                "Chat message relayed"
            );
        }
        ClientMessage::Ping => {
            WsMessageMetrics::record_ping();
            let _ = handle.send(ServerMessage::Pong);
        }
    }
}
