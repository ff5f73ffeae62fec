/**
 * Gateway Subscription Handler
 *
 * The WebSocket handshake and per-connection event loop for GET /ws.
 *
 * # Handshake
 *
 * The client presents its bearer token as a `token` query parameter (or an
 * `Authorization: Bearer` header). A missing or invalid token rejects the
 * request with 401 before the upgrade.
 *
 * # Connection lifecycle
 *
 * 1. On connect the socket joins the user's own room and the global channel,
 *    the presence registry records the connection, and `user_online` is
 *    broadcast if this is the user's first connection.
 * 2. The loop relays room events out and handles client events in:
 *    `joinRoom`, `getOnlineUsers`, `typing`, `stopTyping`.
 * 3. On disconnect the registry is updated and `user_offline` is broadcast
 *    when the last connection for the user closes.
 */

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamMap;
use uuid::Uuid;

use crate::auth::sessions::verify_token;
use crate::error::ApiError;
use crate::realtime::events::{ClientEvent, ServerEvent};
use crate::realtime::rooms::Gateway;
use crate::server::state::AppState;

/// Key for the global (presence) channel in the connection's stream map
const GLOBAL_STREAM_KEY: &str = "~global";

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    /// Bearer token (browsers cannot set headers on WebSocket upgrades)
    pub token: Option<String>,
}

/// Handle the WebSocket handshake (GET /ws)
///
/// # Errors
///
/// * `401 Unauthorized` - missing or invalid token
pub async fn handle_gateway_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|t| t.to_string())
        })
        .ok_or_else(|| ApiError::Unauthorized("Authentication error: No token".to_string()))?;

    let claims = verify_token(&token)
        .map_err(|_| ApiError::Unauthorized("Authentication error: Invalid token".to_string()))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Authentication error: Invalid token".to_string()))?;

    tracing::info!("[Gateway] WebSocket handshake for user {}", user_id);

    let gateway = state.gateway.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, gateway)))
}

/// What one iteration of the connection loop decided to do
enum Step {
    /// A parsed client event to dispatch
    Client(ClientEvent),
    /// A room event to relay out
    Outgoing(ServerEvent),
    /// Nothing actionable (ignored frame, lagged receiver)
    Idle,
    /// Peer closed or errored
    Disconnect,
}

/// Per-connection event loop
async fn handle_socket(socket: WebSocket, user_id: Uuid, gateway: Gateway) {
    let (mut sender, mut receiver) = socket.split();

    // Every connection listens to its own user room plus the global channel.
    let mut streams: StreamMap<String, BroadcastStream<ServerEvent>> = StreamMap::new();
    streams.insert(
        user_id.to_string(),
        BroadcastStream::new(gateway.subscribe_room(&user_id.to_string())),
    );
    streams.insert(
        GLOBAL_STREAM_KEY.to_string(),
        BroadcastStream::new(gateway.subscribe_global()),
    );

    if gateway.presence().connect(user_id) {
        gateway.broadcast_all(ServerEvent::UserOnline(user_id));
    }

    loop {
        // The select only classifies the wakeup; acting on it happens below,
        // after the competing futures are gone.
        let step = tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(event) => Step::Client(event),
                            Err(e) => {
                                tracing::warn!("[Gateway] Unparseable client event: {:?}", e);
                                Step::Idle
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => Step::Disconnect,
                    // Ping/pong are answered by axum; binary frames are ignored
                    Some(Ok(_)) => Step::Idle,
                    Some(Err(e)) => {
                        tracing::warn!("[Gateway] WebSocket error for {}: {:?}", user_id, e);
                        Step::Disconnect
                    }
                }
            }
            Some((_room, event)) = streams.next() => {
                match event {
                    Ok(event) => Step::Outgoing(event),
                    Err(e) => {
                        // Lagged receiver: skip ahead and keep the connection
                        tracing::warn!("[Gateway] Receiver lagged for {}: {:?}", user_id, e);
                        Step::Idle
                    }
                }
            }
        };

        match step {
            Step::Client(event) => {
                handle_client_event(event, user_id, &gateway, &mut streams, &mut sender).await;
            }
            Step::Outgoing(event) => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("[Gateway] Failed to serialize event: {:?}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Step::Idle => {}
            Step::Disconnect => break,
        }
    }

    if gateway.presence().disconnect(user_id) {
        gateway.broadcast_all(ServerEvent::UserOffline(user_id));
    }
    tracing::info!("[Gateway] Connection closed for user {}", user_id);
}

/// Dispatch one client event
async fn handle_client_event(
    event: ClientEvent,
    user_id: Uuid,
    gateway: &Gateway,
    streams: &mut StreamMap<String, BroadcastStream<ServerEvent>>,
    sender: &mut SplitSink<WebSocket, Message>,
) {
    match event {
        ClientEvent::JoinRoom { room } => {
            let already_joined = streams.keys().any(|key| key == &room);
            if !already_joined {
                tracing::debug!("[Gateway] {} joined room {}", user_id, room);
                streams.insert(
                    room.clone(),
                    BroadcastStream::new(gateway.subscribe_room(&room)),
                );
            }
        }
        ClientEvent::GetOnlineUsers => {
            let event = ServerEvent::OnlineUsers(gateway.presence().online_users());
            if let Ok(json) = serde_json::to_string(&event) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
        }
        ClientEvent::Typing { to } => {
            gateway.emit_to_user(to, ServerEvent::Typing { from: user_id });
        }
        ClientEvent::StopTyping { to } => {
            gateway.emit_to_user(to, ServerEvent::StopTyping { from: user_id });
        }
    }
}
