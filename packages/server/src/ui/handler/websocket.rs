//! WebSocket connection handlers.
//!
//! Each accepted connection runs two pumps. The inbound pump reads frames,
//! decodes them and hands them to the [`EventRouter`](crate::usecase::EventRouter).
//! The outbound pump drains the connection's queue onto the socket and pings
//! the client periodically. When either pump stops, the other is aborted and the
//! player is disconnected.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    config::HubConfig,
    domain::{ConnectionId, User, UserId},
    infrastructure::dto::decode_event,
    ui::{error::ApiError, state::AppState},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

#[derive(Debug, Error)]
enum WriteError {
    #[error("write timed out")]
    Timeout,

    #[error("socket error: {0}")]
    Socket(#[from] axum::Error),
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<Response, ApiError> {
    let user = state
        .authenticate_user_usecase
        .execute(query.token.as_deref())
        .await
        .inspect_err(|e| tracing::warn!("Rejected WebSocket connection: {}", e))?;

    // Register before upgrading so a duplicate connection is refused with 409
    let connection_id = ConnectionId::generate();
    let (tx, rx) = mpsc::channel(state.hub_config.outbound_queue_capacity);
    state
        .connect_player_usecase
        .execute(user.id, connection_id, tx)
        .await
        .inspect_err(|e| tracing::warn!("Rejected WebSocket connection: {}", e))?;
    tracing::info!(
        "User {} ({}) registered with connection {}",
        user.id,
        user.username,
        connection_id
    );

    let user_id = user.id;
    let failed_state = state.clone();
    let max_message_size = state.hub_config.max_message_size;

    Ok(ws
        .max_message_size(max_message_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!("WebSocket upgrade failed for user {}: {}", user_id, e);
            tokio::spawn(async move {
                disconnect(&failed_state, user_id, connection_id).await;
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, user, connection_id, rx))
        .into_response())
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user: User,
    connection_id: ConnectionId,
    rx: mpsc::Receiver<String>,
) {
    let (sender, receiver) = socket.split();
    let config = state.hub_config.clone();

    let mut send_task = tokio::spawn(outbound_pump(rx, sender, config.clone()));

    // InitialState and UserJoined go through the queue like any other event
    if let Err(e) = state
        .connect_player_usecase
        .announce(&user, connection_id)
        .await
    {
        tracing::error!("Failed to announce user {}: {}", user.id, e);
        send_task.abort();
        disconnect(&state, user.id, connection_id).await;
        return;
    }

    let mut recv_task = tokio::spawn(inbound_pump(
        receiver,
        state.clone(),
        user.id,
        connection_id,
        config,
    ));

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    disconnect(&state, user.id, connection_id).await;
}

/// Reads frames until the client goes away, misbehaves, or stays silent for `pong_wait`.
async fn inbound_pump(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    user_id: UserId,
    connection_id: ConnectionId,
    config: HubConfig,
) {
    loop {
        // Any frame, including Pong, resets the read deadline
        let frame = match tokio::time::timeout(config.pong_wait, receiver.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                tracing::debug!("Read error from user {}: {}", user_id, e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    "No frame from user {} within {:?}, closing",
                    user_id,
                    config.pong_wait
                );
                break;
            }
        };

        match frame {
            Message::Text(text) => {
                let event = match decode_event(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Closing connection of user {}: {}", user_id, e);
                        break;
                    }
                };

                if let Err(e) = state
                    .event_router
                    .dispatch(user_id, connection_id, event)
                    .await
                {
                    tracing::warn!("Event from user {} was not handled: {}", user_id, e);
                }
            }
            Message::Binary(_) => {
                tracing::warn!("Ignoring binary frame from user {}", user_id);
            }
            Message::Close(_) => {
                tracing::info!("User {} requested close", user_id);
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Writes queued events and periodic pings until the queue closes or a write fails.
async fn outbound_pump(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
    config: HubConfig,
) {
    let mut heartbeat =
        tokio::time::interval_at(Instant::now() + config.ping_period, config.ping_period);

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(text) = message else {
                    // The hub dropped the sender: the connection was evicted or replaced
                    let _ = write(&mut sender, Message::Close(None), &config).await;
                    break;
                };
                if let Err(e) = write(&mut sender, Message::Text(text.into()), &config).await {
                    tracing::debug!("Failed to write event: {}", e);
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if let Err(e) = write(&mut sender, Message::Ping(Bytes::new()), &config).await {
                    tracing::debug!("Failed to write ping: {}", e);
                    break;
                }
            }
        }
    }
}

async fn write(
    sender: &mut SplitSink<WebSocket, Message>,
    message: Message,
    config: &HubConfig,
) -> Result<(), WriteError> {
    tokio::time::timeout(config.write_wait, sender.send(message))
        .await
        .map_err(|_| WriteError::Timeout)??;
    Ok(())
}

async fn disconnect(state: &AppState, user_id: UserId, connection_id: ConnectionId) {
    match state
        .disconnect_player_usecase
        .execute(user_id, connection_id)
        .await
    {
        Ok(unregistration) => {
            tracing::info!(
                "Connection {} of user {} closed ({:?})",
                connection_id,
                user_id,
                unregistration
            );
        }
        Err(e) => {
            tracing::warn!("Failed to disconnect user {}: {}", user_id, e);
        }
    }
}
