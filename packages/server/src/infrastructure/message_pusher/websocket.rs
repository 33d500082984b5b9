//! WebSocket 接続のハブ（MessagePusher 実装）
//!
//! ## 責務
//!
//! - ユーザー ID → 接続（上限付き送信キュー）のテーブルを所有する
//! - 登録・登録解除・ユニキャスト・ブロードキャスト
//! - 送信キューが満杯または閉じた接続の退去
//! - 予約中の接続宛てイベントの保留（最初のイベントより先に届かないようにする）
//!
//! ## 設計ノート
//!
//! テーブルの所有者はこの構造体ただ一つで、すべての変更は 1 つのロックの下で行います。
//! 送信は `try_send` のみで、ロックを握ったまま待つことはありません。
//!
//! WebSocket の生成と送受信ループは UI 層（`ui/handler/websocket.rs`）が担い、
//! ここでは生成された送信キューの管理とメッセージ送信のみを行います。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::{
    domain::{
        ConnectionId, ConnectionInfo, Event, MessagePushError, MessagePusher, PusherChannel,
        Unregistration, UserId,
    },
    infrastructure::dto::encode_event,
};
use dojo_shared::time::get_unix_millis;

/// 登録中の接続
struct Connection {
    connection_id: ConnectionId,
    sender: PusherChannel,
    connected_at: i64,
    /// 予約中（`activate_client` 前）に届いたイベント
    held: Option<Vec<String>>,
}

/// `try_send` の結果
enum Delivery {
    Delivered,
    Evicted,
}

fn deliver(user_id: UserId, connection: &mut Connection, payload: String) -> Delivery {
    let Some(held) = connection.held.as_mut() else {
        return send(user_id, connection, payload);
    };

    // 有効化時に最初のイベントが入る 1 枠を残す
    if held.len() + 1 >= connection.sender.max_capacity() {
        tracing::warn!(
            "Too many events held for user {}, evicting connection {}",
            user_id,
            connection.connection_id
        );
        return Delivery::Evicted;
    }
    held.push(payload);
    Delivery::Delivered
}

fn send(user_id: UserId, connection: &Connection, payload: String) -> Delivery {
    match connection.sender.try_send(payload) {
        Ok(()) => Delivery::Delivered,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                "Outbound queue of user {} is full, evicting connection {}",
                user_id,
                connection.connection_id
            );
            Delivery::Evicted
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(
                "Outbound queue of user {} is closed, evicting connection {}",
                user_id,
                connection.connection_id
            );
            Delivery::Evicted
        }
    }
}

/// WebSocket 接続のハブ
///
/// ## 使用例
///
/// ```ignore
/// let hub = ConnectionHub::new();
/// let (tx, rx) = tokio::sync::mpsc::channel(256);
/// hub.register_client(user_id, ConnectionId::generate(), tx).await?;
/// hub.broadcast(&Event::from_server(EventBody::BreakStarted)).await?;
/// ```
#[derive(Default)]
pub struct ConnectionHub {
    connections: Mutex<HashMap<UserId, Connection>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(event: &Event) -> Result<String, MessagePushError> {
        encode_event(event).map_err(|e| MessagePushError::Encode(e.to_string()))
    }

    async fn insert(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
        held: Option<Vec<String>>,
    ) -> Result<(), MessagePushError> {
        let mut connections = self.connections.lock().await;

        // 既存の接続が生きていれば拒否（チェックと挿入は同じロックの下）
        if let Some(existing) = connections.get(&user_id) {
            if !existing.sender.is_closed() {
                return Err(MessagePushError::Conflict(user_id));
            }
            tracing::debug!(
                "Replacing closed connection {} of user {}",
                existing.connection_id,
                user_id
            );
        }

        connections.insert(
            user_id,
            Connection {
                connection_id,
                sender,
                connected_at: get_unix_millis(),
                held,
            },
        );
        tracing::debug!(
            "User {} registered to ConnectionHub (connection {})",
            user_id,
            connection_id
        );
        Ok(())
    }
}

#[async_trait]
impl MessagePusher for ConnectionHub {
    async fn register_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), MessagePushError> {
        self.insert(user_id, connection_id, sender, None).await
    }

    async fn reserve_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), MessagePushError> {
        self.insert(user_id, connection_id, sender, Some(Vec::new()))
            .await
    }

    async fn activate_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        first: &Event,
    ) -> Result<(), MessagePushError> {
        let payload = Self::encode(first)?;
        let mut connections = self.connections.lock().await;

        let connection = match connections.get_mut(&user_id) {
            Some(connection) if connection.connection_id == connection_id => connection,
            _ => return Err(MessagePushError::ClientNotFound(user_id)),
        };
        let held = connection.held.take().unwrap_or_default();
        let held_count = held.len();

        let evicted = std::iter::once(payload)
            .chain(held)
            .any(|payload| matches!(send(user_id, connection, payload), Delivery::Evicted));
        if evicted {
            connections.remove(&user_id);
            return Err(MessagePushError::Evicted(user_id));
        }

        tracing::debug!(
            "Activated connection {} of user {} ({} held event(s))",
            connection_id,
            user_id,
            held_count
        );
        Ok(())
    }

    async fn unregister_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Unregistration {
        let mut connections = self.connections.lock().await;

        match connections.get(&user_id) {
            Some(current) if current.connection_id == connection_id => {
                // 送信側を drop すると送信キューが閉じる
                connections.remove(&user_id);
                tracing::debug!(
                    "User {} unregistered from ConnectionHub (connection {})",
                    user_id,
                    connection_id
                );
                Unregistration::Removed
            }
            Some(current) => {
                tracing::debug!(
                    "Connection {} of user {} was superseded by {}",
                    connection_id,
                    user_id,
                    current.connection_id
                );
                Unregistration::Superseded
            }
            None => Unregistration::Evicted,
        }
    }

    async fn push_to(&self, user_id: UserId, event: &Event) -> Result<(), MessagePushError> {
        let payload = Self::encode(event)?;
        let mut connections = self.connections.lock().await;

        let connection = connections
            .get_mut(&user_id)
            .ok_or(MessagePushError::ClientNotFound(user_id))?;
        match deliver(user_id, connection, payload) {
            Delivery::Delivered => {
                tracing::debug!("Pushed {:?} to user {}", event.kind(), user_id);
                Ok(())
            }
            Delivery::Evicted => {
                connections.remove(&user_id);
                Err(MessagePushError::Evicted(user_id))
            }
        }
    }

    async fn push_to_connection(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        event: &Event,
    ) -> Result<(), MessagePushError> {
        let payload = Self::encode(event)?;
        let mut connections = self.connections.lock().await;

        let Some(connection) = connections.get_mut(&user_id) else {
            tracing::debug!(
                "Dropping {:?} for departed connection {} of user {}",
                event.kind(),
                connection_id,
                user_id
            );
            return Ok(());
        };
        if connection.connection_id != connection_id {
            tracing::debug!(
                "Dropping {:?} for stale connection {} of user {}",
                event.kind(),
                connection_id,
                user_id
            );
            return Ok(());
        }

        match deliver(user_id, connection, payload) {
            Delivery::Delivered => Ok(()),
            Delivery::Evicted => {
                connections.remove(&user_id);
                Err(MessagePushError::Evicted(user_id))
            }
        }
    }

    async fn broadcast(&self, event: &Event) -> Result<(), MessagePushError> {
        let payload = Self::encode(event)?;
        let mut connections = self.connections.lock().await;

        // ブロードキャストでは送れなかった接続を退去させ、他への配信は続ける
        connections.retain(|user_id, connection| {
            matches!(deliver(*user_id, connection, payload.clone()), Delivery::Delivered)
        });
        tracing::debug!(
            "Broadcasted {:?} to {} connection(s)",
            event.kind(),
            connections.len()
        );

        Ok(())
    }

    async fn connected_user_ids(&self) -> Vec<UserId> {
        let connections = self.connections.lock().await;
        let mut ids: Vec<UserId> = connections.keys().copied().collect();
        ids.sort();
        ids
    }

    async fn connections(&self) -> Vec<ConnectionInfo> {
        let connections = self.connections.lock().await;
        let mut infos: Vec<ConnectionInfo> = connections
            .iter()
            .map(|(user_id, connection)| ConnectionInfo {
                user_id: *user_id,
                connection_id: connection.connection_id,
                connected_at: connection.connected_at,
            })
            .collect();
        infos.sort_by_key(|info| info.user_id);
        infos
    }

    async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}
