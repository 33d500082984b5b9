//! UseCase テスト用の共通ヘルパー
//!
//! インメモリ実装の協調者一式と、ハブに登録した受信キューからイベントを読み出す関数を提供する。

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, Event, MessagePusher, SharedGameState, UserId},
    infrastructure::{
        dto::decode_event,
        message_pusher::ConnectionHub,
        repository::{InMemoryChallengeRepository, InMemoryUserRepository},
        state_store::InMemoryStateStore,
    },
};

pub(crate) struct Harness {
    pub hub: Arc<ConnectionHub>,
    pub game_state: SharedGameState,
    pub challenges: Arc<InMemoryChallengeRepository>,
    pub users: Arc<InMemoryUserRepository>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            hub: Arc::new(ConnectionHub::new()),
            game_state: SharedGameState::new(Arc::new(InMemoryStateStore::new())),
            challenges: Arc::new(InMemoryChallengeRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
        }
    }

    /// ハブにだけ接続を登録し、その受信キューを返す
    pub async fn listen(&self, user_id: UserId) -> (ConnectionId, mpsc::Receiver<String>) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::channel(64);
        self.hub
            .register_client(user_id, connection_id, tx)
            .await
            .expect("register listener");
        (connection_id, rx)
    }
}

/// 次のイベントを待って取り出す
pub(crate) async fn next_event(rx: &mut mpsc::Receiver<String>) -> Event {
    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("outbound queue closed");
    decode_event(&payload).expect("decode event")
}

/// 既に届いているイベントをすべて取り出す
pub(crate) fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        events.push(decode_event(&payload).expect("decode event"));
    }
    events
}
