//! MessagePusher trait 定義
//!
//! 接続中のクライアントへイベントを届けるインターフェース。
//! 接続テーブルの所有者は実装側ただ一つで、登録・解除・配信はすべてそこを通る。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    event::Event,
    value_object::{ConnectionId, UserId},
};

/// クライアントごとの送信キュー（上限あり、エンコード済みエンベロープを運ぶ）
pub type PusherChannel = mpsc::Sender<String>;

/// 接続情報（デバッグ・観測用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    /// 接続時刻（Unix ミリ秒）
    pub connected_at: i64,
}

/// 登録解除の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistration {
    /// 指定の接続が現在の保持者で、テーブルから削除した
    Removed,
    /// 既に退去済みで、後続の接続もない
    Evicted,
    /// 同じユーザーの新しい接続がテーブルを保持している（何もしない）
    Superseded,
}

/// メッセージ送信のインターフェース
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録する（チェックと挿入はアトミック）
    ///
    /// 同じユーザーが既に接続中なら `MessagePushError::Conflict`。
    async fn register_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), MessagePushError>;

    /// 接続を予約する（`register_client` と同じ重複チェック）
    ///
    /// `activate_client` までに届いたイベントは送信キューに入れず保留する。
    async fn reserve_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), MessagePushError>;

    /// 予約した接続に `first` を送り、続けて保留分を届いた順に流して配信対象にする
    ///
    /// 指定の接続が既にいなければ `MessagePushError::ClientNotFound`。
    async fn activate_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        first: &Event,
    ) -> Result<(), MessagePushError>;

    /// 接続の登録を解除する（指定の接続が現在の保持者である場合のみ削除）
    async fn unregister_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Unregistration;

    /// 特定ユーザーの現在の接続にイベントを送る
    async fn push_to(&self, user_id: UserId, event: &Event) -> Result<(), MessagePushError>;

    /// 特定の接続にイベントを送る（その接続が既にいなければ破棄）
    async fn push_to_connection(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        event: &Event,
    ) -> Result<(), MessagePushError>;

    /// 接続中の全クライアントにイベントを送る
    async fn broadcast(&self, event: &Event) -> Result<(), MessagePushError>;

    /// 接続中のユーザー ID 一覧（昇順）
    async fn connected_user_ids(&self) -> Vec<UserId>;

    /// 接続中の全接続情報（ユーザー ID 昇順）
    async fn connections(&self) -> Vec<ConnectionInfo>;

    /// 接続数
    async fn connection_count(&self) -> usize;
}
