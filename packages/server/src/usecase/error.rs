//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{
    EventKind, MessagePushError, RepositoryError, StoreError, SubmitError, UserId,
};

/// 接続処理のエラー
#[derive(Debug, Error)]
pub enum ConnectError {
    /// 同じユーザーが既に接続中
    #[error("user {0} is already connected")]
    AlreadyConnected(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// 切断処理のエラー
#[derive(Debug, Error)]
pub enum DisconnectError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// 認証のエラー
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token is missing")]
    MissingToken,

    #[error("access token is invalid")]
    InvalidToken,

    #[error(transparent)]
    Repository(RepositoryError),
}

/// コード実行リクエストのエラー
///
/// どのエラーでも呼び出し元の接続には `CodeRanResult{passed: false}` が届く。
#[derive(Debug, Error)]
pub enum RunCodeError {
    #[error("no challenge is running during a break")]
    OnBreak,

    #[error("no challenge is running")]
    NoActiveChallenge,

    #[error("code is not valid base64: {0}")]
    InvalidSource(String),

    #[error("submission rejected: {0}")]
    Rejected(#[from] SubmitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// イベントのルーティングエラー（接続は維持される）
#[derive(Debug, Error)]
pub enum RouteError {
    /// クライアントが送ってはならないイベント
    #[error("clients may not send {0:?} events")]
    UnexpectedClientEvent(EventKind),

    #[error(transparent)]
    RunCode(#[from] RunCodeError),

    /// ハンドラ内の panic
    #[error("internal error: {0}")]
    Internal(String),
}

/// tick のエラー（その tick だけが中断される）
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}
