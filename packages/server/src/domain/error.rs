//! ドメイン層のエラー定義

use std::time::Duration;

use thiserror::Error;

use super::value_object::UserId;

/// 永続化のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// 共有ステートストアのエラー
///
/// 接続エラーはリトライ可能で、影響は現在の tick / リクエストに限られる。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("state store connection error: {0}")]
    Connection(String),

    #[error("invalid value for key '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("user {0} already has a live connection")]
    Conflict(UserId),

    #[error("user {0} is not connected")]
    ClientNotFound(UserId),

    #[error("user {0} was evicted because its outbound queue is full or closed")]
    Evicted(UserId),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

/// コード実行のエラー
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("container failure: {0}")]
    Container(String),

    #[error("execution timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("scratch space error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// 実行キューへの投入エラー
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("execution queue is full")]
    QueueFull,

    #[error("execution queue is closed")]
    Closed,
}
