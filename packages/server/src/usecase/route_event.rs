//! UseCase: クライアントイベントのルーティング
//!
//! 受信ポンプがデコードしたイベントを、送信元を認証済みユーザーに付け替えたうえで
//! 種別ごとのユースケースへ振り分ける。クライアントが送ってよいのは RunCodeRequest だけ。

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;

use crate::domain::{ConnectionId, Event, EventBody, UserId};

use super::{error::RouteError, run_code::RunCodeUseCase};

/// イベントルーター
pub struct EventRouter {
    run_code_usecase: Arc<RunCodeUseCase>,
}

impl EventRouter {
    pub fn new(run_code_usecase: Arc<RunCodeUseCase>) -> Self {
        Self { run_code_usecase }
    }

    /// イベントを処理する
    ///
    /// 送信元はクライアントの申告ではなく `origin` で上書きする。
    /// ハンドラ内の panic はここで捕捉し `RouteError::Internal` として返す。
    pub async fn dispatch(
        &self,
        origin: UserId,
        connection_id: ConnectionId,
        event: Event,
    ) -> Result<(), RouteError> {
        let event = Event::new(origin, event.body);

        AssertUnwindSafe(self.route(connection_id, event))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!("Event handler panicked for user {}: {}", origin, message);
                Err(RouteError::Internal(message))
            })
    }

    async fn route(&self, connection_id: ConnectionId, event: Event) -> Result<(), RouteError> {
        match event.body {
            EventBody::RunCodeRequest { code, lang } => {
                tracing::info!("User {} submitted {} code", event.origin, lang);
                self.run_code_usecase
                    .execute(event.origin, connection_id, &code, &lang)
                    .await?;
                Ok(())
            }
            other => Err(RouteError::UnexpectedClientEvent(other.kind())),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
