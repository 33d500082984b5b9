//! UseCase: プレイヤー切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectPlayerUseCase::execute() メソッド
//! - 登録解除の結果ごとの UserLeft 配信と参加ユーザー集合の更新
//!
//! ### なぜこのテストが必要か
//! - 古い接続の後始末が、同じユーザーの新しい接続を消してはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：通常の切断
//! - エッジケース：退去済みの接続、新しい接続に置き換えられた接続、登録解除の直後の再接続

use std::sync::Arc;

use crate::domain::{
    ConnectionId, Event, EventBody, MessagePusher, SharedGameState, Unregistration, UserId,
};

use super::error::DisconnectError;

/// プレイヤー切断のユースケース
pub struct DisconnectPlayerUseCase {
    game_state: SharedGameState,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectPlayerUseCase {
    pub fn new(game_state: SharedGameState, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            game_state,
            message_pusher,
        }
    }

    /// 切断処理を実行
    ///
    /// 新しい接続に置き換えられていた場合（`Superseded`）は何もしない。
    /// それ以外は参加ユーザー集合から外し、残りの接続に UserLeft を送る。
    /// 登録解除の後に同じユーザーが再接続していれば、その参加は取り消さない。
    pub async fn execute(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<Unregistration, DisconnectError> {
        let unregistration = self
            .message_pusher
            .unregister_client(user_id, connection_id)
            .await;

        if unregistration == Unregistration::Superseded {
            tracing::debug!(
                "Connection {} of user {} was superseded, keeping the user",
                connection_id,
                user_id
            );
            return Ok(unregistration);
        }

        if self.reconnected(user_id).await {
            return Ok(unregistration);
        }
        self.game_state.remove_current_user(user_id).await?;
        if self.reconnected(user_id).await {
            // 削除と再接続の参加が入れ違った
            self.game_state.add_current_user(user_id).await?;
            return Ok(unregistration);
        }

        let left = Event::new(user_id, EventBody::UserLeft { user_id });
        self.message_pusher.broadcast(&left).await?;

        tracing::info!("User {} left the game ({:?})", user_id, unregistration);
        Ok(unregistration)
    }

    async fn reconnected(&self, user_id: UserId) -> bool {
        let reconnected = self
            .message_pusher
            .connected_user_ids()
            .await
            .contains(&user_id);
        if reconnected {
            tracing::debug!("User {} reconnected while leaving, keeping the user", user_id);
        }
        reconnected
    }
}
