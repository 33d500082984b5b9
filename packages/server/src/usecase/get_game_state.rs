//! UseCase: ゲーム状態の取得（デバッグ用）

use std::sync::Arc;

use crate::domain::{ConnectionInfo, GameState, MessagePusher, SharedGameState, StoreError};

/// ゲーム状態と接続状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOverview {
    pub state: GameState,
    /// ハブに登録中の接続（参加ユーザー集合とずれていれば後始末漏れ）
    pub connections: Vec<ConnectionInfo>,
}

/// ゲーム状態取得のユースケース
pub struct GetGameStateUseCase {
    game_state: SharedGameState,
    message_pusher: Arc<dyn MessagePusher>,
}

impl GetGameStateUseCase {
    pub fn new(game_state: SharedGameState, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            game_state,
            message_pusher,
        }
    }

    pub async fn execute(&self) -> Result<GameOverview, StoreError> {
        let state = self.game_state.snapshot().await?;
        let connections = self.message_pusher.connections().await;
        Ok(GameOverview { state, connections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChallengeId, UserId},
        usecase::testing::Harness,
    };

    #[tokio::test]
    async fn test_overview_reflects_store_and_hub() {
        // テスト項目: ストアの状態とハブの接続ユーザーがまとめて取得できる
        // given (前提条件):
        let harness = Harness::new();
        harness.game_state.set_current_challenge_id(ChallengeId::new(2)).await.unwrap();
        harness.game_state.set_time(30).await.unwrap();
        harness.game_state.add_current_user(UserId::new(1)).await.unwrap();
        let (connection_id, _rx) = harness.listen(UserId::new(1)).await;
        let usecase = GetGameStateUseCase::new(harness.game_state.clone(), harness.hub.clone());

        // when (操作):
        let overview = usecase.execute().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            overview.state,
            GameState {
                current_challenge_id: Some(ChallengeId::new(2)),
                current_user_ids: vec![UserId::new(1)],
                total_time: 30,
                remaining_time: 30,
                is_break: false,
            }
        );
        assert_eq!(overview.connections.len(), 1);
        assert_eq!(overview.connections[0].user_id, UserId::new(1));
        assert_eq!(overview.connections[0].connection_id, connection_id);
        assert!(overview.connections[0].connected_at > 0);
    }
}
