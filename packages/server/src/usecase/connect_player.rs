//! UseCase: プレイヤー接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectPlayerUseCase::execute() と announce()
//! - 重複接続の拒否、InitialState の内容、UserJoined の配信先
//!
//! ### なぜこのテストが必要か
//! - 1 ユーザー 1 接続の不変条件はここで守られる
//! - 後から参加したクライアントは InitialState だけで画面を組み立てるため、内容が正しい必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の参加者、2 人目の参加者
//! - 異常系：同じユーザーの二重接続
//! - エッジケース：チャレンジ未設定、参照先のチャレンジが消えている、登録から参加通知までの間のブロードキャスト

use std::sync::Arc;

use crate::domain::{
    ChallengeId, ChallengeInfo, ChallengeRepository, ConnectionId, Event, EventBody,
    MessagePushError, MessagePusher, PusherChannel, RepositoryError, SharedGameState, User,
    UserId, UserRepository,
};

use super::error::ConnectError;

/// プレイヤー接続のユースケース
pub struct ConnectPlayerUseCase {
    game_state: SharedGameState,
    challenge_repository: Arc<dyn ChallengeRepository>,
    user_repository: Arc<dyn UserRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectPlayerUseCase {
    pub fn new(
        game_state: SharedGameState,
        challenge_repository: Arc<dyn ChallengeRepository>,
        user_repository: Arc<dyn UserRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            game_state,
            challenge_repository,
            user_repository,
            message_pusher,
        }
    }

    /// 接続をハブに予約登録する
    ///
    /// `announce` が InitialState を送るまで、この接続宛てのイベントはハブで保留される。
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 登録成功
    /// * `Err(ConnectError::AlreadyConnected)` - 同じユーザーが接続中（既存の接続はそのまま）
    pub async fn execute(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), ConnectError> {
        match self
            .message_pusher
            .reserve_client(user_id, connection_id, sender)
            .await
        {
            Ok(()) => Ok(()),
            Err(MessagePushError::Conflict(user_id)) => {
                Err(ConnectError::AlreadyConnected(user_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 参加を知らせる
    ///
    /// 1. 参加ユーザー集合に追加
    /// 2. 新しい接続に InitialState を送信し、保留中のイベントを続けて流す
    /// 3. 全接続（本人を含む）に UserJoined をブロードキャスト
    pub async fn announce(
        &self,
        user: &User,
        connection_id: ConnectionId,
    ) -> Result<(), ConnectError> {
        self.game_state.add_current_user(user.id).await?;

        let initial_state = Event::from_server(self.build_initial_state().await?);
        self.message_pusher
            .activate_client(user.id, connection_id, &initial_state)
            .await?;

        let joined = Event::new(
            user.id,
            EventBody::UserJoined {
                user: user.player(),
            },
        );
        self.message_pusher.broadcast(&joined).await?;

        tracing::info!("User {} ({}) joined the game", user.id, user.username);
        Ok(())
    }

    async fn build_initial_state(&self) -> Result<EventBody, ConnectError> {
        let state = self.game_state.snapshot().await?;

        let challenge = match state.current_challenge_id {
            Some(id) => self.current_challenge(id).await?,
            None => None,
        };

        let mut users = Vec::with_capacity(state.current_user_ids.len());
        for user_id in state.current_user_ids {
            match self.user_repository.get_user(user_id).await {
                Ok(user) => users.push(user.player()),
                Err(RepositoryError::NotFound(_)) => {
                    tracing::warn!("Current user {} no longer exists, skipping", user_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(EventBody::InitialState {
            challenge,
            users,
            remaining: state.remaining_time,
            total: state.total_time,
        })
    }

    async fn current_challenge(
        &self,
        id: ChallengeId,
    ) -> Result<Option<ChallengeInfo>, ConnectError> {
        match self.challenge_repository.get_challenge(id).await {
            Ok(challenge) => Ok(Some(challenge.info())),
            Err(RepositoryError::NotFound(_)) => {
                tracing::warn!("Current challenge {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{EventKind, Player, entity::fixtures},
        usecase::testing::{Harness, drain, next_event},
    };

    fn player_ids(players: &[Player]) -> Vec<UserId> {
        players.iter().map(|player| player.id).collect()
    }

    fn create_usecase(harness: &Harness) -> ConnectPlayerUseCase {
        ConnectPlayerUseCase::new(
            harness.game_state.clone(),
            harness.challenges.clone(),
            harness.users.clone(),
            harness.hub.clone(),
        )
    }

    async fn join(
        harness: &Harness,
        usecase: &ConnectPlayerUseCase,
        user: &User,
    ) -> tokio::sync::mpsc::Receiver<String> {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        usecase.execute(user.id, connection_id, tx).await.unwrap();
        usecase.announce(user, connection_id).await.unwrap();
        assert!(harness.hub.connection_count().await > 0);
        rx
    }

    #[tokio::test]
    async fn test_first_player_sees_only_themself() {
        // テスト項目: 最初の参加者の InitialState には自分だけが含まれ、続いて自分の UserJoined が届く
        // given (前提条件):
        let harness = Harness::new();
        let usecase = create_usecase(&harness);
        let alice = harness.users.save_user(fixtures::user(1, "alice")).await.unwrap();

        // when (操作):
        let mut rx = join(&harness, &usecase, &alice).await;

        // then (期待する結果):
        let initial = next_event(&mut rx).await;
        assert_eq!(initial.origin, UserId::SERVER);
        match initial.body {
            EventBody::InitialState { challenge, users, .. } => {
                assert!(challenge.is_none());
                assert_eq!(player_ids(&users), vec![alice.id]);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let joined = next_event(&mut rx).await;
        assert_eq!(joined.origin, alice.id);
        assert_eq!(joined.body, EventBody::UserJoined { user: alice.player() });
    }

    #[tokio::test]
    async fn test_second_player_is_announced_to_everyone() {
        // テスト項目: 2 人目の参加で、既存の参加者と本人の両方に UserJoined が届く
        // given (前提条件):
        let harness = Harness::new();
        let usecase = create_usecase(&harness);
        let alice = harness.users.save_user(fixtures::user(1, "alice")).await.unwrap();
        let bob = harness.users.save_user(fixtures::user(2, "bob")).await.unwrap();
        let mut alice_rx = join(&harness, &usecase, &alice).await;
        drain(&mut alice_rx);

        // when (操作):
        let mut bob_rx = join(&harness, &usecase, &bob).await;

        // then (期待する結果):
        let joined = next_event(&mut alice_rx).await;
        assert_eq!(joined.body, EventBody::UserJoined { user: bob.player() });

        match next_event(&mut bob_rx).await.body {
            EventBody::InitialState { users, .. } => {
                assert_eq!(player_ids(&users), vec![alice.id, bob.id]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        let joined = next_event(&mut bob_rx).await;
        assert_eq!(joined.body, EventBody::UserJoined { user: bob.player() });
    }

    #[tokio::test]
    async fn test_duplicate_connection_is_rejected() {
        // テスト項目: 接続中のユーザーが再接続すると AlreadyConnected になり、既存の接続は生きたまま
        // given (前提条件):
        let harness = Harness::new();
        let usecase = create_usecase(&harness);
        let alice = harness.users.save_user(fixtures::user(1, "alice")).await.unwrap();
        let mut alice_rx = join(&harness, &usecase, &alice).await;
        drain(&mut alice_rx);

        // when (操作):
        let (tx, _rx) = tokio::sync::mpsc::channel(64);
        let result = usecase.execute(alice.id, ConnectionId::generate(), tx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::AlreadyConnected(id)) if id == alice.id));
        assert_eq!(harness.hub.connection_count().await, 1);
        harness
            .hub
            .push_to(alice.id, &Event::from_server(EventBody::BreakStarted))
            .await
            .unwrap();
        assert_eq!(next_event(&mut alice_rx).await.body, EventBody::BreakStarted);
    }

    #[tokio::test]
    async fn test_initial_state_carries_current_challenge_and_timer() {
        // テスト項目: 進行中のチャレンジと残り時間が InitialState に含まれ、期待出力は含まれない
        // given (前提条件):
        let harness = Harness::new();
        let usecase = create_usecase(&harness);
        let challenge = harness
            .challenges
            .save_challenge(fixtures::challenge(7, 60, "42"))
            .await
            .unwrap();
        harness.game_state.set_current_challenge_id(challenge.id).await.unwrap();
        harness.game_state.set_time(60).await.unwrap();
        harness.game_state.decrement_time_remaining().await.unwrap();
        let alice = harness.users.save_user(fixtures::user(1, "alice")).await.unwrap();

        // when (操作):
        let mut rx = join(&harness, &usecase, &alice).await;

        // then (期待する結果):
        assert_eq!(
            next_event(&mut rx).await.body,
            EventBody::InitialState {
                challenge: Some(challenge.info()),
                users: vec![alice.player()],
                remaining: 59,
                total: 60,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_current_challenge_is_omitted() {
        // テスト項目: 参照先のチャレンジが存在しなければ challenge なしで InitialState を送る
        // given (前提条件):
        let harness = Harness::new();
        let usecase = create_usecase(&harness);
        harness
            .game_state
            .set_current_challenge_id(ChallengeId::new(99))
            .await
            .unwrap();
        let alice = harness.users.save_user(fixtures::user(1, "alice")).await.unwrap();

        // when (操作):
        let mut rx = join(&harness, &usecase, &alice).await;

        // then (期待する結果):
        match next_event(&mut rx).await.body {
            EventBody::InitialState { challenge, .. } => assert!(challenge.is_none()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_before_announce_arrives_after_initial_state() {
        // テスト項目: 登録から参加通知までの間のブロードキャストは InitialState より先に届かない
        // given (前提条件):
        let harness = Harness::new();
        let usecase = create_usecase(&harness);
        let alice = harness.users.save_user(fixtures::user(1, "alice")).await.unwrap();
        let connection_id = ConnectionId::generate();
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        usecase.execute(alice.id, connection_id, tx).await.unwrap();

        // when (操作):
        harness
            .hub
            .broadcast(&Event::from_server(EventBody::BreakStarted))
            .await
            .unwrap();
        usecase.announce(&alice, connection_id).await.unwrap();

        // then (期待する結果):
        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::InitialState,
                EventKind::BreakStarted,
                EventKind::UserJoined,
            ]
        );
    }
}
