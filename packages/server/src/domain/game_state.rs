//! 共有ステートストア上のゲーム状態
//!
//! ゲーム状態はプロセスのメモリに複製せず、毎回 [`StateStore`] から読み書きする。
//! tick ループとリクエストハンドラが同じストアを見るため、状態が分岐しない。

use std::{str::FromStr, sync::Arc};

use serde::Serialize;

use super::{
    error::StoreError,
    state_store::StateStore,
    value_object::{ChallengeId, UserId},
};

const CURRENT_CHALLENGE_ID_KEY: &str = "current_challenge_id";
const CURRENT_USER_IDS_KEY: &str = "current_users";
const TIME_TOTAL_KEY: &str = "time_total";
const TIME_REMAINING_KEY: &str = "time_remaining";
const BREAK_KEY: &str = "break";

/// 残り時間を減らした結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// まだ残っている（減らした後の秒数）
    Running(u32),
    /// ちょうど今 0 になった（満了ごとに 1 回だけ）
    Expired,
    /// 満了後もフェーズが切り替わっていない
    Overdue,
}

/// ゲーム状態のスナップショット（読み取り専用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    pub current_challenge_id: Option<ChallengeId>,
    pub current_user_ids: Vec<UserId>,
    pub total_time: u32,
    pub remaining_time: u32,
    pub is_break: bool,
}

/// 共有ステートストアへの型付きアクセス
#[derive(Clone)]
pub struct SharedGameState {
    store: Arc<dyn StateStore>,
}

impl SharedGameState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn current_challenge_id(&self) -> Result<Option<ChallengeId>, StoreError> {
        let value = self.store.get(CURRENT_CHALLENGE_ID_KEY).await?;
        Ok(parse_optional::<i64>(CURRENT_CHALLENGE_ID_KEY, value)?.map(ChallengeId::new))
    }

    pub async fn set_current_challenge_id(&self, id: ChallengeId) -> Result<(), StoreError> {
        self.store
            .set(CURRENT_CHALLENGE_ID_KEY, id.value().to_string())
            .await
    }

    /// 現在の参加ユーザー ID（昇順）
    pub async fn current_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        let members = self.store.set_members(CURRENT_USER_IDS_KEY).await?;
        let mut ids = members
            .into_iter()
            .map(|member| parse::<i64>(CURRENT_USER_IDS_KEY, &member).map(UserId::new))
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort();
        Ok(ids)
    }

    pub async fn add_current_user(&self, id: UserId) -> Result<(), StoreError> {
        self.store
            .set_add(CURRENT_USER_IDS_KEY, id.value().to_string())
            .await
    }

    pub async fn remove_current_user(&self, id: UserId) -> Result<(), StoreError> {
        self.store
            .set_remove(CURRENT_USER_IDS_KEY, &id.value().to_string())
            .await
    }

    /// 残り時間（満了後の負の値は 0 として返す）
    pub async fn time_remaining(&self) -> Result<u32, StoreError> {
        let value = self.store.get(TIME_REMAINING_KEY).await?;
        let remaining = parse_optional::<i64>(TIME_REMAINING_KEY, value)?.unwrap_or(0);
        Ok(clamp_seconds(remaining))
    }

    pub async fn total_time(&self) -> Result<u32, StoreError> {
        let value = self.store.get(TIME_TOTAL_KEY).await?;
        Ok(parse_optional::<u32>(TIME_TOTAL_KEY, value)?.unwrap_or(0))
    }

    /// 残り時間を 1 往復で 1 秒減らす
    ///
    /// ストア上の値は 0 を下回っても減り続けるため、0 ちょうどになった呼び出しだけが
    /// `Countdown::Expired` を受け取る。
    pub async fn decrement_time_remaining(&self) -> Result<Countdown, StoreError> {
        let remaining = self.store.decrement(TIME_REMAINING_KEY).await?;
        Ok(match remaining {
            0 => Countdown::Expired,
            r if r < 0 => Countdown::Overdue,
            r => Countdown::Running(clamp_seconds(r)),
        })
    }

    /// 合計時間と残り時間を同じ値に設定
    pub async fn set_time(&self, seconds: u32) -> Result<(), StoreError> {
        self.store.set_many(time_entries(seconds)).await
    }

    /// チャレンジを開始する（休憩フラグ・チャレンジ ID・時間を 1 回の書き込みで設定）
    pub async fn begin_challenge(&self, id: ChallengeId, seconds: u32) -> Result<(), StoreError> {
        let mut entries = time_entries(seconds);
        entries.push((BREAK_KEY.to_string(), "0".to_string()));
        entries.push((CURRENT_CHALLENGE_ID_KEY.to_string(), id.value().to_string()));
        self.store.set_many(entries).await
    }

    /// 休憩を開始する（休憩フラグと時間を 1 回の書き込みで設定）
    pub async fn begin_break(&self, seconds: u32) -> Result<(), StoreError> {
        let mut entries = time_entries(seconds);
        entries.push((BREAK_KEY.to_string(), "1".to_string()));
        self.store.set_many(entries).await
    }

    /// 休憩中かどうか（未設定なら `false`）
    pub async fn is_break(&self) -> Result<bool, StoreError> {
        match self.store.get(BREAK_KEY).await? {
            None => Ok(false),
            Some(value) => match value.as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(StoreError::InvalidValue {
                    key: BREAK_KEY.to_string(),
                    value,
                }),
            },
        }
    }

    pub async fn set_break(&self, is_break: bool) -> Result<(), StoreError> {
        let value = if is_break { "1" } else { "0" };
        self.store.set(BREAK_KEY, value.to_string()).await
    }

    pub async fn snapshot(&self) -> Result<GameState, StoreError> {
        Ok(GameState {
            current_challenge_id: self.current_challenge_id().await?,
            current_user_ids: self.current_user_ids().await?,
            total_time: self.total_time().await?,
            remaining_time: self.time_remaining().await?,
            is_break: self.is_break().await?,
        })
    }
}

fn time_entries(seconds: u32) -> Vec<(String, String)> {
    vec![
        (TIME_TOTAL_KEY.to_string(), seconds.to_string()),
        (TIME_REMAINING_KEY.to_string(), seconds.to_string()),
    ]
}

fn clamp_seconds(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
    value.parse::<T>().map_err(|_| StoreError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_optional<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, StoreError> {
    value.map(|v| parse::<T>(key, &v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::state_store::MockStateStore, infrastructure::state_store::InMemoryStateStore};

    fn create_test_state() -> SharedGameState {
        SharedGameState::new(Arc::new(InMemoryStateStore::new()))
    }

    #[tokio::test]
    async fn test_empty_store_has_defaults() {
        // テスト項目: 未設定のストアでは既定値（休憩なし・残り 0・チャレンジなし）が返る
        // given (前提条件):
        let state = create_test_state();

        // when (操作):
        let snapshot = state.snapshot().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            snapshot,
            GameState {
                current_challenge_id: None,
                current_user_ids: vec![],
                total_time: 0,
                remaining_time: 0,
                is_break: false,
            }
        );
    }

    #[tokio::test]
    async fn test_set_time_sets_total_and_remaining() {
        // テスト項目: set_time で合計時間と残り時間が同じ値になる
        // given (前提条件):
        let state = create_test_state();

        // when (操作):
        state.set_time(30).await.unwrap();

        // then (期待する結果):
        assert_eq!(state.total_time().await.unwrap(), 30);
        assert_eq!(state.time_remaining().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_countdown_expires_exactly_once() {
        // テスト項目: 0 になった回だけが Expired で、その後は Overdue。読み出す残り時間は負にならない
        // given (前提条件):
        let state = create_test_state();
        state.set_time(2).await.unwrap();

        // when (操作):
        let mut results = Vec::new();
        for _ in 0..4 {
            results.push(state.decrement_time_remaining().await.unwrap());
        }

        // then (期待する結果):
        assert_eq!(
            results,
            vec![
                Countdown::Running(1),
                Countdown::Expired,
                Countdown::Overdue,
                Countdown::Overdue,
            ]
        );
        assert_eq!(state.time_remaining().await.unwrap(), 0);
        assert_eq!(state.snapshot().await.unwrap().remaining_time, 0);
    }

    #[tokio::test]
    async fn test_begin_challenge_and_break_set_phase() {
        // テスト項目: begin_challenge / begin_break で休憩フラグ・チャレンジ ID・時間がそろって切り替わる
        // given (前提条件):
        let state = create_test_state();
        state.set_time(1).await.unwrap();
        state.decrement_time_remaining().await.unwrap();
        state.decrement_time_remaining().await.unwrap();

        // when (操作):
        state.begin_challenge(ChallengeId::new(4), 90).await.unwrap();
        let challenge = state.snapshot().await.unwrap();
        state.begin_break(3).await.unwrap();
        let pause = state.snapshot().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            challenge,
            GameState {
                current_challenge_id: Some(ChallengeId::new(4)),
                current_user_ids: vec![],
                total_time: 90,
                remaining_time: 90,
                is_break: false,
            }
        );
        assert!(pause.is_break);
        assert_eq!(pause.current_challenge_id, Some(ChallengeId::new(4)));
        assert_eq!((pause.total_time, pause.remaining_time), (3, 3));
    }

    #[tokio::test]
    async fn test_begin_challenge_is_a_single_write() {
        // テスト項目: チャレンジ開始の書き込みは 1 回の set_many で、途中まで反映された状態を作らない
        // given (前提条件):
        let mut store = MockStateStore::new();
        store
            .expect_set_many()
            .times(1)
            .withf(|entries| {
                let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
                keys.contains(&BREAK_KEY)
                    && keys.contains(&CURRENT_CHALLENGE_ID_KEY)
                    && keys.contains(&TIME_TOTAL_KEY)
                    && keys.contains(&TIME_REMAINING_KEY)
            })
            .returning(|_| Err(StoreError::Connection("connection reset".to_string())));
        store.expect_set().never();
        let state = SharedGameState::new(Arc::new(store));

        // when (操作):
        let result = state.begin_challenge(ChallengeId::new(1), 60).await;

        // then (期待する結果):
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[tokio::test]
    async fn test_current_users_are_sorted_and_unique() {
        // テスト項目: 参加ユーザーが昇順かつ重複なしで返る
        // given (前提条件):
        let state = create_test_state();
        state.add_current_user(UserId::new(3)).await.unwrap();
        state.add_current_user(UserId::new(1)).await.unwrap();
        state.add_current_user(UserId::new(3)).await.unwrap();

        // when (操作):
        let ids = state.current_user_ids().await.unwrap();

        // then (期待する結果):
        assert_eq!(ids, vec![UserId::new(1), UserId::new(3)]);
    }

    #[tokio::test]
    async fn test_remove_current_user() {
        // テスト項目: 参加ユーザーを削除できる
        // given (前提条件):
        let state = create_test_state();
        state.add_current_user(UserId::new(1)).await.unwrap();
        state.add_current_user(UserId::new(2)).await.unwrap();

        // when (操作):
        state.remove_current_user(UserId::new(1)).await.unwrap();

        // then (期待する結果):
        assert_eq!(state.current_user_ids().await.unwrap(), vec![UserId::new(2)]);
    }

    #[tokio::test]
    async fn test_break_flag_round_trips() {
        // テスト項目: 休憩フラグを設定・取得できる
        // given (前提条件):
        let state = create_test_state();

        // when (操作):
        state.set_break(true).await.unwrap();
        let on = state.is_break().await.unwrap();
        state.set_break(false).await.unwrap();
        let off = state.is_break().await.unwrap();

        // then (期待する結果):
        assert!(on);
        assert!(!off);
    }

    #[tokio::test]
    async fn test_corrupted_value_is_reported() {
        // テスト項目: 数値として読めない値は InvalidValue エラーになる
        // given (前提条件):
        let mut store = MockStateStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some("not-a-number".to_string())));
        let state = SharedGameState::new(Arc::new(store));

        // when (操作):
        let result = state.time_remaining().await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(StoreError::InvalidValue {
                key: TIME_REMAINING_KEY.to_string(),
                value: "not-a-number".to_string(),
            })
        );
    }
}
