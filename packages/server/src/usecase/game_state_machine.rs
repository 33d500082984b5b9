//! UseCase: チャレンジと休憩を繰り返すゲーム進行
//!
//! 1 秒ごとの tick で共有ステートストアの残り時間を減らし、タイマーイベントを配信する。
//! 残り時間が 0 になったら TimerFinished を配信し、チャレンジと休憩を切り替える。
//! 切り替えに失敗した場合は、TimerFinished を繰り返さずに次の tick で切り替えだけをやり直す。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - GameStateMachine::tick() / bootstrap() / start()
//!
//! ### なぜこのテストが必要か
//! - TimerFinished は 1 回の満了につき 1 回だけ、残り時間は負にならない
//! - チャレンジと休憩は交互に切り替わる
//!
//! ### どのような状況を想定しているか
//! - 正常系：5 秒のカウントダウン、チャレンジ→休憩、休憩→チャレンジ
//! - 異常系：ストア障害、チャレンジ未登録（リトライ、切り替えの持ち越し）
//! - エッジケース：tick 中の panic

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::FutureExt;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::domain::{
    Challenge, ChallengeRepository, Countdown, Event, EventBody, MessagePusher,
    RepositoryError, SharedGameState,
};

use super::error::TickError;

/// ゲーム進行の設定
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// tick の周期
    pub tick_interval: Duration,
    /// 休憩の秒数
    pub break_seconds: u32,
    /// 起動直後の最初のカウントダウンの秒数
    pub bootstrap_seconds: u32,
    /// チャレンジがまだ 1 件もないときに取得をやり直す回数
    pub challenge_retry_limit: u32,
    /// やり直しの間隔
    pub challenge_retry_delay: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            break_seconds: 3,
            bootstrap_seconds: 5,
            challenge_retry_limit: 3,
            challenge_retry_delay: Duration::from_millis(100),
        }
    }
}

/// ゲーム進行のサービス
pub struct GameStateMachine {
    game_state: SharedGameState,
    challenge_repository: Arc<dyn ChallengeRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    config: GameConfig,
}

impl GameStateMachine {
    pub fn new(
        game_state: SharedGameState,
        challenge_repository: Arc<dyn ChallengeRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        config: GameConfig,
    ) -> Self {
        Self {
            game_state,
            challenge_repository,
            message_pusher,
            config,
        }
    }

    /// 最初のカウントダウンを設定する（休憩フラグは触らない）
    pub async fn bootstrap(&self) -> Result<(), TickError> {
        self.game_state
            .set_time(self.config.bootstrap_seconds)
            .await?;
        tracing::info!(
            "Game bootstrapped with a {}s countdown",
            self.config.bootstrap_seconds
        );
        Ok(())
    }

    /// 1 tick 分の処理
    ///
    /// エラーはこの tick だけを中断する。次の tick は独立して実行される。
    pub async fn tick(&self) -> Result<(), TickError> {
        match self.game_state.decrement_time_remaining().await? {
            Countdown::Running(remaining) => {
                let total = self.game_state.total_time().await?;
                self.broadcast(EventBody::TimerChanged { total, remaining })
                    .await?;
                return Ok(());
            }
            Countdown::Expired => self.broadcast(EventBody::TimerFinished).await?,
            // 前回の切り替えが失敗したまま
            Countdown::Overdue => tracing::debug!("Retrying the pending phase transition"),
        }

        if self.game_state.is_break().await? {
            self.start_challenge().await
        } else {
            self.start_break().await
        }
    }

    /// tick ループを開始する
    pub fn start(self: Arc<Self>) -> GameHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.config.tick_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        match AssertUnwindSafe(self.tick()).catch_unwind().await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => tracing::error!("Tick aborted: {}", e),
                            Err(_) => tracing::error!("Tick panicked, continuing with the next one"),
                        }
                    }
                }
            }

            tracing::info!("Game loop stopped");
        });

        tracing::info!("Game loop started ({:?} per tick)", period);
        GameHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn start_challenge(&self) -> Result<(), TickError> {
        let challenge = self.pick_challenge().await?;

        self.game_state
            .begin_challenge(challenge.id, challenge.seconds)
            .await?;

        tracing::info!(
            "Challenge {} started ({}s): {}",
            challenge.id,
            challenge.seconds,
            challenge.title
        );
        self.broadcast(EventBody::ChallengeSet {
            challenge: challenge.info(),
        })
        .await
    }

    async fn start_break(&self) -> Result<(), TickError> {
        self.game_state
            .begin_break(self.config.break_seconds)
            .await?;

        tracing::info!("Break started ({}s)", self.config.break_seconds);
        self.broadcast(EventBody::BreakStarted).await
    }

    /// ランダムにチャレンジを選ぶ（まだ 1 件もなければ間隔を空けてやり直す）
    async fn pick_challenge(&self) -> Result<Challenge, TickError> {
        let mut attempt = 0;
        loop {
            match self.challenge_repository.get_random_challenge().await {
                Ok(challenge) => return Ok(challenge),
                Err(RepositoryError::NotFound(what))
                    if attempt < self.config.challenge_retry_limit =>
                {
                    attempt += 1;
                    tracing::debug!(
                        "No {} available yet, retrying ({}/{})",
                        what,
                        attempt,
                        self.config.challenge_retry_limit
                    );
                    tokio::time::sleep(self.config.challenge_retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn broadcast(&self, body: EventBody) -> Result<(), TickError> {
        self.message_pusher
            .broadcast(&Event::from_server(body))
            .await?;
        Ok(())
    }
}

/// 実行中の tick ループ
pub struct GameHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl GameHandle {
    /// 停止を通知し、ループの終了を待つ
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Game loop terminated abnormally: {}", e);
        }
    }
}
