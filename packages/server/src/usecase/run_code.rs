//! UseCase: コード実行リクエスト処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RunCodeUseCase::execute() メソッド
//! - 実行ジョブの組み立て（base64 デコード、期待出力の付与）と投入
//!
//! ### なぜこのテストが必要か
//! - 受け付けられなかったリクエストにも、送信元へ必ず失敗結果を返す必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：チャレンジ中の投入
//! - 異常系：休憩中、チャレンジ未設定、不正な base64、キュー満杯

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::domain::{
    ChallengeRepository, ConnectionId, Event, EventBody, ExecutionJob, ExecutionQueue,
    MessagePusher, SharedGameState, UserId,
};

use super::error::RunCodeError;

/// コード実行リクエストのユースケース
pub struct RunCodeUseCase {
    game_state: SharedGameState,
    challenge_repository: Arc<dyn ChallengeRepository>,
    queue: Arc<dyn ExecutionQueue>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RunCodeUseCase {
    pub fn new(
        game_state: SharedGameState,
        challenge_repository: Arc<dyn ChallengeRepository>,
        queue: Arc<dyn ExecutionQueue>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            game_state,
            challenge_repository,
            queue,
            message_pusher,
        }
    }

    /// コード実行を受け付ける
    ///
    /// # Arguments
    ///
    /// * `code` - base64 エンコードされたソースコード
    /// * `lang` - 言語タグ
    ///
    /// 受け付けた場合、結果はワーカーから `CodeRanResult` として届く。
    /// 受け付けなかった場合はここで `CodeRanResult{passed: false}` を送信元の接続へ返す。
    pub async fn execute(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        code: &str,
        lang: &str,
    ) -> Result<(), RunCodeError> {
        let result = match self.build_job(user_id, connection_id, code, lang).await {
            Ok(job) => self.queue.submit(job).await.map_err(RunCodeError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!("Rejected code submission from user {}: {}", user_id, e);
            let failure = Event::new(
                user_id,
                EventBody::CodeRanResult {
                    output: e.to_string(),
                    passed: false,
                },
            );
            if let Err(push_error) = self
                .message_pusher
                .push_to_connection(user_id, connection_id, &failure)
                .await
            {
                tracing::warn!(
                    "Failed to report rejection to user {}: {}",
                    user_id,
                    push_error
                );
            }
        }

        result
    }

    async fn build_job(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        code: &str,
        lang: &str,
    ) -> Result<ExecutionJob, RunCodeError> {
        if self.game_state.is_break().await? {
            return Err(RunCodeError::OnBreak);
        }
        let challenge_id = self
            .game_state
            .current_challenge_id()
            .await?
            .ok_or(RunCodeError::NoActiveChallenge)?;
        let challenge = self.challenge_repository.get_challenge(challenge_id).await?;

        let source = STANDARD
            .decode(code.trim())
            .map_err(|e| RunCodeError::InvalidSource(e.to_string()))?;

        Ok(ExecutionJob {
            user_id,
            connection_id,
            language: lang.to_string(),
            source,
            expected_output: challenge.expected_output,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::{
        domain::{SubmitError, entity::fixtures},
        usecase::testing::{Harness, drain, next_event},
    };

    /// 投入されたジョブを記録するだけのキュー
    #[derive(Default)]
    struct RecordingQueue {
        jobs: Mutex<Vec<ExecutionJob>>,
        reject_with: Option<SubmitError>,
    }

    #[async_trait]
    impl ExecutionQueue for RecordingQueue {
        async fn submit(&self, job: ExecutionJob) -> Result<(), SubmitError> {
            if let Some(error) = self.reject_with {
                return Err(error);
            }
            self.jobs.lock().await.push(job);
            Ok(())
        }
    }

    async fn setup_challenge(harness: &Harness) {
        let challenge = harness
            .challenges
            .save_challenge(fixtures::challenge(1, 60, "42"))
            .await
            .unwrap();
        harness.game_state.set_current_challenge_id(challenge.id).await.unwrap();
        harness.game_state.set_break(false).await.unwrap();
    }

    fn create_usecase(harness: &Harness, queue: Arc<RecordingQueue>) -> RunCodeUseCase {
        RunCodeUseCase::new(
            harness.game_state.clone(),
            harness.challenges.clone(),
            queue,
            harness.hub.clone(),
        )
    }

    #[tokio::test]
    async fn test_submission_is_queued_with_expected_output() {
        // テスト項目: チャレンジ中の投入はデコード済みソースと期待出力を持つジョブになる
        // given (前提条件):
        let harness = Harness::new();
        setup_challenge(&harness).await;
        let queue = Arc::new(RecordingQueue::default());
        let usecase = create_usecase(&harness, queue.clone());
        let alice = UserId::new(1);
        let (connection_id, mut rx) = harness.listen(alice).await;

        // when (操作):
        let code = STANDARD.encode("puts 42");
        let result = usecase.execute(alice, connection_id, &code, "ruby").await;

        // then (期待する結果):
        assert!(result.is_ok());
        let jobs = queue.jobs.lock().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].source, b"puts 42".to_vec());
        assert_eq!(jobs[0].expected_output, "42");
        assert_eq!(jobs[0].language, "ruby");
        assert_eq!(jobs[0].connection_id, connection_id);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_submission_during_break_fails() {
        // テスト項目: 休憩中の投入は受け付けず、送信元に passed=false が届く
        // given (前提条件):
        let harness = Harness::new();
        setup_challenge(&harness).await;
        harness.game_state.set_break(true).await.unwrap();
        let queue = Arc::new(RecordingQueue::default());
        let usecase = create_usecase(&harness, queue.clone());
        let alice = UserId::new(1);
        let (connection_id, mut rx) = harness.listen(alice).await;

        // when (操作):
        let code = STANDARD.encode("puts 42");
        let result = usecase.execute(alice, connection_id, &code, "ruby").await;

        // then (期待する結果):
        assert!(matches!(result, Err(RunCodeError::OnBreak)));
        assert!(queue.jobs.lock().await.is_empty());
        assert_eq!(
            next_event(&mut rx).await.body,
            EventBody::CodeRanResult {
                output: "no challenge is running during a break".to_string(),
                passed: false,
            }
        );
    }

    #[tokio::test]
    async fn test_submission_without_challenge_fails() {
        // テスト項目: チャレンジ未設定の投入は NoActiveChallenge
        // given (前提条件):
        let harness = Harness::new();
        let queue = Arc::new(RecordingQueue::default());
        let usecase = create_usecase(&harness, queue);
        let alice = UserId::new(1);
        let (connection_id, mut rx) = harness.listen(alice).await;

        // when (操作):
        let result = usecase.execute(alice, connection_id, "cHV0cyA0Mg==", "ruby").await;

        // then (期待する結果):
        assert!(matches!(result, Err(RunCodeError::NoActiveChallenge)));
        match next_event(&mut rx).await.body {
            EventBody::CodeRanResult { passed, .. } => assert!(!passed),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_base64_fails() {
        // テスト項目: base64 として不正なコードは InvalidSource
        // given (前提条件):
        let harness = Harness::new();
        setup_challenge(&harness).await;
        let queue = Arc::new(RecordingQueue::default());
        let usecase = create_usecase(&harness, queue.clone());
        let alice = UserId::new(1);
        let (connection_id, mut rx) = harness.listen(alice).await;

        // when (操作):
        let result = usecase.execute(alice, connection_id, "not base64!", "ruby").await;

        // then (期待する結果):
        assert!(matches!(result, Err(RunCodeError::InvalidSource(_))));
        assert!(queue.jobs.lock().await.is_empty());
        match next_event(&mut rx).await.body {
            EventBody::CodeRanResult { passed, .. } => assert!(!passed),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_queue_reports_failure() {
        // テスト項目: キューが満杯なら Rejected になり、送信元に失敗結果が届く
        // given (前提条件):
        let harness = Harness::new();
        setup_challenge(&harness).await;
        let queue = Arc::new(RecordingQueue {
            jobs: Mutex::new(Vec::new()),
            reject_with: Some(SubmitError::QueueFull),
        });
        let usecase = create_usecase(&harness, queue);
        let alice = UserId::new(1);
        let (connection_id, mut rx) = harness.listen(alice).await;

        // when (操作):
        let code = STANDARD.encode("puts 42");
        let result = usecase.execute(alice, connection_id, &code, "ruby").await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(RunCodeError::Rejected(SubmitError::QueueFull))
        ));
        assert_eq!(
            next_event(&mut rx).await.body,
            EventBody::CodeRanResult {
                output: "submission rejected: execution queue is full".to_string(),
                passed: false,
            }
        );
    }
}
