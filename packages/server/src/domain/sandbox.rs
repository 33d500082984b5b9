//! Sandbox trait 定義
//!
//! 信頼できないコードを隔離環境で実行する能力のインターフェース。
//! コンテナ・microVM・制限付きサブプロセスなど、隔離の実装はワーカープールに影響せず差し替えられる。

use std::time::Duration;

use async_trait::async_trait;

use super::{
    error::{ExecutionError, SubmitError},
    value_object::{ConnectionId, UserId},
};

/// 言語タグから解決したサンドボックスの実行環境
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxImage {
    /// コンテナイメージ名
    pub image: String,
    /// ソースファイルを受け取るインタプリタのコマンド
    pub command: Vec<String>,
    /// スクラッチ領域に書き出すソースファイル名
    pub file_name: String,
}

/// 実行で得られた出力（stdout の後に stderr を連結したもの）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub output: String,
}

/// 実行ジョブ（RunCodeRequest ごとに作られ、結果の配送後に破棄される）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionJob {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub language: String,
    /// base64 デコード済みのソースコード
    pub source: Vec<u8>,
    pub expected_output: String,
}

/// 採点結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub passed: bool,
}

impl ExecutionResult {
    /// 出力の前後の空白を除いて期待出力とバイト単位で比較する
    pub fn judge(output: String, expected_output: &str) -> Self {
        let passed = output.trim() == expected_output;
        Self { output, passed }
    }

    /// 失敗結果（実行できなかった場合も必ず呼び出し元へ返す）
    pub fn failure(error: &ExecutionError) -> Self {
        Self {
            output: error.to_string(),
            passed: false,
        }
    }
}

/// サンドボックスの能力
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// 言語タグを実行環境に解決する
    fn resolve_image(&self, language: &str) -> Result<SandboxImage, ExecutionError>;

    /// ソースを新しい隔離環境で実行し、stdout と stderr を連結した出力を返す
    ///
    /// `timeout` を超えたら環境を強制終了して `ExecutionError::Timeout` を返す。
    /// スクラッチ領域とコンテナはどの経路でも後始末する。
    async fn run(
        &self,
        image: &SandboxImage,
        source: &[u8],
        timeout: Duration,
    ) -> Result<ExecutionOutput, ExecutionError>;
}

/// 実行ジョブの投入先
///
/// 投入はブロックしない。キューが満杯なら `SubmitError::QueueFull`。
#[async_trait]
pub trait ExecutionQueue: Send + Sync {
    async fn submit(&self, job: ExecutionJob) -> Result<(), SubmitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_passes_on_trimmed_match() {
        // テスト項目: 前後の空白を除いた出力が期待出力と一致すれば合格
        // given (前提条件):
        let output = "42\n".to_string();

        // when (操作):
        let result = ExecutionResult::judge(output, "42");

        // then (期待する結果):
        assert!(result.passed);
        assert_eq!(result.output, "42\n");
    }

    #[test]
    fn test_judge_fails_on_deviation() {
        // テスト項目: 出力が少しでも異なれば不合格
        // given (前提条件):
        let output = "42.0".to_string();

        // when (操作):
        let result = ExecutionResult::judge(output, "42");

        // then (期待する結果):
        assert!(!result.passed);
    }

    #[test]
    fn test_judge_is_case_sensitive() {
        // テスト項目: 大文字小文字の違いも不合格になる
        // given (前提条件):
        let output = "Hello".to_string();

        // when (操作):
        let result = ExecutionResult::judge(output, "hello");

        // then (期待する結果):
        assert!(!result.passed);
    }

    #[test]
    fn test_failure_is_not_passed() {
        // テスト項目: 失敗結果は不合格でエラー内容を出力に持つ
        // given (前提条件):
        let error = ExecutionError::UnsupportedLanguage("cobol".to_string());

        // when (操作):
        let result = ExecutionResult::failure(&error);

        // then (期待する結果):
        assert!(!result.passed);
        assert_eq!(result.output, "unsupported language 'cobol'");
    }
}
