//! 共有ステートストア trait 定義
//!
//! ゲーム状態はプロセス外のアトミックなキー・バリュー／集合ストアにのみ置く。
//! 各操作は単体でアトミック。

use async_trait::async_trait;

use super::error::StoreError;

/// 共有ステートストア
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// スカラー値を取得（未設定なら `None`）
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// スカラー値を設定
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// 複数のスカラー値をまとめて設定（全部反映されるか、どれも反映されないか）
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError>;

    /// 整数値を 1 減らし、減らした後の値を返す
    ///
    /// 1 往復で減算と読み出しを行う。0 を下回っても止めない。未設定の場合は 0 として扱う。
    async fn decrement(&self, key: &str) -> Result<i64, StoreError>;

    /// 集合に要素を追加
    async fn set_add(&self, key: &str, member: String) -> Result<(), StoreError>;

    /// 集合から要素を削除
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// 集合の全要素を取得
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;
}
