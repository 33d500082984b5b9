//! 共有ステートストアの実装
//!
//! - `inmemory`: プロセス内の実装（単一インスタンス運用・テスト用）

pub mod inmemory;

pub use inmemory::InMemoryStateStore;
