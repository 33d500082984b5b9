//! Repository の実装
//!
//! - `inmemory`: HashMap / BTreeMap をインメモリ DB として使う実装
//! - `seed`: JSON シードファイルの読み込み

pub mod inmemory;
pub mod seed;

pub use inmemory::{InMemoryChallengeRepository, InMemoryUserRepository};
pub use seed::{SeedData, SeedError, load_seed_file};
