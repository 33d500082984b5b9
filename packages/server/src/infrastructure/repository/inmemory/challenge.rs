//! InMemory Challenge Repository 実装
//!
//! ドメイン層が定義する ChallengeRepository trait の具体的な実装。
//! BTreeMap をインメモリ DB として使用します。

use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use tokio::sync::Mutex;

use crate::domain::{Challenge, ChallengeId, ChallengeRepository, RepositoryError};
use dojo_shared::time::now_utc;

#[derive(Default)]
struct Table {
    rows: BTreeMap<ChallengeId, Challenge>,
    last_id: i64,
}

/// インメモリ Challenge Repository 実装
#[derive(Default)]
pub struct InMemoryChallengeRepository {
    table: Mutex<Table>,
}

impl InMemoryChallengeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryChallengeRepository {
    async fn get_challenge(&self, id: ChallengeId) -> Result<Challenge, RepositoryError> {
        let table = self.table.lock().await;
        table
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("challenge {}", id)))
    }

    async fn get_random_challenge(&self) -> Result<Challenge, RepositoryError> {
        let table = self.table.lock().await;
        table
            .rows
            .values()
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound("challenge".to_string()))
    }

    async fn save_challenge(&self, mut challenge: Challenge) -> Result<Challenge, RepositoryError> {
        let mut table = self.table.lock().await;
        let now = now_utc();

        // ID 0 は未保存のレコード
        if challenge.id.value() == 0 {
            table.last_id += 1;
            challenge.id = ChallengeId::new(table.last_id);
            challenge.created = now;
        } else {
            table.last_id = table.last_id.max(challenge.id.value());
            if let Some(existing) = table.rows.get(&challenge.id) {
                challenge.created = existing.created;
            } else {
                challenge.created = now;
            }
        }
        challenge.updated = now;

        table.rows.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }
}
