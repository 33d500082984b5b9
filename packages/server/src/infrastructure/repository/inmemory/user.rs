//! InMemory User Repository 実装

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, User, UserId, UserRepository};
use dojo_shared::time::now_utc;

#[derive(Default)]
struct Table {
    rows: BTreeMap<UserId, User>,
    last_id: i64,
}

/// インメモリ User Repository 実装
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: Mutex<Table>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let table = self.table.lock().await;
        table
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }

    async fn get_user_by_access_token(&self, token: &str) -> Result<User, RepositoryError> {
        let table = self.table.lock().await;
        table
            .rows
            .values()
            .find(|user| !user.access_token.is_empty() && user.access_token == token)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound("user for access token".to_string()))
    }

    async fn save_user(&self, mut user: User) -> Result<User, RepositoryError> {
        let mut table = self.table.lock().await;
        let now = now_utc();

        // ID 0 は未保存のレコード
        if user.id.value() == 0 {
            table.last_id += 1;
            user.id = UserId::new(table.last_id);
            user.created = now;
        } else {
            table.last_id = table.last_id.max(user.id.value());
            user.created = table.rows.get(&user.id).map_or(now, |existing| existing.created);
        }
        user.updated = now;

        table.rows.insert(user.id, user.clone());
        Ok(user)
    }
}
