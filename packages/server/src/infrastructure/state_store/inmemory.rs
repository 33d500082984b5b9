//! InMemory StateStore 実装
//!
//! 1 つのロックでスカラー値と集合をまとめて保持し、各操作をアトミックにします。

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{StateStore, StoreError};

#[derive(Default)]
struct Entries {
    scalars: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// インメモリ共有ステートストア
#[derive(Default)]
pub struct InMemoryStateStore {
    entries: Mutex<Entries>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.scalars.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.scalars.insert(key.to_string(), value);
        Ok(())
    }

    async fn set_many(&self, values: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.scalars.extend(values);
        Ok(())
    }

    async fn decrement(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().await;
        let current = match entries.scalars.get(key) {
            Some(value) => value.parse::<i64>().map_err(|_| StoreError::InvalidValue {
                key: key.to_string(),
                value: value.clone(),
            })?,
            None => 0,
        };
        let next = current - 1;
        entries.scalars.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn set_add(&self, key: &str, member: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.sets.entry(key.to_string()).or_default().insert(member);
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(set) = entries.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
