//! In-memory [`RoomStore`] implementation.
//!
//! Backs integration tests without a live store. TTLs are static
//! bookkeeping: `expire` records the requested lifetime and `ttl`
//! reports it unchanged, so tests assert on the values operations set
//! rather than on wall-clock decay. Published payloads are captured
//! for assertion instead of being delivered anywhere.

use async_trait::async_trait;
use room_service::errors::RoomError;
use room_service::store::{RoomStore, TTL_MISSING, TTL_NONE};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, Vec<String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
    /// key -> remaining lifetime in seconds, as last set by `expire`.
    ttls: HashMap<String, i64>,
    /// (channel, payload) in publish order.
    published: Vec<(String, String)>,
}

impl Inner {
    fn key_exists(&self, key: &str) -> bool {
        self.hashes.contains_key(key)
            || self.lists.contains_key(key)
            || self.zsets.contains_key(key)
    }

    fn remove_key(&mut self, key: &str) {
        self.hashes.remove(key);
        self.lists.remove(key);
        self.zsets.remove(key);
        self.ttls.remove(key);
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    inner: Mutex<Inner>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload published so far, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.lock().published.clone()
    }

    /// Event names published to a channel, in order, extracted from
    /// the JSON envelope.
    pub fn published_events(&self, channel: &str) -> Vec<String> {
        self.lock()
            .published
            .iter()
            .filter(|(c, _)| c == channel)
            .filter_map(|(_, payload)| {
                serde_json::from_str::<serde_json::Value>(payload)
                    .ok()?
                    .get("event")?
                    .as_str()
                    .map(str::to_string)
            })
            .collect()
    }

    /// Current list contents (empty if the key is absent).
    pub fn list(&self, key: &str) -> Vec<String> {
        self.lock().lists.get(key).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store lock poisoned")
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, RoomError> {
        Ok(self.lock().hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), RoomError> {
        let mut inner = self.lock();
        let hash = inner.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, RoomError> {
        Ok(self.lock().key_exists(key))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), RoomError> {
        let mut inner = self.lock();
        for key in keys {
            inner.remove_key(key);
        }
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<(), RoomError> {
        let mut inner = self.lock();
        if inner.key_exists(key) {
            inner.ttls.insert(key.to_string(), seconds);
        }
        Ok(())
    }

    async fn persist(&self, key: &str) -> Result<(), RoomError> {
        self.lock().ttls.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, RoomError> {
        let inner = self.lock();
        if !inner.key_exists(key) {
            return Ok(TTL_MISSING);
        }
        Ok(inner.ttls.get(key).copied().unwrap_or(TTL_NONE))
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), RoomError> {
        self.lock()
            .lists
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> Result<(), RoomError> {
        let mut inner = self.lock();
        if let Some(list) = inner.lists.get_mut(key) {
            let len = list.len() as isize;
            let resolve = |index: isize| -> isize {
                if index < 0 {
                    (len + index).max(0)
                } else {
                    index.min(len)
                }
            };
            let start = resolve(start) as usize;
            let stop = (resolve(stop) + 1).min(len) as usize;
            *list = if start < stop {
                list[start..stop].to_vec()
            } else {
                Vec::new()
            };
        }
        Ok(())
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, RoomError> {
        let inner = self.lock();
        let Some(list) = inner.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as isize;
        let resolve = |index: isize| -> isize {
            if index < 0 {
                (len + index).max(0)
            } else {
                index.min(len)
            }
        };
        let start = resolve(start) as usize;
        let stop = (resolve(stop) + 1).min(len) as usize;
        if start < stop {
            Ok(list[start..stop].to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), RoomError> {
        self.lock()
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), RoomError> {
        let mut inner = self.lock();
        if let Some(zset) = inner.zsets.get_mut(key) {
            zset.remove(member);
            if zset.is_empty() {
                inner.zsets.remove(key);
                inner.ttls.remove(key);
            }
        }
        Ok(())
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, RoomError> {
        Ok(self
            .lock()
            .zsets
            .get(key)
            .and_then(|zset| zset.get(member))
            .copied())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), RoomError> {
        self.lock()
            .published
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}
