//! Server-side web sessions.
//!
//! The browser only holds a random key (see [`crate::constants::SESSION_COOKIE_NAME`]);
//! the [`SessionData`] lives in Redis, or in process memory when no Redis URL
//! is configured.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{constants::SESSION_KEY_PREFIX, error::ServerError, impl_redis_rv, utils::RKeys};

/// What a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// The logged in user, if any
    pub user_id: Option<i32>,
    /// Messages shown once on the next rendered page
    pub flashes: Vec<String>,
}

impl_redis_rv!(SessionData);

/// Most sessions kept by a memory store before older ones are evicted.
pub const MEMORY_SESSION_CAPACITY: usize = 10_000;

pub type MemorySessions = Arc<Mutex<HashMap<String, (SessionData, Instant)>>>;

#[derive(Clone)]
pub enum SessionStore {
    Redis(ConnectionManager),
    Memory {
        sessions: MemorySessions,
        capacity: usize,
    },
}

impl SessionStore {
    /// Connect to Redis, or fall back to memory when `redis_url` is `None`.
    pub async fn connect(redis_url: Option<&str>) -> Result<Self, ServerError> {
        match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = client.get_connection_manager().await?;
                tracing::info!("keeping sessions in redis");
                Ok(SessionStore::Redis(manager))
            }
            None => {
                tracing::warn!("REDIS_URL is not set, keeping sessions in memory");
                Ok(Self::memory())
            }
        }
    }

    pub fn memory() -> Self {
        Self::memory_with_capacity(MEMORY_SESSION_CAPACITY)
    }

    pub fn memory_with_capacity(capacity: usize) -> Self {
        SessionStore::Memory {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Store `data` under a fresh random key and return the key for the cookie.
    pub async fn create(&self, data: &SessionData, ttl_secs: u64) -> Result<String, ServerError> {
        let RKeys {
            base_key,
            prefixed_key,
        } = RKeys::generate(SESSION_KEY_PREFIX);
        self.put(prefixed_key, data, ttl_secs).await?;
        Ok(base_key)
    }

    pub async fn load(&self, key: &str) -> Result<Option<SessionData>, ServerError> {
        let prefixed_key = format!("{}{}", SESSION_KEY_PREFIX, key);
        match self {
            SessionStore::Redis(manager) => Ok(manager.clone().get(&prefixed_key).await?),
            SessionStore::Memory { sessions, .. } => {
                let mut map = sessions.lock().await;
                match map.get(&prefixed_key) {
                    Some((data, expires)) if *expires > Instant::now() => Ok(Some(data.clone())),
                    Some(_) => {
                        map.remove(&prefixed_key);
                        Ok(None)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Store `data` under `key` for `ttl_secs` seconds.
    pub async fn save(&self, key: &str, data: &SessionData, ttl_secs: u64) -> Result<(), ServerError> {
        self.put(format!("{}{}", SESSION_KEY_PREFIX, key), data, ttl_secs)
            .await
    }

    async fn put(&self, prefixed_key: String, data: &SessionData, ttl_secs: u64) -> Result<(), ServerError> {
        match self {
            SessionStore::Redis(manager) => {
                manager
                    .clone()
                    .set_ex::<_, _, ()>(&prefixed_key, data, ttl_secs)
                    .await?;
            }
            SessionStore::Memory { sessions, capacity } => {
                let now = Instant::now();
                let mut map = sessions.lock().await;
                if !map.contains_key(&prefixed_key) && map.len() >= *capacity {
                    map.retain(|_, (_, expires)| *expires > now);
                    if map.len() >= *capacity {
                        let soonest = map
                            .iter()
                            .min_by_key(|(_, (_, expires))| *expires)
                            .map(|(key, _)| key.clone());
                        if let Some(key) = soonest {
                            tracing::debug!("session store full, evicting a session");
                            map.remove(&key);
                        }
                    }
                }
                map.insert(prefixed_key, (data.clone(), now + Duration::from_secs(ttl_secs)));
            }
        }
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), ServerError> {
        let prefixed_key = format!("{}{}", SESSION_KEY_PREFIX, key);
        match self {
            SessionStore::Redis(manager) => {
                manager.clone().del::<_, ()>(&prefixed_key).await?;
            }
            SessionStore::Memory { sessions, .. } => {
                sessions.lock().await.remove(&prefixed_key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = SessionStore::memory();
        assert_eq!(store.load("abc").await.unwrap(), None);

        let data = SessionData {
            user_id: Some(3),
            flashes: vec!["hello".to_owned()],
        };
        store.save("abc", &data, 60).await.unwrap();
        assert_eq!(store.load("abc").await.unwrap(), Some(data));

        store.remove("abc").await.unwrap();
        assert_eq!(store.load("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_session() {
        let store = SessionStore::memory();
        let data = SessionData {
            user_id: Some(1),
            flashes: vec![],
        };
        let key = store.create(&data, 60).await.unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(store.load(&key).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = SessionStore::memory();
        store.save("abc", &SessionData::default(), 0).await.unwrap();
        assert_eq!(store.load("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_drops_expired_sessions_when_full() {
        let store = SessionStore::memory_with_capacity(3);
        for key in ["a", "b", "c"] {
            store.save(key, &SessionData::default(), 0).await.unwrap();
        }
        store.save("d", &SessionData::default(), 60).await.unwrap();

        let SessionStore::Memory { sessions, .. } = &store else {
            unreachable!()
        };
        assert_eq!(sessions.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_is_bounded() {
        let store = SessionStore::memory_with_capacity(3);
        for (key, ttl) in [("a", 60), ("b", 10), ("c", 120)] {
            store.save(key, &SessionData::default(), ttl).await.unwrap();
        }
        for i in 0..50 {
            let data = SessionData {
                user_id: Some(i),
                flashes: vec![],
            };
            store.create(&data, 600).await.unwrap();
        }

        let SessionStore::Memory { sessions, .. } = &store else {
            unreachable!()
        };
        assert_eq!(sessions.lock().await.len(), 3);
        assert_eq!(store.load("b").await.unwrap(), None);

        store.save("c", &SessionData::default(), 600).await.unwrap();
        assert_eq!(sessions.lock().await.len(), 3);
    }

    #[test]
    fn test_session_data_redis_value() {
        use redis::{FromRedisValue, ToRedisArgs};

        let data = SessionData {
            user_id: Some(9),
            flashes: vec![],
        };
        let args = data.to_redis_args();
        let value = redis::Value::Data(args[0].clone());
        assert_eq!(SessionData::from_redis_value(&value).unwrap(), data);
    }
}
