use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use serde_json::Value;

use super::{RecordStore, StoreError, path_segments};

/// 每个顶层路径作为一个 JSON 文档存在 redis 中
#[derive(Clone)]
pub struct RedisStore {
    redis: Arc<RedisClient>,
    key_prefix: String,
}

impl RedisStore {
    pub fn new(redis: Arc<RedisClient>, key_prefix: impl Into<String>) -> Self {
        Self {
            redis,
            key_prefix: key_prefix.into(),
        }
    }

    pub(crate) fn document_key(&self, path: &str) -> String {
        let path = path_segments(path).collect::<Vec<_>>().join(":");
        format!("{}{}", self.key_prefix, path)
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let key = self.document_key(path);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(&key).await?;

        match raw {
            Some(json_str) => {
                tracing::debug!("Read {} from redis store", key);
                Ok(Some(serde_json::from_str(&json_str)?))
            }
            None => Ok(None),
        }
    }
}
