//! 层级键值数据库的只读访问
//!
//! 数据库按路径组织（例如 `locations/<owner_id>`），这里只需要整棵子树的快照读取。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{Config, StoreBackend};

mod memory;
mod redis;
mod rest;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use rest::RestStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 读取路径下的整棵子树，路径不存在时返回 `None`
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;
}

/// 根据配置创建数据库连接
pub async fn from_config(config: &Config) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match config.store_backend {
        StoreBackend::Memory => match &config.store_seed_file {
            Some(path) => Arc::new(MemoryStore::from_file(path).await?),
            None => {
                tracing::warn!("No STORE_SEED_FILE given, memory store starts empty");
                Arc::new(MemoryStore::default())
            }
        },
        StoreBackend::Rest => {
            let url = config
                .store_url
                .clone()
                .ok_or_else(|| StoreError::Unavailable("STORE_URL is not set".into()))?;
            Arc::new(RestStore::new(url, config.store_auth.clone()))
        }
        StoreBackend::Redis => {
            let url = config
                .store_url
                .as_ref()
                .or(config.redis_url.as_ref())
                .ok_or_else(|| StoreError::Unavailable("STORE_URL is not set".into()))?;
            let client = ::redis::Client::open(url.as_str())?;
            Arc::new(RedisStore::new(Arc::new(client), config.store_key_prefix.clone()))
        }
    };

    tracing::info!("Using {:?} record store", config.store_backend);
    Ok(store)
}

/// 拆分路径，忽略首尾和重复的 `/`
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
