use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{RecordStore, StoreError, path_segments};

/// 进程内的 JSON 树，用于开发环境和测试
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    pub fn new(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// 从 JSON 文件加载初始数据
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let root = serde_json::from_str(&raw)?;
        tracing::info!("Loaded memory store seed from {}", path.as_ref().display());
        Ok(Self::new(root))
    }

    /// 写入路径，中间节点不存在时自动创建
    pub fn set(&self, path: &str, value: Value) {
        let mut root = self.root.write().unwrap_or_else(|e| e.into_inner());
        let mut node = &mut *root;
        for segment in path_segments(path) {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = &mut node[segment];
        }
        *node = value;
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.root.read().unwrap_or_else(|e| e.into_inner());
        let mut node = &*root;
        for segment in path_segments(path) {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }

        if node.is_null() {
            Ok(None)
        } else {
            Ok(Some(node.clone()))
        }
    }
}
