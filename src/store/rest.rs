use async_trait::async_trait;
use serde_json::Value;

use super::{RecordStore, StoreError, path_segments};

/// 通过 REST 接口访问的层级数据库（`GET {base}/{path}.json`）
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub(crate) fn document_url(&self, path: &str) -> String {
        let path = path_segments(path).collect::<Vec<_>>().join("/");
        format!("{}/{}.json", self.base_url, path)
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let mut request = self.client.get(self.document_url(path));
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth)]);
        }

        let value: Value = request.send().await?.error_for_status()?.json().await?;
        tracing::debug!("Read {} from rest store", path);

        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }
}
