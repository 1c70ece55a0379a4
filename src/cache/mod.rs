//! 进程内的短期结果缓存
//!
//! 缓存只是性能优化：并发写同一个键时以最后一次写入为准。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    created_at: DateTime<Utc>,
    data: T,
}

pub struct ResultCache<T> {
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// 读取未过期的缓存，同时清理所有过期条目
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.lock();
        self.sweep(&mut entries, now);
        entries.get(key).map(|entry| entry.data.clone())
    }

    /// 写入缓存，同时清理所有过期条目
    pub fn put(&self, key: impl Into<String>, data: T) {
        let now = self.clock.now();
        let mut entries = self.lock();
        self.sweep(&mut entries, now);
        entries.insert(
            key.into(),
            CacheEntry {
                created_at: now,
                data,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, entries: &mut HashMap<String, CacheEntry<T>>, now: DateTime<Utc>) {
        let before = entries.len();
        entries.retain(|_, entry| now - entry.created_at < self.ttl);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!("Purged {} expired cache entries", purged);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 手动推进的时钟
#[cfg(test)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc::now()),
        })
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::from_std(by).unwrap();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
