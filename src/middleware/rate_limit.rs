use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{config::Config, error::AppError};

const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 基于 redis 计数器的固定窗口限流
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    window_secs: u64,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: &Config) -> Self {
        Self {
            redis,
            window_secs: config.rate_limit_window().as_secs(),
            max_requests: config.rate_limit_requests,
        }
    }

    /// 窗口内计数加一，返回当前计数
    async fn hit(&self, ip: &str) -> redis::RedisResult<u32> {
        let key = format!("{}{}", RATE_LIMIT_PREFIX, ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            // 第一次请求时设置过期时间
            let _: () = conn.expire(&key, self.window_secs as i64).await?;
        }

        Ok(count)
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let remote = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let ip = client_ip(req.headers(), remote);

        match self.hit(&ip).await {
            Ok(count) if count > self.max_requests => {
                tracing::info!("Rate limited {} ({} requests)", ip, count);
                AppError::RateLimited(self.window_secs).into_response()
            }
            Ok(_) => next.run(req).await,
            Err(e) => {
                // redis 不可用时放行
                tracing::warn!("Rate limiter unavailable: {}", e);
                next.run(req).await
            }
        }
    }
}

/// 依次使用 x-real-ip、x-forwarded-for 和连接地址
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_string)
        })
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
