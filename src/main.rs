use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use petmatch::{
    AppState, app,
    config::Config,
    middleware::{RateLimiter, rate_limit},
    store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    let record_store = store::from_config(&config)
        .await
        .expect("Failed to set up record store");

    let state = AppState::new(config.clone(), record_store);
    let router = app(state);

    // 配置了 redis 时启用限流
    let router = match (&config.redis_url, config.rate_limit_enabled()) {
        (Some(redis_url), true) => {
            let client = redis::Client::open(redis_url.as_str())
                .expect("Failed to create Redis client");
            let limiter = Arc::new(RateLimiter::new(Arc::new(client), &config));
            tracing::info!(
                "Rate limiting enabled: {} requests per {}s",
                config.rate_limit_requests,
                config.rate_limit_window_secs
            );
            router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit))
        }
        _ => router,
    };

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
