use std::sync::Arc;

use axum::{Router, routing::get};
use cache::ResultCache;
use config::Config;
use routes::pet::NearbyPet;
use store::RecordStore;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub nearby_cache: Arc<ResultCache<Vec<NearbyPet>>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Self {
        let nearby_cache = Arc::new(ResultCache::with_system_clock(config.nearby_cache_ttl()));
        Self {
            config,
            store,
            nearby_cache,
        }
    }
}

/// 组装路由，API 统一挂在 `api_base_uri` 下
pub fn app(state: AppState) -> Router {
    let api_routes = Router::new().route("/pets/nearby", get(routes::pet::find_nearby_pets));

    let base = state.config.api_base_uri.trim_end_matches('/').to_string();
    let router = if base.is_empty() {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(&base, api_routes)
    };

    router
        .route("/health", get(routes::health))
        .layer(axum::middleware::from_fn(middleware::log_errors))
        .with_state(state)
}
