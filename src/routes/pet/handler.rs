use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, extract::WithRejection, headers::CacheControl};
use serde::Deserialize;

use crate::{AppState, config::Config, error::AppError, utils::geo::is_valid_coordinate};

use super::model::{DEFAULT_LIMIT, DEFAULT_RADIUS, NearbyPet, NearbySearch};

// 附近宠物查询参数，全部按字符串接收再校验
#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    #[serde(alias = "latitude")]
    pub lat: Option<String>,
    #[serde(alias = "longitude")]
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "includeAll", alias = "include_all")]
    pub include_all: Option<String>,
}

impl NearbyQuery {
    pub fn into_search(self, config: &Config) -> Result<NearbySearch, AppError> {
        let latitude = required_coordinate(self.lat.as_deref(), "lat")?;
        let longitude = required_coordinate(self.lng.as_deref(), "lng")?;
        if !is_valid_coordinate(latitude, longitude) {
            return Err(AppError::InvalidQuery("坐标超出范围".into()));
        }

        let radius = match non_empty(self.radius.as_deref()) {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|radius| radius.is_finite() && *radius >= 0.0)
                .ok_or_else(|| AppError::InvalidQuery(format!("radius参数无效: {}", raw)))?,
            None => DEFAULT_RADIUS,
        };

        let limit = match non_empty(self.limit.as_deref()) {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| AppError::InvalidQuery(format!("limit参数无效: {}", raw)))?,
            None => DEFAULT_LIMIT,
        };

        if let Some(max) = config.max_search_radius.filter(|max| radius > *max) {
            return Err(AppError::InvalidQuery(format!("radius不能超过{}", max)));
        }
        if let Some(max) = config.max_result_limit.filter(|max| limit > *max) {
            return Err(AppError::InvalidQuery(format!("limit不能超过{}", max)));
        }

        let include_all = match non_empty(self.include_all.as_deref()) {
            Some(raw) => parse_flag(raw)
                .ok_or_else(|| AppError::InvalidQuery(format!("includeAll参数无效: {}", raw)))?,
            None => false,
        };

        Ok(NearbySearch {
            latitude,
            longitude,
            radius,
            limit,
            include_all,
        })
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|raw| !raw.is_empty())
}

fn required_coordinate(raw: Option<&str>, name: &str) -> Result<f64, AppError> {
    let raw = non_empty(raw).ok_or_else(|| AppError::InvalidQuery(format!("缺少{}参数", name)))?;
    raw.parse::<f64>()
        .map_err(|_| AppError::InvalidQuery(format!("{}参数无效: {}", name, raw)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// 获取附近宠物API
pub async fn find_nearby_pets(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<NearbyQuery>, AppError>,
) -> Result<Response, AppError> {
    let search = query.into_search(&state.config)?;

    let pets = NearbyPet::find_nearby(
        state.store.as_ref(),
        &state.nearby_cache,
        &state.config.store_paths,
        &search,
    )
    .await
    .map_err(|err| {
        tracing::error!("查找附近宠物错误: {:?}", err);
        AppError::from(err)
    })?;

    let cache_control = CacheControl::new()
        .with_public()
        .with_max_age(state.config.nearby_cache_ttl());

    Ok((TypedHeader(cache_control), Json(pets)).into_response())
}
