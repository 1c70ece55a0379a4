use axum::Json;
use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidQuery(String),

    #[error("请求过于频繁，请在{0}秒后重试")]
    RateLimited(u64),

    #[error("数据读取失败: {0}")]
    Upstream(#[from] StoreError),
}

// 查询串无法解析时也走统一的错误格式
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidQuery(msg) => (
                StatusCode::BAD_REQUEST,
                error_to_api_response::<()>(error_codes::VALIDATION_ERROR, msg),
            )
                .into_response(),
            AppError::RateLimited(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(error_codes::RATE_LIMIT, self.to_string()),
            )
                .into_response(),
            // 列表接口出错时返回空数组
            AppError::Upstream(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::<()>::new())).into_response()
            }
        }
    }
}
