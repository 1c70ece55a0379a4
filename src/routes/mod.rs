pub mod pet;

// 存活检查
pub async fn health() -> &'static str {
    "OK"
}
