pub mod handlers;

pub use handlers::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::config::AppConfig;

/// 构建路由
pub fn router(config: AppConfig) -> Router {
    let state = Arc::new(ServiceState::new(config));

    let anomaly_routes = Router::new()
        .route("/api/anomalies", post(handlers::detect_json))
        .route("/api/anomalies/csv", post(handlers::detect_csv))
        .route("/api/anomalies/export", post(handlers::export_csv))
        .route("/api/report", post(handlers::report))
        .route("/api/normalize", post(handlers::normalize_csv))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(anomaly_routes)
        .layer(ServiceBuilder::new())
}
