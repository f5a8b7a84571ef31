//! API 路由模块

mod analyze;
mod examples;
mod generate;
mod health;

pub use analyze::analyze_routes;
pub use examples::examples_routes;
pub use generate::generate_routes;
pub use health::health_routes;

use axum::Router;

use crate::state::AppState;
use std::sync::Arc;

/// 创建所有 API 路由
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(analyze_routes())
        .merge(generate_routes())
        .merge(examples_routes())
        .with_state(state)
}
