//! 代码分析端点
//!
//! 接收一段 Python 代码，返回实体列表与复杂度指标。

use axum::{routing::post, Json, Router};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::models::api::{AnalyzeRequest, AnalyzeResponse, EntityDto};
use crate::services::extractor::{self, EntityKind};
use crate::state::AppState;

/// 创建代码分析路由
pub fn analyze_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/analyze", post(analyze_code))
}

/// 分析提交的代码，返回结构信息
async fn analyze_code(
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("未提供代码".to_string()));
    }

    let unit = extractor::parse(&req.code)?;
    let complexity = extractor::analyze_complexity(&req.code)?;

    let functions: Vec<EntityDto> = unit
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Function)
        .map(EntityDto::from)
        .collect();
    let classes: Vec<EntityDto> = unit
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Class)
        .map(EntityDto::from)
        .collect();

    debug!(
        "Analyzed code: {} functions, {} classes",
        unit.count(EntityKind::Function),
        unit.count(EntityKind::Class)
    );

    let total_items = functions.len() + classes.len();
    Ok(Json(AnalyzeResponse {
        functions,
        classes,
        complexity,
        total_items,
    }))
}
