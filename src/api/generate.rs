//! 文档生成端点
//!
//! `/api/generate` 为选中实体生成 docstring 文本；
//! `/api/download` 对整段代码跑完整流水线，以附件形式返回补全后的源文件。

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::llm::LlmClient;
use crate::models::api::{
    DownloadRequest, GenerateRequest, GenerateResponse, GeneratedItemDto,
};
use crate::services::extractor;
use crate::services::EntityFilter;
use crate::state::AppState;

/// 创建文档生成路由
pub fn generate_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/generate", post(generate_docs))
        .route("/api/download", post(download_docs))
}

/// 为选中的实体生成 docstring
async fn generate_docs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("未提供代码".to_string()));
    }

    let unit = extractor::parse(&req.code)?;
    let llm = override_client(&state, req.provider.clone(), req.api_key.clone())?;

    let mut results = Vec::with_capacity(req.selected_items.len());

    for id in &req.selected_items {
        let Some((kind, name)) = id.split_once(':') else {
            results.push(error_item(id, "", "", "非法的实体 ID"));
            continue;
        };

        let Some(entity) = unit
            .entities
            .iter()
            .find(|e| e.kind.as_str() == kind && e.name == name)
        else {
            results.push(error_item(id, kind, name, "未找到实体"));
            continue;
        };

        let prompt = state.prompt_builder.render(entity);
        match llm.generate(&prompt, entity).await {
            Ok(generated) => results.push(GeneratedItemDto {
                id: id.clone(),
                kind: kind.to_string(),
                name: name.to_string(),
                status: "generated".to_string(),
                docstring: Some(generated.text),
                error: None,
                provider: Some(generated.provider),
            }),
            Err(e) => {
                let status = if e.is_transient() { "skipped" } else { "error" };
                results.push(GeneratedItemDto {
                    id: id.clone(),
                    kind: kind.to_string(),
                    name: name.to_string(),
                    status: status.to_string(),
                    docstring: None,
                    error: Some(e.to_string()),
                    provider: None,
                });
            }
        }
    }

    let total_generated = results.iter().filter(|r| r.status == "generated").count();
    info!(
        "Generated {}/{} docstrings",
        total_generated,
        req.selected_items.len()
    );

    Ok(Json(GenerateResponse {
        results,
        total_generated,
    }))
}

/// 下载补全 docstring 后的源文件
async fn download_docs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("未提供代码".to_string()));
    }

    let filter = EntityFilter::from_flags(req.functions_only, req.classes_only);
    let report = state.pipeline().document_source(&req.code, filter).await?;

    let filename = req
        .filename
        .unwrap_or_else(|| "documented_code.py".to_string())
        .replace(['"', '\r', '\n'], "_");

    Ok((
        [
            (header::CONTENT_TYPE, "text/x-python; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        report.output,
    )
        .into_response())
}

/// 针对单次请求构建覆盖提供方/密钥的客户端；没有覆盖时复用默认客户端
fn override_client(
    state: &AppState,
    provider: Option<String>,
    api_key: Option<String>,
) -> Result<Arc<LlmClient>, AppError> {
    if provider.is_none() && api_key.is_none() {
        return Ok(Arc::clone(&state.llm));
    }

    let mut config = state.config.clone();
    if provider.is_some() {
        config.provider = provider;
    }
    if api_key.is_some() {
        config.api_key = api_key;
    }

    LlmClient::from_config(&config)
        .map(Arc::new)
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn error_item(id: &str, kind: &str, name: &str, message: &str) -> GeneratedItemDto {
    GeneratedItemDto {
        id: id.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        status: "error".to_string(),
        docstring: None,
        error: Some(message.to_string()),
        provider: None,
    }
}
