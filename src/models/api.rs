//! REST API 请求/响应模型

use serde::{Deserialize, Serialize};

use crate::services::extractor::{CodeEntity, CodeMetrics, MethodInfo, Param};

/// 实体 DTO（行号对外为 1 起）
#[derive(Debug, Serialize)]
pub struct EntityDto {
    /// 选择用 ID，形如 `function:add` / `class:Calculator`
    pub id: String,
    pub kind: String,
    pub name: String,
    pub signature: String,
    pub lineno: usize,
    pub end_lineno: usize,
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
    pub is_async: bool,
    pub bases: Vec<String>,
    pub methods: Vec<MethodInfo>,
    pub docstring: Option<String>,
}

impl From<&CodeEntity> for EntityDto {
    fn from(entity: &CodeEntity) -> Self {
        Self {
            id: format!("{}:{}", entity.kind.as_str(), entity.name),
            kind: entity.kind.as_str().to_string(),
            name: entity.name.clone(),
            signature: entity.signature(),
            lineno: entity.start_line + 1,
            end_lineno: entity.end_line + 1,
            params: entity.params.clone(),
            return_annotation: entity.return_annotation.clone(),
            is_async: entity.is_async,
            bases: entity.bases.clone(),
            methods: entity.methods.clone(),
            docstring: entity.docstring.as_ref().map(|d| d.text.clone()),
        }
    }
}

/// 代码分析请求
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub code: String,
}

/// 代码分析响应
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub functions: Vec<EntityDto>,
    pub classes: Vec<EntityDto>,
    pub complexity: CodeMetrics,
    pub total_items: usize,
}

/// 文档生成请求
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub code: String,
    /// 选中的实体 ID 列表（`kind:name`）
    #[serde(default)]
    pub selected_items: Vec<String>,
    /// 覆盖提供方（可选，按请求构建一次性客户端）
    #[serde(default)]
    pub provider: Option<String>,
    /// 覆盖 API 密钥（可选）
    #[serde(default)]
    pub api_key: Option<String>,
}

/// 单个实体的生成结果
#[derive(Debug, Serialize)]
pub struct GeneratedItemDto {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// 文档生成响应
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub results: Vec<GeneratedItemDto>,
    pub total_generated: usize,
}

/// 下载请求：对整段代码跑完整流水线，返回补全后的源文件
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub code: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub functions_only: bool,
    #[serde(default)]
    pub classes_only: bool,
}
