//! Prompt 构建服务
//!
//! 从可替换的模板文件加载函数/类两份模板，启动时校验必需占位符
//! （缺失即启动失败，而不是在每次调用时报错），按实体渲染 Prompt。

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::templates::{DEFAULT_CLASS_PROMPT, DEFAULT_FUNCTION_PROMPT};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::extractor::{CodeEntity, EntityKind};

/// 函数模板必需占位符
const FUNCTION_PLACEHOLDER: &str = "{function_code}";
/// 类模板必需占位符
const CLASS_PLACEHOLDER: &str = "{class_code}";

/// 模板错误类型
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// 模板缺少必需占位符
    #[error("模板 {path} 缺少必需占位符 {placeholder}")]
    MissingPlaceholder {
        path: String,
        placeholder: &'static str,
    },

    /// 模板文件读取失败
    #[error("读取模板失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<TemplateError> for AppError {
    fn from(e: TemplateError) -> Self {
        AppError::Template(e.to_string())
    }
}

/// Prompt 构建器
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    function_template: String,
    class_template: String,
}

impl PromptBuilder {
    /// 按配置加载模板
    ///
    /// 模板文件存在则读取，不存在时回落到内置默认值；
    /// 读取失败或占位符缺失都是启动错误。
    pub fn load(config: &AppConfig) -> Result<Self, TemplateError> {
        let function_template =
            load_template(&config.function_template, DEFAULT_FUNCTION_PROMPT)?;
        let class_template = load_template(&config.class_template, DEFAULT_CLASS_PROMPT)?;
        Self::from_strings(function_template, class_template)
    }

    /// 从模板文本构建（校验占位符）
    pub fn from_strings(
        function_template: String,
        class_template: String,
    ) -> Result<Self, TemplateError> {
        if !function_template.contains(FUNCTION_PLACEHOLDER) {
            return Err(TemplateError::MissingPlaceholder {
                path: "function template".to_string(),
                placeholder: FUNCTION_PLACEHOLDER,
            });
        }
        if !class_template.contains(CLASS_PLACEHOLDER) {
            return Err(TemplateError::MissingPlaceholder {
                path: "class template".to_string(),
                placeholder: CLASS_PLACEHOLDER,
            });
        }

        Ok(Self {
            function_template,
            class_template,
        })
    }

    /// 渲染实体的 Prompt
    pub fn render(&self, entity: &CodeEntity) -> String {
        let (template, placeholder) = match entity.kind {
            EntityKind::Function => (&self.function_template, FUNCTION_PLACEHOLDER),
            EntityKind::Class => (&self.class_template, CLASS_PLACEHOLDER),
        };

        template
            .replace(placeholder, &entity.source)
            .replace("{name}", &entity.name)
            .replace("{signature}", &entity.signature())
    }
}

/// 读取单个模板文件，文件不存在时使用默认模板
fn load_template(path: &Path, default: &str) -> Result<String, TemplateError> {
    if !path.exists() {
        debug!("Template {} not found, using built-in default", path.display());
        return Ok(default.to_string());
    }

    fs::read_to_string(path).map_err(|e| TemplateError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
