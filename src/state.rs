//! 应用状态管理
//!
//! 定义在请求处理器之间共享的状态。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::llm::LlmClient;
use crate::services::{DocPipeline, PromptBuilder};

/// 应用共享状态
///
/// 使用 Arc 包裹以便在多个处理器之间安全共享
pub struct AppState {
    /// 启动时加载的配置（处理器构建一次性客户端时需要）
    pub config: AppConfig,
    /// 默认 LLM 客户端
    pub llm: Arc<LlmClient>,
    /// Prompt 构建器
    pub prompt_builder: PromptBuilder,
}

impl AppState {
    /// 创建新的应用状态（模板校验失败即启动失败）
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let prompt_builder = PromptBuilder::load(&config)?;
        let llm = Arc::new(
            LlmClient::from_config(&config)
                .map_err(|e| crate::error::AppError::Llm(e.to_string()))?,
        );

        Ok(Self {
            config,
            llm,
            prompt_builder,
        })
    }

    /// 构建默认流水线
    pub fn pipeline(&self) -> DocPipeline {
        DocPipeline::new(self.prompt_builder.clone(), Arc::clone(&self.llm))
    }
}

/// 创建可共享的应用状态
pub fn create_shared_state(config: AppConfig) -> AppResult<Arc<AppState>> {
    Ok(Arc::new(AppState::new(config)?))
}
