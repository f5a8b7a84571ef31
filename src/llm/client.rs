//! 统一 LLM 客户端
//!
//! 提供方在构建时解析一次；mock 模式下不发起网络调用，
//! 远程模式下做非流式单次请求，瞬态失败按指数退避重试。

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

use super::mock::render_mock_docstring;
use super::openai::chat_completion;
use super::provider::{build_chat_endpoint, Provider};
use super::retry::{backoff_delay, RetryConfig};
use super::types::{ChatMessage, GenerationResponse, LlmError};
use crate::config::AppConfig;
use crate::services::extractor::CodeEntity;
use crate::utils::request_logger::RequestLogger;

/// 系统提示词
const SYSTEM_PROMPT: &str =
    "You are a professional Python developer who writes excellent docstrings.";

/// 统一 LLM 客户端
///
/// DeepSeek 与 OpenAI 都走 Chat Completions 格式；配置解析不出
/// 可用的远程提供方时回落到 mock。
pub struct LlmClient {
    http: Client,
    provider: Provider,
    model: String,
    api_key: String,
    endpoint: String,
    temperature: f64,
    max_tokens: u32,
    retry: RetryConfig,
    logger: RequestLogger,
    auth_fallback_to_mock: bool,
    /// 认证失败后置位，其后的调用全部走 mock
    degraded: AtomicBool,
}

impl LlmClient {
    /// 从应用配置创建客户端
    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let provider = Provider::resolve(config.provider.as_deref(), config.api_key.as_deref())?;

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());
        let endpoint = if provider == Provider::Mock {
            String::new()
        } else {
            build_chat_endpoint(&base_url)
        };

        // 构建 HTTP 客户端
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            http,
            provider,
            model,
            api_key: config.api_key.clone().unwrap_or_default(),
            endpoint,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryConfig::from_config(config),
            logger: RequestLogger::default(),
            auth_fallback_to_mock: config.auth_fallback_to_mock,
            degraded: AtomicBool::new(false),
        })
    }

    /// 是否以 mock 模式工作（初始即 mock，或认证失败后降级）
    pub fn is_mock(&self) -> bool {
        self.provider == Provider::Mock || self.degraded.load(Ordering::Relaxed)
    }

    /// 为实体生成 docstring 正文
    pub async fn generate(
        &self,
        prompt: &str,
        entity: &CodeEntity,
    ) -> Result<GenerationResponse, LlmError> {
        if self.is_mock() {
            return Ok(self.mock_response(entity));
        }

        let start = Instant::now();
        let request_id = RequestLogger::generate_request_id();
        let entry = self.logger.log_request(
            &request_id,
            self.provider.as_str(),
            &self.endpoint,
            &self.model,
            prompt,
            self.temperature,
            self.max_tokens,
            &self.api_key,
        );

        match self.try_generate(prompt).await {
            Ok((raw, attempts)) => {
                let text = sanitize_output(&raw);
                self.logger.log_success(entry, start, attempts, &text);
                Ok(GenerationResponse {
                    text,
                    provider: self.provider.as_str().to_string(),
                    model: self.model.clone(),
                    attempts,
                })
            }
            Err((error, attempts)) => {
                self.logger.log_error(
                    entry,
                    start,
                    attempts,
                    error.kind(),
                    &error.to_string(),
                    error.status_code(),
                );

                if matches!(error, LlmError::Auth { .. }) && self.auth_fallback_to_mock {
                    warn!(
                        "Authentication failed, degrading to mock mode for the rest of the run: {}",
                        error
                    );
                    self.degraded.store(true, Ordering::Relaxed);
                    return Ok(self.mock_response(entity));
                }

                Err(error)
            }
        }
    }

    /// 有界重试循环：只对瞬态失败退避重试
    async fn try_generate(&self, prompt: &str) -> Result<(String, u32), (LlmError, u32)> {
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            let messages = vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ];

            match chat_completion(
                &self.http,
                &self.endpoint,
                &self.api_key,
                &self.model,
                messages,
                self.temperature,
                self.max_tokens,
            )
            .await
            {
                Ok(raw) => return Ok((raw, attempt + 1)),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = backoff_delay(&self.retry, attempt);
                    warn!(
                        "Transient LLM failure (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.retry.max_retries + 1,
                        delay,
                        e
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err((e, attempt + 1)),
            }
        }

        Err((
            last_error.unwrap_or(LlmError::EmptyResponse),
            self.retry.max_retries + 1,
        ))
    }

    fn mock_response(&self, entity: &CodeEntity) -> GenerationResponse {
        GenerationResponse {
            text: render_mock_docstring(entity),
            provider: Provider::Mock.as_str().to_string(),
            model: Provider::Mock.default_model().to_string(),
            attempts: 0,
        }
    }
}

// 预编译正则表达式
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap()
});

/// 清洗模型输出
///
/// 插入器期望纯 docstring 正文：去掉模型可能回显的 markdown
/// 代码围栏与成对三引号。
pub fn sanitize_output(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if let Some(caps) = FENCE_RE.captures(&text) {
        text = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
    }

    for quote in ["\"\"\"", "'''"] {
        if text.starts_with(quote) && text.ends_with(quote) && text.len() >= 6 {
            text = text[3..text.len() - 3].trim().to_string();
        }
    }

    text
}
