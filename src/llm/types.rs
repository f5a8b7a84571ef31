//! LLM 类型定义

use serde::{Deserialize, Serialize};

/// 聊天消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 角色：system, user, assistant
    pub role: String,
    /// 消息内容
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// 单次生成结果
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// 清洗后的 docstring 正文
    pub text: String,
    /// 实际使用的提供方标识
    pub provider: String,
    /// 实际使用的模型名
    pub model: String,
    /// 发出的请求次数（mock 为 0）
    pub attempts: u32,
}

/// LLM 错误类型
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP 请求错误
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// API 返回错误
    #[error("API 错误 ({status}): {message}")]
    Api { status: u16, message: String },

    /// 认证失败（401/403），不重试
    #[error("认证失败 ({status}): {message}")]
    Auth { status: u16, message: String },

    /// 超时错误
    #[error("请求超时")]
    Timeout,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 响应中没有内容
    #[error("响应内容为空")]
    EmptyResponse,
}

impl LlmError {
    /// 是否为瞬态失败（可按退避策略重试）
    ///
    /// 瞬态：超时 / 连接失败 / 408 / 429 / 5xx。
    /// 认证失败与请求本身非法不重试。
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout => true,
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => {
                *status == 408 || *status == 429 || (500..=599).contains(status)
            }
            _ => false,
        }
    }

    /// 错误类别标识（用于请求日志）
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Http(_) => "http",
            LlmError::Api { .. } => "api",
            LlmError::Auth { .. } => "auth",
            LlmError::Timeout => "timeout",
            LlmError::Config(_) => "config",
            LlmError::EmptyResponse => "empty_response",
        }
    }

    /// 关联的 HTTP 状态码（如果有）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } | LlmError::Auth { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::Api {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(LlmError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());

        assert!(!LlmError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!LlmError::Auth {
            status: 401,
            message: String::new()
        }
        .is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
    }
}
