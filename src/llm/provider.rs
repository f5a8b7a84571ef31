//! 提供方选择与端点构建
//!
//! 提供方在启动时根据配置与环境解析一次，之后作为显式值传入客户端。

use tracing::{info, warn};

use super::types::LlmError;

/// LLM 提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// 离线确定性 mock（无网络调用）
    Mock,
    /// DeepSeek（OpenAI 兼容格式）
    DeepSeek,
    /// OpenAI
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Mock => "mock",
            Provider::DeepSeek => "deepseek",
            Provider::OpenAi => "openai",
        }
    }

    /// 提供方默认 base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Mock => "",
            Provider::DeepSeek => "https://api.deepseek.com",
            Provider::OpenAi => "https://api.openai.com",
        }
    }

    /// 提供方默认模型
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Mock => "mock",
            Provider::DeepSeek => "deepseek-chat",
            Provider::OpenAi => "gpt-3.5-turbo",
        }
    }

    /// 按名称解析提供方
    pub fn from_name(name: &str) -> Result<Self, LlmError> {
        match name.to_lowercase().as_str() {
            "mock" => Ok(Provider::Mock),
            "deepseek" => Ok(Provider::DeepSeek),
            "openai" => Ok(Provider::OpenAi),
            other => Err(LlmError::Config(format!(
                "未知的提供方: {other}（支持 mock / deepseek / openai）"
            ))),
        }
    }

    /// 解析配置中的提供方与密钥组合
    ///
    /// 远程提供方缺少 API 密钥时静默回落到 mock 模式，
    /// 保证工具离线可用、可演示。
    pub fn resolve(name: Option<&str>, api_key: Option<&str>) -> Result<Self, LlmError> {
        let provider = match name {
            Some(name) => Self::from_name(name)?,
            None => Provider::Mock,
        };

        let has_key = api_key.is_some_and(|k| !k.is_empty());
        if provider != Provider::Mock && !has_key {
            warn!(
                "Provider {} selected but no API key present, falling back to mock mode",
                provider.as_str()
            );
            return Ok(Provider::Mock);
        }

        if provider == Provider::Mock {
            info!("Mock mode selected: docstrings will be generated offline and deterministically");
        } else {
            info!("Provider selected: {}", provider.as_str());
        }
        Ok(provider)
    }
}

/// 修复 base_url
///
/// - 移除末尾斜杠
/// - 修复双斜杠（保留协议部分）
pub fn fix_base_url(base_url: &str) -> String {
    let mut url = base_url.trim_end_matches('/').to_string();

    if let Some(pos) = url.find("://") {
        let (protocol, rest) = url.split_at(pos + 3);
        let fixed_rest = rest.replace("//", "/");
        url = format!("{}{}", protocol, fixed_rest);
    }

    url
}

/// 构建 Chat Completions 端点
pub fn build_chat_endpoint(base_url: &str) -> String {
    let url = fix_base_url(base_url);

    if url.ends_with("/chat/completions") {
        url
    } else if url.ends_with("/v1") {
        format!("{}/chat/completions", url)
    } else {
        format!("{}/v1/chat/completions", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Provider::from_name("deepseek").unwrap(), Provider::DeepSeek);
        assert_eq!(Provider::from_name("OpenAI").unwrap(), Provider::OpenAi);
        assert_eq!(Provider::from_name("mock").unwrap(), Provider::Mock);
        assert!(Provider::from_name("huggingface").is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_mock_without_key() {
        // 没有密钥的远程提供方回落到 mock
        assert_eq!(
            Provider::resolve(Some("deepseek"), None).unwrap(),
            Provider::Mock
        );
        assert_eq!(
            Provider::resolve(Some("openai"), Some("")).unwrap(),
            Provider::Mock
        );
        // 未指定提供方时同样是 mock
        assert_eq!(Provider::resolve(None, None).unwrap(), Provider::Mock);
        // 有密钥时保持所选提供方
        assert_eq!(
            Provider::resolve(Some("deepseek"), Some("sk-test")).unwrap(),
            Provider::DeepSeek
        );
    }

    #[test]
    fn test_fix_base_url() {
        assert_eq!(fix_base_url("https://api.openai.com/"), "https://api.openai.com");
        assert_eq!(
            fix_base_url("https://api.openai.com//v1"),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn test_build_chat_endpoint() {
        assert_eq!(
            build_chat_endpoint("https://api.deepseek.com"),
            "https://api.deepseek.com/v1/chat/completions"
        );
        assert_eq!(
            build_chat_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            build_chat_endpoint("https://api.openai.com/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
