//! 应用配置管理
//!
//! 配置在启动时构建一次（文件 + 环境变量），之后以显式值传递给各组件，
//! 调用逻辑内部不再读取环境变量。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 获取配置文件路径
fn get_config_path() -> PathBuf {
    // 配置文件位于可执行文件同级目录
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.json")
}

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM 提供方（mock / deepseek / openai），未设置时根据环境变量自动选择
    #[serde(default)]
    pub provider: Option<String>,

    /// LLM API 密钥
    #[serde(default)]
    pub api_key: Option<String>,

    /// LLM API 基础 URL（未设置时使用提供方默认值）
    #[serde(default)]
    pub base_url: Option<String>,

    /// 模型名称（未设置时使用提供方默认值）
    #[serde(default)]
    pub model: Option<String>,

    /// 温度参数
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// 最大 token 数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 最大重试次数（不含首次请求）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 退避基础延迟（毫秒）
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// 退避延迟上限（毫秒）
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// 单次请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 函数 Prompt 模板路径
    #[serde(default = "default_function_template")]
    pub function_template: PathBuf,

    /// 类 Prompt 模板路径
    #[serde(default = "default_class_template")]
    pub class_template: PathBuf,

    /// 认证失败（401/403）时是否降级到 mock 模式继续运行
    #[serde(default = "default_auth_fallback")]
    pub auth_fallback_to_mock: bool,
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_cap_ms() -> u64 {
    8000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_function_template() -> PathBuf {
    PathBuf::from("prompts/function_prompt.txt")
}

fn default_class_template() -> PathBuf {
    PathBuf::from("prompts/class_prompt.txt")
}

fn default_auth_fallback() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            base_url: None,
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            timeout_secs: default_timeout_secs(),
            function_template: default_function_template(),
            class_template: default_class_template(),
            auth_fallback_to_mock: default_auth_fallback(),
        }
    }
}

impl AppConfig {
    /// 加载配置：config.json（如果存在）叠加环境变量，只在启动时调用一次
    pub fn load() -> Self {
        let mut config = load_config_from_file().unwrap_or_default();
        config.apply_env();
        config
    }

    /// 从环境变量补全提供方与密钥
    ///
    /// 优先级与原有行为一致：DEEPSEEK_API_KEY 先于 OPENAI_API_KEY，
    /// 两者都不存在时选择 mock 模式。
    fn apply_env(&mut self) {
        if self.api_key.is_some() {
            return;
        }

        match self.provider.as_deref() {
            Some("deepseek") => self.api_key = env_key("DEEPSEEK_API_KEY"),
            Some("openai") => self.api_key = env_key("OPENAI_API_KEY"),
            Some(_) => {}
            None => {
                if let Some(key) = env_key("DEEPSEEK_API_KEY") {
                    self.provider = Some("deepseek".to_string());
                    self.api_key = Some(key);
                } else if let Some(key) = env_key("OPENAI_API_KEY") {
                    self.provider = Some("openai".to_string());
                    self.api_key = Some(key);
                } else {
                    self.provider = Some("mock".to_string());
                }
            }
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// 从文件加载配置
fn load_config_from_file() -> Option<AppConfig> {
    let path = get_config_path();
    if path.exists() {
        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    } else {
        None
    }
}
