//! 重试与指数退避
//!
//! 单线程顺序模型下的有界重试：延迟按 base * 2^attempt 计算并封顶，
//! 只对瞬态失败重试，重试循环在调用方（客户端）内展开。

use std::time::Duration;

use crate::config::AppConfig;

/// 重试配置
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 最大重试次数（不含首次请求）
    pub max_retries: u32,
    /// 首次重试前的基础延迟
    pub base_delay: Duration,
    /// 延迟上限
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// 从应用配置构建
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_cap_ms),
        }
    }
}

/// 计算第 attempt 次重试前的退避延迟（attempt 从 0 起）
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_millis() as f64;
    let exponential = base * 2f64.powi(attempt as i32);
    Duration::from_millis(exponential.min(config.max_delay.as_millis() as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let config = RetryConfig::default();

        assert_eq!(backoff_delay(&config, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(&config, 3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_capped() {
        let config = RetryConfig::default();

        // 超过上限后封顶在 8s
        assert_eq!(backoff_delay(&config, 6), Duration::from_secs(8));
        assert_eq!(backoff_delay(&config, 10), Duration::from_secs(8));
    }

    #[test]
    fn test_from_app_config() {
        let app = AppConfig {
            max_retries: 5,
            backoff_base_ms: 250,
            backoff_cap_ms: 2000,
            ..Default::default()
        };
        let config = RetryConfig::from_config(&app);

        assert_eq!(config.max_retries, 5);
        assert_eq!(backoff_delay(&config, 0), Duration::from_millis(250));
        assert_eq!(backoff_delay(&config, 4), Duration::from_millis(2000));
    }
}
