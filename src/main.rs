//! AI Code-to-Documentation Generator - Rust Backend
//!
//! 解析 Python 源码中的函数与类，调用 LLM 生成 docstring 并拼接回
//! 原始源码。提供 CLI（docgen / batch / version）与 web 界面（serve）。

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod services;
mod state;
mod utils;

use cli::Cli;
use config::AppConfig;

/// 在 Windows 上设置控制台代码页为 UTF-8
#[cfg(windows)]
fn setup_console_encoding() {
    unsafe {
        // 设置控制台输出代码页为 UTF-8 (65001)
        extern "system" {
            fn SetConsoleOutputCP(code_page: u32) -> i32;
            fn SetConsoleCP(code_page: u32) -> i32;
        }
        SetConsoleOutputCP(65001);
        SetConsoleCP(65001);
    }
}

#[cfg(not(windows))]
fn setup_console_encoding() {
    // 非 Windows 平台不需要特殊处理
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 设置控制台编码
    setup_console_encoding();

    let cli = Cli::parse();

    // 初始化日志：写 stderr，stdout 留给补全后的源码输出
    let default_filter = if cli.verbose() {
        "codex_docgen=debug"
    } else {
        "codex_docgen=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 配置只在启动时构建一次，此后显式传递
    let config = AppConfig::load();

    cli::run(cli, config).await
}
