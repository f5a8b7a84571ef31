//! CLI 命令定义与执行
//!
//! `docgen` 处理单个文件，`batch` 处理目录，`serve` 启动 web 界面。
//! 补全后的源码走 stdout，状态与统计走 stderr 日志，退出码非零表示
//! 不可恢复错误（文件不存在、源码完全无法解析等）。

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::api::create_api_routes;
use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::services::{DocPipeline, EntityFilter, EntityStatus, PromptBuilder};
use crate::state::create_shared_state;

#[derive(Parser)]
#[command(
    name = "codex-docgen",
    version,
    about = "AI-powered code documentation generator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate docstrings for all functions and classes in a Python file
    Docgen {
        /// Path to the Python file to process
        file: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Process only functions, skip classes
        #[arg(long, conflicts_with = "classes_only")]
        functions_only: bool,

        /// Process only classes, skip functions
        #[arg(long)]
        classes_only: bool,
    },

    /// Process all Python files in a directory
    Batch {
        /// Directory containing Python files to process
        directory: PathBuf,

        /// Process subdirectories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the web interface
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },

    /// Show the version of the tool
    Version,
}

impl Cli {
    /// verbose 标志在初始化日志之前读取，用于决定默认日志级别
    pub fn verbose(&self) -> bool {
        matches!(
            self.command,
            Command::Docgen { verbose: true, .. } | Command::Batch { verbose: true, .. }
        )
    }
}

/// 执行 CLI 命令
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Docgen {
            file,
            output,
            functions_only,
            classes_only,
            ..
        } => run_docgen(config, &file, output, functions_only, classes_only).await,
        Command::Batch {
            directory,
            recursive,
            ..
        } => run_batch(config, &directory, recursive).await,
        Command::Serve { host, port } => run_serve(config, &host, port).await,
        Command::Version => {
            println!("codex-docgen v{}", env!("CARGO_PKG_VERSION"));
            println!("AI-powered code documentation generator");
            Ok(())
        }
    }
}

/// 构建流水线（模板校验失败即启动失败）
fn build_pipeline(config: &AppConfig) -> anyhow::Result<DocPipeline> {
    let prompt_builder = PromptBuilder::load(config)?;
    let llm = Arc::new(LlmClient::from_config(config)?);
    Ok(DocPipeline::new(prompt_builder, llm))
}

async fn run_docgen(
    config: AppConfig,
    file: &Path,
    output: Option<PathBuf>,
    functions_only: bool,
    classes_only: bool,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File '{}' does not exist", file.display());
    }
    if file.extension().and_then(|e| e.to_str()) != Some("py") {
        anyhow::bail!("File '{}' is not a Python file", file.display());
    }

    let pipeline = build_pipeline(&config)?;
    let filter = EntityFilter::from_flags(functions_only, classes_only);
    let report = pipeline.document_file(file, filter).await?;

    for outcome in &report.outcomes {
        match &outcome.status {
            EntityStatus::Generated => debug!(
                "generated {} `{}` via {}",
                outcome.kind.as_str(),
                outcome.name,
                outcome.provider.as_deref().unwrap_or("unknown")
            ),
            EntityStatus::Skipped { reason } => debug!(
                "skipped {} `{}`: {}",
                outcome.kind.as_str(),
                outcome.name,
                reason
            ),
            EntityStatus::Failed { reason } => debug!(
                "failed {} `{}`: {}",
                outcome.kind.as_str(),
                outcome.name,
                reason
            ),
        }
    }

    if report.outcomes.is_empty() {
        info!("No functions or classes found to document");
    } else {
        info!(
            "{} generated, {} skipped, {} failed",
            report.generated(),
            report.skipped(),
            report.failed()
        );
    }

    match output {
        Some(path) => {
            tokio::fs::write(&path, &report.output).await?;
            info!("Results saved to: {}", path.display());
        }
        None => print!("{}", report.output),
    }

    Ok(())
}

async fn run_batch(config: AppConfig, directory: &Path, recursive: bool) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&config)?;
    let report = pipeline.run_batch(directory, recursive).await?;

    info!(
        "Batch finished: {} files processed, {} files failed; {} docstrings generated, {} skipped, {} failed",
        report.files_processed,
        report.files_failed,
        report.entities_generated,
        report.entities_skipped,
        report.entities_failed
    );

    Ok(())
}

async fn run_serve(config: AppConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let state = create_shared_state(config)?;

    // 配置 CORS（允许所有来源）
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = axum::Router::new()
        .merge(create_api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Server listening on: {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_docgen_flags() {
        let cli = Cli::try_parse_from([
            "codex-docgen",
            "docgen",
            "sample.py",
            "--output",
            "out.py",
            "--functions-only",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose());
        match cli.command {
            Command::Docgen {
                file,
                output,
                functions_only,
                classes_only,
                ..
            } => {
                assert_eq!(file, PathBuf::from("sample.py"));
                assert_eq!(output, Some(PathBuf::from("out.py")));
                assert!(functions_only);
                assert!(!classes_only);
            }
            _ => panic!("expected docgen command"),
        }
    }

    #[test]
    fn test_cli_rejects_conflicting_filters() {
        let result = Cli::try_parse_from([
            "codex-docgen",
            "docgen",
            "sample.py",
            "--functions-only",
            "--classes-only",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_serve_defaults() {
        let cli = Cli::try_parse_from(["codex-docgen", "serve"]).unwrap();
        match cli.command {
            Command::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 5000);
            }
            _ => panic!("expected serve command"),
        }
    }
}
