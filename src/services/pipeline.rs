//! 文档生成流水线
//!
//! 按文件驱动：提取 → 过滤 → 构建 Prompt → 生成 → 插入。
//! 插入按实体起始行降序（自底向上）应用，保证未处理实体的
//! 行偏移始终有效。实体级失败不中断文件，文件级失败不中断批处理。

use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::extractor::{self, CodeEntity, EntityKind};
use super::inserter;
use super::prompt_builder::PromptBuilder;
use super::scanner;
use crate::error::{AppError, AppResult};
use crate::llm::LlmClient;

/// 实体过滤器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFilter {
    All,
    FunctionsOnly,
    ClassesOnly,
}

impl EntityFilter {
    /// 从 CLI 标志构建
    pub fn from_flags(functions_only: bool, classes_only: bool) -> Self {
        match (functions_only, classes_only) {
            (true, false) => EntityFilter::FunctionsOnly,
            (false, true) => EntityFilter::ClassesOnly,
            _ => EntityFilter::All,
        }
    }

    fn matches(&self, kind: EntityKind) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::FunctionsOnly => kind == EntityKind::Function,
            EntityFilter::ClassesOnly => kind == EntityKind::Class,
        }
    }
}

/// 单个实体的处理状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityStatus {
    /// 已生成并插入
    Generated,
    /// 跳过（瞬态失败重试耗尽）
    Skipped { reason: String },
    /// 失败（非瞬态错误或插入失败）
    Failed { reason: String },
}

/// 单个实体的处理结果
#[derive(Debug, Clone)]
pub struct EntityOutcome {
    pub name: String,
    pub kind: EntityKind,
    pub status: EntityStatus,
    /// 实际使用的提供方（生成成功时）
    pub provider: Option<String>,
}

/// 单个文件的处理报告
#[derive(Debug, Clone)]
pub struct FileReport {
    /// 处理后的源码文本
    pub output: String,
    /// 按文档顺序排列的实体结果
    pub outcomes: Vec<EntityOutcome>,
}

impl FileReport {
    pub fn generated(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Generated))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&EntityStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// 批处理报告
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub files_processed: usize,
    pub files_failed: usize,
    pub entities_generated: usize,
    pub entities_skipped: usize,
    pub entities_failed: usize,
}

/// 文档生成流水线
pub struct DocPipeline {
    prompt_builder: PromptBuilder,
    llm: Arc<LlmClient>,
}

impl DocPipeline {
    /// 创建新的流水线
    pub fn new(prompt_builder: PromptBuilder, llm: Arc<LlmClient>) -> Self {
        Self { prompt_builder, llm }
    }

    /// 处理一段源码，返回补全 docstring 后的文本与逐实体结果
    pub async fn document_source(
        &self,
        source: &str,
        filter: EntityFilter,
    ) -> AppResult<FileReport> {
        let unit = extractor::parse(source)?;

        // 自底向上处理，前面实体的偏移不受后面插入影响
        let mut selected: Vec<&CodeEntity> = unit
            .entities
            .iter()
            .filter(|e| filter.matches(e.kind))
            .collect();
        selected.sort_by(|a, b| b.start_line.cmp(&a.start_line));

        let mut text = unit.source.clone();
        let mut outcomes = Vec::with_capacity(selected.len());

        for entity in selected {
            let prompt = self.prompt_builder.render(entity);

            let status_and_provider = match self.llm.generate(&prompt, entity).await {
                Ok(generated) => match inserter::insert_docstring(&text, entity, &generated.text) {
                    Ok(patched) => {
                        debug!(
                            "Docstring generated for {} `{}` via {} ({}, {} attempts)",
                            entity.kind.as_str(),
                            entity.name,
                            generated.provider,
                            generated.model,
                            generated.attempts
                        );
                        text = patched;
                        (EntityStatus::Generated, Some(generated.provider))
                    }
                    Err(e) => {
                        warn!("Insertion failed for `{}`: {}", entity.name, e);
                        (
                            EntityStatus::Failed {
                                reason: e.to_string(),
                            },
                            None,
                        )
                    }
                },
                Err(e) if e.is_transient() => {
                    // 重试已在客户端内部耗尽
                    warn!("Entity `{}` skipped after retries: {}", entity.name, e);
                    (
                        EntityStatus::Skipped {
                            reason: e.to_string(),
                        },
                        None,
                    )
                }
                Err(e) => {
                    warn!("Generation failed for `{}`: {}", entity.name, e);
                    (
                        EntityStatus::Failed {
                            reason: e.to_string(),
                        },
                        None,
                    )
                }
            };

            outcomes.push(EntityOutcome {
                name: entity.name.clone(),
                kind: entity.kind,
                status: status_and_provider.0,
                provider: status_and_provider.1,
            });
        }

        // 恢复文档顺序
        outcomes.reverse();

        Ok(FileReport {
            output: text,
            outcomes,
        })
    }

    /// 处理单个文件
    pub async fn document_file(&self, path: &Path, filter: EntityFilter) -> AppResult<FileReport> {
        if !path.exists() {
            return Err(AppError::NotFound(path.display().to_string()));
        }

        let source = fs::read_to_string(path).await?;
        info!("Processing file: {} ({} bytes)", path.display(), source.len());
        self.document_source(&source, filter).await
    }

    /// 批处理目录：逐个文件处理，成功后原地重写
    ///
    /// 文件要么完整重写，要么保持原样；单个文件失败只记录，不中断批处理。
    pub async fn run_batch(&self, dir: &Path, recursive: bool) -> AppResult<BatchReport> {
        let files = scanner::collect_python_files(dir, recursive)?;
        if files.is_empty() {
            info!("No Python files found in {}", dir.display());
            return Ok(BatchReport::default());
        }

        info!("Found {} Python files to process", files.len());
        let mut report = BatchReport::default();

        for file in &files {
            match self.document_file(file, EntityFilter::All).await {
                Ok(file_report) => {
                    report.entities_generated += file_report.generated();
                    report.entities_skipped += file_report.skipped();
                    report.entities_failed += file_report.failed();

                    if file_report.generated() > 0 {
                        if let Err(e) = fs::write(file, &file_report.output).await {
                            warn!("Failed to rewrite {}: {}", file.display(), e);
                            report.files_failed += 1;
                            continue;
                        }
                        info!(
                            "Rewrote {}: {} generated, {} skipped, {} failed",
                            file.display(),
                            file_report.generated(),
                            file_report.skipped(),
                            file_report.failed()
                        );
                    } else {
                        info!("No docstrings generated for {}, leaving untouched", file.display());
                    }
                    report.files_processed += 1;
                }
                Err(e) => {
                    // 单个文件的失败（解析错误等）不中断批处理
                    warn!("Failed to process {}: {}", file.display(), e);
                    report.files_failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    /// mock 模式流水线
    fn mock_pipeline() -> DocPipeline {
        let config = AppConfig::default();
        let prompt_builder = PromptBuilder::load(&config).unwrap();
        let llm = Arc::new(LlmClient::from_config(&config).unwrap());
        DocPipeline::new(prompt_builder, llm)
    }

    const THREE_ENTITIES: &str = r#"def first(a: int) -> int:
    return a


def second(b):
    return b * 2


class Third:
    def method(self):
        return 1
"#;

    #[tokio::test]
    async fn test_mock_scenario_indents_docstring() {
        let pipeline = mock_pipeline();
        let source = "def add(a: int, b: int) -> int:\n    return a + b\n";
        let report = pipeline
            .document_source(source, EntityFilter::All)
            .await
            .unwrap();

        let lines: Vec<&str> = report.output.split('\n').collect();
        // 第 1 行不变，第 2 行是缩进 4 格的三引号块开头
        assert_eq!(lines[0], "def add(a: int, b: int) -> int:");
        assert!(lines[1].starts_with("    \"\"\""));
        assert!(report.output.contains("    return a + b"));
        assert_eq!(report.generated(), 1);
    }

    #[tokio::test]
    async fn test_mock_output_is_deterministic() {
        let pipeline = mock_pipeline();
        let first = pipeline
            .document_source(THREE_ENTITIES, EntityFilter::All)
            .await
            .unwrap();
        let second = pipeline
            .document_source(THREE_ENTITIES, EntityFilter::All)
            .await
            .unwrap();

        assert_eq!(first.output, second.output);
    }

    #[tokio::test]
    async fn test_idempotent_rerun_replaces_docstrings() {
        let pipeline = mock_pipeline();
        let once = pipeline
            .document_source(THREE_ENTITIES, EntityFilter::All)
            .await
            .unwrap();
        let twice = pipeline
            .document_source(&once.output, EntityFilter::All)
            .await
            .unwrap();

        // 第二次运行替换而不是追加：输出稳定，每个实体只有一个 docstring
        assert_eq!(once.output, twice.output);
        let unit = extractor::parse(&twice.output).unwrap();
        for entity in &unit.entities {
            assert!(entity.docstring.is_some(), "`{}` lost its docstring", entity.name);
        }
    }

    #[tokio::test]
    async fn test_offset_stability_matches_one_at_a_time() {
        let pipeline = mock_pipeline();

        // 一次性自底向上处理
        let batched = pipeline
            .document_source(THREE_ENTITIES, EntityFilter::All)
            .await
            .unwrap();

        // 逐实体处理，每次插入后重新提取
        let llm = Arc::new(LlmClient::from_config(&AppConfig::default()).unwrap());
        let mut text = THREE_ENTITIES.to_string();
        loop {
            let unit = extractor::parse(&text).unwrap();
            let Some(entity) = unit.entities.iter().find(|e| e.docstring.is_none()) else {
                break;
            };
            let generated = llm.generate("unused", entity).await.unwrap();
            text = inserter::insert_docstring(&text, entity, &generated.text).unwrap();
        }

        assert_eq!(batched.output, text);
    }

    #[tokio::test]
    async fn test_filters_select_entity_kinds() {
        let pipeline = mock_pipeline();

        let functions = pipeline
            .document_source(THREE_ENTITIES, EntityFilter::FunctionsOnly)
            .await
            .unwrap();
        assert_eq!(functions.outcomes.len(), 2);
        assert!(functions
            .outcomes
            .iter()
            .all(|o| o.kind == EntityKind::Function));

        let classes = pipeline
            .document_source(THREE_ENTITIES, EntityFilter::ClassesOnly)
            .await
            .unwrap();
        assert_eq!(classes.outcomes.len(), 1);
        assert_eq!(classes.outcomes[0].name, "Third");
    }

    #[tokio::test]
    async fn test_parse_error_surfaces_with_line() {
        let pipeline = mock_pipeline();
        let err = pipeline
            .document_source("def broken(:\n    pass\n", EntityFilter::All)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_inline_body_failure_keeps_other_entities() {
        let pipeline = mock_pipeline();
        let source = "def inline(): return 1\n\n\ndef normal(a):\n    return a\n";
        let report = pipeline
            .document_source(source, EntityFilter::All)
            .await
            .unwrap();

        assert_eq!(report.generated(), 1);
        assert_eq!(report.failed(), 1);
        // 失败实体周围的文本保持原样
        assert!(report.output.contains("def inline(): return 1"));
        assert!(report.output.contains("    \"\"\""));
    }

    #[tokio::test]
    async fn test_transient_failure_skips_entity_but_processes_rest() {
        // 针对特定实体返回 503：其余实体正常生成
        let mut server = mockito::Server::new_async().await;
        let ok_body = serde_json::json!({
            "choices": [{"message": {"content": "A generated docstring."}}]
        });
        // 两个 mock 按请求体区分实体，互不重叠
        let _ok_mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("working".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok_body.to_string())
            .create_async()
            .await;
        let _fail_mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("failing".to_string()))
            .with_status(503)
            .with_body("unavailable")
            .expect_at_least(1)
            .create_async()
            .await;

        let config = AppConfig {
            provider: Some("deepseek".to_string()),
            api_key: Some("sk-test".to_string()),
            base_url: Some(server.url()),
            max_retries: 2,
            backoff_base_ms: 1,
            backoff_cap_ms: 2,
            timeout_secs: 5,
            ..Default::default()
        };
        let pipeline = DocPipeline::new(
            PromptBuilder::load(&config).unwrap(),
            Arc::new(LlmClient::from_config(&config).unwrap()),
        );

        let source = "def failing(a):\n    return a\n\n\ndef working(b):\n    return b\n";
        let report = pipeline
            .document_source(source, EntityFilter::All)
            .await
            .unwrap();

        assert_eq!(report.generated(), 1);
        assert_eq!(report.skipped(), 1);

        let failing = report.outcomes.iter().find(|o| o.name == "failing").unwrap();
        assert!(matches!(failing.status, EntityStatus::Skipped { .. }));
        let working = report.outcomes.iter().find(|o| o.name == "working").unwrap();
        assert_eq!(working.status, EntityStatus::Generated);
    }

    #[tokio::test]
    async fn test_batch_rewrites_in_place() {
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.py");
        let mut f = std::fs::File::create(&good).unwrap();
        f.write_all(b"def f(a):\n    return a\n").unwrap();

        let bad = dir.path().join("bad.py");
        let mut f = std::fs::File::create(&bad).unwrap();
        f.write_all(b"def broken(:\n    pass\n").unwrap();

        let pipeline = mock_pipeline();
        let report = pipeline.run_batch(dir.path(), false).await.unwrap();

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.entities_generated, 1);

        // 成功的文件被重写，失败的保持原样
        let rewritten = std::fs::read_to_string(&good).unwrap();
        assert!(rewritten.contains("\"\"\""));
        let untouched = std::fs::read_to_string(&bad).unwrap();
        assert_eq!(untouched, "def broken(:\n    pass\n");
    }
}
