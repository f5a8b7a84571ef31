//! Python 代码实体提取
//!
//! 使用 tree-sitter 对源码做结构化解析，在语法树上做类型化遍历，
//! 不依赖正则提取。只提取顶层函数与顶层类；类方法作为类实体的
//! 元数据记录，嵌套函数不提取。

pub mod types;

use tree_sitter::{Language, Node, Parser};

use crate::error::AppError;
pub use types::{CodeEntity, CodeMetrics, Docstring, EntityKind, MethodInfo, Param, SourceUnit};

/// 提取错误类型
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// 源码语法错误（定位到出错行，1 起）
    #[error("语法错误: 第 {line} 行: {message}")]
    Syntax { line: usize, message: String },

    /// 解析器初始化失败
    #[error("解析器初始化失败: {0}")]
    Language(String),

    /// 解析器未能产出语法树
    #[error("解析失败: 输入无法处理")]
    Parse,
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Syntax { line, message } => AppError::Parse { line, message },
            other => AppError::Parse {
                line: 0,
                message: other.to_string(),
            },
        }
    }
}

/// 解析源码，返回源码单元与按文档顺序排列的顶层实体
pub fn parse(source: &str) -> Result<SourceUnit, ExtractError> {
    let tree = parse_tree(source)?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, message) = find_first_error(root);
        return Err(ExtractError::Syntax { line, message });
    }

    let mut entities = Vec::new();
    for i in 0..root.named_child_count() {
        let Some(child) = root.named_child(i as u32) else {
            continue;
        };
        match child.kind() {
            "function_definition" => {
                entities.push(extract_function(child, child, source));
            }
            "class_definition" => {
                entities.push(extract_class(child, child, source));
            }
            "decorated_definition" => {
                if let Some(def) = child.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => entities.push(extract_function(def, child, source)),
                        "class_definition" => entities.push(extract_class(def, child, source)),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    Ok(SourceUnit {
        source: source.to_string(),
        entities,
    })
}

/// 统计复杂度指标（函数/类/导入为全深度计数，与行数、字符数）
pub fn analyze_complexity(source: &str) -> Result<CodeMetrics, ExtractError> {
    let tree = parse_tree(source)?;

    let mut metrics = CodeMetrics {
        lines: source.lines().count(),
        characters: source.chars().count(),
        ..Default::default()
    };

    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "function_definition" => metrics.functions += 1,
            "class_definition" => metrics.classes += 1,
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                metrics.imports += 1
            }
            _ => {}
        }
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i as u32) {
                stack.push(child);
            }
        }
    }

    Ok(metrics)
}

fn parse_tree(source: &str) -> Result<tree_sitter::Tree, ExtractError> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_python::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| ExtractError::Language(e.to_string()))?;
    parser.parse(source, None).ok_or(ExtractError::Parse)
}

/// 定位第一个错误节点，报告其行号（1 起）
fn find_first_error(root: Node) -> (usize, String) {
    let mut best: Option<(usize, String)> = None;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            match &best {
                Some((l, _)) if *l <= line => {}
                _ => best = Some((line, message)),
            }
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i as u32) {
                stack.push(child);
            }
        }
    }

    best.unwrap_or((1, "invalid syntax".to_string()))
}

/// 提取函数实体
///
/// `node` 为 function_definition，`outer` 为含装饰器的外层节点
/// （无装饰器时二者相同），完整定义的行跨度与源码文本取自外层。
fn extract_function(node: Node, outer: Node, source: &str) -> CodeEntity {
    let name = field_text(node, "name", source);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| extract_params(p, source))
        .unwrap_or_default();
    let return_annotation = node
        .child_by_field_name("return_type")
        .map(|n| node_text(n, source).to_string());

    let body = BodyInfo::of(node, source);

    CodeEntity {
        kind: EntityKind::Function,
        name,
        params,
        return_annotation,
        is_async: has_async_keyword(node),
        bases: Vec::new(),
        methods: Vec::new(),
        start_line: outer.start_position().row,
        end_line: end_line_of(outer),
        body_start_line: body.start_line,
        body_indent: body.indent,
        body_inline: body.inline,
        docstring: body.docstring,
        source: node_text(outer, source).to_string(),
    }
}

/// 提取类实体
fn extract_class(node: Node, outer: Node, source: &str) -> CodeEntity {
    let name = field_text(node, "name", source);

    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            named_children(args)
                .iter()
                .map(|n| node_text(*n, source).to_string())
                .collect()
        })
        .unwrap_or_default();

    let methods = node
        .child_by_field_name("body")
        .map(|body| extract_methods(body, source))
        .unwrap_or_default();

    let body = BodyInfo::of(node, source);

    CodeEntity {
        kind: EntityKind::Class,
        name,
        params: Vec::new(),
        return_annotation: None,
        is_async: false,
        bases,
        methods,
        start_line: outer.start_position().row,
        end_line: end_line_of(outer),
        body_start_line: body.start_line,
        body_indent: body.indent,
        body_inline: body.inline,
        docstring: body.docstring,
        source: node_text(outer, source).to_string(),
    }
}

/// 类体内的方法列表（仅做元数据记录）
fn extract_methods(body: Node, source: &str) -> Vec<MethodInfo> {
    let mut methods = Vec::new();
    for child in named_children(body) {
        let def = match child.kind() {
            "function_definition" => Some(child),
            "decorated_definition" => child
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        if let Some(def) = def {
            let info = BodyInfo::of(def, source);
            methods.push(MethodInfo {
                name: field_text(def, "name", source),
                is_async: has_async_keyword(def),
                has_docstring: info.docstring.is_some(),
            });
        }
    }
    methods
}

/// 参数列表提取：按节点变体区分注解、默认值与分隔符
fn extract_params(parameters: Node, source: &str) -> Vec<Param> {
    let mut params = Vec::new();

    for child in named_children(parameters) {
        let param = match child.kind() {
            "identifier" => Some(Param {
                name: node_text(child, source).to_string(),
                annotation: None,
                default: None,
            }),
            "typed_parameter" => {
                let name = child
                    .named_child(0)
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                Some(Param {
                    name,
                    annotation: child
                        .child_by_field_name("type")
                        .map(|n| node_text(n, source).to_string()),
                    default: None,
                })
            }
            "default_parameter" => Some(Param {
                name: field_text(child, "name", source),
                annotation: None,
                default: child
                    .child_by_field_name("value")
                    .map(|n| node_text(n, source).to_string()),
            }),
            "typed_default_parameter" => Some(Param {
                name: field_text(child, "name", source),
                annotation: child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, source).to_string()),
                default: child
                    .child_by_field_name("value")
                    .map(|n| node_text(n, source).to_string()),
            }),
            "list_splat_pattern" | "dictionary_splat_pattern" => Some(Param {
                name: node_text(child, source).to_string(),
                annotation: None,
                default: None,
            }),
            "keyword_separator" => Some(Param {
                name: "*".to_string(),
                annotation: None,
                default: None,
            }),
            "positional_separator" => Some(Param {
                name: "/".to_string(),
                annotation: None,
                default: None,
            }),
            _ => None,
        };
        if let Some(param) = param {
            params.push(param);
        }
    }

    params
}

/// 实体体信息：起始行、缩进、是否同行、已有 docstring
struct BodyInfo {
    start_line: usize,
    indent: usize,
    inline: bool,
    docstring: Option<Docstring>,
}

impl BodyInfo {
    fn of(def: Node, source: &str) -> Self {
        let Some(body) = def.child_by_field_name("body") else {
            // 没有 body 字段的定义在合法语法下不会出现
            return Self {
                start_line: def.end_position().row,
                indent: 0,
                inline: true,
                docstring: None,
            };
        };

        let start = body.start_position();
        // 体起始列之前已有非空白内容，说明语句跟在签名冒号后面
        let inline = source
            .lines()
            .nth(start.row)
            .map(|line| {
                line.chars()
                    .take(start.column)
                    .any(|c| !c.is_whitespace())
            })
            .unwrap_or(false);

        Self {
            start_line: start.row,
            indent: start.column,
            inline,
            docstring: find_docstring(body, source),
        }
    }
}

/// 体内第一条语句为字符串字面量时视为 docstring
fn find_docstring(body: Node, source: &str) -> Option<Docstring> {
    let first = named_children(body)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0).filter(|n| n.kind() == "string")?;

    let raw = node_text(string, source);
    let text = clean_docstring(&unquote_string(raw)?);

    Some(Docstring {
        text,
        start_line: first.start_position().row,
        end_line: first.end_position().row,
    })
}

/// 去除字符串前缀字母与引号
///
/// 支持 `"""`、`'''`、`"`、`'` 与 r/b/f/u 前缀组合。
fn unquote_string(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let rest = trimmed.trim_start_matches(|c: char| c.is_ascii_alphabetic());

    for quote in ["\"\"\"", "'''"] {
        if rest.starts_with(quote) && rest.ends_with(quote) && rest.len() >= 6 {
            return Some(rest[3..rest.len() - 3].to_string());
        }
    }
    for quote in ['"', '\''] {
        if rest.len() >= 2 && rest.starts_with(quote) && rest.ends_with(quote) {
            return Some(rest[1..rest.len() - 1].to_string());
        }
    }
    None
}

/// 规范化 docstring 文本：去掉首尾空行与后续行的公共缩进
///
/// 与 Python `inspect.cleandoc` 的行为对齐，保证插入-再提取的往返一致。
pub fn clean_docstring(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut out = vec![lines[0].trim_start().to_string()];
    for line in &lines[1..] {
        if line.trim().is_empty() {
            out.push(String::new());
        } else {
            out.push(line.chars().skip(margin).collect());
        }
    }
    out.join("\n")
}

fn named_children(node: Node) -> Vec<Node> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i as u32))
        .collect()
}

fn has_async_keyword(def: Node) -> bool {
    (0..def.child_count())
        .filter_map(|i| def.child(i as u32))
        .any(|c| c.kind() == "async")
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn field_text(node: Node, field: &str, source: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default()
}

/// 定义结束行：end_position 在行首时归属上一行
fn end_line_of(node: Node) -> usize {
    let end = node.end_position();
    if end.column == 0 {
        end.row.saturating_sub(1)
    } else {
        end.row
    }
}
