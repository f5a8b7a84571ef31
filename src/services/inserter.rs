//! Docstring 插入器
//!
//! 在原始源码中按实体体缩进拼接三引号 docstring 块：
//! 无 docstring 时插入在签名（含多行签名）之后、第一条语句之前，
//! 已有 docstring 时原位替换。除被修改的行跨度外，其余字节保持不变。
//!
//! 同一文件的多处插入必须按起始行降序（自底向上）应用，
//! 否则前面的插入会使后续实体的行偏移失效。

use crate::error::AppError;
use crate::services::extractor::CodeEntity;

/// 插入错误类型
#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    /// 实体体与签名同行，没有可插入的位置
    #[error("`{name}` 的实体体与签名同行，无法插入 docstring")]
    InlineBody { name: String },

    /// 实体行偏移超出当前文本范围（偏移已失效）
    #[error("`{name}` 的行偏移超出源码范围（第 {line} 行，共 {total} 行）")]
    SpanOutOfBounds {
        name: String,
        line: usize,
        total: usize,
    },
}

impl From<InsertError> for AppError {
    fn from(e: InsertError) -> Self {
        AppError::Insertion(e.to_string())
    }
}

/// 将 docstring 文本渲染为按指定宽度缩进的三引号块
///
/// 单行文本输出单行块；多行文本首行跟在开引号后，闭引号独占一行。
pub fn render_docstring_block(text: &str, indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    let text = text.trim();
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        lines.push("");
    }

    if lines.len() == 1 {
        return vec![format!("{pad}\"\"\"{}\"\"\"", lines[0])];
    }

    let mut block = Vec::with_capacity(lines.len() + 1);
    block.push(format!("{pad}\"\"\"{}", lines[0]));
    for line in &lines[1..] {
        if line.trim().is_empty() {
            block.push(String::new());
        } else {
            block.push(format!("{pad}{line}"));
        }
    }
    block.push(format!("{pad}\"\"\""));
    block
}

/// 对单个实体插入（或替换）docstring，返回新的源码文本
pub fn insert_docstring(
    source: &str,
    entity: &CodeEntity,
    text: &str,
) -> Result<String, InsertError> {
    if entity.body_inline {
        return Err(InsertError::InlineBody {
            name: entity.name.clone(),
        });
    }

    // 用 split('\n') 而非 lines()，保留行尾与末尾换行的原始字节
    let mut lines: Vec<String> = source.split('\n').map(String::from).collect();
    let total = lines.len();

    let block = render_docstring_block(text, entity.body_indent);

    match &entity.docstring {
        Some(existing) => {
            if existing.end_line >= total {
                return Err(InsertError::SpanOutOfBounds {
                    name: entity.name.clone(),
                    line: existing.end_line + 1,
                    total,
                });
            }
            lines.splice(existing.start_line..=existing.end_line, block);
        }
        None => {
            if entity.body_start_line >= total {
                return Err(InsertError::SpanOutOfBounds {
                    name: entity.name.clone(),
                    line: entity.body_start_line + 1,
                    total,
                });
            }
            lines.splice(
                entity.body_start_line..entity.body_start_line,
                block,
            );
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor;

    #[test]
    fn test_render_single_line_block() {
        let block = render_docstring_block("Add two numbers.", 4);
        assert_eq!(block, vec![r#"    """Add two numbers.""""#]);
    }

    #[test]
    fn test_render_multi_line_block() {
        let block = render_docstring_block("Summary.\n\nDetails here.", 4);
        assert_eq!(
            block,
            vec![
                r#"    """Summary."#.to_string(),
                String::new(),
                "    Details here.".to_string(),
                r#"    """"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_insert_after_signature() {
        let source = "def add(a: int, b: int) -> int:\n    return a + b\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], "Add two numbers.").unwrap();

        assert_eq!(
            patched,
            "def add(a: int, b: int) -> int:\n    \"\"\"Add two numbers.\"\"\"\n    return a + b\n"
        );
    }

    #[test]
    fn test_replace_existing_docstring_in_place() {
        let source = "def add(a, b):\n    \"\"\"Old text.\"\"\"\n    return a + b\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], "New text.").unwrap();

        assert_eq!(
            patched,
            "def add(a, b):\n    \"\"\"New text.\"\"\"\n    return a + b\n"
        );
        // 只有一个 docstring，不会追加第二个
        assert_eq!(patched.matches("\"\"\"").count(), 2);
    }

    #[test]
    fn test_replace_multi_line_docstring() {
        let source =
            "def f():\n    \"\"\"Old summary.\n\n    Old details.\n    \"\"\"\n    return 1\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], "New summary.").unwrap();

        assert_eq!(patched, "def f():\n    \"\"\"New summary.\"\"\"\n    return 1\n");
    }

    #[test]
    fn test_surrounding_bytes_untouched() {
        let source = "X = 1\n\n\ndef f():\n    return X\n\n\nY = 2\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], "Doc.").unwrap();

        assert!(patched.starts_with("X = 1\n\n\ndef f():\n"));
        assert!(patched.ends_with("    return X\n\n\nY = 2\n"));
    }

    #[test]
    fn test_inline_body_rejected() {
        let source = "def f(): return 1\n";
        let unit = extractor::parse(source).unwrap();
        let err = insert_docstring(source, &unit.entities[0], "Doc.").unwrap_err();

        assert!(matches!(err, InsertError::InlineBody { .. }));
    }

    #[test]
    fn test_round_trip_single_line() {
        let source = "def add(a, b):\n    return a + b\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], "Add two numbers.").unwrap();

        let reparsed = extractor::parse(&patched).unwrap();
        let doc = reparsed.entities[0].docstring.as_ref().unwrap();
        assert_eq!(doc.text, "Add two numbers.");
    }

    #[test]
    fn test_round_trip_multi_line() {
        let text = "Summary line.\n\nDetails about behavior.";
        let source = "def add(a, b):\n    return a + b\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], text).unwrap();

        let reparsed = extractor::parse(&patched).unwrap();
        let doc = reparsed.entities[0].docstring.as_ref().unwrap();
        assert_eq!(doc.text, text);
    }

    #[test]
    fn test_insert_after_multiline_signature() {
        let source = "def f(\n    a,\n    b,\n):\n    return a + b\n";
        let unit = extractor::parse(source).unwrap();
        let patched = insert_docstring(source, &unit.entities[0], "Doc.").unwrap();

        assert_eq!(
            patched,
            "def f(\n    a,\n    b,\n):\n    \"\"\"Doc.\"\"\"\n    return a + b\n"
        );
    }
}
