//! Mock 生成器
//!
//! 离线回落模式：不发起网络调用，根据实体签名渲染确定性的
//! 占位 docstring，保证相同输入得到逐字节相同的输出。

use crate::services::extractor::{CodeEntity, EntityKind};

/// 根据实体签名渲染确定性 docstring 正文
pub fn render_mock_docstring(entity: &CodeEntity) -> String {
    match entity.kind {
        EntityKind::Function => render_function(entity),
        EntityKind::Class => render_class(entity),
    }
}

fn render_function(entity: &CodeEntity) -> String {
    let mut out = format!(
        "Auto-generated documentation for function `{}`.",
        entity.signature()
    );

    let params: Vec<_> = entity
        .params
        .iter()
        .filter(|p| p.name != "*" && p.name != "/")
        .collect();

    if !params.is_empty() {
        out.push_str("\n\nArgs:");
        for param in params {
            match &param.annotation {
                Some(ann) => {
                    out.push_str(&format!("\n    {} ({}): Parameter `{}`.", param.name, ann, param.name))
                }
                None => out.push_str(&format!("\n    {}: Parameter `{}`.", param.name, param.name)),
            }
        }
    }

    if let Some(ret) = &entity.return_annotation {
        out.push_str(&format!("\n\nReturns:\n    {}: Return value.", ret));
    }

    out
}

fn render_class(entity: &CodeEntity) -> String {
    let mut out = format!("Auto-generated documentation for class `{}`.", entity.name);

    if !entity.bases.is_empty() {
        out.push_str(&format!("\n\nInherits from: {}.", entity.bases.join(", ")));
    }

    if !entity.methods.is_empty() {
        let names: Vec<&str> = entity.methods.iter().map(|m| m.name.as_str()).collect();
        out.push_str(&format!("\n\nMethods:\n    {}", names.join(", ")));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor;

    #[test]
    fn test_function_mock_is_deterministic() {
        let source = "def add(a: int, b: int) -> int:\n    return a + b\n";
        let unit = extractor::parse(source).unwrap();

        let first = render_mock_docstring(&unit.entities[0]);
        let second = render_mock_docstring(&unit.entities[0]);
        assert_eq!(first, second);

        assert!(first.starts_with(
            "Auto-generated documentation for function `add(a: int, b: int) -> int`."
        ));
        assert!(first.contains("a (int): Parameter `a`."));
        assert!(first.contains("Returns:\n    int: Return value."));
    }

    #[test]
    fn test_class_mock_lists_methods() {
        let source = "class Calculator(Base):\n    def add(self, a, b):\n        return a + b\n";
        let unit = extractor::parse(source).unwrap();

        let text = render_mock_docstring(&unit.entities[0]);
        assert!(text.starts_with("Auto-generated documentation for class `Calculator`."));
        assert!(text.contains("Inherits from: Base."));
        assert!(text.contains("Methods:\n    add"));
    }

    #[test]
    fn test_separators_excluded_from_args() {
        let source = "def f(a, *, b):\n    return a\n";
        let unit = extractor::parse(source).unwrap();

        let text = render_mock_docstring(&unit.entities[0]);
        assert!(!text.contains("    * "));
        assert!(text.contains("b: Parameter `b`."));
    }
}
