//! 内置 Prompt 模板
//!
//! 模板文件缺失时的默认值；占位符 `{function_code}` / `{class_code}` 必需，
//! `{name}` / `{signature}` 可选。

/// 函数 docstring 生成 Prompt
pub const DEFAULT_FUNCTION_PROMPT: &str = r#"You are an expert Python developer and code reviewer.

Write a complete, high-quality Python docstring for the following function,
following PEP-257:
- Start with a clear, concise summary of what the function does.
- Document all parameters (with types if obvious).
- Describe the return value (type and meaning).
- Mention raised exceptions if any.

Here is the function to document:

{function_code}

Return only the docstring body text. Do NOT include the original code,
triple quotes, or markdown fences."#;

/// 类 docstring 生成 Prompt
pub const DEFAULT_CLASS_PROMPT: &str = r#"You are an expert Python developer and code reviewer.

Write a complete, high-quality Python docstring for the following class,
following PEP-257:
- Start with a clear, concise summary of the class's purpose.
- Describe the main attributes and their meaning.
- Summarize the public methods briefly.

Here is the class to document:

{class_code}

Return only the docstring body text. Do NOT include the original code,
triple quotes, or markdown fences."#;
