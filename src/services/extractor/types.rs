//! 代码实体类型定义
//!
//! 解析产物：源码单元、函数/类实体、参数、复杂度指标。

use serde::Serialize;

/// 实体种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// 顶层函数
    Function,
    /// 顶层类
    Class,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Function => "function",
            EntityKind::Class => "class",
        }
    }
}

/// 函数参数
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    /// 参数名（`*args` / `**kwargs` 含星号前缀，`*` / `/` 为分隔符）
    pub name: String,
    /// 类型注解
    pub annotation: Option<String>,
    /// 默认值表达式
    pub default: Option<String>,
}

/// 类方法信息（记录在类实体上，不独立生成文档）
#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub is_async: bool,
    pub has_docstring: bool,
}

/// 已存在的 docstring
#[derive(Debug, Clone, Serialize)]
pub struct Docstring {
    /// 规范化后的文本（去除引号与公共缩进）
    pub text: String,
    /// 起始行（0 起）
    pub start_line: usize,
    /// 结束行（0 起，含）
    pub end_line: usize,
}

/// 一个函数或类实体
///
/// 所有行号都指向提取时的原始源码；文本被修改后偏移即失效，
/// 多处插入必须按起始行降序应用。
#[derive(Debug, Clone, Serialize)]
pub struct CodeEntity {
    pub kind: EntityKind,
    pub name: String,
    /// 参数列表（仅函数）
    pub params: Vec<Param>,
    /// 返回类型注解（仅函数）
    pub return_annotation: Option<String>,
    /// 是否 async def
    pub is_async: bool,
    /// 基类列表（仅类）
    pub bases: Vec<String>,
    /// 方法列表（仅类）
    pub methods: Vec<MethodInfo>,
    /// 完整定义起始行（0 起，含装饰器）
    pub start_line: usize,
    /// 完整定义结束行（0 起，含）
    pub end_line: usize,
    /// 实体体第一条语句所在行（0 起）
    pub body_start_line: usize,
    /// 实体体缩进宽度（列数）
    pub body_indent: usize,
    /// 实体体与签名同行（`def f(): return 1` 形式），无法插入 docstring
    pub body_inline: bool,
    /// 已存在的 docstring（体内第一条字符串语句）
    pub docstring: Option<Docstring>,
    /// 完整定义源码文本（用于构建 Prompt）
    pub source: String,
}

impl CodeEntity {
    /// 渲染单行签名字符串，如 `async fetch(url: str, timeout=30) -> dict`
    pub fn signature(&self) -> String {
        match self.kind {
            EntityKind::Function => {
                let params: Vec<String> = self.params.iter().map(render_param).collect();
                let mut sig = format!("{}({})", self.name, params.join(", "));
                if let Some(ret) = &self.return_annotation {
                    sig.push_str(&format!(" -> {}", ret));
                }
                if self.is_async {
                    sig = format!("async {}", sig);
                }
                sig
            }
            EntityKind::Class => {
                if self.bases.is_empty() {
                    self.name.clone()
                } else {
                    format!("{}({})", self.name, self.bases.join(", "))
                }
            }
        }
    }
}

fn render_param(param: &Param) -> String {
    match (&param.annotation, &param.default) {
        (Some(ann), Some(default)) => format!("{}: {} = {}", param.name, ann, default),
        (Some(ann), None) => format!("{}: {}", param.name, ann),
        (None, Some(default)) => format!("{}={}", param.name, default),
        (None, None) => param.name.clone(),
    }
}

/// 源码单元：一份输入文本与其按文档顺序排列的实体列表
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub source: String,
    pub entities: Vec<CodeEntity>,
}

impl SourceUnit {
    /// 按种类统计
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }
}

/// 代码复杂度指标（全部嵌套深度计数）
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeMetrics {
    pub functions: usize,
    pub classes: usize,
    pub imports: usize,
    pub lines: usize,
    pub characters: usize,
}
