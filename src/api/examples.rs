//! 示例代码端点
//!
//! 提供几段固定的示例代码，供前端填充输入框。

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;
use std::sync::Arc;

/// 获取示例代码片段
async fn get_examples() -> Json<Value> {
    Json(json!({
        "fibonacci": {
            "name": "Fibonacci Function",
            "code": "def calculate_fibonacci(n: int) -> int:\n    if n <= 1:\n        return n\n    return calculate_fibonacci(n - 1) + calculate_fibonacci(n - 2)",
            "description": "A recursive function to calculate Fibonacci numbers."
        },
        "calculator": {
            "name": "Calculator Class",
            "code": "class Calculator:\n    def __init__(self):\n        self.history = []\n\n    def add(self, a: float, b: float) -> float:\n        result = a + b\n        self.history.append(f\"{a} + {b} = {result}\")\n        return result\n\n    def get_history(self) -> list:\n        return self.history.copy()",
            "description": "A simple calculator class with operation history."
        },
        "data_processor": {
            "name": "Data Processor",
            "code": "def process_data(data: list, filter_key: str = None, sort_by: str = None) -> list:\n    result = data.copy()\n\n    if filter_key:\n        result = [item for item in result if filter_key in item]\n\n    if sort_by:\n        result.sort(key=lambda x: x.get(sort_by, 0))\n\n    return result",
            "description": "A data processing function with filtering and sorting."
        }
    }))
}

/// 创建示例代码路由
pub fn examples_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/examples", get(get_examples))
}
