//! OpenAI Chat Completions API 实现
//!
//! DeepSeek 与 OpenAI 都使用该格式，非流式单次请求。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::types::{ChatMessage, LlmError};

/// Chat Completions 请求载荷
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

/// Chat Completions 响应
#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

/// 发起一次 Chat Completions 调用，返回原始文本
pub async fn chat_completion(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
) -> Result<String, LlmError> {
    let payload = ChatRequest {
        model: model.to_string(),
        messages,
        temperature,
        max_tokens,
    };

    debug!("Chat request: endpoint={}, model={}", endpoint, model);

    let response = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Http(e)
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_text = response.text().await.unwrap_or_default();
        let message = error_text[..error_text.len().min(500)].to_string();
        error!("Chat API error: status={}, body={}", status_code, message);

        if status_code == 401 || status_code == 403 {
            return Err(LlmError::Auth {
                status: status_code,
                message,
            });
        }
        return Err(LlmError::Api {
            status: status_code,
            message,
        });
    }

    let parsed: ChatResponse = response.json().await.map_err(|e| {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(e)
        }
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}
