use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{decode_error, require_api_key, status_error, PromptTemplate, Translator};
use crate::api_constants::api_config::{OPENAI_DEFAULT_ENDPOINT, OPENAI_DEFAULT_MODEL};
use crate::error::Result;
use crate::translation_error;

const PROVIDER: &str = "OpenAI";

/// OpenAI Chat Completions 翻译后端
pub struct OpenAiTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    prompt: PromptTemplate,
}

impl OpenAiTranslator {
    pub fn new(
        client: Client,
        api_key: &str,
        endpoint: Option<&str>,
        model: Option<&str>,
        prompt: PromptTemplate,
    ) -> Result<Self> {
        let api_key = require_api_key(PROVIDER, api_key)?;
        let endpoint = endpoint.unwrap_or(OPENAI_DEFAULT_ENDPOINT).to_string();
        let model = model.unwrap_or(OPENAI_DEFAULT_MODEL).to_string();

        info!("初始化 OpenAI 客户端: Endpoint={}, Model={}", endpoint, model);
        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
            prompt,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// 解析 Chat Completions 响应，返回第一个候选的文本
fn parse_response(status: StatusCode, body: &str) -> Result<String> {
    let response: ChatResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) if status.is_success() => return Err(decode_error(PROVIDER, status, e, body)),
        // 非成功状态下响应体可能不是JSON
        Err(_) => return Err(status_error(PROVIDER, status, body)),
    };

    if let Some(err) = response.error {
        let message = format!(
            "{} (类型: {})",
            err.message,
            err.kind.as_deref().unwrap_or("unknown")
        );
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => translation_error!(auth, PROVIDER, message),
            _ => translation_error!(translation_api, PROVIDER, status.as_u16(), message),
        });
    }

    if !status.is_success() {
        return Err(status_error(PROVIDER, status, body));
    }

    let choice = response.choices.into_iter().next();
    let finish_reason = choice
        .as_ref()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_else(|| "未知".to_string());

    match choice.and_then(|c| c.message.content).filter(|c| !c.is_empty()) {
        Some(text) => Ok(text),
        None => {
            warn!("OpenAI: API 响应不包含有效内容。完成原因: {}", finish_reason);
            Err(translation_error!(
                malformed,
                PROVIDER,
                format!("API 响应未包含有效翻译内容 (完成原因: {})", finish_reason)
            ))
        }
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, content: &str) -> Result<String> {
        let prompt = self.prompt.render(content);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        debug!("OpenAI: 发送请求到 {} (模型: {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let text = parse_response(status, &body)?;

        debug!("OpenAI: 成功接收并解析响应");
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
