use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{decode_error, require_api_key, status_error, PromptTemplate, Translator};
use crate::api_constants::api_config::{
    CLAUDE_API_VERSION, CLAUDE_DEFAULT_ENDPOINT, CLAUDE_DEFAULT_MODEL, CLAUDE_MAX_TOKENS,
};
use crate::error::Result;
use crate::translation_error;

const PROVIDER: &str = "Claude";

/// Anthropic Messages API 翻译后端
pub struct ClaudeTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    prompt: PromptTemplate,
}

impl ClaudeTranslator {
    pub fn new(
        client: Client,
        api_key: &str,
        endpoint: Option<&str>,
        model: Option<&str>,
        prompt: PromptTemplate,
    ) -> Result<Self> {
        let api_key = require_api_key(PROVIDER, api_key)?;
        let endpoint = endpoint.unwrap_or(CLAUDE_DEFAULT_ENDPOINT).to_string();
        let model = model.unwrap_or(CLAUDE_DEFAULT_MODEL).to_string();

        info!(
            "初始化 Claude 客户端: Endpoint={}, Model={}, APIVersion={}",
            endpoint, model, CLAUDE_API_VERSION
        );
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
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}

fn parse_response(status: StatusCode, body: &str) -> Result<String> {
    let response: MessagesResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) if status.is_success() => return Err(decode_error(PROVIDER, status, e, body)),
        Err(_) => return Err(status_error(PROVIDER, status, body)),
    };

    if let Some(err) = response.error {
        let message = format!("{} (类型: {})", err.message, err.kind);
        return Err(match (status, err.kind.as_str()) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _)
            | (_, "authentication_error" | "permission_error") => {
                translation_error!(auth, PROVIDER, message)
            }
            _ => translation_error!(translation_api, PROVIDER, status.as_u16(), message),
        });
    }

    if !status.is_success() {
        return Err(status_error(PROVIDER, status, body));
    }

    let stop_reason = response.stop_reason.unwrap_or_default();
    match response.content.into_iter().next() {
        Some(block) if block.kind == "text" && !block.text.is_empty() => Ok(block.text),
        _ => {
            warn!("Claude: API 响应不包含有效文本内容。停止原因: {}", stop_reason);
            Err(translation_error!(
                malformed,
                PROVIDER,
                format!("API 响应未包含有效翻译内容 (停止原因: {})", stop_reason)
            ))
        }
    }
}

#[async_trait]
impl Translator for ClaudeTranslator {
    async fn translate(&self, content: &str) -> Result<String> {
        let prompt = self.prompt.render(content);
        let request = MessagesRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
            max_tokens: CLAUDE_MAX_TOKENS,
        };

        debug!("Claude: 发送请求到 {} (模型: {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_API_VERSION)
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let text = parse_response(status, &body)?;

        debug!("Claude: 成功接收并解析响应");
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;

    #[test]
    fn test_parse_success() {
        let body = r#"{"content":[{"type":"text","text":"<translate># tar</translate>"}],"stop_reason":"end_turn","usage":{"input_tokens":10,"output_tokens":5}}"#;
        assert_eq!(
            parse_response(StatusCode::OK, body).unwrap(),
            "<translate># tar</translate>"
        );
    }

    #[test]
    fn test_parse_authentication_error() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert!(matches!(
            parse_response(StatusCode::UNAUTHORIZED, body),
            Err(TranslationError::Authentication { .. })
        ));
    }

    #[test]
    fn test_parse_overloaded_error() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(matches!(
            parse_response(StatusCode::from_u16(529).unwrap(), body),
            Err(TranslationError::TranslationApi { status_code: 529, .. })
        ));
    }

    #[test]
    fn test_parse_non_text_block() {
        let body = r#"{"content":[{"type":"tool_use"}],"stop_reason":"tool_use"}"#;
        assert!(matches!(
            parse_response(StatusCode::OK, body),
            Err(TranslationError::MalformedResponse { .. })
        ));
    }
}
