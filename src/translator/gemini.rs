use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{decode_error, require_api_key, status_error, PromptTemplate, Translator};
use crate::api_constants::api_config::GEMINI_DEFAULT_MODEL;
use crate::api_constants::gemini_endpoint_for;
use crate::error::Result;
use crate::translation_error;

const PROVIDER: &str = "Gemini";

/// Google Gemini generateContent 翻译后端
pub struct GeminiTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
    prompt: PromptTemplate,
}

impl GeminiTranslator {
    /// 未指定端点时根据模型名称构建默认端点
    pub fn new(
        client: Client,
        api_key: &str,
        endpoint: Option<&str>,
        model: Option<&str>,
        prompt: PromptTemplate,
    ) -> Result<Self> {
        let api_key = require_api_key(PROVIDER, api_key)?;
        let model = model.unwrap_or(GEMINI_DEFAULT_MODEL);
        let endpoint = match endpoint {
            Some(endpoint) => {
                info!("Gemini: 使用用户提供的完整 API 端点: {}", endpoint);
                endpoint.to_string()
            }
            None => gemini_endpoint_for(model),
        };

        info!("初始化 Gemini 客户端: Endpoint={}", endpoint);
        Ok(Self {
            client,
            api_key,
            endpoint,
            prompt,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: u16,
    message: String,
    #[serde(default)]
    status: String,
}

fn parse_response(status: StatusCode, body: &str) -> Result<String> {
    let response: GenerateResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) if status.is_success() => return Err(decode_error(PROVIDER, status, e, body)),
        Err(_) => return Err(status_error(PROVIDER, status, body)),
    };

    if let Some(err) = response.error {
        let message = format!("{} (Code: {}, Status: {})", err.message, err.code, err.status);
        return Err(match err.status.as_str() {
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => translation_error!(auth, PROVIDER, message),
            _ => translation_error!(translation_api, PROVIDER, status.as_u16(), message),
        });
    }

    if !status.is_success() {
        return Err(status_error(PROVIDER, status, body));
    }

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .filter(|r| !r.is_empty())
    {
        return Err(translation_error!(
            malformed,
            PROVIDER,
            format!("请求被阻止，原因: {}", reason)
        ));
    }

    let candidate = match response.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            warn!("Gemini: API 响应不包含候选结果");
            return Err(translation_error!(malformed, PROVIDER, "API 响应未包含候选结果"));
        }
    };

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    if finish_reason != "STOP" && finish_reason != "MAX_TOKENS" {
        return Err(translation_error!(
            malformed,
            PROVIDER,
            format!("生成因 '{}' 原因停止", finish_reason)
        ));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        warn!("Gemini: 候选结果中不包含有效文本内容。FinishReason: {}", finish_reason);
        return Err(translation_error!(
            malformed,
            PROVIDER,
            format!("API 响应未包含有效翻译内容 (FinishReason: {})", finish_reason)
        ));
    }

    Ok(text)
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(&self, content: &str) -> Result<String> {
        let prompt = self.prompt.render(content);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: &prompt }],
            }],
        };

        // API Key 在 URL 中，不打印
        debug!("Gemini: 发送请求到 {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let text = parse_response(status, &body)?;

        debug!("Gemini: 成功接收并解析响应");
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
