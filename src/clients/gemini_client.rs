//! 生成服务客户端
//!
//! 封装 generateContent / countTokens 两个接口，所有请求都经过运行期间
//! 固定的出口代理。
//!
//! ## 响应处理约定
//! - 非 2xx 响应是硬失败，携带原始响应体向上传播
//! - 2xx 但结构上缺少 candidates[0].content.parts[0].text 时返回固定的
//!   占位文本，不视为错误

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::ProxyDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// 响应结构缺失时返回的占位文本
pub const NO_RESPONSE_TEXT: &str = "No response";

/// 代理探测使用的固定提示词
const PROBE_PROMPT: &str = "Explain how AI works";

/// 内容生成能力
///
/// 生成服务与 token 计数器的统一接口；token 计数对提示词长度单调即可
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// 估算提示词的 token 成本
    async fn count_tokens(&self, prompt: &str) -> AppResult<u64>;

    /// 生成内容，返回第一候选的第一段文本
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

// ========== 请求/响应结构 ==========

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn single(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u64,
}

/// 提取第一候选的第一段文本，结构缺失时降级为占位文本
fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .unwrap_or_else(|| NO_RESPONSE_TEXT.to_string())
}

// ========== 客户端 ==========

/// 生成服务客户端
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// 通过指定代理构建客户端
    ///
    /// 代理一经选定整个运行期间不再更换，客户端也只构建一次
    pub fn with_proxy(config: &Config, proxy: &ProxyDescriptor) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .proxy(proxy.to_reqwest_proxy()?)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::api_request_failed("client builder", e))?;

        Ok(Self {
            http,
            base_url: config.gemini_api_base_url.clone(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model_name.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, action)
    }

    async fn post(&self, action: &str, prompt: &str) -> AppResult<reqwest::Response> {
        let endpoint = self.endpoint(action);
        self.http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::single(prompt))
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn count_tokens(&self, prompt: &str) -> AppResult<u64> {
        debug!("估算 token 成本，提示词长度: {} 字符", prompt.chars().count());

        let response = self.post("countTokens", prompt).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::api_bad_status(self.endpoint("countTokens"), status, body));
        }

        let parsed: CountTokensResponse = response
            .json()
            .await
            .map_err(AppError::json_parse_failed)?;

        debug!("token 成本: {}", parsed.total_tokens);

        Ok(parsed.total_tokens)
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let response = self.post("generateContent", prompt).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::api_bad_status(
                self.endpoint("generateContent"),
                status,
                body,
            ));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(AppError::json_parse_failed)?;

        Ok(extract_text(parsed))
    }
}

// ========== 代理探测 ==========

/// 通过候选代理向生成服务发起一次真实探测请求
///
/// 超时、网络错误、非 2xx 都视为该候选失败，由调用方继续尝试下一个候选
pub async fn probe_via_proxy(config: &Config, candidate: &ProxyDescriptor) -> bool {
    let reqwest_proxy = match candidate.to_reqwest_proxy() {
        Ok(proxy) => proxy,
        Err(e) => {
            warn!("❌ 候选代理配置无效 ({}): {}", candidate.endpoint(), e);
            return false;
        }
    };

    let client = match reqwest::Client::builder()
        .proxy(reqwest_proxy)
        .timeout(Duration::from_secs(config.proxy_test_timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("❌ 无法构建探测客户端 ({}): {}", candidate.endpoint(), e);
            return false;
        }
    };

    let endpoint = format!(
        "{}/models/{}:generateContent",
        config.gemini_api_base_url, config.gemini_model_name
    );

    let result = client
        .post(&endpoint)
        .query(&[("key", config.gemini_api_key.as_str())])
        .json(&GenerateRequest::single(PROBE_PROMPT))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            warn!(
                "❌ 代理探测返回错误状态 ({}): {}",
                candidate.endpoint(),
                response.status()
            );
            false
        }
        Err(e) => {
            warn!("❌ 代理探测失败 ({}): {}", candidate.endpoint(), e);
            false
        }
    }
}
