//! 代理列表服务客户端
//!
//! 按国家过滤拉取候选代理；完整列表同时写成 CSV 供人工检查。
//! 列表接口本身直连访问，不经过出口代理。

use crate::config::Config;
use crate::error::{AppError, AppResult, ProxyError};
use crate::models::ProxyDescriptor;
use serde::Deserialize;
use std::time::Duration;
use tokio::fs;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ProxyListResponse {
    #[serde(default)]
    results: Vec<ProxyEntry>,
}

#[derive(Debug, Deserialize)]
struct ProxyEntry {
    proxy_address: String,
    port: u16,
    username: String,
    password: String,
}

/// 代理列表服务客户端
pub struct WebshareClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    country: String,
    artifact_path: String,
    request_timeout: Duration,
}

impl WebshareClient {
    /// 创建新的代理列表客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.webshare_api_base_url.clone(),
            api_key: config.webshare_api_key.clone(),
            country: config.proxy_country.clone(),
            artifact_path: config.proxies_list_file.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// 获取候选代理列表
    ///
    /// # 返回
    /// 按接口返回顺序排列的代理描述符；任何失败都在处理任何数据行之前中止运行
    pub async fn fetch_proxies(&self) -> AppResult<Vec<ProxyDescriptor>> {
        info!("🌐 正在获取代理列表 (国家: {})...", self.country);

        let endpoint = format!("{}/api/v2/proxy/list/", self.base_url);
        let response = self
            .http
            .get(&endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .query(&[
                ("country_code__in", self.country.as_str()),
                ("mode", "direct"),
            ])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                AppError::Proxy(ProxyError::RequestFailed {
                    source: Box::new(e),
                })
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Proxy(ProxyError::FetchFailed { status, body }));
        }

        let list: ProxyListResponse = response
            .json()
            .await
            .map_err(AppError::json_parse_failed)?;

        self.write_artifact(&list.results).await?;

        info!(
            "✓ 获取到 {} 个代理，列表已保存至 {}",
            list.results.len(),
            self.artifact_path
        );

        Ok(list
            .results
            .into_iter()
            .map(|entry| {
                ProxyDescriptor::new(entry.proxy_address, entry.port, entry.username, entry.password)
            })
            .collect())
    }

    /// 将完整代理列表写成 CSV
    async fn write_artifact(&self, entries: &[ProxyEntry]) -> AppResult<()> {
        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            writer
                .write_record(["proxy_address", "port", "username", "password"])
                .map_err(|e| AppError::csv_failed(self.artifact_path.as_str(), e))?;
            for entry in entries {
                let port = entry.port.to_string();
                writer
                    .write_record([
                        entry.proxy_address.as_str(),
                        port.as_str(),
                        entry.username.as_str(),
                        entry.password.as_str(),
                    ])
                    .map_err(|e| AppError::csv_failed(self.artifact_path.as_str(), e))?;
            }
            writer
                .flush()
                .map_err(|e| AppError::csv_failed(self.artifact_path.as_str(), e))?;
        }

        fs::write(&self.artifact_path, buf)
            .await
            .map_err(|e| AppError::file_write_failed(self.artifact_path.as_str(), e))
    }
}
