//! 出口代理描述符

use crate::error::{AppError, AppResult, ProxyError};

/// 出口代理描述符
///
/// 主机、端口、用户名、密码分字段保存，传输层代理配置由字段构建，
/// 凭据不进入 URL 字符串拼接，也不进入日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ProxyDescriptor {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// 不含凭据的端点标识（用于日志显示）
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 构建 reqwest 传输层代理配置
    pub fn to_reqwest_proxy(&self) -> AppResult<reqwest::Proxy> {
        let proxy =
            reqwest::Proxy::all(format!("http://{}:{}", self.host, self.port)).map_err(|e| {
                AppError::Proxy(ProxyError::InvalidEndpoint {
                    host: self.host.clone(),
                    port: self.port,
                    source: Box::new(e),
                })
            })?;

        Ok(proxy.basic_auth(&self.username, &self.password))
    }
}
