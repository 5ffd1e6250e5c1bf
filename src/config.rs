use crate::error::{AppError, AppResult, ConfigError};
use crate::models::QuotaLimits;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- 生成服务配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    // --- 代理列表服务配置 ---
    pub webshare_api_key: String,
    pub webshare_api_base_url: String,
    /// 代理国家过滤（country_code__in 参数）
    pub proxy_country: String,
    /// 单个代理验证超时（秒）
    pub proxy_test_timeout_secs: u64,
    // --- 数据集配置 ---
    /// 输入数据集（CSV）
    pub input_file: String,
    /// 包含评论文本的列名
    pub review_column: String,
    /// 分析配置文件（TOML，按顺序定义输出列与提示词）
    pub analyses_file: String,
    // --- 输出产物配置 ---
    /// 逐单元刷新的进度快照
    pub progress_file: String,
    /// 运行结束时的最终导出
    pub final_file: String,
    /// 错误日志文件
    pub error_log_file: String,
    /// 代理列表副本（供人工检查）
    pub proxies_list_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 配额限制 ---
    pub requests_per_minute: u32,
    pub tokens_per_minute: u64,
    pub requests_per_day: u32,
    // --- 请求行为 ---
    /// 每个单元之间的固定间隔（秒），独立于配额状态
    pub politeness_delay_secs: u64,
    /// 生成/计数请求的超时（秒）
    pub request_timeout_secs: u64,
    /// 提示词与评论之间的分隔文本
    pub prompt_separator: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model_name: "gemini-1.5-flash-latest".to_string(),
            webshare_api_key: String::new(),
            webshare_api_base_url: "https://proxy.webshare.io".to_string(),
            proxy_country: "US".to_string(),
            proxy_test_timeout_secs: 10,
            input_file: "reviews.csv".to_string(),
            review_column: "review text".to_string(),
            analyses_file: "analyses.toml".to_string(),
            progress_file: "sentiment_analysis_results.csv".to_string(),
            final_file: "sentiment_analysis_results_final.csv".to_string(),
            error_log_file: "error_log.txt".to_string(),
            proxies_list_file: "proxies_list.csv".to_string(),
            output_log_file: "output.txt".to_string(),
            requests_per_minute: 15,
            tokens_per_minute: 1_000_000,
            requests_per_day: 1500,
            politeness_delay_secs: 4,
            request_timeout_secs: 120,
            prompt_separator: "Questo è il commento da analizzare:".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.gemini_api_base_url),
            gemini_model_name: std::env::var("GEMINI_MODEL_NAME").unwrap_or(default.gemini_model_name),
            webshare_api_key: std::env::var("WEBSHARE_API_KEY").unwrap_or(default.webshare_api_key),
            webshare_api_base_url: std::env::var("WEBSHARE_API_BASE_URL").unwrap_or(default.webshare_api_base_url),
            proxy_country: std::env::var("PROXY_COUNTRY").unwrap_or(default.proxy_country),
            proxy_test_timeout_secs: std::env::var("PROXY_TEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.proxy_test_timeout_secs),
            input_file: std::env::var("INPUT_FILE").unwrap_or(default.input_file),
            review_column: std::env::var("REVIEW_COLUMN").unwrap_or(default.review_column),
            analyses_file: std::env::var("ANALYSES_FILE").unwrap_or(default.analyses_file),
            progress_file: std::env::var("PROGRESS_FILE").unwrap_or(default.progress_file),
            final_file: std::env::var("FINAL_FILE").unwrap_or(default.final_file),
            error_log_file: std::env::var("ERROR_LOG_FILE").unwrap_or(default.error_log_file),
            proxies_list_file: std::env::var("PROXIES_LIST_FILE").unwrap_or(default.proxies_list_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            requests_per_minute: std::env::var("REQUESTS_PER_MINUTE_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.requests_per_minute),
            tokens_per_minute: std::env::var("TOKENS_PER_MINUTE_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.tokens_per_minute),
            requests_per_day: std::env::var("REQUESTS_PER_DAY_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.requests_per_day),
            politeness_delay_secs: std::env::var("POLITENESS_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.politeness_delay_secs),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            prompt_separator: std::env::var("PROMPT_SEPARATOR").unwrap_or(default.prompt_separator),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 校验必需的凭据
    ///
    /// 两个密钥都缺一不可：没有生成服务密钥无法发起分析请求，
    /// 没有代理列表密钥无法获取出口代理
    pub fn validate(&self) -> AppResult<()> {
        if self.gemini_api_key.is_empty() {
            return Err(AppError::Config(ConfigError::MissingApiKey {
                var_name: "GEMINI_API_KEY".to_string(),
            }));
        }
        if self.webshare_api_key.is_empty() {
            return Err(AppError::Config(ConfigError::MissingApiKey {
                var_name: "WEBSHARE_API_KEY".to_string(),
            }));
        }
        Ok(())
    }

    /// 从配置提取配额限制
    pub fn quota_limits(&self) -> QuotaLimits {
        QuotaLimits {
            requests_per_minute: self.requests_per_minute,
            tokens_per_minute: self.tokens_per_minute,
            requests_per_day: self.requests_per_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = Config::default();
        let limits = config.quota_limits();
        assert_eq!(limits.requests_per_minute, 15);
        assert_eq!(limits.tokens_per_minute, 1_000_000);
        assert_eq!(limits.requests_per_day, 1500);
    }

    #[test]
    fn test_validate_requires_keys() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            gemini_api_key: "k1".to_string(),
            webshare_api_key: "k2".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
