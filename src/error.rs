use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配额相关错误
    Quota(QuotaError),
    /// 代理相关错误
    Proxy(ProxyError),
    /// 生成服务 API 调用错误
    Api(ApiError),
    /// 文件操作错误
    File(FileError),
    /// 数据表/分析配置错误
    Data(DataError),
    /// 配置错误
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Quota(e) => write!(f, "配额错误: {}", e),
            AppError::Proxy(e) => write!(f, "代理错误: {}", e),
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Data(e) => write!(f, "数据错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Quota(e) => Some(e),
            AppError::Proxy(e) => Some(e),
            AppError::Api(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Data(e) => Some(e),
            AppError::Config(e) => Some(e),
        }
    }
}

/// 配额相关错误
#[derive(Debug)]
pub enum QuotaError {
    /// 每日请求配额耗尽
    ///
    /// 对调用方是致命错误：当日剩余单元不再处理，已保存的进度保留
    DailyQuotaExceeded { limit: u32 },
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::DailyQuotaExceeded { limit } => {
                write!(f, "已达到每日请求上限 ({})", limit)
            }
        }
    }
}

impl std::error::Error for QuotaError {}

/// 代理相关错误
#[derive(Debug)]
pub enum ProxyError {
    /// 代理列表接口请求失败（网络层）
    RequestFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 代理列表接口返回错误响应
    FetchFailed { status: u16, body: String },
    /// 所有候选代理均未通过验证
    NoWorkingProxy { tried: usize },
    /// 代理描述符无法构建传输层配置
    InvalidEndpoint {
        host: String,
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::RequestFailed { source } => {
                write!(f, "获取代理列表失败: {}", source)
            }
            ProxyError::FetchFailed { status, body } => {
                write!(f, "代理列表接口返回错误 (状态码: {}): {}", status, body)
            }
            ProxyError::NoWorkingProxy { tried } => {
                write!(f, "没有可用代理 (已测试 {} 个候选)", tried)
            }
            ProxyError::InvalidEndpoint { host, port, source } => {
                write!(f, "无法构建代理配置 ({}:{}): {}", host, port, source)
            }
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::RequestFailed { source } | ProxyError::InvalidEndpoint { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 生成服务 API 调用错误
#[derive(Debug)]
pub enum ApiError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回非 2xx 响应，携带原始响应体
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "API请求失败 ({}): {}", endpoint, source)
            }
            ApiError::BadStatus {
                endpoint,
                status,
                body,
            } => {
                write!(
                    f,
                    "API返回错误响应 ({}): status={}, body={}",
                    endpoint, status, body
                )
            }
            ApiError::JsonParseFailed { source } => {
                write!(f, "JSON解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. } | ApiError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// CSV 读写失败
    CsvFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            FileError::CsvFailed { path, source } => {
                write!(f, "CSV处理失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. }
            | FileError::CsvFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 数据表/分析配置错误
#[derive(Debug)]
pub enum DataError {
    /// 指定列不存在
    ColumnNotFound { name: String },
    /// 分析配置为空
    NoAnalyses { path: String },
    /// 分析输出列名重复
    DuplicateColumn { name: String },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::ColumnNotFound { name } => write!(f, "数据表中找不到列: {}", name),
            DataError::NoAnalyses { path } => {
                write!(f, "分析配置文件中没有任何分析: {}", path)
            }
            DataError::DuplicateColumn { name } => {
                write!(f, "分析输出列名重复: {}", name)
            }
        }
    }
}

impl std::error::Error for DataError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 缺少必需的 API 密钥
    MissingApiKey { var_name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey { var_name } => {
                write!(f, "缺少必需的 API 密钥，请设置环境变量 {}", var_name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建API错误响应错误
    pub fn api_bad_status(
        endpoint: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        AppError::Api(ApiError::BadStatus {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        })
    }

    /// 创建JSON解析失败错误
    pub fn json_parse_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建CSV处理错误
    pub fn csv_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::CsvFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否为每日配额耗尽（运行级致命错误）
    pub fn is_daily_quota_exceeded(&self) -> bool {
        matches!(self, AppError::Quota(QuotaError::DailyQuotaExceeded { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
