use thiserror::Error;

/// 网络层错误。只有 Connect / Timeout / Server 属于瞬时故障，可以重试。
/// Body 兜底其余情况（URL 构造失败、响应解码失败等）。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("连接失败: {0}")]
    Connect(String),
    #[error("请求超时: {0}")]
    Timeout(String),
    #[error("服务端错误: HTTP {0}")]
    Server(u16),
    #[error("请求被拒绝: HTTP {0}")]
    Status(u16),
    #[error("请求失败: {0}")]
    Body(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Connect(_) | FetchError::Timeout(_) | FetchError::Server(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout(e.to_string());
        }
        if let Some(status) = e.status() {
            return if status.is_server_error() {
                FetchError::Server(status.as_u16())
            } else {
                FetchError::Status(status.as_u16())
            };
        }
        // 对端建立连接后断开（reset / 半截响应）时 is_connect() 为 false，归为 request 或 body 阶段
        if e.is_connect() || e.is_request() || e.is_body() || has_connection_io_source(&e) {
            return FetchError::Connect(e.to_string());
        }
        FetchError::Body(e.to_string())
    }
}

fn has_connection_io_source(e: &reqwest::Error) -> bool {
    use std::io::ErrorKind;

    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = std::error::Error::source(err);
    }
    false
}

/// 响应结构与预期不符。换数据源之前重试没有意义。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("JSON 解析失败: {0}")]
    Json(String),
    #[error("缺少字段 {0}")]
    MissingField(&'static str),
    #[error("字段 {field} 取值无效: {raw}")]
    InvalidValue { field: &'static str, raw: String },
    #[error("行情列表中未找到代码 {0}")]
    RowNotFound(String),
    #[error("响应数据为空")]
    EmptyRow,
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e.to_string())
    }
}

/// 价格字段超出合理区间，视为上游脏数据。
#[derive(Error, Debug, Clone, PartialEq)]
#[error("字段 {field} 超出合理区间: {value}")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: f64,
}

/// 单个数据源一次尝试的失败原因。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Fetch(e) => e.is_transient(),
            ProviderError::Parse(_) | ProviderError::Validation(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Fetch(e) if e.is_transient() => "transient",
            ProviderError::Fetch(_) => "fetch",
            ProviderError::Parse(_) => "parse",
            ProviderError::Validation(_) => "validation",
        }
    }
}

#[derive(Error, Debug)]
pub enum HistoryLogError {
    #[error("历史文件读写失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("历史记录格式错误: {0}")]
    Csv(#[from] csv::Error),
    #[error("合成占位数据不写入历史文件")]
    SyntheticQuote,
}
