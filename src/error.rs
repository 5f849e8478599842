use thiserror::Error;

/// 应用程序错误类型
///
/// 只有这里的错误会终止运行；单个图片的失败一律在分发边界转成
/// `DispatchOutcome`，不会出现在这里。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入 CSV 无法读取或格式错误
    #[error("加载输入失败: {0}")]
    Load(#[from] LoadError),
    /// 结果 CSV 写入失败
    #[error("写入结果文件失败 ({path}): {source}")]
    Sink {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 配置错误
    #[error("配置错误: {0}")]
    InvalidConfig(String),
    /// HTTP 客户端初始化失败
    #[error("HTTP 客户端初始化失败: {0}")]
    Client(#[from] reqwest::Error),
}

/// 输入加载错误
#[derive(Debug, Error)]
pub enum LoadError {
    /// 文件不存在或无法读取
    #[error("无法读取文件 {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 表头缺少必须的列
    #[error("CSV 缺少列 '{column}'")]
    MissingColumn { column: String },
    /// 某一行缺少必须的字段
    #[error("第 {line} 行缺少字段 '{column}'")]
    MissingField { line: u64, column: String },
    /// CSV 格式错误
    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),
}

/// 响应解析错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// 单个解析策略失败
    #[error("{strategy} 解析失败: {message}")]
    Strategy {
        strategy: &'static str,
        message: String,
    },
    /// 所有策略均失败
    #[error("无法解析响应: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Exhausted(Vec<ParseError>),
}

impl ParseError {
    pub fn strategy(strategy: &'static str, message: impl Into<String>) -> Self {
        ParseError::Strategy {
            strategy,
            message: message.into(),
        }
    }
}

impl AppError {
    /// 创建结果写入错误
    pub fn sink(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Sink {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
