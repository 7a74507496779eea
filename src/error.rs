use thiserror::Error;

/// 引擎统一错误类型
///
/// 空批次、零方差特征不属于错误，检测器直接返回空结果。
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),

    #[error("invalid detector parameter: {0}")]
    InvalidParameter(String),

    #[error("schema validation failed, missing columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl EngineError {
    /// 调用方输入问题 (HTTP 400) 还是服务端问题 (HTTP 500)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidContamination(_)
                | EngineError::InvalidParameter(_)
                | EngineError::MissingColumns(_)
                | EngineError::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
