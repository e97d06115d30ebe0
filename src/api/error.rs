// ==========================================
// 出库计划引擎 - API层错误类型
// ==========================================
// 职责: 汇总引擎/配置/请求错误，区分调用方错误与服务端错误
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::EngineError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("请求解析失败: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    // ==========================================
    // 服务端错误
    // ==========================================
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("结果序列化失败: {0}")]
    Serialization(String),
}

impl ApiError {
    /// 是否为调用方错误（4xx）
    ///
    /// 引擎错误均为确定性输入错误，归为调用方错误
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::InvalidRequest(_) | ApiError::Engine(_))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let engine = ApiError::from(EngineError::InvalidArgument("empty".to_string()));
        assert!(engine.is_client_error());
        assert!(engine.to_string().contains("无效参数"));

        let config = ApiError::from(ConfigError::Invalid("step".to_string()));
        assert!(!config.is_client_error());

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ApiError::from(parse).is_client_error());
    }
}
