// ==========================================
// 出库计划引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 引擎内不重试、不吞错，全部向调用方传播
// ==========================================

use chrono::{DateTime, Utc};
use thiserror::Error;

/// 引擎错误类型
///
/// 所有错误均为确定性错误（同样输入必然复现），调用方映射为 4xx。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 输入错误 =====
    #[error("无效时间范围: from={from} > to={to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ===== 结构错误 =====
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    // ===== 查询错误 =====
    #[error("未知流程: {0}")]
    UnknownProcess(String),
}

impl EngineError {
    /// 负数量校验失败
    pub fn negative(field: &str, value: i64) -> Self {
        EngineError::InvalidInput(format!("{} 不能为负数: {}", field, value))
    }

    /// 件·秒换算溢出
    pub fn overflow(field: &str) -> Self {
        EngineError::InvalidInput(format!("{} 超出可计算范围", field))
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

/// 单个数量 / 产能的上限
///
/// 引擎内部按 "件·秒" (×3600) 分配，上限保证单值换算不溢出 i64；
/// 多值累加仍用 checked 运算。
pub const MAX_QUANTITY: i64 = 1_000_000_000_000;

/// 校验数量在 [0, MAX_QUANTITY] 内
pub(crate) fn ensure_quantity(field: &str, value: i64) -> EngineResult<i64> {
    if value < 0 {
        return Err(EngineError::negative(field, value));
    }
    if value > MAX_QUANTITY {
        return Err(EngineError::InvalidInput(format!(
            "{} 超出上限 {}: {}",
            field, MAX_QUANTITY, value
        )));
    }
    Ok(value)
}
