// ==========================================
// 出库计划引擎 - CPT 达成结果
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个 CPT 的投影结果
///
/// - `projected_end_date`: 全部需求处理完毕的时间；区间内无法完成为 None
/// - `remaining_quantity`: 截止时间（或投影终点，取较早者）仍未处理的数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentResult {
    pub date: DateTime<Utc>,
    pub projected_end_date: Option<DateTime<Utc>>,
    pub remaining_quantity: i64,
}

impl CommitmentResult {
    pub fn new(
        date: DateTime<Utc>,
        projected_end_date: Option<DateTime<Utc>>,
        remaining_quantity: i64,
    ) -> Self {
        Self {
            date,
            projected_end_date,
            remaining_quantity,
        }
    }

    /// 是否在截止时间前完成
    pub fn is_on_time(&self) -> bool {
        matches!(self.projected_end_date, Some(end) if end <= self.date)
    }
}
