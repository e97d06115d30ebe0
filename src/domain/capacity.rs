// ==========================================
// 出库计划引擎 - 小时产能模型
// ==========================================
// 红线: 产能按整点分桶，缺失整点视为 0 产能（不是"跳过"）
// 用途: CPT 投影、拣货网络仿真的产能输入
// ==========================================

use crate::domain::time::{hours_between, truncate_to_hour};
use crate::domain::types::ProcessName;
use crate::engine::error::{ensure_quantity, EngineError, EngineResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 1 件 = 3600 件·秒（以 1 件/小时的产能处理 1 秒）
pub const UNIT_SECONDS: i64 = 3600;

// ==========================================
// CapacityByHour - 小时产能
// ==========================================
// 不可变: 构造后只读，按区间查询
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<DateTime<Utc>, i64>",
    into = "BTreeMap<DateTime<Utc>, i64>"
)]
pub struct CapacityByHour {
    by_hour: BTreeMap<DateTime<Utc>, i64>,
}

impl CapacityByHour {
    /// 从 (时间, 单位/小时) 序列构造
    ///
    /// # 错误
    /// - 产能为负或超过 `MAX_QUANTITY`: `InvalidInput`
    /// - 截断后整点重复: `InvalidInput`
    pub fn new<I>(entries: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (DateTime<Utc>, i64)>,
    {
        let mut by_hour = BTreeMap::new();
        for (date, value) in entries {
            ensure_quantity("capacity", value)?;
            let hour = truncate_to_hour(date);
            if by_hour.insert(hour, value).is_some() {
                return Err(EngineError::InvalidInput(format!(
                    "产能整点重复: {}",
                    hour
                )));
            }
        }
        Ok(Self { by_hour })
    }

    /// 空产能（全部整点为 0）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 多流程产能取每小时最小值（瓶颈流程决定整体产能）
    ///
    /// 某流程缺失某整点时，该整点按 0 计。
    pub fn from_min_throughput(
        throughput_by_process: &BTreeMap<ProcessName, BTreeMap<DateTime<Utc>, i64>>,
    ) -> EngineResult<Self> {
        let mut per_process = Vec::with_capacity(throughput_by_process.len());
        for series in throughput_by_process.values() {
            per_process.push(Self::new(series.iter().map(|(d, v)| (*d, *v)))?);
        }

        let hours: BTreeSet<DateTime<Utc>> = per_process
            .iter()
            .flat_map(|c| c.by_hour.keys().copied())
            .collect();

        let by_hour = hours
            .into_iter()
            .map(|hour| {
                let min = per_process.iter().map(|c| c.at(hour)).min().unwrap_or(0);
                (hour, min)
            })
            .collect();

        Ok(Self { by_hour })
    }

    /// 指定时间所在整点的产能
    pub fn at(&self, date: DateTime<Utc>) -> i64 {
        self.by_hour
            .get(&truncate_to_hour(date))
            .copied()
            .unwrap_or(0)
    }

    /// 区间 [from, to) 内可用产能（按分钟比例折算，向下取整）
    pub fn available_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        self.unit_seconds_between(from, to) / UNIT_SECONDS
    }

    /// 区间 [from, to) 内可用产能，单位为 "件·秒"（1 件 = 3600 件·秒）
    ///
    /// 引擎内部用此精度做分配，避免分钟折算的舍入误差累积。
    /// 单小时不会溢出（产能 <= MAX_QUANTITY），超长区间累加饱和到 i64::MAX。
    pub fn unit_seconds_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        if to <= from {
            return 0;
        }
        hours_between(from, to)
            .into_iter()
            .map(|hour| {
                let start = hour.max(from);
                let end = (hour + Duration::hours(1)).min(to);
                self.at(hour).saturating_mul((end - start).num_seconds())
            })
            .fold(0i64, i64::saturating_add)
    }

    /// 按整点升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &i64)> {
        self.by_hour.iter()
    }

    pub fn len(&self) -> usize {
        self.by_hour.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hour.is_empty()
    }
}

impl TryFrom<BTreeMap<DateTime<Utc>, i64>> for CapacityByHour {
    type Error = EngineError;

    fn try_from(value: BTreeMap<DateTime<Utc>, i64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapacityByHour> for BTreeMap<DateTime<Utc>, i64> {
    fn from(value: CapacityByHour) -> Self {
        value.by_hour
    }
}
