// ==========================================
// 出库计划引擎 - 有序积压模型
// ==========================================
// 红线: 积压按 CPT（截止时间）升序，先到期先处理
// 约定: 所有运算返回新值，不修改入参
// ==========================================

use crate::engine::error::{ensure_quantity, EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// OrderedBacklog - 按截止时间分组的积压
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<DateTime<Utc>, i64>",
    into = "BTreeMap<DateTime<Utc>, i64>"
)]
pub struct OrderedBacklog {
    by_date: BTreeMap<DateTime<Utc>, i64>,
}

impl OrderedBacklog {
    /// 从 (截止时间, 数量) 序列构造，同一截止时间的数量先求和
    ///
    /// # 错误
    /// - 数量为负或超过 `MAX_QUANTITY`: `InvalidInput`
    pub fn new<I>(entries: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (DateTime<Utc>, i64)>,
    {
        let mut backlog = Self::default();
        for (date, quantity) in entries {
            ensure_quantity("backlog quantity", quantity)?;
            backlog.add(date, quantity);
        }
        Ok(backlog)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 累加（仅供单次调用内部的构建过程使用）
    pub(crate) fn add(&mut self, date: DateTime<Utc>, quantity: i64) {
        let slot = self.by_date.entry(date).or_insert(0);
        *slot = slot.saturating_add(quantity);
    }

    /// 总量
    pub fn total(&self) -> i64 {
        self.by_date.values().fold(0i64, |acc, q| acc.saturating_add(*q))
    }

    /// 某截止时间的数量
    pub fn get(&self, date: DateTime<Utc>) -> i64 {
        self.by_date.get(&date).copied().unwrap_or(0)
    }

    /// 最早的非零截止时间
    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.by_date
            .iter()
            .find(|(_, q)| **q > 0)
            .map(|(d, _)| *d)
    }

    /// 截止时间 <= date 的数量合计
    pub fn quantity_until(&self, date: DateTime<Utc>) -> i64 {
        self.by_date.range(..=date).map(|(_, q)| *q).sum()
    }

    /// 合并两份积压
    pub fn merge(&self, other: &OrderedBacklog) -> OrderedBacklog {
        let mut merged = self.clone();
        for (date, quantity) in &other.by_date {
            merged.add(*date, *quantity);
        }
        merged
    }

    /// 多份积压求和
    pub fn sum<'a, I>(backlogs: I) -> OrderedBacklog
    where
        I: IntoIterator<Item = &'a OrderedBacklog>,
    {
        backlogs
            .into_iter()
            .fold(OrderedBacklog::default(), |acc, b| acc.merge(b))
    }

    /// 按截止时间升序消耗指定数量
    ///
    /// # 返回
    /// (被消耗部分, 剩余部分)；剩余部分不保留已清零的截止时间
    pub fn consume(&self, quantity: i64) -> (OrderedBacklog, OrderedBacklog) {
        let mut budget = quantity.max(0);
        let mut taken = OrderedBacklog::default();
        let mut remaining = OrderedBacklog::default();

        for (date, available) in &self.by_date {
            let take = budget.min(*available);
            if take > 0 {
                taken.add(*date, take);
                budget -= take;
            }
            if *available - take > 0 {
                remaining.add(*date, *available - take);
            }
        }

        (taken, remaining)
    }

    /// 按截止时间升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &i64)> {
        self.by_date.iter()
    }

    /// 截止时间列表（升序）
    pub fn dates(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.by_date.keys()
    }

    /// 是否无积压
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl TryFrom<BTreeMap<DateTime<Utc>, i64>> for OrderedBacklog {
    type Error = EngineError;

    fn try_from(value: BTreeMap<DateTime<Utc>, i64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderedBacklog> for BTreeMap<DateTime<Utc>, i64> {
    fn from(value: OrderedBacklog) -> Self {
        value.by_date
    }
}

// ==========================================
// PlannedUnits - 计划到达量
// ==========================================
// date_in: 需求可见时间（按整点生效）; date_out: CPT
// is_deferred: 已被递延到后续班次，递延投影中不参与竞争产能
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedUnits {
    pub date_in: DateTime<Utc>,
    pub date_out: DateTime<Utc>,
    pub quantity: i64,
    #[serde(default)]
    pub is_deferred: bool,
}

impl PlannedUnits {
    pub fn new(date_in: DateTime<Utc>, date_out: DateTime<Utc>, quantity: i64) -> Self {
        Self {
            date_in,
            date_out,
            quantity,
            is_deferred: false,
        }
    }

    /// 标记为已递延
    pub fn deferred(mut self) -> Self {
        self.is_deferred = true;
        self
    }
}
