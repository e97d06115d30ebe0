// ==========================================
// 出库计划引擎 - 分段上游流入
// ==========================================
// 时间 → (流程名 → 积压)；时间戳落在 [t0, t1) 的流入在 t0 注入
// ==========================================

use crate::domain::backlog::OrderedBacklog;
use crate::domain::types::ProcessPath;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PiecewiseUpstream {
    by_date: BTreeMap<DateTime<Utc>, BTreeMap<String, OrderedBacklog>>,
}

impl PiecewiseUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按路径分组的流入（流程名取路径名）
    pub fn from_paths(inflows: &BTreeMap<DateTime<Utc>, BTreeMap<ProcessPath, OrderedBacklog>>) -> Self {
        let mut upstream = Self::new();
        for (date, by_path) in inflows {
            for (path, backlog) in by_path {
                upstream.add(*date, path.as_str(), backlog);
            }
        }
        upstream
    }

    /// 追加流入（同一时间同一流程累加）
    pub fn add(&mut self, date: DateTime<Utc>, process: impl Into<String>, backlog: &OrderedBacklog) {
        let entry = self
            .by_date
            .entry(date)
            .or_default()
            .entry(process.into())
            .or_default();
        *entry = entry.merge(backlog);
    }

    /// [from, to) 内指定流程的流入合计
    pub fn inflow_between(
        &self,
        process: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> OrderedBacklog {
        if to <= from {
            return OrderedBacklog::empty();
        }
        OrderedBacklog::sum(
            self.by_date
                .range(from..to)
                .filter_map(|(_, by_process)| by_process.get(process)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
