// ==========================================
// 出库计划引擎 - 流程上下文
// ==========================================
// 职责: 保存每个流程节点的产能、积压与已处理区间
// 红线: 并行节点的积压 = 子节点积压之和（每个时间片之后都成立）
// ==========================================

use crate::domain::backlog::OrderedBacklog;
use crate::domain::capacity::{CapacityByHour, UNIT_SECONDS};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// 已处理区间
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedBacklog {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub backlog: OrderedBacklog,
}

// ==========================================
// SimpleContext - 单流程上下文
// ==========================================
// carry_unit_seconds: 上一时间片用剩的不足一件的产能（件·秒），
// 只在积压未清空时结转，空闲产能不结转
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleContext {
    pub tph: CapacityByHour,
    pub initial_backlog: OrderedBacklog,
    pub backlog: OrderedBacklog,
    pub processed_backlog: Vec<ProcessedBacklog>,
    pub carry_unit_seconds: i64,
}

impl SimpleContext {
    pub fn new(tph: CapacityByHour, initial_backlog: OrderedBacklog) -> Self {
        Self {
            tph,
            backlog: initial_backlog.clone(),
            initial_backlog,
            processed_backlog: Vec::new(),
            carry_unit_seconds: 0,
        }
    }

    /// 推进一个时间片: 合并流入后按截止时间升序消耗
    ///
    /// 可处理件数 = (结转 + 区间件·秒) / 3600，与 CPT 投影的累计精度一致。
    pub(crate) fn advance(&mut self, inflow: &OrderedBacklog, start: DateTime<Utc>, end: DateTime<Utc>) {
        let merged = self.backlog.merge(inflow);
        let budget = self
            .carry_unit_seconds
            .saturating_add(self.tph.unit_seconds_between(start, end));
        let (processed, remaining) = merged.consume(budget / UNIT_SECONDS);

        self.carry_unit_seconds = if remaining.is_empty() {
            0
        } else {
            budget % UNIT_SECONDS
        };
        self.backlog = remaining;
        self.processed_backlog.push(ProcessedBacklog {
            start_date: start,
            end_date: end,
            backlog: processed,
        });
    }

    /// 最近一个时间片的处理量
    pub fn last_processed(&self) -> Option<&OrderedBacklog> {
        self.processed_backlog.last().map(|p| &p.backlog)
    }
}

// ==========================================
// ParallelContext - 并行汇总上下文
// ==========================================
// 自身不分配产能，只汇总子节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParallelContext {
    pub children: Vec<String>,
    pub initial_backlog: OrderedBacklog,
    pub backlog: OrderedBacklog,
    pub processed_backlog: Vec<ProcessedBacklog>,
}

impl ParallelContext {
    pub fn new(children: Vec<String>, initial_backlog: OrderedBacklog) -> Self {
        Self {
            children,
            backlog: initial_backlog.clone(),
            initial_backlog,
            processed_backlog: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessContext {
    Simple(SimpleContext),
    Parallel(ParallelContext),
}

impl ProcessContext {
    /// 当前积压总量
    pub fn total(&self) -> i64 {
        self.backlog().total()
    }

    pub fn backlog(&self) -> &OrderedBacklog {
        match self {
            ProcessContext::Simple(ctx) => &ctx.backlog,
            ProcessContext::Parallel(ctx) => &ctx.backlog,
        }
    }

    pub fn initial_backlog(&self) -> &OrderedBacklog {
        match self {
            ProcessContext::Simple(ctx) => &ctx.initial_backlog,
            ProcessContext::Parallel(ctx) => &ctx.initial_backlog,
        }
    }

    pub fn processed_backlog(&self) -> &[ProcessedBacklog] {
        match self {
            ProcessContext::Simple(ctx) => &ctx.processed_backlog,
            ProcessContext::Parallel(ctx) => &ctx.processed_backlog,
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, ProcessContext::Parallel(_))
    }
}

// ==========================================
// ContextHolder - 流程名 → 上下文
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextHolder {
    contexts: BTreeMap<String, ProcessContext>,
}

impl ContextHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, context: ProcessContext) {
        self.contexts.insert(name.into(), context);
    }

    /// 查询上下文
    ///
    /// # 错误
    /// - 名称不存在: `UnknownProcess`
    pub fn context(&self, name: &str) -> EngineResult<&ProcessContext> {
        self.contexts
            .get(name)
            .ok_or_else(|| EngineError::UnknownProcess(name.to_string()))
    }

    pub(crate) fn context_mut(&mut self, name: &str) -> EngineResult<&mut ProcessContext> {
        self.contexts
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownProcess(name.to_string()))
    }

    /// 区间 [from, to) 内节点可用产能；并行节点为子节点之和
    pub fn available_between(
        &self,
        name: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<i64> {
        match self.context(name)? {
            ProcessContext::Simple(ctx) => Ok(ctx.tph.available_between(from, to)),
            ProcessContext::Parallel(ctx) => ctx
                .children
                .iter()
                .map(|child| self.available_between(child, from, to))
                .sum(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
