// ==========================================
// 出库计划引擎 - 流程图（arena + 下标）
// ==========================================
// 红线: 子节点 / 上游节点下标小于本节点，按 arena 顺序求值即为拓扑序
// ==========================================
// 职责: 在时间线上推进各流程积压
// 输入: 上下文 + 分段上游 + 严格递增时间线
// 输出: 新的上下文（入参不变）
// ==========================================

use crate::domain::backlog::OrderedBacklog;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::network::context::{ContextHolder, ProcessContext, ProcessedBacklog};
use crate::engine::network::upstream::PiecewiseUpstream;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// 按自身产能消耗积压
    Simple,
    /// 汇总子节点
    Parallel { children: Vec<usize> },
    /// 下游工序：流入 = 上游节点本时间片的处理量
    Stage { feeders: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessNode {
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessGraph {
    nodes: Vec<ProcessNode>,
    root: usize,
}

impl ProcessGraph {
    /// 构造单层并行图：叶子在前，根节点在最后
    pub(crate) fn parallel(name: &str, leaves: Vec<String>) -> EngineResult<Self> {
        if leaves.is_empty() {
            return Err(EngineError::InvalidArgument(format!(
                "并行节点 {} 至少需要一个子节点",
                name
            )));
        }
        let mut nodes: Vec<ProcessNode> = leaves
            .into_iter()
            .map(|leaf| ProcessNode {
                name: leaf,
                kind: NodeKind::Simple,
            })
            .collect();
        let children = (0..nodes.len()).collect();
        nodes.push(ProcessNode {
            name: name.to_string(),
            kind: NodeKind::Parallel { children },
        });
        let root = nodes.len() - 1;
        Ok(Self { nodes, root })
    }

    /// 追加下游工序节点，返回其下标
    ///
    /// # 错误
    /// - 上游下标不存在（须先于本节点加入）: `InvalidArgument`
    /// - 名称重复: `InvalidArgument`
    pub(crate) fn push_stage(&mut self, name: &str, feeders: Vec<usize>) -> EngineResult<usize> {
        if self.index_of(name).is_some() {
            return Err(EngineError::InvalidArgument(format!("流程节点重复: {}", name)));
        }
        if let Some(bad) = feeders.iter().find(|f| **f >= self.nodes.len()) {
            return Err(EngineError::InvalidArgument(format!(
                "工序 {} 的上游下标 {} 不存在",
                name, bad
            )));
        }
        self.nodes.push(ProcessNode {
            name: name.to_string(),
            kind: NodeKind::Stage { feeders },
        });
        Ok(self.nodes.len() - 1)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// 根节点名称
    pub fn name(&self) -> &str {
        &self.nodes[self.root].name
    }

    pub fn nodes(&self) -> &[ProcessNode] {
        &self.nodes
    }

    /// 叶子节点名称（arena 顺序）
    pub fn leaf_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Simple)
            .map(|n| n.name.as_str())
    }

    /// 沿时间线推进
    ///
    /// # 错误
    /// - 时间线非严格递增: `InvalidInput`
    /// - 节点缺少上下文: `UnknownProcess`
    /// - 上下文类型与节点类型不符: `InvalidArgument`
    #[instrument(skip(self, holder, upstream, timeline), fields(
        graph = %self.name(),
        nodes = self.nodes.len(),
        steps = timeline.len().saturating_sub(1)
    ))]
    pub fn run(
        &self,
        holder: &ContextHolder,
        upstream: &PiecewiseUpstream,
        timeline: &[DateTime<Utc>],
    ) -> EngineResult<ContextHolder> {
        if let Some(pair) = timeline.windows(2).find(|w| w[1] <= w[0]) {
            return Err(EngineError::InvalidInput(format!(
                "时间线必须严格递增: {} -> {}",
                pair[0], pair[1]
            )));
        }
        self.check_contexts(holder)?;

        let mut result = holder.clone();
        for window in timeline.windows(2) {
            let (start, end) = (window[0], window[1]);
            for node in &self.nodes {
                match &node.kind {
                    NodeKind::Simple => {
                        Self::advance_simple(&mut result, &node.name, upstream, start, end)?
                    }
                    NodeKind::Parallel { children } => {
                        self.aggregate_parallel(&mut result, &node.name, children, start, end)?
                    }
                    NodeKind::Stage { feeders } => {
                        self.advance_stage(&mut result, &node.name, feeders, start, end)?
                    }
                }
            }
        }

        debug!(
            remaining = result.context(self.name())?.total(),
            "流程图推进完成"
        );
        Ok(result)
    }

    fn check_contexts(&self, holder: &ContextHolder) -> EngineResult<()> {
        for node in &self.nodes {
            let context = holder.context(&node.name)?;
            let expected_parallel = matches!(node.kind, NodeKind::Parallel { .. });
            if context.is_parallel() != expected_parallel {
                return Err(EngineError::InvalidArgument(format!(
                    "流程 {} 的上下文类型与图节点不符",
                    node.name
                )));
            }
        }
        Ok(())
    }

    fn advance_simple(
        holder: &mut ContextHolder,
        name: &str,
        upstream: &PiecewiseUpstream,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<()> {
        if let ProcessContext::Simple(ctx) = holder.context_mut(name)? {
            let inflow = upstream.inflow_between(name, start, end);
            ctx.advance(&inflow, start, end);
        }
        Ok(())
    }

    // 上游节点在本时间片已推进，其最近处理量即本工序流入
    fn advance_stage(
        &self,
        holder: &mut ContextHolder,
        name: &str,
        feeders: &[usize],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut inflows = Vec::with_capacity(feeders.len());
        for feeder in feeders {
            let context = holder.context(&self.nodes[*feeder].name)?;
            if let Some(last) = context.processed_backlog().last() {
                inflows.push(last.backlog.clone());
            }
        }
        let inflow = OrderedBacklog::sum(&inflows);

        if let ProcessContext::Simple(ctx) = holder.context_mut(name)? {
            ctx.advance(&inflow, start, end);
        }
        Ok(())
    }

    fn aggregate_parallel(
        &self,
        holder: &mut ContextHolder,
        name: &str,
        children: &[usize],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut backlogs = Vec::with_capacity(children.len());
        let mut processed = Vec::with_capacity(children.len());
        for child in children {
            let context = holder.context(&self.nodes[*child].name)?;
            backlogs.push(context.backlog().clone());
            if let Some(last) = context.processed_backlog().last() {
                processed.push(last.backlog.clone());
            }
        }

        if let ProcessContext::Parallel(ctx) = holder.context_mut(name)? {
            ctx.backlog = OrderedBacklog::sum(&backlogs);
            ctx.processed_backlog.push(ProcessedBacklog {
                start_date: start,
                end_date: end,
                backlog: OrderedBacklog::sum(&processed),
            });
        }
        Ok(())
    }
}
