// ==========================================
// 出库计划引擎 - 拣货网络构建器
// ==========================================
// 结构: picking(并行) → 每个流程路径一个单流程叶子
// 叶子命名: 路径的 SCREAMING_SNAKE_CASE 名称
// 下游: 多件批次路径 → 分拣 → 上墙 → 墙面包装，其余路径 → 包装
// ==========================================

use crate::domain::backlog::OrderedBacklog;
use crate::domain::capacity::CapacityByHour;
use crate::domain::types::{ProcessName, ProcessPath};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::network::context::{
    ContextHolder, ParallelContext, ProcessContext, SimpleContext,
};
use crate::engine::network::graph::ProcessGraph;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// 拣货并行节点名称
pub const PICKING: &str = "picking";

/// 路径 → (时间 → 数量)
pub type QuantityByPathAndDate = BTreeMap<ProcessPath, BTreeMap<DateTime<Utc>, i64>>;

/// 下游工序 → (时间 → 数量)
pub type QuantityByProcessAndDate = BTreeMap<ProcessName, BTreeMap<DateTime<Utc>, i64>>;

/// 拣货之后的工序（arena 顺序）
pub const DOWNSTREAM_STAGES: [ProcessName; 4] = [
    ProcessName::Packing,
    ProcessName::BatchSorter,
    ProcessName::WallIn,
    ProcessName::PackingWall,
];

/// 路径拣货完成后依次经过的工序
pub fn downstream_route(path: ProcessPath) -> &'static [ProcessName] {
    match path {
        ProcessPath::TotMultiBatch | ProcessPath::NonTotMultiBatch => &[
            ProcessName::BatchSorter,
            ProcessName::WallIn,
            ProcessName::PackingWall,
        ],
        _ => &[ProcessName::Packing],
    }
}

pub struct PickingProjectionBuilder;

impl PickingProjectionBuilder {
    /// 构建拣货流程图（路径去重，保持首次出现顺序）
    ///
    /// # 错误
    /// - 路径列表为空: `InvalidArgument`
    pub fn build_graph(process_paths: &[ProcessPath]) -> EngineResult<ProcessGraph> {
        if process_paths.is_empty() {
            return Err(EngineError::InvalidArgument(
                "拣货流程图至少需要一个流程路径".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let leaves: Vec<String> = process_paths
            .iter()
            .filter(|path| seen.insert(**path))
            .map(|path| path.as_str().to_string())
            .collect();

        ProcessGraph::parallel(PICKING, leaves)
    }

    /// 构建拣货 + 下游工序流程图
    ///
    /// 每个工序的上游: 路线首站为对应路径叶子，其余为路线上前一工序。
    pub fn build_outbound_graph(process_paths: &[ProcessPath]) -> EngineResult<ProcessGraph> {
        let mut graph = Self::build_graph(process_paths)?;
        let leaves: Vec<(ProcessPath, usize)> = process_paths
            .iter()
            .filter_map(|path| graph.index_of(path.as_str()).map(|i| (*path, i)))
            .collect();

        for stage in DOWNSTREAM_STAGES {
            let mut feeders: Vec<usize> = Vec::new();
            for (path, leaf) in &leaves {
                let route = downstream_route(*path);
                let feeder = match route.iter().position(|s| *s == stage) {
                    Some(0) => Some(*leaf),
                    Some(pos) => graph.index_of(route[pos - 1].as_str()),
                    None => None,
                };
                if let Some(feeder) = feeder {
                    if !feeders.contains(&feeder) {
                        feeders.push(feeder);
                    }
                }
            }
            graph.push_stage(stage.as_str(), feeders)?;
        }
        Ok(graph)
    }

    /// 下游工序上下文：每个工序一个单流程上下文，缺失的积压 / 产能按空处理
    ///
    /// # 错误
    /// - 积压或产能为负 / 产能整点重复: `InvalidInput`
    pub fn add_downstream_contexts(
        holder: &mut ContextHolder,
        backlog: &QuantityByProcessAndDate,
        throughput: &QuantityByProcessAndDate,
    ) -> EngineResult<()> {
        for stage in DOWNSTREAM_STAGES {
            let stage_backlog = match backlog.get(&stage) {
                Some(by_date) => OrderedBacklog::new(by_date.iter().map(|(d, q)| (*d, *q)))?,
                None => OrderedBacklog::empty(),
            };
            let tph = match throughput.get(&stage) {
                Some(by_hour) => CapacityByHour::new(by_hour.iter().map(|(d, v)| (*d, *v)))?,
                None => CapacityByHour::empty(),
            };
            holder.insert(
                stage.as_str(),
                ProcessContext::Simple(SimpleContext::new(tph, stage_backlog)),
            );
        }
        Ok(())
    }

    /// 构建上下文：两份输入中出现的每个路径一个单流程上下文，外加 picking
    ///
    /// # 错误
    /// - 积压或产能为负 / 产能整点重复: `InvalidInput`
    pub fn build_context_holder(
        backlog: &QuantityByPathAndDate,
        throughput: &QuantityByPathAndDate,
    ) -> EngineResult<ContextHolder> {
        let paths: BTreeSet<ProcessPath> =
            backlog.keys().chain(throughput.keys()).copied().collect();

        let mut holder = ContextHolder::new();
        let mut children = Vec::with_capacity(paths.len());
        let mut initial = Vec::with_capacity(paths.len());

        for path in paths {
            let path_backlog = match backlog.get(&path) {
                Some(by_date) => OrderedBacklog::new(by_date.iter().map(|(d, q)| (*d, *q)))?,
                None => OrderedBacklog::empty(),
            };
            let tph = match throughput.get(&path) {
                Some(by_hour) => CapacityByHour::new(by_hour.iter().map(|(d, v)| (*d, *v)))?,
                None => CapacityByHour::empty(),
            };

            initial.push(path_backlog.clone());
            children.push(path.as_str().to_string());
            holder.insert(
                path.as_str(),
                ProcessContext::Simple(SimpleContext::new(tph, path_backlog)),
            );
        }

        holder.insert(
            PICKING,
            ProcessContext::Parallel(ParallelContext::new(
                children,
                OrderedBacklog::sum(&initial),
            )),
        );
        Ok(holder)
    }
}
