// ==========================================
// 出库计划引擎 - 流程网络仿真
// ==========================================
// 职责: 以并行/单流程/下游工序节点组成的有向图推进积压
// 用途: 波次决策时预估拣货与下游工序在制积压
// ==========================================

pub mod builder;
pub mod context;
pub mod graph;
pub mod upstream;

pub use builder::{
    downstream_route, PickingProjectionBuilder, QuantityByPathAndDate, QuantityByProcessAndDate,
    DOWNSTREAM_STAGES, PICKING,
};
pub use context::{
    ContextHolder, ParallelContext, ProcessContext, ProcessedBacklog, SimpleContext,
};
pub use graph::{NodeKind, ProcessGraph, ProcessNode};
pub use upstream::PiecewiseUpstream;
