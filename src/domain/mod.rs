// ==========================================
// 出库计划引擎 - 领域模型层
// ==========================================
// 职责: 定义产能、积压、CPT 结果、波次等值类型
// 红线: 不含引擎逻辑，所有实体单次调用内创建、用后即弃
// ==========================================

pub mod backlog;
pub mod capacity;
pub mod commitment;
pub mod time;
pub mod types;
pub mod wave;

// 重导出核心类型
pub use backlog::{OrderedBacklog, PlannedUnits};
pub use capacity::{CapacityByHour, UNIT_SECONDS};
pub use commitment::CommitmentResult;
pub use types::{ProcessName, ProcessPath, ProjectionType, TriggerName};
pub use wave::{
    BacklogLimits, ForecastedUnitsByProcessPath, LimitsByProcess, ProcessPathConfiguration,
    Simulations, Suggestion, ThroughputByPathAndProcess, UnitsByDateOut,
    minutes_of_throughput, UnitsByProcessPathAndProcess, Wave,
};
