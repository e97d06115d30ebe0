// ==========================================
// 出库计划引擎 - 核心库
// ==========================================
// 组成: CPT 达成投影 / 拣货网络仿真 / 波次下发建议
// 系统定位: 进程内纯计算库，调用方提供时钟与全部输入
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值类型
pub mod domain;

// 引擎层 - 投影与决策
pub mod engine;

// 配置层 - 计划参数
pub mod config;

// 日志系统
pub mod logging;

// API 层 - 场景运行
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ProcessName, ProcessPath, ProjectionType, TriggerName};

// 领域实体
pub use domain::{
    BacklogLimits, CapacityByHour, CommitmentResult, ForecastedUnitsByProcessPath,
    OrderedBacklog, PlannedUnits, ProcessPathConfiguration, Suggestion, UnitsByDateOut,
    UnitsByProcessPathAndProcess, Wave,
};

// 引擎
pub use engine::{
    CptProjectionInput, CptProjector, EngineError, EngineResult, PickingProjectionBuilder,
    WavesCalculator,
};

// 配置
pub use config::PlannerConfig;

// API
pub use api::{ApiError, ScenarioApi, ScenarioRequest};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "出库计划引擎";
