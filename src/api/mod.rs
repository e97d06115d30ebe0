// ==========================================
// 出库计划引擎 - API 层
// ==========================================
// 职责: 提供场景运行接口，供命令行与外部调用
// ==========================================

pub mod error;
pub mod scenario_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use scenario_api::{
    PickingProjectionRequest, ScenarioApi, ScenarioRequest, SuggestedWavesRequest,
};
