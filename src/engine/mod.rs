// ==========================================
// 出库计划引擎 - 引擎层
// ==========================================
// 职责: CPT 达成投影 / 拣货网络仿真 / 波次下发建议
// 红线: 引擎纯函数式，不读系统时钟、不持有全局状态
// ==========================================

pub mod cpt_projection;
pub mod error;
pub mod metrics;
pub mod network;
pub mod waves_calculator;

// 重导出核心引擎
pub use cpt_projection::{CptProjectionInput, CptProjector};
pub use error::{EngineError, EngineResult, MAX_QUANTITY};
pub use metrics::{
    NoOpMetricsObserver, RecordingMetricsObserver, WaveExecutionEvent, WaveExecutionEventType,
    WaveMetricsObserver,
};
pub use network::{
    ContextHolder, PickingProjectionBuilder, PiecewiseUpstream, ProcessContext, ProcessGraph,
    ProcessedBacklog, PICKING,
};
pub use waves_calculator::WavesCalculator;
