// ==========================================
// 出库计划引擎 - 场景运行 API
// ==========================================
// 职责: 解析场景请求，分派到对应引擎，返回 JSON 结果
// 请求格式: 以 "type" 字段区分场景
//   - cpt_projection      CPT 达成投影
//   - picking_projection  拣货网络仿真
//   - suggested_waves     波次下发建议
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::PlannerConfig;
use crate::domain::backlog::OrderedBacklog;
use crate::domain::types::ProcessPath;
use crate::domain::wave::{
    BacklogLimits, ForecastedUnitsByProcessPath, ProcessPathConfiguration, Simulations,
    ThroughputByPathAndProcess, UnitsByProcessPathAndProcess,
};
use crate::engine::cpt_projection::{CptProjectionInput, CptProjector};
use crate::engine::metrics::{NoOpMetricsObserver, WaveMetricsObserver};
use crate::engine::network::{PickingProjectionBuilder, PiecewiseUpstream, QuantityByPathAndDate};
use crate::engine::waves_calculator::WavesCalculator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// 请求定义
// ==========================================

/// 拣货网络仿真请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickingProjectionRequest {
    pub process_paths: Vec<ProcessPath>,
    #[serde(default)]
    pub backlog: QuantityByPathAndDate,
    #[serde(default)]
    pub throughput: QuantityByPathAndDate,
    /// 时间 → 路径 → 流入积压
    #[serde(default)]
    pub inflows: BTreeMap<DateTime<Utc>, BTreeMap<ProcessPath, OrderedBacklog>>,
    pub timeline: Vec<DateTime<Utc>>,
}

/// 波次建议请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedWavesRequest {
    pub first_inflection_point: DateTime<Utc>,
    pub configurations: Vec<ProcessPathConfiguration>,
    #[serde(default)]
    pub current_backlog: Vec<UnitsByProcessPathAndProcess>,
    #[serde(default)]
    pub forecast: Vec<ForecastedUnitsByProcessPath>,
    #[serde(default)]
    pub throughput: ThroughputByPathAndProcess,
    #[serde(default)]
    pub backlog_limits: BacklogLimits,
    #[serde(default)]
    pub simulations: Simulations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioRequest {
    CptProjection(CptProjectionInput),
    PickingProjection(PickingProjectionRequest),
    SuggestedWaves(SuggestedWavesRequest),
}

impl ScenarioRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioRequest::CptProjection(_) => "cpt_projection",
            ScenarioRequest::PickingProjection(_) => "picking_projection",
            ScenarioRequest::SuggestedWaves(_) => "suggested_waves",
        }
    }
}

// ==========================================
// ScenarioApi - 场景运行 API
// ==========================================
pub struct ScenarioApi {
    config: PlannerConfig,
    observer: Arc<dyn WaveMetricsObserver>,
}

impl ScenarioApi {
    pub fn new(config: PlannerConfig) -> Self {
        Self::with_observer(config, Arc::new(NoOpMetricsObserver))
    }

    pub fn with_observer(config: PlannerConfig, observer: Arc<dyn WaveMetricsObserver>) -> Self {
        Self { config, observer }
    }

    /// 解析并运行 JSON 场景请求
    pub fn run_json(&self, request: &str) -> ApiResult<serde_json::Value> {
        let request: ScenarioRequest = serde_json::from_str(request)?;
        self.run(&request)
    }

    /// 运行场景请求
    ///
    /// # 错误
    /// - 配置无效: `ApiError::Config`
    /// - 引擎输入错误: `ApiError::Engine`
    #[instrument(skip(self, request), fields(kind = request.kind()))]
    pub fn run(&self, request: &ScenarioRequest) -> ApiResult<serde_json::Value> {
        self.config.validate()?;

        let value = match request {
            ScenarioRequest::CptProjection(input) => {
                let projector = CptProjector::with_config(&self.config.projection);
                to_json(&projector.execute(input)?)?
            }
            ScenarioRequest::PickingProjection(req) => {
                let graph = PickingProjectionBuilder::build_graph(&req.process_paths)?;
                let holder =
                    PickingProjectionBuilder::build_context_holder(&req.backlog, &req.throughput)?;
                let upstream = PiecewiseUpstream::from_paths(&req.inflows);
                to_json(&graph.run(&holder, &upstream, &req.timeline)?)?
            }
            ScenarioRequest::SuggestedWaves(req) => {
                let calculator =
                    WavesCalculator::with_observer(self.config.wave.clone(), self.observer.clone());
                let suggestions = calculator.waves(
                    req.first_inflection_point,
                    &req.configurations,
                    &req.current_backlog,
                    &req.forecast,
                    &req.throughput,
                    &req.backlog_limits,
                    &req.simulations,
                )?;
                to_json(&suggestions)?
            }
        };

        info!(kind = request.kind(), "场景运行完成");
        Ok(value)
    }
}

fn to_json<T: Serialize>(value: &T) -> ApiResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))
}
