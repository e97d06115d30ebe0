// ==========================================
// 出库计划引擎 - 波次领域模型
// ==========================================
// 职责: 路径配置 / 积压上下限 / 波次 / 建议
// 红线: 建议一经产出不可撤回，按决策时间升序输出
// ==========================================

use crate::domain::types::{ProcessName, ProcessPath, TriggerName};
use crate::engine::error::{ensure_quantity, EngineError, EngineResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 流程 → (时间 → 数量)
pub type LimitsByProcess = BTreeMap<ProcessName, BTreeMap<DateTime<Utc>, i64>>;

/// 路径 → 流程 → (整点 → 单位/小时)
pub type ThroughputByPathAndProcess =
    BTreeMap<ProcessPath, BTreeMap<ProcessName, BTreeMap<DateTime<Utc>, i64>>>;

/// 模拟产能（与预测产能同构，按整点覆盖）
pub type Simulations = ThroughputByPathAndProcess;

// ==========================================
// ProcessPathConfiguration - 路径静态参数
// ==========================================
// 三个周期时间满足 min <= normal <= max（分钟）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPathConfiguration {
    pub process_path: ProcessPath,
    /// 无显式上限时，波次上限 = 拣货产能 × 该时长
    pub max_cycle_time_minutes: i64,
    /// SLA 窗口：最早未下发 CPT 距当前不超过此值
    pub normal_cycle_time_minutes: i64,
    /// 路径拣货仍有在制时，CPT 须进入此更紧的窗口才触发 SLA
    pub min_cycle_time_minutes: i64,
}

impl ProcessPathConfiguration {
    pub fn new(
        process_path: ProcessPath,
        max_cycle_time_minutes: i64,
        normal_cycle_time_minutes: i64,
        min_cycle_time_minutes: i64,
    ) -> Self {
        Self {
            process_path,
            max_cycle_time_minutes,
            normal_cycle_time_minutes,
            min_cycle_time_minutes,
        }
    }

    /// 校验：参数非负且 min <= normal <= max
    pub fn validate(&self) -> EngineResult<()> {
        let field = |name: &str| format!("{}.{}", self.process_path, name);
        ensure_quantity(&field("max_cycle_time_minutes"), self.max_cycle_time_minutes)?;
        ensure_quantity(&field("normal_cycle_time_minutes"), self.normal_cycle_time_minutes)?;
        ensure_quantity(&field("min_cycle_time_minutes"), self.min_cycle_time_minutes)?;

        if self.min_cycle_time_minutes > self.normal_cycle_time_minutes
            || self.normal_cycle_time_minutes > self.max_cycle_time_minutes
        {
            return Err(EngineError::InvalidInput(format!(
                "{} 周期时间须满足 min <= normal <= max: {} / {} / {}",
                self.process_path,
                self.min_cycle_time_minutes,
                self.normal_cycle_time_minutes,
                self.max_cycle_time_minutes
            )));
        }
        Ok(())
    }

    pub fn normal_cycle_time(&self) -> Duration {
        Duration::minutes(self.normal_cycle_time_minutes)
    }

    pub fn min_cycle_time(&self) -> Duration {
        Duration::minutes(self.min_cycle_time_minutes)
    }

    /// 按小时产能折算的波次上限
    pub fn max_wave_quantity(&self, throughput_per_hour: i64) -> i64 {
        minutes_of_throughput(throughput_per_hour, self.max_cycle_time_minutes)
    }
}

/// 小时产能 × 分钟数折算的件数（向下取整）
pub fn minutes_of_throughput(throughput_per_hour: i64, minutes: i64) -> i64 {
    throughput_per_hour.saturating_mul(minutes) / 60
}

// ==========================================
// 积压快照 / 预测到达
// ==========================================

/// 当前积压（按路径、流程、CPT）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsByProcessPathAndProcess {
    pub process_path: ProcessPath,
    pub process_name: ProcessName,
    pub date_out: DateTime<Utc>,
    pub quantity: i64,
}

impl UnitsByProcessPathAndProcess {
    pub fn new(
        process_path: ProcessPath,
        process_name: ProcessName,
        date_out: DateTime<Utc>,
        quantity: i64,
    ) -> Self {
        Self {
            process_path,
            process_name,
            date_out,
            quantity,
        }
    }
}

/// 预测到达（date_in 时刻进入待下发积压）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastedUnitsByProcessPath {
    pub process_path: ProcessPath,
    pub date_in: DateTime<Utc>,
    pub date_out: DateTime<Utc>,
    pub quantity: i64,
}

impl ForecastedUnitsByProcessPath {
    pub fn new(
        process_path: ProcessPath,
        date_in: DateTime<Utc>,
        date_out: DateTime<Utc>,
        quantity: i64,
    ) -> Self {
        Self {
            process_path,
            date_in,
            date_out,
            quantity,
        }
    }
}

// ==========================================
// BacklogLimits - 在制积压上下限
// ==========================================
// 查找规则: 取 <= t 的最近一条
/// 按流程、按时间的在制积压上下限
///
/// `lower_at` / `upper_at` 在 t 及之前没有任何条目时返回 `None`，不会按 0 处理：
/// 缺失的上限回退到路径默认波次上限，缺失的拣货下限回退到各路径最小波次之和。
/// 只有显式的 0 才会抑制下发。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogLimits {
    #[serde(default)]
    pub lower: LimitsByProcess,
    #[serde(default)]
    pub upper: LimitsByProcess,
}

impl BacklogLimits {
    pub fn new(lower: LimitsByProcess, upper: LimitsByProcess) -> Self {
        Self { lower, upper }
    }

    /// 校验：所有上下限非负
    pub fn validate(&self) -> EngineResult<()> {
        for (kind, limits) in [("lower", &self.lower), ("upper", &self.upper)] {
            for (process, by_date) in limits {
                for (date, value) in by_date {
                    if *value < 0 {
                        return Err(EngineError::InvalidInput(format!(
                            "{} 积压{}限不能为负数: {} @ {}",
                            process, kind, value, date
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn lower_at(&self, process: ProcessName, date: DateTime<Utc>) -> Option<i64> {
        Self::lookup(&self.lower, process, date)
    }

    pub fn upper_at(&self, process: ProcessName, date: DateTime<Utc>) -> Option<i64> {
        Self::lookup(&self.upper, process, date)
    }

    fn lookup(limits: &LimitsByProcess, process: ProcessName, date: DateTime<Utc>) -> Option<i64> {
        limits
            .get(&process)?
            .range(..=date)
            .next_back()
            .map(|(_, value)| *value)
    }
}

// ==========================================
// Wave / Suggestion - 波次与建议
// ==========================================

/// 单路径波次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    pub process_path: ProcessPath,
    pub lower_bound: i64,
    pub upper_bound: i64,
    pub wave_dates: BTreeSet<DateTime<Utc>>,
}

/// 按 CPT 汇总的预期下发量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsByDateOut {
    pub date_out: DateTime<Utc>,
    pub quantity: i64,
}

/// 一个决策点的波次建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub date: DateTime<Utc>,
    pub waves: Vec<Wave>,
    pub reason: TriggerName,
    pub expected_quantities: Vec<UnitsByDateOut>,
}

impl Suggestion {
    /// 指定路径的波次
    pub fn wave_for(&self, process_path: ProcessPath) -> Option<&Wave> {
        self.waves.iter().find(|w| w.process_path == process_path)
    }

    /// 预期下发总量
    pub fn expected_total(&self) -> i64 {
        self.expected_quantities.iter().map(|u| u.quantity).sum()
    }
}
