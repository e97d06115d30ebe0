// ==========================================
// 出库计划引擎 - CPT 达成投影引擎
// ==========================================
// 红线: 先到期先处理（EDF），已过期需求仍需处理
// ==========================================
// 职责: 将小时产能按截止时间升序分配给可见需求
// 输入: 小时产能 + 当前积压 + 计划到达 + 投影区间
// 输出: 每个 CPT 的完成时间与截止时剩余量
// ==========================================
// 精度: 内部以 "件·秒" 计（1 件 = 3600 件·秒），
//       产能 c 件/小时 在 s 秒内提供 c·s 件·秒
// ==========================================

use crate::config::ProjectionConfig;
use crate::domain::backlog::{OrderedBacklog, PlannedUnits};
use crate::domain::capacity::{CapacityByHour, UNIT_SECONDS};
use crate::domain::commitment::CommitmentResult;
use crate::domain::time::{ceil_to_minute, hours_between, truncate_to_hour};
use crate::domain::types::ProjectionType;
use crate::engine::error::{ensure_quantity, EngineError, EngineResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

// ==========================================
// CptProjectionInput - 投影请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CptProjectionInput {
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub capacity: CapacityByHour,
    #[serde(default)]
    pub backlog: OrderedBacklog,
    #[serde(default)]
    pub planned_units: Vec<PlannedUnits>,
    /// 必须出现在结果中的 CPT（无需求时按 0 需求输出）
    #[serde(default)]
    pub cpt_by_warehouse: Vec<DateTime<Utc>>,
    /// CPT 或 DEFERRAL；缺省为 CPT
    #[serde(default)]
    pub projection_type: ProjectionType,
}

// 单个 CPT 的投影状态（件·秒）
#[derive(Debug, Default)]
struct DueState {
    demand: i64,
    available: i64,
    processed: i64,
    completed_at: Option<DateTime<Utc>>,
    remaining_at_due: Option<i64>,
}

impl DueState {
    fn remaining_units(&self) -> i64 {
        // 部分处理的件仍计为剩余
        (self.demand - self.processed + UNIT_SECONDS - 1) / UNIT_SECONDS
    }
}

// ==========================================
// CptProjector - CPT 达成投影引擎
// ==========================================
pub struct CptProjector {
    round_completion_to_minute: bool,
}

impl Default for CptProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl CptProjector {
    pub fn new() -> Self {
        Self::with_config(&ProjectionConfig::default())
    }

    pub fn with_config(config: &ProjectionConfig) -> Self {
        Self {
            round_completion_to_minute: config.round_completion_to_minute,
        }
    }

    /// 支持 CPT 与 DEFERRAL 投影
    pub fn supports_projection_type(&self, projection_type: ProjectionType) -> bool {
        matches!(projection_type, ProjectionType::Cpt | ProjectionType::Deferral)
    }

    /// 执行投影请求（含必报 CPT）
    ///
    /// DEFERRAL 投影不计入已递延的计划到达量，其余与 CPT 投影一致。
    ///
    /// # 错误
    /// - 不支持的投影类型: `InvalidArgument`
    #[instrument(skip(self, input), fields(
        projection_type = %input.projection_type,
        date_from = %input.date_from,
        date_to = %input.date_to,
        planned_count = input.planned_units.len(),
        cpt_count = input.cpt_by_warehouse.len()
    ))]
    pub fn execute(&self, input: &CptProjectionInput) -> EngineResult<Vec<CommitmentResult>> {
        if !self.supports_projection_type(input.projection_type) {
            warn!(projection_type = %input.projection_type, "不支持的投影类型");
            return Err(EngineError::InvalidArgument(format!(
                "不支持的投影类型: {}",
                input.projection_type
            )));
        }

        let planned_units: Vec<PlannedUnits> = match input.projection_type {
            ProjectionType::Deferral => input
                .planned_units
                .iter()
                .filter(|p| !p.is_deferred)
                .cloned()
                .collect(),
            _ => input.planned_units.clone(),
        };
        debug!(
            excluded = input.planned_units.len() - planned_units.len(),
            "递延计划量已排除"
        );

        self.project_dates(
            &input.capacity,
            &input.backlog,
            &planned_units,
            input.date_from,
            input.date_to,
            &input.cpt_by_warehouse,
        )
    }

    /// 投影区间 [date_from, date_to) 内各 CPT 的达成情况
    ///
    /// # 返回
    /// 按 CPT 升序、去重的结果列表
    ///
    /// # 错误
    /// - date_to < date_from: `InvalidRange`
    /// - 负数量 / 超过上限 / 件·秒累加溢出: `InvalidInput`
    #[instrument(skip(self, capacity, backlog, planned_units), fields(
        capacity_hours = capacity.len(),
        backlog_total = backlog.total(),
        planned_count = planned_units.len()
    ))]
    pub fn project(
        &self,
        capacity: &CapacityByHour,
        backlog: &OrderedBacklog,
        planned_units: &[PlannedUnits],
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
    ) -> EngineResult<Vec<CommitmentResult>> {
        self.project_dates(capacity, backlog, planned_units, date_from, date_to, &[])
    }

    fn project_dates(
        &self,
        capacity: &CapacityByHour,
        backlog: &OrderedBacklog,
        planned_units: &[PlannedUnits],
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
        extra_dates: &[DateTime<Utc>],
    ) -> EngineResult<Vec<CommitmentResult>> {
        if date_to < date_from {
            return Err(EngineError::InvalidRange {
                from: date_from,
                to: date_to,
            });
        }
        for planned in planned_units {
            ensure_quantity("planned quantity", planned.quantity)?;
        }

        // 1. 建立 CPT 状态：积压立即可见，计划到达按整点可见
        let mut states: BTreeMap<DateTime<Utc>, DueState> = BTreeMap::new();
        for (date, quantity) in backlog.iter() {
            let unit_seconds = to_unit_seconds("backlog quantity", *quantity)?;
            let state = states.entry(*date).or_default();
            state.demand = checked_sum("backlog demand", state.demand, unit_seconds)?;
            state.available = state.demand;
        }

        let mut arrivals: Vec<(DateTime<Utc>, DateTime<Utc>, i64)> =
            Vec::with_capacity(planned_units.len());
        for p in planned_units {
            let unit_seconds = to_unit_seconds("planned quantity", p.quantity)?;
            arrivals.push((truncate_to_hour(p.date_in), p.date_out, unit_seconds));
        }
        arrivals.sort();
        for (_, date_out, quantity) in &arrivals {
            let state = states.entry(*date_out).or_default();
            state.demand = checked_sum("planned demand", state.demand, *quantity)?;
        }
        for date in extra_dates {
            states.entry(*date).or_default();
        }

        for (date, state) in states.iter_mut() {
            if state.demand == 0 {
                state.completed_at = Some(*date);
            }
        }

        // 2. 切分区间：整点 / 到达整点 / 区间内 CPT
        let mut cuts: BTreeSet<DateTime<Utc>> = BTreeSet::new();
        cuts.insert(date_from);
        cuts.insert(date_to);
        cuts.extend(hours_between(date_from, date_to));
        cuts.extend(arrivals.iter().map(|(hour, _, _)| *hour));
        cuts.extend(states.keys().copied());
        let cuts: Vec<DateTime<Utc>> = cuts
            .into_iter()
            .filter(|d| *d >= date_from && *d <= date_to)
            .collect();

        // 3. 逐区间分配
        let mut next_arrival = 0;
        for window in cuts.windows(2) {
            let (start, end) = (window[0], window[1]);

            Self::snapshot_remaining(&mut states, start, date_from, date_to);

            while next_arrival < arrivals.len() && arrivals[next_arrival].0 <= start {
                let (_, date_out, quantity) = arrivals[next_arrival];
                if let Some(state) = states.get_mut(&date_out) {
                    state.available += quantity;
                }
                next_arrival += 1;
            }

            let rate = capacity.at(start);
            let mut budget = rate
                .checked_mul((end - start).num_seconds())
                .ok_or_else(|| EngineError::overflow("capacity"))?;
            let mut used = 0;

            for (date, state) in states.iter_mut() {
                if budget == 0 {
                    break;
                }
                let take = budget.min(state.available);
                if take == 0 {
                    continue;
                }
                state.available -= take;
                state.processed += take;
                budget -= take;
                used += take;

                if state.completed_at.is_none() && state.processed == state.demand {
                    // rate > 0：budget 非零才会走到这里
                    let seconds = (used + rate - 1) / rate;
                    let completed = start + Duration::seconds(seconds);
                    debug!(cpt = %date, completed = %completed, "CPT 需求处理完毕");
                    state.completed_at = Some(completed);
                }
            }
        }

        // 截止时间在区间终点（或之后）的 CPT 在终点取剩余量
        Self::snapshot_remaining(&mut states, date_to, date_from, date_to);

        let results: Vec<CommitmentResult> = states
            .into_iter()
            .map(|(date, state)| {
                let projected_end_date = state.completed_at.map(|d| {
                    if self.round_completion_to_minute {
                        ceil_to_minute(d)
                    } else {
                        d
                    }
                });
                CommitmentResult::new(date, projected_end_date, state.remaining_at_due.unwrap_or(0))
            })
            .collect();

        info!(
            cpt_count = results.len(),
            late_count = results.iter().filter(|r| r.remaining_quantity > 0).count(),
            "CPT 投影完成"
        );
        Ok(results)
    }

    // 截止时间（夹在投影区间内）已到的 CPT 记录剩余量，只记一次
    fn snapshot_remaining(
        states: &mut BTreeMap<DateTime<Utc>, DueState>,
        now: DateTime<Utc>,
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
    ) {
        for (date, state) in states.iter_mut() {
            if state.remaining_at_due.is_none() && (*date).clamp(date_from, date_to) <= now {
                state.remaining_at_due = Some(state.remaining_units());
            }
        }
    }
}

fn to_unit_seconds(field: &str, quantity: i64) -> EngineResult<i64> {
    quantity
        .checked_mul(UNIT_SECONDS)
        .ok_or_else(|| EngineError::overflow(field))
}

fn checked_sum(field: &str, a: i64, b: i64) -> EngineResult<i64> {
    a.checked_add(b).ok_or_else(|| EngineError::overflow(field))
}
