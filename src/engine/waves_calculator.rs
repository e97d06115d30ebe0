// ==========================================
// 出库计划引擎 - 波次下发建议引擎
// ==========================================
// 红线: 同一决策点最多一条建议；SLA 触发优先于空闲触发
// 红线: 每个波次满足 lower <= upper <= 下发上限
// ==========================================
// 职责: 在决策时域内逐点判断是否下发波次
// 输入: 路径配置 + 当前积压 + 预测到达 + 产能 + 积压上下限
// 输出: 按时间升序的波次建议
// ==========================================

use crate::config::WaveSchedulerConfig;
use crate::domain::backlog::OrderedBacklog;
use crate::domain::capacity::CapacityByHour;
use crate::domain::types::{ProcessName, ProcessPath, TriggerName};
use crate::domain::wave::{
    minutes_of_throughput, BacklogLimits, ForecastedUnitsByProcessPath, ProcessPathConfiguration,
    Simulations, Suggestion, ThroughputByPathAndProcess, UnitsByDateOut,
    UnitsByProcessPathAndProcess, Wave,
};
use crate::engine::error::{ensure_quantity, EngineError, EngineResult};
use crate::engine::metrics::{NoOpMetricsObserver, WaveExecutionEvent, WaveMetricsObserver};
use crate::engine::network::{
    downstream_route, ContextHolder, PickingProjectionBuilder, PiecewiseUpstream, ProcessGraph,
    QuantityByPathAndDate, QuantityByProcessAndDate, DOWNSTREAM_STAGES, PICKING,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// 单路径的决策状态
#[derive(Debug, Clone)]
struct PathState {
    conf: ProcessPathConfiguration,
    tph: CapacityByHour,
    unwaved: OrderedBacklog,
}

impl PathState {
    fn path(&self) -> ProcessPath {
        self.conf.process_path
    }

    fn max_wave(&self, now: DateTime<Utc>) -> i64 {
        self.conf.max_wave_quantity(self.tph.at(now))
    }

    // 拣货 + 下游路线
    fn processes(&self) -> impl Iterator<Item = ProcessName> {
        std::iter::once(ProcessName::Picking).chain(downstream_route(self.path()).iter().copied())
    }
}

// 待确认的波次（下标指向 PathState）
#[derive(Debug, Clone, Copy)]
struct WaveDraft {
    index: usize,
    lower: i64,
    upper: i64,
}

// 下发余量：每个有显式上限的流程一份共享余量；
// 路径受拣货及其下游路线上所有余量约束，都没有上限时取路径默认值
#[derive(Debug, Clone)]
struct ReleaseCap {
    rooms: BTreeMap<ProcessName, i64>,
}

impl ReleaseCap {
    fn new(rooms: BTreeMap<ProcessName, i64>) -> Self {
        Self { rooms }
    }

    fn for_path(&self, state: &PathState, now: DateTime<Utc>) -> i64 {
        state
            .processes()
            .filter_map(|process| self.rooms.get(&process).copied())
            .min()
            .unwrap_or_else(|| state.max_wave(now))
    }

    fn consume(&mut self, state: &PathState, quantity: i64) {
        for process in state.processes() {
            if let Some(room) = self.rooms.get_mut(&process) {
                *room = (*room - quantity).max(0);
            }
        }
    }
}

// ==========================================
// WavesCalculator - 波次建议引擎
// ==========================================
pub struct WavesCalculator {
    config: WaveSchedulerConfig,
    observer: Arc<dyn WaveMetricsObserver>,
}

impl Default for WavesCalculator {
    fn default() -> Self {
        Self::new(WaveSchedulerConfig::default())
    }
}

impl WavesCalculator {
    pub fn new(config: WaveSchedulerConfig) -> Self {
        Self::with_observer(config, Arc::new(NoOpMetricsObserver))
    }

    pub fn with_observer(config: WaveSchedulerConfig, observer: Arc<dyn WaveMetricsObserver>) -> Self {
        Self { config, observer }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算决策时域内的波次建议
    ///
    /// 决策点: first_inflection_point 起，每 decision_step_minutes 一个，
    /// 直到 first_inflection_point + horizon_hours（不含）
    ///
    /// 每个决策点:
    /// 1) 预测到达（date_in <= t）进入待下发积压
    /// 2) SLA: 最早 CPT 进入常规周期窗口的路径；路径拣货仍有在制时须进入最短周期窗口
    /// 3) 空闲: 无 SLA 波次且不下发时下一决策点的拣货在制将低于下限，所有有积压的路径
    /// 4) 下发量按 CPT 升序从待下发积压扣除，并注入拣货网络
    /// 5) 拣货与下游工序推进一个步长
    ///
    /// # 错误
    /// - 配置、积压、预测、上下限或产能为负: `InvalidInput`
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, configurations, current_backlog, forecast, throughput, backlog_limits, simulations), fields(
        first_inflection_point = %first_inflection_point,
        paths = configurations.len(),
        backlog_rows = current_backlog.len(),
        forecast_rows = forecast.len()
    ))]
    pub fn waves(
        &self,
        first_inflection_point: DateTime<Utc>,
        configurations: &[ProcessPathConfiguration],
        current_backlog: &[UnitsByProcessPathAndProcess],
        forecast: &[ForecastedUnitsByProcessPath],
        throughput: &ThroughputByPathAndProcess,
        backlog_limits: &BacklogLimits,
        simulations: &Simulations,
    ) -> EngineResult<Vec<Suggestion>> {
        self.validate(configurations, current_backlog, forecast, backlog_limits)?;
        if configurations.is_empty() {
            info!("无流程路径配置，不产出波次建议");
            return Ok(Vec::new());
        }

        let mut paths = Self::path_states(configurations, throughput, simulations)?;
        Self::seed_unwaved(&mut paths, current_backlog);
        let (graph, mut holder) =
            Self::outbound_network(&paths, current_backlog, throughput, simulations)?;

        let mut arrivals: Vec<&ForecastedUnitsByProcessPath> = forecast.iter().collect();
        arrivals.sort_by_key(|f| f.date_in);
        let mut next_arrival = 0;

        let step = Duration::minutes(self.config.decision_step_minutes);
        let horizon_end = first_inflection_point + Duration::hours(self.config.horizon_hours);

        let mut suggestions = Vec::new();
        let mut decision_points = 0;
        let mut now = first_inflection_point;

        while now < horizon_end {
            decision_points += 1;
            let next = now + step;

            // 1. 预测到达
            while next_arrival < arrivals.len() && arrivals[next_arrival].date_in <= now {
                let arrival = arrivals[next_arrival];
                if let Some(state) = paths.iter_mut().find(|s| s.path() == arrival.process_path) {
                    state.unwaved.add(arrival.date_out, arrival.quantity);
                }
                next_arrival += 1;
            }

            // 2-3. 触发判断；不下发时的推进结果同时用于空闲判断
            let idle_run = graph.run(&holder, &PiecewiseUpstream::new(), &[now, next])?;
            let rooms = Self::release_rooms(now, &paths, &holder, backlog_limits)?;
            let projected_picking = idle_run.context(PICKING)?.total();

            let decision =
                self.decide(now, &paths, &holder, projected_picking, backlog_limits, &rooms)?;

            // 4-5. 下发并推进
            holder = match decision {
                Some((reason, drafts)) => {
                    let mut upstream = PiecewiseUpstream::new();
                    let suggestion = Self::release(now, reason, &drafts, &mut paths, &mut upstream);
                    debug!(
                        date = %now,
                        reason = %reason,
                        waves = suggestion.waves.len(),
                        picking_total = holder.context(PICKING)?.total(),
                        "产出波次建议"
                    );
                    self.observer.record(&WaveExecutionEvent::SuggestionEmitted {
                        date: now,
                        reason,
                        wave_count: suggestion.waves.len(),
                        total_units: suggestion.expected_total(),
                    });
                    suggestions.push(suggestion);
                    graph.run(&holder, &upstream, &[now, next])?
                }
                None => idle_run,
            };
            now = next;
        }

        self.observer.record(&WaveExecutionEvent::Finished {
            decision_points,
            suggestions: suggestions.len(),
        });
        info!(
            decision_points,
            suggestions = suggestions.len(),
            "波次建议计算完成"
        );
        Ok(suggestions)
    }

    // ==========================================
    // 输入准备
    // ==========================================

    fn validate(
        &self,
        configurations: &[ProcessPathConfiguration],
        current_backlog: &[UnitsByProcessPathAndProcess],
        forecast: &[ForecastedUnitsByProcessPath],
        backlog_limits: &BacklogLimits,
    ) -> EngineResult<()> {
        if self.config.decision_step_minutes <= 0 || self.config.horizon_hours <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "决策步长与时域必须为正数: step={} horizon={}",
                self.config.decision_step_minutes, self.config.horizon_hours
            )));
        }
        ensure_quantity("idle_wave_minutes", self.config.idle_wave_minutes)?;
        for conf in configurations {
            conf.validate()?;
        }
        backlog_limits.validate()?;
        for row in current_backlog {
            ensure_quantity("backlog quantity", row.quantity)?;
        }
        for row in forecast {
            ensure_quantity("forecast quantity", row.quantity)?;
        }
        Ok(())
    }

    // 路径按配置顺序去重；拣货产能 = 预测产能，模拟值按整点覆盖
    fn path_states(
        configurations: &[ProcessPathConfiguration],
        throughput: &ThroughputByPathAndProcess,
        simulations: &Simulations,
    ) -> EngineResult<Vec<PathState>> {
        let mut states: Vec<PathState> = Vec::with_capacity(configurations.len());
        for conf in configurations {
            if states.iter().any(|s| s.path() == conf.process_path) {
                continue;
            }
            let tph = Self::effective_throughput(
                conf.process_path,
                ProcessName::Picking,
                throughput,
                simulations,
            )?;
            states.push(PathState {
                conf: conf.clone(),
                tph,
                unwaved: OrderedBacklog::empty(),
            });
        }
        Ok(states)
    }

    fn effective_throughput(
        path: ProcessPath,
        process: ProcessName,
        throughput: &ThroughputByPathAndProcess,
        simulations: &Simulations,
    ) -> EngineResult<CapacityByHour> {
        let base = match process_series(throughput, path, process) {
            Some(series) => CapacityByHour::new(series.iter().map(|(d, v)| (*d, *v)))?,
            None => CapacityByHour::empty(),
        };
        let Some(simulated) = process_series(simulations, path, process) else {
            return Ok(base);
        };

        let overrides = CapacityByHour::new(simulated.iter().map(|(d, v)| (*d, *v)))?;
        let mut merged: BTreeMap<DateTime<Utc>, i64> = base.into();
        merged.extend(overrides.iter().map(|(d, v)| (*d, *v)));
        CapacityByHour::new(merged)
    }

    // 待下发积压 = 已配置路径的 WAVING 行
    fn seed_unwaved(paths: &mut [PathState], current_backlog: &[UnitsByProcessPathAndProcess]) {
        for row in current_backlog
            .iter()
            .filter(|r| r.process_name == ProcessName::Waving)
        {
            if let Some(state) = paths.iter_mut().find(|s| s.path() == row.process_path) {
                state.unwaved.add(row.date_out, row.quantity);
            }
        }
    }

    // 出库网络：每个配置路径一个拣货叶子（PICKING 行为初始积压），
    // 下游工序积压为各路径该工序行之和，产能取 GLOBAL 路径
    fn outbound_network(
        paths: &[PathState],
        current_backlog: &[UnitsByProcessPathAndProcess],
        throughput: &ThroughputByPathAndProcess,
        simulations: &Simulations,
    ) -> EngineResult<(ProcessGraph, ContextHolder)> {
        let process_paths: Vec<ProcessPath> = paths.iter().map(PathState::path).collect();
        let graph = PickingProjectionBuilder::build_outbound_graph(&process_paths)?;

        let mut tph: QuantityByPathAndDate = BTreeMap::new();
        for state in paths {
            tph.insert(state.path(), state.tph.iter().map(|(d, v)| (*d, *v)).collect());
        }

        let mut picking_backlog: QuantityByPathAndDate = BTreeMap::new();
        let mut stage_backlog: QuantityByProcessAndDate = BTreeMap::new();
        for row in current_backlog {
            let slot = match row.process_name {
                ProcessName::Waving => continue,
                ProcessName::Picking if tph.contains_key(&row.process_path) => {
                    picking_backlog.entry(row.process_path).or_default()
                }
                ProcessName::Picking => continue,
                stage => stage_backlog.entry(stage).or_default(),
            };
            let quantity = slot.entry(row.date_out).or_insert(0);
            *quantity = quantity.saturating_add(row.quantity);
        }

        let mut stage_tph: QuantityByProcessAndDate = BTreeMap::new();
        for stage in DOWNSTREAM_STAGES {
            let series =
                Self::effective_throughput(ProcessPath::Global, stage, throughput, simulations)?;
            stage_tph.insert(stage, series.into());
        }

        let mut holder = PickingProjectionBuilder::build_context_holder(&picking_backlog, &tph)?;
        PickingProjectionBuilder::add_downstream_contexts(&mut holder, &stage_backlog, &stage_tph)?;
        debug!(
            paths = process_paths.len(),
            downstream_units = stage_backlog
                .values()
                .flat_map(|by_date| by_date.values())
                .sum::<i64>(),
            "出库网络已构建"
        );
        Ok((graph, holder))
    }

    // 各流程的下发余量：拣货 = 上限 - 拣货在制；
    // 下游工序 = 上限 - (工序积压 + 经该工序的路径拣货在制)
    fn release_rooms(
        now: DateTime<Utc>,
        paths: &[PathState],
        holder: &ContextHolder,
        backlog_limits: &BacklogLimits,
    ) -> EngineResult<BTreeMap<ProcessName, i64>> {
        let mut rooms = BTreeMap::new();
        if let Some(upper) = backlog_limits.upper_at(ProcessName::Picking, now) {
            let load = holder.context(PICKING)?.total();
            rooms.insert(ProcessName::Picking, (upper - load).max(0));
        }

        for stage in DOWNSTREAM_STAGES {
            let Some(upper) = backlog_limits.upper_at(stage, now) else {
                continue;
            };
            let mut load = holder.context(stage.as_str())?.total();
            for state in paths
                .iter()
                .filter(|s| downstream_route(s.path()).contains(&stage))
            {
                load = load.saturating_add(holder.context(state.path().as_str())?.total());
            }
            rooms.insert(stage, (upper - load).max(0));
        }
        Ok(rooms)
    }

    // ==========================================
    // 触发判断
    // ==========================================

    fn decide(
        &self,
        now: DateTime<Utc>,
        paths: &[PathState],
        holder: &ContextHolder,
        projected_picking: i64,
        backlog_limits: &BacklogLimits,
        rooms: &BTreeMap<ProcessName, i64>,
    ) -> EngineResult<Option<(TriggerName, Vec<WaveDraft>)>> {
        let sla = self.sla_waves(now, paths, holder, ReleaseCap::new(rooms.clone()))?;
        if !sla.is_empty() {
            return Ok(Some((TriggerName::Sla, sla)));
        }

        let idle = self.idleness_waves(
            now,
            paths,
            projected_picking,
            backlog_limits,
            ReleaseCap::new(rooms.clone()),
        );
        if !idle.is_empty() {
            return Ok(Some((TriggerName::Idleness, idle)));
        }
        Ok(None)
    }

    fn min_wave(&self, state: &PathState, now: DateTime<Utc>) -> i64 {
        minutes_of_throughput(state.tph.at(now), self.config.idle_wave_minutes)
    }

    // SLA: 最早未下发 CPT 进入常规周期窗口；
    // 路径拣货仍有在制时，推迟到进入最短周期窗口
    fn sla_waves(
        &self,
        now: DateTime<Utc>,
        paths: &[PathState],
        holder: &ContextHolder,
        mut cap: ReleaseCap,
    ) -> EngineResult<Vec<WaveDraft>> {
        let mut drafts = Vec::new();
        for (index, state) in paths.iter().enumerate() {
            let Some(first_date) = state.unwaved.first_date() else {
                continue;
            };
            let until_due = first_date - now;
            if until_due > state.conf.normal_cycle_time() {
                continue;
            }
            let queued = holder.context(state.path().as_str())?.total();
            if queued > 0 && until_due > state.conf.min_cycle_time() {
                continue;
            }

            let path_cap = cap.for_path(state, now);
            if path_cap == 0 {
                self.suppress(now, state.path());
                continue;
            }

            let due_quantity = state
                .unwaved
                .quantity_until(now + state.conf.normal_cycle_time());
            let lower = due_quantity.min(path_cap);
            let upper = lower.max(
                due_quantity
                    .max(self.min_wave(state, now))
                    .min(state.unwaved.total())
                    .min(path_cap),
            );
            if upper == 0 {
                continue;
            }

            cap.consume(state, upper);
            drafts.push(WaveDraft {
                index,
                lower,
                upper,
            });
        }
        Ok(drafts)
    }

    // 空闲: 下一决策点的拣货在制低于下限（缺省下限 = 各路径最小波次之和）
    fn idleness_waves(
        &self,
        now: DateTime<Utc>,
        paths: &[PathState],
        projected_picking: i64,
        backlog_limits: &BacklogLimits,
        mut cap: ReleaseCap,
    ) -> Vec<WaveDraft> {
        let lower_limit = backlog_limits
            .lower_at(ProcessName::Picking, now)
            .unwrap_or_else(|| paths.iter().map(|s| self.min_wave(s, now)).sum());
        if projected_picking >= lower_limit {
            return Vec::new();
        }
        debug!(date = %now, projected_picking, lower_limit, "拣货在制将低于下限");

        let mut drafts = Vec::new();
        for (index, state) in paths.iter().enumerate() {
            let total = state.unwaved.total();
            if total == 0 {
                continue;
            }

            let path_cap = cap.for_path(state, now);
            if path_cap == 0 {
                self.suppress(now, state.path());
                continue;
            }

            let upper = total.min(path_cap);
            let lower = self.min_wave(state, now).min(upper);
            cap.consume(state, upper);
            drafts.push(WaveDraft {
                index,
                lower,
                upper,
            });
        }
        drafts
    }

    fn suppress(&self, now: DateTime<Utc>, process_path: ProcessPath) {
        debug!(date = %now, path = %process_path, "下发余量为 0，路径被抑制");
        self.observer.record(&WaveExecutionEvent::ReleaseSuppressed {
            date: now,
            process_path,
        });
    }

    // ==========================================
    // 下发
    // ==========================================

    fn release(
        now: DateTime<Utc>,
        reason: TriggerName,
        drafts: &[WaveDraft],
        paths: &mut [PathState],
        upstream: &mut PiecewiseUpstream,
    ) -> Suggestion {
        let mut expected = OrderedBacklog::empty();
        let mut waves = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let state = &mut paths[draft.index];
            let (released, remaining) = state.unwaved.consume(draft.upper);
            state.unwaved = remaining;

            upstream.add(now, state.path().as_str(), &released);
            expected = expected.merge(&released);
            waves.push(Wave {
                process_path: state.path(),
                lower_bound: draft.lower,
                upper_bound: draft.upper,
                wave_dates: released.dates().copied().collect(),
            });
        }

        Suggestion {
            date: now,
            waves,
            reason,
            expected_quantities: expected
                .iter()
                .map(|(date_out, quantity)| UnitsByDateOut {
                    date_out: *date_out,
                    quantity: *quantity,
                })
                .collect(),
        }
    }
}

fn process_series(
    source: &ThroughputByPathAndProcess,
    path: ProcessPath,
    process: ProcessName,
) -> Option<&BTreeMap<DateTime<Utc>, i64>> {
    source.get(&path)?.get(&process)
}
