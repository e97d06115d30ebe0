// ==========================================
// 拣货网络仿真集成测试
// ==========================================
// 测试目标: 验证流程图构建、上下文构建与时间线推进
// 覆盖范围: 并行汇总、分段上游、时间线校验、入参不变
// ==========================================

use chrono::{DateTime, Duration, Utc};
use outbound_planning::domain::{CapacityByHour, OrderedBacklog, ProcessPath};
use outbound_planning::engine::network::{
    ContextHolder, PickingProjectionBuilder, PiecewiseUpstream, ProcessContext,
    QuantityByPathAndDate, PICKING,
};
use outbound_planning::engine::{CptProjector, EngineError};
use std::collections::BTreeMap;

// ==========================================
// 测试辅助函数
// ==========================================

const DATE_1: &str = "2023-02-17T10:00:00Z";
const DATE_2: &str = "2023-02-17T11:00:00Z";
const DATE_3: &str = "2023-02-17T12:00:00Z";
const DATE_OUT_1: &str = "2023-02-17T12:00:00Z";
const DATE_OUT_2: &str = "2023-02-17T13:00:00Z";

fn at(s: &str) -> DateTime<Utc> {
    outbound_planning::logging::init_test();
    s.parse().unwrap()
}

fn by_path(entries: &[(ProcessPath, &[(&str, i64)])]) -> QuantityByPathAndDate {
    entries
        .iter()
        .map(|(path, values)| {
            (
                *path,
                values.iter().map(|(d, q)| (at(d), *q)).collect::<BTreeMap<_, _>>(),
            )
        })
        .collect()
}

fn current_backlog() -> QuantityByPathAndDate {
    by_path(&[
        (ProcessPath::TotMono, &[(DATE_OUT_1, 100), (DATE_OUT_2, 200)]),
        (ProcessPath::NonTotMono, &[(DATE_OUT_1, 200), (DATE_OUT_2, 300)]),
    ])
}

fn holder_with_tph(tot_mono: i64, non_tot_mono: i64) -> ContextHolder {
    let throughput = by_path(&[
        (ProcessPath::TotMono, &[(DATE_1, tot_mono), (DATE_2, 500)]),
        (ProcessPath::NonTotMono, &[(DATE_1, non_tot_mono), (DATE_2, 600)]),
    ]);
    PickingProjectionBuilder::build_context_holder(&current_backlog(), &throughput).unwrap()
}

fn wave(quantity: i64) -> OrderedBacklog {
    OrderedBacklog::new(vec![(at(DATE_OUT_1), quantity)]).unwrap()
}

// ==========================================
// 构建
// ==========================================

#[test]
fn test_context_holder_has_one_context_per_path_plus_picking() {
    let holder = holder_with_tph(200, 600);

    assert_eq!(holder.len(), 3);
    let names: Vec<&str> = holder.names().collect();
    assert!(names.contains(&PICKING));
    assert!(names.contains(&"TOT_MONO"));
    assert!(names.contains(&"NON_TOT_MONO"));

    assert!(holder.context(PICKING).unwrap().is_parallel());

    let tot_mono = holder.context("TOT_MONO").unwrap();
    assert!(!tot_mono.is_parallel());
    assert_eq!(tot_mono.initial_backlog().total(), 300);
    assert_eq!(
        holder.available_between("TOT_MONO", at(DATE_1), at(DATE_2)).unwrap(),
        200
    );

    let non_tot_mono = holder.context("NON_TOT_MONO").unwrap();
    assert_eq!(non_tot_mono.initial_backlog().total(), 500);
    assert_eq!(
        holder.available_between("NON_TOT_MONO", at(DATE_1), at(DATE_2)).unwrap(),
        600
    );

    assert_eq!(holder.context(PICKING).unwrap().total(), 800);
    assert_eq!(
        holder.available_between(PICKING, at(DATE_1), at(DATE_2)).unwrap(),
        800
    );
}

#[test]
fn test_path_only_in_throughput_gets_empty_backlog() {
    let throughput = by_path(&[(ProcessPath::TotMultiBatch, &[(DATE_1, 100)])]);
    let holder = PickingProjectionBuilder::build_context_holder(&current_backlog(), &throughput)
        .unwrap();

    assert_eq!(holder.len(), 4);
    assert_eq!(holder.context("TOT_MULTI_BATCH").unwrap().total(), 0);
    assert_eq!(
        holder.available_between("TOT_MONO", at(DATE_1), at(DATE_2)).unwrap(),
        0
    );
}

// ==========================================
// 推进
// ==========================================

#[test]
fn test_simple_projection() {
    let holder = holder_with_tph(300, 600);
    let graph =
        PickingProjectionBuilder::build_graph(&[ProcessPath::TotMono, ProcessPath::NonTotMono])
            .unwrap();

    let mut upstream = PiecewiseUpstream::new();
    upstream.add(at(DATE_1), "TOT_MONO", &wave(100));
    upstream.add(at(DATE_2), "TOT_MONO", &wave(100));

    let result = graph.run(&holder, &upstream, &[at(DATE_1), at(DATE_2)]).unwrap();

    let tot_mono = result.context("TOT_MONO").unwrap();
    assert_eq!(tot_mono.processed_backlog().len(), 1);
    let processed = &tot_mono.processed_backlog()[0];
    assert_eq!(processed.start_date, at(DATE_1));
    assert_eq!(processed.end_date, at(DATE_2));
    assert_eq!(processed.backlog.total(), 300);
    // 初始 300 + 流入 100 - 处理 300
    assert_eq!(tot_mono.total(), 100);

    // 入参不变
    assert!(holder.context("TOT_MONO").unwrap().processed_backlog().is_empty());
    assert_eq!(holder.context("TOT_MONO").unwrap().total(), 300);
}

#[test]
fn test_parallel_node_aggregates_children_each_tick() {
    let holder = holder_with_tph(300, 600);
    let graph =
        PickingProjectionBuilder::build_graph(&[ProcessPath::TotMono, ProcessPath::NonTotMono])
            .unwrap();

    let mut upstream = PiecewiseUpstream::new();
    upstream.add(at(DATE_2), "NON_TOT_MONO", &wave(250));

    let result = graph
        .run(&holder, &upstream, &[at(DATE_1), at(DATE_2), at(DATE_3)])
        .unwrap();

    let picking = result.context(PICKING).unwrap();
    let tot_mono = result.context("TOT_MONO").unwrap();
    let non_tot_mono = result.context("NON_TOT_MONO").unwrap();

    assert_eq!(picking.total(), tot_mono.total() + non_tot_mono.total());
    assert_eq!(picking.processed_backlog().len(), 2);
    for (i, interval) in picking.processed_backlog().iter().enumerate() {
        assert_eq!(
            interval.backlog.total(),
            tot_mono.processed_backlog()[i].backlog.total()
                + non_tot_mono.processed_backlog()[i].backlog.total()
        );
    }

    // TOT_MONO: 10-11 处理 300，11-12 处理 0（剩余 0）
    // NON_TOT_MONO: 10-11 处理 500，11-12 流入 250 全部处理
    assert_eq!(picking.processed_backlog()[0].backlog.total(), 800);
    assert_eq!(picking.processed_backlog()[1].backlog.total(), 250);
    assert_eq!(picking.total(), 0);

    // 区间首尾相接
    assert_eq!(picking.processed_backlog()[0].end_date, picking.processed_backlog()[1].start_date);
}

#[test]
fn test_earliest_due_processed_first() {
    let holder = holder_with_tph(150, 600);
    let graph = PickingProjectionBuilder::build_graph(&[ProcessPath::TotMono]).unwrap();

    let result = graph
        .run(&holder, &PiecewiseUpstream::new(), &[at(DATE_1), at(DATE_2)])
        .unwrap();

    let processed = &result.context("TOT_MONO").unwrap().processed_backlog()[0].backlog;
    assert_eq!(processed.get(at(DATE_OUT_1)), 100);
    assert_eq!(processed.get(at(DATE_OUT_2)), 50);
}

#[test]
fn test_sub_hour_ticks_match_hourly_projection() {
    // 11 件/小时，5 分钟一步：单步不足 1 件，零头须跨步累积
    let backlog = by_path(&[(ProcessPath::TotMono, &[(DATE_OUT_2, 100)])]);
    let throughput = by_path(&[(ProcessPath::TotMono, &[(DATE_1, 11)])]);
    let holder = PickingProjectionBuilder::build_context_holder(&backlog, &throughput).unwrap();
    let graph = PickingProjectionBuilder::build_graph(&[ProcessPath::TotMono]).unwrap();

    let timeline: Vec<DateTime<Utc>> = (0..=12)
        .map(|i| at(DATE_1) + Duration::minutes(5 * i))
        .collect();
    let result = graph.run(&holder, &PiecewiseUpstream::new(), &timeline).unwrap();

    let tot_mono = result.context("TOT_MONO").unwrap();
    let processed: i64 = tot_mono
        .processed_backlog()
        .iter()
        .map(|interval| interval.backlog.total())
        .sum();
    assert_eq!(processed, 11);
    assert_eq!(tot_mono.total(), 89);

    // 同一输入按小时投影的剩余量一致
    let projection = CptProjector::new()
        .project(
            &CapacityByHour::new(vec![(at(DATE_1), 11)]).unwrap(),
            &OrderedBacklog::new(vec![(at(DATE_OUT_2), 100)]).unwrap(),
            &[],
            at(DATE_1),
            at(DATE_2),
        )
        .unwrap();
    assert_eq!(projection.len(), 1);
    assert_eq!(projection[0].remaining_quantity, tot_mono.total());
}

#[test]
fn test_non_increasing_timeline_rejected() {
    let holder = holder_with_tph(300, 600);
    let graph = PickingProjectionBuilder::build_graph(&[ProcessPath::TotMono]).unwrap();

    let err = graph
        .run(&holder, &PiecewiseUpstream::new(), &[at(DATE_2), at(DATE_2)])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[test]
fn test_graph_node_without_context() {
    let holder = holder_with_tph(300, 600);
    let graph = PickingProjectionBuilder::build_graph(&[ProcessPath::TotMultiOrder]).unwrap();

    let err = graph
        .run(&holder, &PiecewiseUpstream::new(), &[at(DATE_1), at(DATE_2)])
        .unwrap_err();
    assert_eq!(err, EngineError::UnknownProcess("TOT_MULTI_ORDER".to_string()));
}

#[test]
fn test_context_kinds_exposed_through_enum() {
    let holder = holder_with_tph(300, 600);
    match holder.context("TOT_MONO").unwrap() {
        ProcessContext::Simple(ctx) => assert_eq!(ctx.tph.at(at(DATE_2)), 500),
        ProcessContext::Parallel(_) => panic!("TOT_MONO 应为单流程上下文"),
    }
}
