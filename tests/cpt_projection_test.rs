// ==========================================
// CptProjector 引擎集成测试
// ==========================================
// 测试目标: 验证 CPT 达成投影的完成时间与剩余量
// 覆盖范围: 按时完成、提前完成、区间内未完成、多 CPT 共享产能、必报 CPT
// ==========================================

use chrono::{DateTime, Duration, Utc};
use outbound_planning::config::ProjectionConfig;
use outbound_planning::domain::{
    CapacityByHour, CommitmentResult, OrderedBacklog, PlannedUnits, ProjectionType,
};
use outbound_planning::engine::{CptProjectionInput, CptProjector, EngineError, MAX_QUANTITY};

// ==========================================
// 测试辅助函数
// ==========================================

fn at(s: &str) -> DateTime<Utc> {
    outbound_planning::logging::init_test();
    s.parse().unwrap()
}

/// 从 start 起每小时一个产能值
fn hourly_capacity(start: &str, values: &[i64]) -> CapacityByHour {
    let start = at(start);
    CapacityByHour::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::hours(i as i64), *v)),
    )
    .unwrap()
}

fn backlog(values: &[(&str, i64)]) -> OrderedBacklog {
    OrderedBacklog::new(values.iter().map(|(d, q)| (at(d), *q))).unwrap()
}

fn planned(date_in: &str, date_out: &str, quantity: i64) -> PlannedUnits {
    PlannedUnits::new(at(date_in), at(date_out), quantity)
}

// ==========================================
// 单 CPT 场景
// ==========================================

#[test]
fn test_completion_exactly_at_cpt() {
    let projector = CptProjector::new();
    let results = projector
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[100, 200, 200]),
            &backlog(&[("2020-01-01T12:00:00Z", 100)]),
            &[planned("2020-01-01T11:00:00Z", "2020-01-01T12:00:00Z", 200)],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T14:00:00Z"),
        )
        .unwrap();

    assert_eq!(
        results,
        vec![CommitmentResult::new(
            at("2020-01-01T12:00:00Z"),
            Some(at("2020-01-01T12:00:00Z")),
            0
        )]
    );
    assert!(results[0].is_on_time());
}

#[test]
fn test_completion_before_cpt() {
    let projector = CptProjector::new();
    let results = projector
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[100, 200, 200]),
            &backlog(&[("2020-01-01T12:00:00Z", 100)]),
            &[planned("2020-01-01T11:00:00Z", "2020-01-01T12:00:00Z", 100)],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T14:00:00Z"),
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].projected_end_date, Some(at("2020-01-01T11:30:00Z")));
    assert_eq!(results[0].remaining_quantity, 0);
}

#[test]
fn test_unmet_demand_by_horizon() {
    let projector = CptProjector::new();
    let results = projector
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[100, 200, 200]),
            &backlog(&[("2020-01-01T12:00:00Z", 1000)]),
            &[planned("2020-01-01T11:00:00Z", "2020-01-01T12:00:00Z", 100)],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T14:00:00Z"),
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].date, at("2020-01-01T12:00:00Z"));
    assert_eq!(results[0].projected_end_date, None);
    assert_eq!(results[0].remaining_quantity, 800);
}

#[test]
fn test_completion_after_cpt_reports_remaining_at_cpt() {
    let projector = CptProjector::new();

    for (date_out, expected_remaining) in [
        ("2020-01-01T12:00:00Z", 200),
        ("2020-01-01T12:30:00Z", 100),
    ] {
        let results = projector
            .project(
                &hourly_capacity("2020-01-01T10:00:00Z", &[100, 200, 200]),
                &backlog(&[(date_out, 100)]),
                &[planned("2020-01-01T11:00:00Z", date_out, 400)],
                at("2020-01-01T10:00:00Z"),
                at("2020-01-01T14:00:00Z"),
            )
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].date, at(date_out));
        assert_eq!(results[0].projected_end_date, Some(at("2020-01-01T13:00:00Z")));
        assert_eq!(results[0].remaining_quantity, expected_remaining);
        assert!(!results[0].is_on_time());
    }
}

// ==========================================
// 多 CPT 场景
// ==========================================

#[test]
fn test_capacity_shared_across_cpts() {
    let projector = CptProjector::new();
    let results = projector
        .project(
            &hourly_capacity(
                "2020-01-01T10:00:00Z",
                &[200, 200, 100, 100, 100, 100, 100, 100, 100],
            ),
            &backlog(&[("2020-01-01T12:00:00Z", 100), ("2020-01-01T13:00:00Z", 150)]),
            &[
                planned("2020-01-01T11:00:00Z", "2020-01-01T12:00:00Z", 100),
                planned("2020-01-01T11:00:00Z", "2020-01-01T13:00:00Z", 350),
            ],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T16:00:00Z"),
        )
        .unwrap();

    assert_eq!(
        results,
        vec![
            CommitmentResult::new(
                at("2020-01-01T12:00:00Z"),
                Some(at("2020-01-01T11:30:00Z")),
                0
            ),
            CommitmentResult::new(
                at("2020-01-01T13:00:00Z"),
                Some(at("2020-01-01T15:00:00Z")),
                200
            ),
        ]
    );
}

#[test]
fn test_past_due_demand_is_still_processed() {
    // 09:00 的 CPT 已过期，仍按最早截止优先处理
    let projector = CptProjector::new();
    let results = projector
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[100, 100]),
            &backlog(&[("2020-01-01T09:00:00Z", 50), ("2020-01-01T11:00:00Z", 50)]),
            &[],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T12:00:00Z"),
        )
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].date, at("2020-01-01T09:00:00Z"));
    assert_eq!(results[0].projected_end_date, Some(at("2020-01-01T10:30:00Z")));
    // 截止时间早于投影起点：起点时全部未处理
    assert_eq!(results[0].remaining_quantity, 50);
    assert_eq!(results[1].projected_end_date, Some(at("2020-01-01T11:00:00Z")));
    assert_eq!(results[1].remaining_quantity, 0);
}

#[test]
fn test_missing_capacity_hour_is_zero_not_skipped() {
    let projector = CptProjector::new();
    let capacity = CapacityByHour::new(vec![
        (at("2020-01-01T10:00:00Z"), 100),
        (at("2020-01-01T12:00:00Z"), 100),
    ])
    .unwrap();

    let results = projector
        .project(
            &capacity,
            &backlog(&[("2020-01-01T13:00:00Z", 150)]),
            &[],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T14:00:00Z"),
        )
        .unwrap();

    assert_eq!(results[0].projected_end_date, Some(at("2020-01-01T12:30:00Z")));
    assert_eq!(results[0].remaining_quantity, 0);
}

// ==========================================
// execute / 必报 CPT
// ==========================================

#[test]
fn test_execute_reports_cpts_without_demand() {
    let projector = CptProjector::new();
    let input = CptProjectionInput {
        date_from: at("2020-01-01T10:00:00Z"),
        date_to: at("2020-01-01T14:00:00Z"),
        capacity: hourly_capacity("2020-01-01T10:00:00Z", &[100, 100, 100, 100]),
        backlog: backlog(&[("2020-01-01T12:00:00Z", 50)]),
        planned_units: vec![],
        cpt_by_warehouse: vec![
            at("2020-01-01T13:00:00Z"),
            at("2020-01-01T12:00:00Z"),
            at("2020-01-01T13:00:00Z"),
        ],
        projection_type: ProjectionType::Cpt,
    };

    let results = projector.execute(&input).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].date, at("2020-01-01T12:00:00Z"));
    assert_eq!(results[0].projected_end_date, Some(at("2020-01-01T10:30:00Z")));
    assert_eq!(
        results[1],
        CommitmentResult::new(
            at("2020-01-01T13:00:00Z"),
            Some(at("2020-01-01T13:00:00Z")),
            0
        )
    );
}

#[test]
fn test_unrounded_completion_keeps_seconds() {
    let projector = CptProjector::with_config(&ProjectionConfig {
        round_completion_to_minute: false,
    });
    let results = projector
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[7]),
            &backlog(&[("2020-01-01T11:00:00Z", 1)]),
            &[],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T11:00:00Z"),
        )
        .unwrap();

    // 1 件 / 7 件每小时 = 514.28… 秒 → 515 秒
    assert_eq!(
        results[0].projected_end_date,
        Some(at("2020-01-01T10:08:35Z"))
    );
}

#[test]
fn test_invalid_range() {
    let projector = CptProjector::new();
    let err = projector
        .project(
            &CapacityByHour::empty(),
            &OrderedBacklog::empty(),
            &[],
            at("2020-01-01T12:00:00Z"),
            at("2020-01-01T11:59:59Z"),
        )
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRange { .. }));
}

// ==========================================
// 数量上限
// ==========================================

#[test]
fn test_huge_backlog_is_rejected_not_panicking() {
    let err = OrderedBacklog::new(vec![(at("2020-01-01T12:00:00Z"), 5_000_000_000_000_000)])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // 单行合法但同一 CPT 累加后换算件·秒溢出，同样返回错误
    let saturated = OrderedBacklog::new(
        (0..10_000).map(|_| (at("2020-01-01T12:00:00Z"), MAX_QUANTITY)),
    )
    .unwrap();
    let err = CptProjector::new()
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[100]),
            &saturated,
            &[],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T14:00:00Z"),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[test]
fn test_huge_planned_quantity_is_rejected() {
    let err = CptProjector::new()
        .project(
            &hourly_capacity("2020-01-01T10:00:00Z", &[100]),
            &OrderedBacklog::empty(),
            &[planned("2020-01-01T10:00:00Z", "2020-01-01T12:00:00Z", i64::MAX)],
            at("2020-01-01T10:00:00Z"),
            at("2020-01-01T14:00:00Z"),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

// ==========================================
// 递延投影
// ==========================================

fn deferral_input(projection_type: ProjectionType) -> CptProjectionInput {
    CptProjectionInput {
        date_from: at("2020-01-01T10:00:00Z"),
        date_to: at("2020-01-01T14:00:00Z"),
        capacity: hourly_capacity("2020-01-01T10:00:00Z", &[100, 100, 100, 100]),
        backlog: backlog(&[("2020-01-01T12:00:00Z", 100)]),
        planned_units: vec![
            planned("2020-01-01T11:00:00Z", "2020-01-01T13:00:00Z", 350).deferred(),
        ],
        cpt_by_warehouse: vec![at("2020-01-01T12:00:00Z"), at("2020-01-01T13:00:00Z")],
        projection_type,
    }
}

#[test]
fn test_deferral_projection_excludes_deferred_units() {
    let projector = CptProjector::new();

    let cpt = projector.execute(&deferral_input(ProjectionType::Cpt)).unwrap();
    // 已递延的 350 件在 CPT 投影中仍占产能：11:00-13:00 只处理 200
    assert_eq!(cpt[1].date, at("2020-01-01T13:00:00Z"));
    assert_eq!(cpt[1].remaining_quantity, 150);
    assert_eq!(cpt[1].projected_end_date, None);

    let deferral = projector
        .execute(&deferral_input(ProjectionType::Deferral))
        .unwrap();
    assert_eq!(
        deferral,
        vec![
            CommitmentResult::new(
                at("2020-01-01T12:00:00Z"),
                Some(at("2020-01-01T11:00:00Z")),
                0
            ),
            CommitmentResult::new(
                at("2020-01-01T13:00:00Z"),
                Some(at("2020-01-01T13:00:00Z")),
                0
            ),
        ]
    );
}

#[test]
fn test_deferral_projection_without_planned_units() {
    let input = CptProjectionInput {
        date_from: at("2020-01-01T10:00:00Z"),
        date_to: at("2020-01-01T13:00:00Z"),
        capacity: hourly_capacity("2020-01-01T10:00:00Z", &[50, 50, 25, 40]),
        backlog: backlog(&[("2020-01-01T12:00:00Z", 100)]),
        planned_units: vec![],
        cpt_by_warehouse: vec![at("2020-01-01T12:00:00Z")],
        projection_type: ProjectionType::Deferral,
    };

    let results = CptProjector::new().execute(&input).unwrap();

    assert_eq!(
        results,
        vec![CommitmentResult::new(
            at("2020-01-01T12:00:00Z"),
            Some(at("2020-01-01T12:00:00Z")),
            0
        )]
    );
}

#[test]
fn test_backlog_projection_type_rejected() {
    let err = CptProjector::new()
        .execute(&deferral_input(ProjectionType::Backlog))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
}
