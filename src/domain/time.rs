// ==========================================
// 出库计划引擎 - 时间桶工具
// ==========================================
// 所有时间均为 UTC，桶边界按整点对齐
// ==========================================

use chrono::{DateTime, Duration, DurationRound, Utc};

/// 截断到整点
pub fn truncate_to_hour(date: DateTime<Utc>) -> DateTime<Utc> {
    date.duration_trunc(Duration::hours(1)).unwrap_or(date)
}

/// 向上取整到分钟
pub fn ceil_to_minute(date: DateTime<Utc>) -> DateTime<Utc> {
    let floor = date.duration_trunc(Duration::minutes(1)).unwrap_or(date);
    if floor == date {
        date
    } else {
        floor + Duration::minutes(1)
    }
}

/// 区间 [from, to) 内的整点序列（含 from 所在整点）
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut hours = Vec::new();
    let mut current = truncate_to_hour(from);
    while current < to {
        hours.push(current);
        current += Duration::hours(1);
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_truncate_to_hour() {
        assert_eq!(
            truncate_to_hour(at("2020-01-01T10:45:12Z")),
            at("2020-01-01T10:00:00Z")
        );
        assert_eq!(
            truncate_to_hour(at("2020-01-01T10:00:00Z")),
            at("2020-01-01T10:00:00Z")
        );
    }

    #[test]
    fn test_ceil_to_minute() {
        assert_eq!(
            ceil_to_minute(at("2020-01-01T11:29:01Z")),
            at("2020-01-01T11:30:00Z")
        );
        assert_eq!(
            ceil_to_minute(at("2020-01-01T11:30:00Z")),
            at("2020-01-01T11:30:00Z")
        );
    }

    #[test]
    fn test_hours_between() {
        let hours = hours_between(at("2020-01-01T10:30:00Z"), at("2020-01-01T13:00:00Z"));
        assert_eq!(
            hours,
            vec![
                at("2020-01-01T10:00:00Z"),
                at("2020-01-01T11:00:00Z"),
                at("2020-01-01T12:00:00Z"),
            ]
        );
        assert!(hours_between(at("2020-01-01T10:00:00Z"), at("2020-01-01T10:00:00Z")).is_empty());
    }
}
