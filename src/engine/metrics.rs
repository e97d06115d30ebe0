// ==========================================
// 出库计划引擎 - 波次执行指标
// ==========================================
// 职责: 定义指标观察者 trait，由调用方注入
// 说明: 引擎不持有全局指标客户端，测试可注入记录型实现
// ==========================================

use crate::domain::types::{ProcessPath, TriggerName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// ==========================================
// 指标事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveExecutionEventType {
    /// 产出波次建议
    SuggestionEmitted,
    /// 上限为 0，路径被抑制
    ReleaseSuppressed,
    /// 计算结束
    Finished,
}

impl WaveExecutionEventType {
    pub fn as_str(&self) -> &str {
        match self {
            WaveExecutionEventType::SuggestionEmitted => "SuggestionEmitted",
            WaveExecutionEventType::ReleaseSuppressed => "ReleaseSuppressed",
            WaveExecutionEventType::Finished => "Finished",
        }
    }
}

/// 波次执行事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveExecutionEvent {
    SuggestionEmitted {
        date: DateTime<Utc>,
        reason: TriggerName,
        wave_count: usize,
        total_units: i64,
    },
    ReleaseSuppressed {
        date: DateTime<Utc>,
        process_path: ProcessPath,
    },
    Finished {
        decision_points: usize,
        suggestions: usize,
    },
}

impl WaveExecutionEvent {
    pub fn event_type(&self) -> WaveExecutionEventType {
        match self {
            WaveExecutionEvent::SuggestionEmitted { .. } => WaveExecutionEventType::SuggestionEmitted,
            WaveExecutionEvent::ReleaseSuppressed { .. } => WaveExecutionEventType::ReleaseSuppressed,
            WaveExecutionEvent::Finished { .. } => WaveExecutionEventType::Finished,
        }
    }
}

// ==========================================
// 观察者 Trait
// ==========================================

/// 波次指标观察者
///
/// 实现方负责把事件转发到实际的指标后端
pub trait WaveMetricsObserver: Send + Sync {
    fn record(&self, event: &WaveExecutionEvent);
}

/// 空操作观察者（默认）
#[derive(Debug, Clone, Default)]
pub struct NoOpMetricsObserver;

impl WaveMetricsObserver for NoOpMetricsObserver {
    fn record(&self, event: &WaveExecutionEvent) {
        tracing::debug!(
            "NoOpMetricsObserver: 跳过指标上报 - event_type={}",
            event.event_type().as_str()
        );
    }
}

/// 内存记录型观察者
#[derive(Debug, Default)]
pub struct RecordingMetricsObserver {
    events: Mutex<Vec<WaveExecutionEvent>>,
}

impl RecordingMetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录事件的快照
    pub fn events(&self) -> Vec<WaveExecutionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, event_type: WaveExecutionEventType) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

impl WaveMetricsObserver for RecordingMetricsObserver {
    fn record(&self, event: &WaveExecutionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_counts_by_type() {
        let observer = RecordingMetricsObserver::new();
        let date: DateTime<Utc> = "2023-03-29T00:00:00Z".parse().unwrap();

        observer.record(&WaveExecutionEvent::ReleaseSuppressed {
            date,
            process_path: ProcessPath::TotMono,
        });
        observer.record(&WaveExecutionEvent::Finished {
            decision_points: 12,
            suggestions: 0,
        });

        assert_eq!(observer.count(WaveExecutionEventType::ReleaseSuppressed), 1);
        assert_eq!(observer.count(WaveExecutionEventType::SuggestionEmitted), 0);
        assert_eq!(observer.events().len(), 2);
    }
}
