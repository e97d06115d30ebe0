// ==========================================
// 出库计划引擎 - 领域类型定义
// ==========================================
// 职责: 流程路径 / 流程名称 / 触发原因 / 投影类型
// 序列化格式: SCREAMING_SNAKE_CASE (与上游接口一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 流程路径 (Process Path)
// ==========================================
// 拣货按路径拆分，各路径独立核算产能与积压
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessPath {
    Global,           // 全局（不区分路径）
    TotMono,          // 周转箱 单件
    NonTotMono,       // 非周转箱 单件
    TotMultiBatch,    // 周转箱 多件批次
    NonTotMultiBatch, // 非周转箱 多件批次
    TotMultiOrder,    // 周转箱 多件订单
    NonTotMultiOrder, // 非周转箱 多件订单
}

impl ProcessPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessPath::Global => "GLOBAL",
            ProcessPath::TotMono => "TOT_MONO",
            ProcessPath::NonTotMono => "NON_TOT_MONO",
            ProcessPath::TotMultiBatch => "TOT_MULTI_BATCH",
            ProcessPath::NonTotMultiBatch => "NON_TOT_MULTI_BATCH",
            ProcessPath::TotMultiOrder => "TOT_MULTI_ORDER",
            ProcessPath::NonTotMultiOrder => "NON_TOT_MULTI_ORDER",
        }
    }
}

impl fmt::Display for ProcessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProcessPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GLOBAL" => Ok(ProcessPath::Global),
            "TOT_MONO" => Ok(ProcessPath::TotMono),
            "NON_TOT_MONO" => Ok(ProcessPath::NonTotMono),
            "TOT_MULTI_BATCH" => Ok(ProcessPath::TotMultiBatch),
            "NON_TOT_MULTI_BATCH" => Ok(ProcessPath::NonTotMultiBatch),
            "TOT_MULTI_ORDER" => Ok(ProcessPath::TotMultiOrder),
            "NON_TOT_MULTI_ORDER" => Ok(ProcessPath::NonTotMultiOrder),
            other => Err(format!("未知流程路径: {}", other)),
        }
    }
}

// ==========================================
// 流程名称 (Process Name)
// ==========================================
// 出库主干: 波次 → 拣货 → 包装 (多件批次另经分拣/墙)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessName {
    Waving,      // 待下发波次
    Picking,     // 拣货
    Packing,     // 包装
    BatchSorter, // 批次分拣
    WallIn,      // 上墙
    PackingWall, // 墙面包装
}

impl ProcessName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessName::Waving => "WAVING",
            ProcessName::Picking => "PICKING",
            ProcessName::Packing => "PACKING",
            ProcessName::BatchSorter => "BATCH_SORTER",
            ProcessName::WallIn => "WALL_IN",
            ProcessName::PackingWall => "PACKING_WALL",
        }
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 波次触发原因 (Trigger Name)
// ==========================================
// 红线: 两类触发互斥，同一决策点只归因一种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerName {
    Sla,      // 临近 CPT
    Idleness, // 下游即将空闲
}

impl fmt::Display for TriggerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerName::Sla => write!(f, "SLA"),
            TriggerName::Idleness => write!(f, "IDLENESS"),
        }
    }
}

// ==========================================
// 投影类型 (Projection Type)
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectionType {
    #[default]
    Cpt,      // CPT 达成投影
    Backlog,  // 积压投影
    Deferral, // 延迟投影
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionType::Cpt => write!(f, "CPT"),
            ProjectionType::Backlog => write!(f, "BACKLOG"),
            ProjectionType::Deferral => write!(f, "DEFERRAL"),
        }
    }
}
