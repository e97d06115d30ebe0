// ==========================================
// 出库计划引擎 - 计划参数
// ==========================================
// 来源优先级: JSON 字符串 / 配置文件 / 环境变量指定文件 / 默认值
// 约定: 缺省字段取默认值，加载后必须 validate
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// 配置文件路径环境变量
pub const CONFIG_ENV_VAR: &str = "OUTBOUND_PLANNING_CONFIG";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const DECISION_STEP_MINUTES: &str = "wave.decision_step_minutes";
    pub const HORIZON_HOURS: &str = "wave.horizon_hours";
    pub const IDLE_WAVE_MINUTES: &str = "wave.idle_wave_minutes";
    pub const ROUND_COMPLETION_TO_MINUTE: &str = "projection.round_completion_to_minute";
}

// ==========================================
// WaveSchedulerConfig - 波次决策参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSchedulerConfig {
    /// 决策点间隔（分钟）
    pub decision_step_minutes: i64,
    /// 决策时域（小时）
    pub horizon_hours: i64,
    /// 最小波次（分钟 × 路径拣货产能）：空闲波次下限与 SLA 波次的最小规模
    pub idle_wave_minutes: i64,
}

impl Default for WaveSchedulerConfig {
    fn default() -> Self {
        Self {
            decision_step_minutes: 5,
            horizon_hours: 6,
            idle_wave_minutes: 30,
        }
    }
}

// ==========================================
// ProjectionConfig - 投影参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// 完成时间向上取整到分钟
    pub round_completion_to_minute: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            round_completion_to_minute: true,
        }
    }
}

// ==========================================
// PlannerConfig - 顶层配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub wave: WaveSchedulerConfig,
    pub projection: ProjectionConfig,
}

impl PlannerConfig {
    /// 从 JSON 字符串解析
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从配置文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.display(), "配置文件已加载");
        Ok(config)
    }

    /// 从环境变量指定的文件加载，未设置时使用默认值
    pub fn from_env() -> ConfigResult<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => {
                debug!("{} 未设置，使用默认配置", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    /// 校验参数范围
    pub fn validate(&self) -> ConfigResult<()> {
        if self.wave.decision_step_minutes <= 0 {
            return Err(ConfigError::Invalid(format!(
                "{} 必须为正数: {}",
                config_keys::DECISION_STEP_MINUTES,
                self.wave.decision_step_minutes
            )));
        }
        if self.wave.horizon_hours <= 0 {
            return Err(ConfigError::Invalid(format!(
                "{} 必须为正数: {}",
                config_keys::HORIZON_HOURS,
                self.wave.horizon_hours
            )));
        }
        if self.wave.idle_wave_minutes < 0 {
            return Err(ConfigError::Invalid(format!(
                "{} 不能为负数: {}",
                config_keys::IDLE_WAVE_MINUTES,
                self.wave.idle_wave_minutes
            )));
        }
        Ok(())
    }
}
