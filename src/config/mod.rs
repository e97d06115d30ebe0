// ==========================================
// 出库计划引擎 - 配置层
// ==========================================
// 职责: 计划参数加载与校验
// 存储: JSON 文件（可选），缺省走默认值
// ==========================================

pub mod error;
pub mod planner_config;

pub use error::{ConfigError, ConfigResult};
pub use planner_config::{
    config_keys, PlannerConfig, ProjectionConfig, WaveSchedulerConfig, CONFIG_ENV_VAR,
};
