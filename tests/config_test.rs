// ==========================================
// PlannerConfig 集成测试
// ==========================================
// 测试目标: 验证配置文件加载、环境变量回退与参数校验
// ==========================================

use outbound_planning::config::{ConfigError, PlannerConfig, CONFIG_ENV_VAR};
use std::io::Write;
use tempfile::NamedTempFile;

// ==========================================
// 测试辅助函数
// ==========================================

/// 写入临时配置文件
fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"{
            "wave": {"decision_step_minutes": 10, "horizon_hours": 4},
            "projection": {"round_completion_to_minute": false}
        }"#,
    );

    let config = PlannerConfig::load(file.path()).expect("Should load config file");
    assert_eq!(config.wave.decision_step_minutes, 10);
    assert_eq!(config.wave.horizon_hours, 4);
    assert!(!config.projection.round_completion_to_minute);
}

#[test]
fn test_empty_object_uses_defaults() {
    let file = write_config("{}");
    let config = PlannerConfig::load(file.path()).unwrap();
    assert_eq!(config, PlannerConfig::default());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let err = PlannerConfig::load(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("missing.json"));
}

#[test]
fn test_invalid_horizon_rejected_on_load() {
    let file = write_config(r#"{"wave": {"horizon_hours": -1}}"#);
    let err = PlannerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_from_env_reads_file_then_falls_back() {
    let file = write_config(r#"{"wave": {"decision_step_minutes": 15}}"#);

    std::env::set_var(CONFIG_ENV_VAR, file.path());
    let config = PlannerConfig::from_env().unwrap();
    assert_eq!(config.wave.decision_step_minutes, 15);

    std::env::remove_var(CONFIG_ENV_VAR);
    let config = PlannerConfig::from_env().unwrap();
    assert_eq!(config, PlannerConfig::default());
}
