// ==========================================
// 出库计划引擎 - 场景运行入口
// ==========================================
// 用法:
//   outbound-planning <request.json> [config.json]
//
// 未指定配置文件时读取 OUTBOUND_PLANNING_CONFIG，仍未设置则使用默认配置
// OUTBOUND_PLANNING_LOG_FORMAT=json 时日志以 JSON 输出到 stderr
// 结果以格式化 JSON 输出到 stdout
// ==========================================

use anyhow::{bail, Context};
use outbound_planning::api::ScenarioApi;
use outbound_planning::config::PlannerConfig;
use outbound_planning::logging;

const LOG_FORMAT_ENV_VAR: &str = "OUTBOUND_PLANNING_LOG_FORMAT";

fn main() -> anyhow::Result<()> {
    if std::env::var(LOG_FORMAT_ENV_VAR).as_deref() == Ok("json") {
        logging::init_json();
    } else {
        logging::init();
    }

    let mut args = std::env::args().skip(1);
    let Some(request_path) = args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    else {
        bail!("用法: outbound-planning <request.json> [config.json]");
    };

    let config = match args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        Some(path) => PlannerConfig::load(&path)?,
        None => PlannerConfig::from_env()?,
    };

    tracing::info!("出库计划引擎 v{}", outbound_planning::VERSION);
    tracing::info!("请求文件: {}", request_path);

    let request = std::fs::read_to_string(&request_path)
        .with_context(|| format!("无法读取请求文件: {}", request_path))?;

    let api = ScenarioApi::new(config);
    let result = api.run_json(&request)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
