// ==========================================
// 学员训练计划管理 - 命令行入口
// ==========================================
// 用法:
//   coaching-plan                 输出本周期看板统计(JSON)
//   coaching-plan <customer_id>   输出该学员的学员端页面(JSON)
//   coaching-plan groups          输出模板视频分组汇总(JSON)
// 数据库路径: COACHING_PLAN_DB_PATH 或用户数据目录
// ==========================================

use anyhow::Context;
use coaching_plan::app::{get_default_db_path, AppState};
use coaching_plan::engine::date_normalizer::today_local;
use coaching_plan::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", coaching_plan::APP_NAME);
    tracing::info!("系统版本: {}", coaching_plan::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let today = today_local();

    let output = match std::env::args().nth(1).map(|s| s.trim().to_string()) {
        Some(arg) if arg == "groups" => {
            let groups = state
                .dashboard_api
                .list_video_groups()
                .await
                .context("加载视频分组失败")?;
            serde_json::to_string_pretty(&groups)?
        }
        Some(customer_id) if !customer_id.is_empty() => {
            let view = state
                .client_view_api
                .load_view(&customer_id, today, false)
                .await
                .with_context(|| format!("加载学员端页面失败: {}", customer_id))?;
            serde_json::to_string_pretty(&view)?
        }
        _ => {
            let view = state
                .dashboard_api
                .load_default_dashboard(today)
                .await
                .context("加载看板失败")?;
            tracing::info!(
                total = view.summary.total,
                active = view.summary.active,
                expiring = view.summary.expiring_soon,
                "看板统计"
            );
            serde_json::to_string_pretty(&view.summary)?
        }
    };

    println!("{}", output);
    Ok(())
}
