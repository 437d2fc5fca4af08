// ==========================================
// 学员训练计划管理 - API 层
// ==========================================
// 职责: 提供运营看板与学员端接口
// ==========================================

pub mod client_view_api;
pub mod dashboard_api;
pub mod error;

// 重导出核心类型
pub use client_view_api::{ClientView, ClientViewApi, DaySlot, GateNotice, OpenOutcome};
pub use dashboard_api::{DashboardApi, DashboardColumns, DashboardRow, DashboardView};
pub use error::{ApiError, ApiResult};
