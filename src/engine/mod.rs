// ==========================================
// 学员训练计划管理 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎（访问控制/财务对账/分组/汇总）
// 红线: Engine 不拼 SQL,判定结果可复现（只依赖输入与"今天"）
// ==========================================

pub mod access_gate;
pub mod aggregator;
pub mod classification;
pub mod date_normalizer;
pub mod financial;
pub mod refresh;
pub mod text;
pub mod video_group;

// 重导出核心引擎
pub use access_gate::{
    group_tasks_by_day, has_plan, prepare_tasks, AccessGate, DayWindow, GateSnapshot, LockReason,
    Schedule, TaskAccess, UnlockHints,
};
pub use aggregator::{
    Aggregator, CustomerEvaluation, DashboardFilter, DashboardGroups, DashboardSummary,
};
pub use classification::{
    resolve_assignment, resolve_assignment_fields, AssignmentFlag, ClassificationEngine,
};
pub use date_normalizer::{DateInput, DateNormalizer, ReferenceYear};
pub use financial::{FinancialReconciler, FinancialSummary, ProductCatalog};
pub use refresh::{RefreshCoordinator, RefreshSource, RefreshTicket};
pub use video_group::VideoGroupBuilder;
