// ==========================================
// 学员训练计划管理 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod customer;
pub mod product;
pub mod task;
pub mod types;

// 重导出核心类型
pub use customer::{effective_duration, Customer, PurchasedLineItem, DEFAULT_DURATION_DAYS};
pub use product::Product;
pub use task::{ExerciseTask, VideoGroup};
pub use types::{AssignmentState, Bucket, CustomerStatus, ProgramState, TaskCategory};
