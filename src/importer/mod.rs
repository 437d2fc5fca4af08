// ==========================================
// 学员训练计划管理 - 导入层
// ==========================================
// 职责: 存储边界上的松散文档 → 强类型记录
// 红线: 历史字段名只在本层出现
// ==========================================

pub mod error;
pub mod record_mapper;
pub mod value_cleaner;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use record_mapper::{RecordMapper, LEGACY_ASSIGNMENT_FIELDS, PRIMARY_ASSIGNMENT_FIELD};
pub use value_cleaner::ValueCleaner;
