// ==========================================
// 学员训练计划管理 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod cache;
pub mod data_source;
pub mod document_store;
pub mod error;

// 重导出核心仓储
pub use cache::TtlCache;
pub use data_source::PlanDataSource;
pub use document_store::{customer_owner_key, plan_owner_key, SqliteDocumentStore};
pub use error::{RepositoryError, RepositoryResult};
