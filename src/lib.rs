// ==========================================
// 学员训练计划管理 - 核心库
// ==========================================
// 职责: 学员计划访问控制 + 财务对账
// 技术栈: Rust + SQLite (文档表)
// 红线: 访问判定每次按"今天"重新计算,不落库
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "vi");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 文档存储与缓存
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 原始文档映射
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AssignmentState, Bucket, Customer, CustomerStatus, ExerciseTask, Product, ProgramState,
    PurchasedLineItem, TaskCategory, VideoGroup,
};

// 引擎
pub use engine::{AccessGate, Aggregator, DateNormalizer, RefreshCoordinator};

// API
pub use api::{ClientViewApi, DashboardApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学员训练计划管理";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
