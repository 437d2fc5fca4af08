// ==========================================
// 学员训练计划管理 - 数据源 Trait
// ==========================================
// 职责: 定义引擎/API 所需的数据访问接口（不包含业务逻辑）
// 红线: 返回的都是已映射的强类型记录
// ==========================================

use crate::domain::{Customer, ExerciseTask, Product};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::NaiveDate;

// ==========================================
// PlanDataSource Trait
// ==========================================
// 实现者: SqliteDocumentStore
#[async_trait]
pub trait PlanDataSource: Send + Sync {
    // ===== 读取 =====

    /// 全部学员（含已删除,由调用方过滤）
    async fn list_customers(&self) -> RepositoryResult<Vec<Customer>>;

    async fn get_customer(&self, customer_id: &str) -> RepositoryResult<Option<Customer>>;

    async fn list_products(&self) -> RepositoryResult<Vec<Product>>;

    /// 学员的任务列表
    ///
    /// 学员有专属任务时返回专属任务,否则返回计划模板任务
    async fn get_plan(
        &self,
        customer_id: &str,
        plan_ref: Option<NaiveDate>,
    ) -> RepositoryResult<Vec<ExerciseTask>>;

    /// 全部模板任务（视频分组汇总用）
    async fn list_template_tasks(&self) -> RepositoryResult<Vec<ExerciseTask>>;

    // ===== 写入（写入后读缓存整体失效）=====

    async fn upsert_customer(&self, customer: &Customer) -> RepositoryResult<()>;

    /// 软删除（状态置为 DELETED）
    async fn delete_customer(&self, customer_id: &str) -> RepositoryResult<()>;

    /// 整表替换商品目录
    async fn save_products(&self, products: &[Product]) -> RepositoryResult<usize>;

    /// 整体替换学员专属任务
    async fn save_customer_plan(
        &self,
        customer_id: &str,
        tasks: &[ExerciseTask],
    ) -> RepositoryResult<usize>;

    /// 整体替换计划模板任务
    async fn save_template_tasks(
        &self,
        plan_ref: NaiveDate,
        tasks: &[ExerciseTask],
    ) -> RepositoryResult<usize>;

    async fn delete_template(&self, plan_ref: NaiveDate) -> RepositoryResult<usize>;
}
