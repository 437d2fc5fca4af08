// ==========================================
// 学员训练计划管理 - 运营看板 API
// ==========================================
// 职责: 加载学员与商品目录,输出看板统计/分栏/逐行结果
// 架构: API 层 → 引擎层 (Aggregator) → 数据源 (PlanDataSource)
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::config::PlanConfig;
use crate::domain::{Bucket, ProgramState, VideoGroup};
use crate::engine::aggregator::{
    Aggregator, CustomerEvaluation, DashboardFilter, DashboardGroups, DashboardSummary,
};
use crate::engine::video_group::VideoGroupBuilder;
use crate::i18n::{t_in, DEFAULT_LOCALE};
use crate::repository::data_source::PlanDataSource;

// ==========================================
// 返回结构
// ==========================================

/// 看板单行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub customer_id: String,
    pub customer_name: String,
    pub bucket: Bucket,
    pub bucket_label: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub program_state: Option<ProgramState>,
    pub current_day: Option<i64>,
    pub days_remaining: Option<i64>,
    pub created_at: Option<NaiveDate>,
}

/// 看板分栏（学员 ID,已按栏目规则排序）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardColumns {
    pub new_today: Vec<String>,
    pub expiring: Vec<String>,
    pub active: Vec<String>,
    pub not_started: Vec<String>,
    pub expired: Vec<String>,
}

impl From<DashboardGroups<'_>> for DashboardColumns {
    fn from(groups: DashboardGroups<'_>) -> Self {
        let ids = |evals: Vec<CustomerEvaluation<'_>>| -> Vec<String> {
            evals
                .into_iter()
                .map(|e| e.customer.customer_id.clone())
                .collect()
        };
        Self {
            new_today: ids(groups.new_today),
            expiring: ids(groups.expiring),
            active: ids(groups.active),
            not_started: ids(groups.not_started),
            expired: ids(groups.expired),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub today: NaiveDate,
    pub filter: DashboardFilter,
    /// 统计按搜索词/日期范围过滤后计算,不受分组过滤影响
    pub summary: DashboardSummary,
    pub columns: DashboardColumns,
    /// 逐行结果（已应用分组过滤）
    pub rows: Vec<DashboardRow>,
}

// ==========================================
// DashboardApi - 运营看板 API
// ==========================================
pub struct DashboardApi {
    source: Arc<dyn PlanDataSource>,
    config: PlanConfig,
    aggregator: Aggregator,
    video_groups: VideoGroupBuilder,
    locale: String,
}

impl DashboardApi {
    pub fn new(source: Arc<dyn PlanDataSource>, config: PlanConfig) -> Self {
        Self {
            source,
            aggregator: Aggregator::new(&config),
            video_groups: VideoGroupBuilder::new(&config),
            config,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// 指定分组标签的语言
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// 默认统计周期的过滤条件
    pub fn default_filter(&self, today: NaiveDate) -> DashboardFilter {
        DashboardFilter::default_cycle(today, self.config.cycle_start_day)
    }

    /// 加载看板
    #[instrument(skip(self, filter), fields(search = %filter.search_term, bucket = ?filter.bucket))]
    pub async fn load_dashboard(
        &self,
        filter: &DashboardFilter,
        today: NaiveDate,
    ) -> ApiResult<DashboardView> {
        let (customers, products) =
            futures::try_join!(self.source.list_customers(), self.source.list_products())?;

        let selected: Vec<_> = customers
            .into_iter()
            .filter(|c| filter.matches_record(c))
            .collect();
        let evaluations = self.aggregator.evaluate_all(&selected, &products, today);
        let summary = Aggregator::summarize(&evaluations, filter.bucket);

        let visible: Vec<CustomerEvaluation<'_>> = evaluations
            .into_iter()
            .filter(|e| filter.bucket.map(|b| b == e.bucket).unwrap_or(true))
            .collect();
        let columns = DashboardColumns::from(Aggregator::group(&visible));
        let rows = visible.iter().map(|e| self.to_row(e)).collect();

        tracing::debug!(
            total = summary.total,
            expiring = summary.expiring_soon,
            "看板加载完成"
        );

        Ok(DashboardView {
            today,
            filter: filter.clone(),
            summary,
            columns,
            rows,
        })
    }

    /// 以默认统计周期加载看板
    pub async fn load_default_dashboard(&self, today: NaiveDate) -> ApiResult<DashboardView> {
        let filter = self.default_filter(today);
        self.load_dashboard(&filter, today).await
    }

    /// 模板视频分组汇总
    pub async fn list_video_groups(&self) -> ApiResult<Vec<VideoGroup>> {
        let (tasks, customers) = futures::try_join!(
            self.source.list_template_tasks(),
            self.source.list_customers()
        )?;
        Ok(self.video_groups.build(&tasks, &customers))
    }

    fn to_row(&self, eval: &CustomerEvaluation<'_>) -> DashboardRow {
        DashboardRow {
            customer_id: eval.customer.customer_id.clone(),
            customer_name: eval.customer.customer_name.clone(),
            bucket: eval.bucket,
            bucket_label: t_in(&self.locale, &eval.bucket.label_key(), &[]),
            revenue: eval.financial.revenue,
            cost: eval.financial.cost,
            profit: eval.financial.profit,
            program_state: eval.program_state(),
            current_day: eval.gate.map(|g| g.current_day()),
            days_remaining: eval.gate.map(|g| g.days_remaining),
            created_at: eval.customer.created_at,
        }
    }
}
