// ==========================================
// 学员训练计划管理 - 看板汇总
// ==========================================
// 职责: 逐个学员评估(分组 + 财务 + 访问控制),再折叠为看板统计
// 红线: 汇总只依赖逐学员结果,不引入独立判定逻辑
// ==========================================

use crate::config::PlanConfig;
use crate::domain::{Bucket, Customer, Product, ProgramState};
use crate::engine::access_gate::{has_plan, AccessGate, GateSnapshot};
use crate::engine::classification::ClassificationEngine;
use crate::engine::date_normalizer::{add_days, to_key};
use crate::engine::financial::{FinancialReconciler, FinancialSummary};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

// ==========================================
// CustomerEvaluation - 单个学员评估结果
// ==========================================
#[derive(Debug, Clone)]
pub struct CustomerEvaluation<'c> {
    pub customer: &'c Customer,
    pub financial: FinancialSummary,
    pub bucket: Bucket,
    /// 无开始日期时为 None
    pub gate: Option<GateSnapshot>,
    pub created_today: bool,
}

impl<'c> CustomerEvaluation<'c> {
    /// 进行中且临近到期（看板统计口径）
    pub fn is_near_expiry(&self) -> bool {
        self.gate.map(|g| g.is_near_expiry()).unwrap_or(false)
    }

    /// 临近到期栏目: 在统计口径之上还要求已有计划
    pub fn is_expiring(&self) -> bool {
        has_plan(self.customer) && self.is_near_expiry()
    }

    /// 尚未过期（未开始或进行中）;无开始日期不计入
    pub fn is_running(&self) -> bool {
        matches!(
            self.program_state(),
            Some(ProgramState::NotStarted) | Some(ProgramState::Active)
        )
    }

    pub fn program_state(&self) -> Option<ProgramState> {
        self.gate.map(|g| g.state)
    }
}

// ==========================================
// DashboardSummary - 看板统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub bucket_counts: BTreeMap<Bucket, usize>,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub created_today: usize,
    pub expiring_soon: usize,
    pub active: usize,
    pub total: usize,
}

impl DashboardSummary {
    pub fn bucket_count(&self, bucket: Bucket) -> usize {
        self.bucket_counts.get(&bucket).copied().unwrap_or(0)
    }
}

// ==========================================
// DashboardFilter - 看板过滤条件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardFilter {
    /// 按姓名/运单号模糊匹配（忽略大小写）
    pub search_term: String,
    /// 创建日期下限（含）
    pub created_from: Option<NaiveDate>,
    /// 创建日期上限（含）
    pub created_to: Option<NaiveDate>,
    /// 分组过滤
    pub bucket: Option<Bucket>,
}

impl DashboardFilter {
    /// 默认统计周期: 以每月 cycle_start_day 号为界的一个月
    ///
    /// 例: cycle_start_day=15, 今天 10 号 → 上月 15 号 ~ 本月 14 号;
    ///     今天 20 号 → 本月 15 号 ~ 下月 14 号
    pub fn default_cycle(today: NaiveDate, cycle_start_day: u32) -> Self {
        let start_day = cycle_start_day.clamp(1, 28);
        let anchor = today.with_day(1).unwrap_or(today);
        let month_start = if today.day() < start_day {
            anchor.checked_sub_months(Months::new(1)).unwrap_or(anchor)
        } else {
            anchor
        };
        let from = add_days(month_start, i64::from(start_day) - 1);
        let to = add_days(
            month_start.checked_add_months(Months::new(1)).unwrap_or(month_start),
            i64::from(start_day) - 2,
        );

        Self {
            created_from: Some(from),
            created_to: Some(to),
            ..Self::default()
        }
    }

    /// 搜索词 + 创建日期范围（分组过滤在评估后进行）
    pub fn matches_record(&self, customer: &Customer) -> bool {
        let term = self.search_term.trim().to_lowercase();
        let match_search = term.is_empty()
            || customer.customer_name.to_lowercase().contains(&term)
            || customer.shipping_code.to_lowercase().contains(&term);

        // 按规范日期键比较;创建日期未知时不落入任何有界范围
        let created_key = customer.created_at.map(to_key);
        let in_range = |bound: Option<NaiveDate>, ok: fn(&str, &str) -> bool| match bound {
            None => true,
            Some(b) => created_key.as_deref().map(|k| ok(k, &to_key(b))).unwrap_or(false),
        };
        let match_date = in_range(self.created_from, |k, b| k >= b)
            && in_range(self.created_to, |k, b| k <= b);

        match_search && match_date
    }
}

// ==========================================
// DashboardGroups - 看板分栏
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DashboardGroups<'c> {
    pub new_today: Vec<CustomerEvaluation<'c>>,
    pub expiring: Vec<CustomerEvaluation<'c>>,
    pub active: Vec<CustomerEvaluation<'c>>,
    pub not_started: Vec<CustomerEvaluation<'c>>,
    pub expired: Vec<CustomerEvaluation<'c>>,
}

// ==========================================
// Aggregator - 看板汇总器
// ==========================================
pub struct Aggregator {
    gate: AccessGate,
    classifier: ClassificationEngine,
}

impl Aggregator {
    pub fn new(config: &PlanConfig) -> Self {
        Self {
            gate: AccessGate::new(config),
            classifier: ClassificationEngine::new(),
        }
    }

    /// 评估单个学员
    pub fn evaluate<'c>(
        &self,
        customer: &'c Customer,
        reconciler: &FinancialReconciler<'_>,
        today: NaiveDate,
    ) -> CustomerEvaluation<'c> {
        let financial = reconciler.reconcile(customer);
        CustomerEvaluation {
            customer,
            financial,
            bucket: self.classifier.classify(customer, &financial),
            gate: self.gate.evaluate_customer(customer, today),
            created_today: customer.created_at == Some(today),
        }
    }

    /// 批量评估（已删除学员不参与）
    #[instrument(skip(self, customers, products), fields(count = customers.len()))]
    pub fn evaluate_all<'c>(
        &self,
        customers: &'c [Customer],
        products: &[Product],
        today: NaiveDate,
    ) -> Vec<CustomerEvaluation<'c>> {
        let reconciler = FinancialReconciler::new(products);
        customers
            .iter()
            .filter(|c| !c.is_deleted())
            .map(|c| self.evaluate(c, &reconciler, today))
            .collect()
    }

    /// 折叠为看板统计（纯函数）
    ///
    /// 分组计数覆盖全部评估结果;其余指标只统计落入 bucket_filter 的学员
    pub fn summarize(
        evaluations: &[CustomerEvaluation<'_>],
        bucket_filter: Option<Bucket>,
    ) -> DashboardSummary {
        let mut summary = DashboardSummary::default();
        for bucket in Bucket::ALL {
            summary.bucket_counts.insert(bucket, 0);
        }

        for eval in evaluations {
            *summary.bucket_counts.entry(eval.bucket).or_insert(0) += 1;
            if matches!(bucket_filter, Some(b) if b != eval.bucket) {
                continue;
            }
            summary.total_revenue += eval.financial.revenue;
            summary.total_profit += eval.financial.profit;
            if eval.created_today {
                summary.created_today += 1;
            }
            if eval.is_near_expiry() {
                summary.expiring_soon += 1;
            }
            if eval.is_running() {
                summary.active += 1;
            }
            summary.total += 1;
        }
        summary
    }

    /// 按看板栏目分组
    ///
    /// - 今日新建: 按创建日期倒序
    /// - 临近到期: 按剩余天数升序
    /// - 进行中: 排除前两栏,按开始日期升序
    /// - 未开始: 按开始日期升序
    /// - 已过期: 按结束日期倒序
    pub fn group<'c>(evaluations: &[CustomerEvaluation<'c>]) -> DashboardGroups<'c> {
        let mut groups = DashboardGroups::default();

        for eval in evaluations {
            if eval.created_today {
                groups.new_today.push(eval.clone());
            }
            let Some(gate) = eval.gate else { continue };
            match gate.state {
                ProgramState::Active if eval.is_expiring() => groups.expiring.push(eval.clone()),
                ProgramState::Active if !eval.created_today => groups.active.push(eval.clone()),
                ProgramState::Active => {}
                ProgramState::NotStarted => groups.not_started.push(eval.clone()),
                ProgramState::Expired => groups.expired.push(eval.clone()),
            }
        }

        let start = |e: &CustomerEvaluation<'_>| e.gate.map(|g| g.schedule.start);
        let end = |e: &CustomerEvaluation<'_>| e.gate.map(|g| g.schedule.end);

        groups
            .new_today
            .sort_by(|a, b| b.customer.created_at.cmp(&a.customer.created_at));
        groups
            .expiring
            .sort_by_key(|e| e.gate.map(|g| g.days_remaining));
        groups.active.sort_by_key(|e| start(e));
        groups.not_started.sort_by_key(|e| start(e));
        groups.expired.sort_by(|a, b| end(b).cmp(&end(a)));
        groups
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(&PlanConfig::default())
    }
}
