// ==========================================
// 学员训练计划管理 - 学员端 API
// ==========================================
// 职责: 学员端页面数据 + 打开任务时的访问判定
// 红线: 每次请求都以"今天"重新计算访问状态,不缓存判定结果
// ==========================================
// 打开任务流程:
// 1) 计划/天数锁定 → 返回锁定原因与提示文案
// 2) 解锁且建议刷新 → 触发后台刷新（不等待,失败忽略）
// 3) 解锁且临近到期 → 带提醒打开,否则直接打开
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::PlanConfig;
use crate::domain::{Customer, ExerciseTask, ProgramState};
use crate::engine::access_gate::{
    group_tasks_by_day, prepare_tasks, AccessGate, DayWindow, GateSnapshot, LockReason, TaskAccess,
};
use crate::engine::date_normalizer::format_display;
use crate::engine::refresh::RefreshCoordinator;
use crate::i18n::{t_in, DEFAULT_LOCALE};
use crate::repository::data_source::PlanDataSource;

// ==========================================
// 返回结构
// ==========================================

/// 提示文案（标题 + 正文）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateNotice {
    pub title: String,
    pub message: String,
}

/// 学员端某一天
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySlot {
    pub day: u32,
    pub unlock_on: NaiveDate,
    pub is_current: bool,
    pub lock_reason: Option<LockReason>,
    pub tasks: Vec<ExerciseTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientView {
    pub customer_id: String,
    pub customer_name: String,
    pub link: String,
    pub today: NaiveDate,
    /// 无开始日期时为 None
    pub state: Option<ProgramState>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub current_day: i64,
    pub days_remaining: Option<i64>,
    /// 计划级提示（未开始/已过期）
    pub notice: Option<GateNotice>,
    pub expanded: bool,
    pub days: Vec<DaySlot>,
}

/// 打开任务的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpenOutcome {
    Open {
        task: ExerciseTask,
        refresh_started: bool,
    },
    OpenWithWarning {
        task: ExerciseTask,
        refresh_started: bool,
        warning: GateNotice,
    },
    Locked {
        reason: LockReason,
        notice: GateNotice,
    },
}

impl OpenOutcome {
    pub fn is_open(&self) -> bool {
        !matches!(self, OpenOutcome::Locked { .. })
    }
}

// ==========================================
// ClientViewApi - 学员端 API
// ==========================================
pub struct ClientViewApi {
    source: Arc<dyn PlanDataSource>,
    refresher: RefreshCoordinator,
    gate: AccessGate,
    window: DayWindow,
    locale: String,
}

impl ClientViewApi {
    pub fn new(
        source: Arc<dyn PlanDataSource>,
        refresher: RefreshCoordinator,
        config: &PlanConfig,
    ) -> Self {
        Self {
            source,
            refresher,
            gate: AccessGate::new(config),
            window: DayWindow::new(config),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// 加载学员端页面
    #[instrument(skip(self))]
    pub async fn load_view(
        &self,
        customer_id: &str,
        today: NaiveDate,
        expanded: bool,
    ) -> ApiResult<ClientView> {
        let customer = self.load_customer(customer_id).await?;
        let tasks = prepare_tasks(
            self.source
                .get_plan(customer_id, customer.plan_ref)
                .await?,
        );
        let snapshot = self.gate.evaluate_customer(&customer, today);

        let mut by_day = group_tasks_by_day(&tasks);

        let days = match snapshot {
            Some(snap) => self
                .window
                .visible_days(expanded)
                .map(|day| DaySlot {
                    day,
                    unlock_on: snap.schedule.unlock_date(day),
                    is_current: snap.state == ProgramState::Active
                        && i64::from(day) == snap.elapsed_days,
                    lock_reason: snap.day_lock_reason(day),
                    tasks: by_day
                        .remove(&day)
                        .map(|ts| ts.into_iter().cloned().collect())
                        .unwrap_or_default(),
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(ClientView {
            customer_id: customer.customer_id.clone(),
            customer_name: customer.customer_name.clone(),
            link: customer.link.clone(),
            today,
            state: snapshot.map(|s| s.state),
            start_date: snapshot.map(|s| s.schedule.start),
            end_date: snapshot.map(|s| s.schedule.end),
            current_day: snapshot.map(|s| s.current_day()).unwrap_or(0),
            days_remaining: snapshot.map(|s| s.days_remaining),
            notice: snapshot
                .and_then(|s| s.program_lock_reason())
                .map(|r| self.lock_notice(&r)),
            expanded,
            days,
        })
    }

    /// 打开第 day 天的第 index 个任务
    #[instrument(skip(self))]
    pub async fn open_task(
        &self,
        customer_id: &str,
        day: u32,
        index: usize,
        today: NaiveDate,
    ) -> ApiResult<OpenOutcome> {
        let customer = self.load_customer(customer_id).await?;
        let snapshot = self.gate.evaluate_customer(&customer, today).ok_or_else(|| {
            ApiError::BusinessRuleViolation(format!("学员{}尚未设置开始日期", customer_id))
        })?;

        let tasks = prepare_tasks(
            self.source
                .get_plan(customer_id, customer.plan_ref)
                .await?,
        );
        let task = tasks
            .into_iter()
            .filter(|t| t.day == day)
            .nth(index)
            .ok_or_else(|| {
                ApiError::NotFound(format!("第{}天第{}个任务不存在", day, index + 1))
            })?;

        Ok(self.decide(&snapshot, customer_id, task))
    }

    /// 对已取得的任务作出打开决定
    pub fn decide(&self, snapshot: &GateSnapshot, customer_id: &str, task: ExerciseTask) -> OpenOutcome {
        match snapshot.task_access(&task) {
            TaskAccess::Locked(reason) => OpenOutcome::Locked {
                notice: self.lock_notice(&reason),
                reason,
            },
            TaskAccess::Unlocked(hints) => {
                let refresh_started =
                    hints.refresh_worthy && self.refresher.trigger(customer_id).is_started();
                if hints.refresh_worthy {
                    debug!(customer_id, day = task.day, refresh_started, "触发后台刷新");
                }

                if hints.near_expiry_warning {
                    OpenOutcome::OpenWithWarning {
                        warning: self.near_expiry_notice(snapshot.days_remaining),
                        task,
                        refresh_started,
                    }
                } else {
                    OpenOutcome::Open {
                        task,
                        refresh_started,
                    }
                }
            }
        }
    }

    /// 锁定提示文案
    pub fn lock_notice(&self, reason: &LockReason) -> GateNotice {
        let key = reason.message_key();
        let (date, day) = match reason {
            LockReason::ProgramNotStarted { starts_on } => (*starts_on, None),
            LockReason::ProgramExpired { ended_on } => (*ended_on, None),
            LockReason::FutureDay { day, unlock_on } => (*unlock_on, Some(day.to_string())),
        };
        let date = format_display(date, true);

        let mut args: Vec<(&str, &str)> = vec![("date", date.as_str())];
        if let Some(day) = day.as_deref() {
            args.push(("day", day));
        }

        GateNotice {
            title: t_in(&self.locale, &format!("{}.title", key), &[]),
            message: t_in(&self.locale, &format!("{}.message", key), &args),
        }
    }

    fn near_expiry_notice(&self, days_remaining: i64) -> GateNotice {
        let days = days_remaining.to_string();
        GateNotice {
            title: t_in(&self.locale, "gate.near_expiry.title", &[]),
            message: t_in(&self.locale, "gate.near_expiry.message", &[("days", days.as_str())]),
        }
    }

    /// 加载学员（不存在或已删除均视为不可用）
    async fn load_customer(&self, customer_id: &str) -> ApiResult<Customer> {
        if customer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("学员ID不能为空".to_string()));
        }
        match self.source.get_customer(customer_id).await? {
            Some(c) if !c.is_deleted() => Ok(c),
            _ => Err(ApiError::NotFound(format!(
                "学员(id={})不存在或已删除",
                customer_id
            ))),
        }
    }
}
