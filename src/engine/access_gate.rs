// ==========================================
// 学员训练计划管理 - 访问控制引擎
// ==========================================
// 职责: 给定学员计划与"今天",判定计划状态与每个任务的可见性
// 红线: 纯函数,无隐藏状态,可在每次访问时重复计算
// ==========================================
// 计划状态（按优先级判定,命中即返回）:
// 1) today < start → NotStarted
// 2) today > end   → Expired
// 3) 其他          → Active
//
// 任务状态:
// - 计划未开始/已过期 → 全部锁定,原因取计划级原因
// - 否则 task.day <= elapsed_days → 解锁,反之锁定到 start + (day - 1)
// ==========================================

use crate::config::PlanConfig;
use crate::domain::{
    effective_duration, Customer, ExerciseTask, ProgramState, DEFAULT_DURATION_DAYS,
};
use crate::engine::date_normalizer::{add_days, day_diff};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

// ==========================================
// Schedule - 学员计划时间窗
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: u32,
}

impl Schedule {
    /// 创建计划时间窗
    ///
    /// end 未显式给出时取 start + duration_days - 1;
    /// duration_days 为 0 时使用默认天数
    pub fn new(start: NaiveDate, end: Option<NaiveDate>, duration_days: u32) -> Self {
        let duration_days = effective_duration(duration_days, DEFAULT_DURATION_DAYS);
        let end = end.unwrap_or_else(|| add_days(start, i64::from(duration_days) - 1));
        Self {
            start,
            end,
            duration_days,
        }
    }

    /// 第 day 天任务的解锁日期
    pub fn unlock_date(&self, day: u32) -> NaiveDate {
        add_days(self.start, i64::from(day) - 1)
    }
}

// ==========================================
// 锁定原因 / 任务访问结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockReason {
    /// 计划尚未开始
    ProgramNotStarted { starts_on: NaiveDate },
    /// 计划已过期
    ProgramExpired { ended_on: NaiveDate },
    /// 任务所在天数尚未到达
    FutureDay { day: u32, unlock_on: NaiveDate },
}

impl LockReason {
    /// i18n 键前缀
    pub fn message_key(&self) -> &'static str {
        match self {
            LockReason::ProgramNotStarted { .. } => "gate.not_started",
            LockReason::ProgramExpired { .. } => "gate.expired",
            LockReason::FutureDay { .. } => "gate.future_day",
        }
    }
}

/// 解锁任务的附加提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnlockHints {
    /// 建议后台静默刷新数据（仅为缓存失效提示,不影响解锁判定）
    pub refresh_worthy: bool,
    /// 临近到期提示（展示用,不是锁）
    pub near_expiry_warning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskAccess {
    Unlocked(UnlockHints),
    Locked(LockReason),
}

impl TaskAccess {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, TaskAccess::Unlocked(_))
    }

    pub fn lock_reason(&self) -> Option<LockReason> {
        match self {
            TaskAccess::Locked(reason) => Some(*reason),
            TaskAccess::Unlocked(_) => None,
        }
    }
}

// ==========================================
// GateSnapshot - 某一天的计划评估结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub schedule: Schedule,
    pub today: NaiveDate,
    pub state: ProgramState,
    /// 当前计划第几天（<=0 未开始,> duration 已超出）
    pub elapsed_days: i64,
    /// 距离结束日的天数（过期后为负）
    pub days_remaining: i64,
    near_expiry_days: i64,
    refresh_day_modulus: u32,
}

impl GateSnapshot {
    /// 计划级锁定原因（进行中时为 None）
    pub fn program_lock_reason(&self) -> Option<LockReason> {
        match self.state {
            ProgramState::NotStarted => Some(LockReason::ProgramNotStarted {
                starts_on: self.schedule.start,
            }),
            ProgramState::Expired => Some(LockReason::ProgramExpired {
                ended_on: self.schedule.end,
            }),
            ProgramState::Active => None,
        }
    }

    /// 进行中且剩余天数在 0..=N 内
    pub fn is_near_expiry(&self) -> bool {
        self.state == ProgramState::Active
            && (0..=self.near_expiry_days).contains(&self.days_remaining)
    }

    /// 展示用的当前天数（未开始时为 0）
    pub fn current_day(&self) -> i64 {
        self.elapsed_days.max(0)
    }

    /// 第 day 天的锁定原因（可访问时为 None）
    pub fn day_lock_reason(&self, day: u32) -> Option<LockReason> {
        if let Some(reason) = self.program_lock_reason() {
            return Some(reason);
        }
        if i64::from(day) > self.elapsed_days {
            return Some(LockReason::FutureDay {
                day,
                unlock_on: self.schedule.unlock_date(day),
            });
        }
        None
    }

    /// 判定单个任务的访问状态
    pub fn task_access(&self, task: &ExerciseTask) -> TaskAccess {
        if let Some(reason) = self.day_lock_reason(task.day) {
            return TaskAccess::Locked(reason);
        }

        TaskAccess::Unlocked(UnlockHints {
            refresh_worthy: is_refresh_worthy(task, self.refresh_day_modulus),
            near_expiry_warning: self.is_near_expiry(),
        })
    }
}

// ==========================================
// AccessGate - 访问控制引擎
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGate {
    default_duration_days: u32,
    near_expiry_days: i64,
    refresh_day_modulus: u32,
}

impl AccessGate {
    pub fn new(config: &PlanConfig) -> Self {
        Self {
            default_duration_days: config.default_duration_days,
            near_expiry_days: config.near_expiry_days,
            refresh_day_modulus: config.refresh_day_modulus.max(1),
        }
    }

    /// 评估计划在 today 的状态
    pub fn evaluate(&self, schedule: &Schedule, today: NaiveDate) -> GateSnapshot {
        let state = if today < schedule.start {
            ProgramState::NotStarted
        } else if today > schedule.end {
            ProgramState::Expired
        } else {
            ProgramState::Active
        };

        GateSnapshot {
            schedule: *schedule,
            today,
            state,
            elapsed_days: day_diff(schedule.start, today) + 1,
            days_remaining: day_diff(today, schedule.end),
            near_expiry_days: self.near_expiry_days,
            refresh_day_modulus: self.refresh_day_modulus,
        }
    }

    /// 评估学员计划（无开始日期时返回 None;天数为 0 时取配置默认值）
    pub fn evaluate_customer(&self, customer: &Customer, today: NaiveDate) -> Option<GateSnapshot> {
        let duration = customer.effective_duration_days(self.default_duration_days);
        customer
            .start_date
            .map(|start| self.evaluate(&Schedule::new(start, customer.end_date, duration), today))
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(&PlanConfig::default())
    }
}

// ==========================================
// DayWindow - 学员端可见天数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub collapsed: u32,
    pub expanded: u32,
}

impl DayWindow {
    pub fn new(config: &PlanConfig) -> Self {
        Self {
            collapsed: config.collapsed_visible_days,
            expanded: config.expanded_visible_days.max(config.collapsed_visible_days),
        }
    }

    /// 展示的天数范围（从第 1 天开始）
    pub fn visible_days(&self, show_all: bool) -> RangeInclusive<u32> {
        let last = if show_all { self.expanded } else { self.collapsed };
        1..=last
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self::new(&PlanConfig::default())
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 学员是否已有计划（计划标识存在）
pub fn has_plan(customer: &Customer) -> bool {
    customer.plan_ref.is_some()
}

/// 必修任务且天数为模数的倍数时建议后台刷新
pub fn is_refresh_worthy(task: &ExerciseTask, modulus: u32) -> bool {
    task.is_mandatory() && modulus > 0 && task.day % modulus == 0
}

/// 进入访问控制前的任务整理: 剔除已删除/天数非法的任务,按天排序
pub fn prepare_tasks(tasks: Vec<ExerciseTask>) -> Vec<ExerciseTask> {
    let mut cleaned: Vec<ExerciseTask> = tasks
        .into_iter()
        .filter(|t| !t.deleted && t.day >= 1)
        .collect();
    cleaned.sort_by_key(|t| t.day);
    cleaned
}

/// 按天分组
pub fn group_tasks_by_day(tasks: &[ExerciseTask]) -> BTreeMap<u32, Vec<&ExerciseTask>> {
    let mut groups: BTreeMap<u32, Vec<&ExerciseTask>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.day).or_default().push(task);
    }
    groups
}
