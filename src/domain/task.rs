// ==========================================
// 学员训练计划管理 - 训练任务 / 视频分组
// ==========================================

use crate::domain::types::TaskCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ExerciseTask - 训练任务
// ==========================================
// 红线: day >= 1; deleted=true 的任务在进入访问控制前剔除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTask {
    pub task_id: Option<String>,
    pub day: u32,                    // 第几天（从 1 开始）
    pub category: TaskCategory,      // 必修/辅助
    pub title: String,
    pub body: String,
    pub link: String,                // 视频链接
    pub deleted: bool,
    pub plan_ref: Option<NaiveDate>, // 所属模板（视频日期）
}

impl ExerciseTask {
    pub fn new(day: u32, category: TaskCategory, title: impl Into<String>) -> Self {
        Self {
            task_id: None,
            day,
            category,
            title: title.into(),
            body: String::new(),
            link: String::new(),
            deleted: false,
            plan_ref: None,
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.category == TaskCategory::Mandatory
    }
}

// ==========================================
// VideoGroup - 模板视频分组汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGroup {
    pub plan_ref: NaiveDate,
    pub plan_key: String, // YYYY-MM-DD
    pub total_days: usize,
    pub total_tasks: usize,
    pub mandatory_tasks: usize,
    pub optional_tasks: usize,
    pub active_learners: usize,
    pub is_invalid: bool, // 年份异常（超出允许范围）
}
