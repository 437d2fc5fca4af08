// ==========================================
// 学员训练计划管理 - 模板视频分组汇总
// ==========================================
// 职责: 按计划标识(视频日期)汇总模板任务与在学人数
// ==========================================

use crate::config::PlanConfig;
use crate::domain::{Customer, ExerciseTask, VideoGroup};
use crate::engine::date_normalizer::to_key;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

pub struct VideoGroupBuilder {
    min_year: i32,
    max_year: i32,
}

impl VideoGroupBuilder {
    pub fn new(config: &PlanConfig) -> Self {
        Self {
            min_year: config.min_plan_year,
            max_year: config.max_plan_year,
        }
    }

    /// 年份超出允许范围的计划标识视为异常
    pub fn is_invalid_plan_ref(&self, plan_ref: NaiveDate) -> bool {
        !(self.min_year..=self.max_year).contains(&plan_ref.year())
    }

    /// 汇总分组（按计划标识升序）
    ///
    /// 已删除任务不计;没有任务但有学员引用的计划也会出现
    pub fn build(&self, tasks: &[ExerciseTask], customers: &[Customer]) -> Vec<VideoGroup> {
        #[derive(Default)]
        struct Acc {
            days: BTreeSet<u32>,
            total: usize,
            mandatory: usize,
            learners: usize,
        }

        let mut acc: BTreeMap<NaiveDate, Acc> = BTreeMap::new();

        for task in tasks.iter().filter(|t| !t.deleted && t.day >= 1) {
            let Some(plan_ref) = task.plan_ref else { continue };
            let entry = acc.entry(plan_ref).or_default();
            entry.days.insert(task.day);
            entry.total += 1;
            if task.is_mandatory() {
                entry.mandatory += 1;
            }
        }

        for customer in customers.iter().filter(|c| !c.is_deleted()) {
            if let Some(plan_ref) = customer.plan_ref {
                acc.entry(plan_ref).or_default().learners += 1;
            }
        }

        acc.into_iter()
            .map(|(plan_ref, a)| VideoGroup {
                plan_ref,
                plan_key: to_key(plan_ref),
                total_days: a.days.len(),
                total_tasks: a.total,
                mandatory_tasks: a.mandatory,
                optional_tasks: a.total - a.mandatory,
                active_learners: a.learners,
                is_invalid: self.is_invalid_plan_ref(plan_ref),
            })
            .collect()
    }
}

impl Default for VideoGroupBuilder {
    fn default() -> Self {
        Self::new(&PlanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerStatus, TaskCategory};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(plan: NaiveDate, day: u32, category: TaskCategory) -> ExerciseTask {
        let mut t = ExerciseTask::new(day, category, "bài tập");
        t.plan_ref = Some(plan);
        t
    }

    #[test]
    fn test_build_groups() {
        let plan = ymd(2024, 5, 1);
        let odd = ymd(1970, 1, 1);

        let mut removed = task(plan, 4, TaskCategory::Mandatory);
        removed.deleted = true;
        let tasks = vec![
            task(plan, 1, TaskCategory::Mandatory),
            task(plan, 1, TaskCategory::Optional),
            task(plan, 2, TaskCategory::Mandatory),
            removed,
            task(odd, 1, TaskCategory::Optional),
        ];

        let mut learner = Customer::new("C1");
        learner.plan_ref = Some(plan);
        let mut gone = Customer::new("C2");
        gone.plan_ref = Some(plan);
        gone.status = CustomerStatus::Deleted;
        let mut orphan = Customer::new("C3");
        orphan.plan_ref = Some(ymd(2024, 6, 1));

        let groups = VideoGroupBuilder::default().build(&tasks, &[learner, gone, orphan]);
        assert_eq!(groups.len(), 3);

        assert!(groups[0].is_invalid);
        assert_eq!(groups[0].plan_key, "1970-01-01");

        let g = &groups[1];
        assert_eq!(g.plan_key, "2024-05-01");
        assert_eq!(g.total_days, 2);
        assert_eq!(g.total_tasks, 3);
        assert_eq!(g.mandatory_tasks, 2);
        assert_eq!(g.optional_tasks, 1);
        assert_eq!(g.active_learners, 1);
        assert!(!g.is_invalid);

        assert_eq!(groups[2].total_tasks, 0);
        assert_eq!(groups[2].active_learners, 1);
    }
}
