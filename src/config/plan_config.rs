// ==========================================
// 学员训练计划管理 - 计划引擎配置
// ==========================================
// 职责: 汇总引擎使用的全部阈值,提供默认值
// 来源: ConfigManager (config_kv 表) 覆写默认值
// ==========================================

use crate::domain::DEFAULT_DURATION_DAYS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 计划引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// 计划默认天数
    pub default_duration_days: u32,
    /// 临期提醒窗口（剩余天数 0..=N）
    pub near_expiry_days: i64,
    /// 必修任务后台刷新的天数模数
    pub refresh_day_modulus: u32,
    /// 读缓存 TTL（秒）
    pub cache_ttl_secs: u64,
    /// 读缓存条目上限
    pub cache_max_entries: usize,
    /// 学员端默认展示天数
    pub collapsed_visible_days: u32,
    /// 学员端展开后展示天数
    pub expanded_visible_days: u32,
    /// 模板年份合法下限
    pub min_plan_year: i32,
    /// 模板年份合法上限
    pub max_plan_year: i32,
    /// 看板默认统计周期起始日（每月几号）
    pub cycle_start_day: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            default_duration_days: DEFAULT_DURATION_DAYS,
            near_expiry_days: 5,
            refresh_day_modulus: 3,
            cache_ttl_secs: 60,
            cache_max_entries: 256,
            collapsed_visible_days: 10,
            expanded_visible_days: 30,
            min_plan_year: 2000,
            max_plan_year: 2100,
            cycle_start_day: 15,
        }
    }
}

impl PlanConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
