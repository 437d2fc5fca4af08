// ==========================================
// 学员训练计划管理 - 学员领域模型
// ==========================================
// 用途: 导入层由原始文档构造,引擎层只读
// ==========================================

use crate::domain::types::{AssignmentState, CustomerStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 计划默认天数（缺失或为 0 时使用）
pub const DEFAULT_DURATION_DAYS: u32 = 62;

/// 计划天数为 0 时取默认天数
pub fn effective_duration(duration_days: u32, default_days: u32) -> u32 {
    if duration_days == 0 {
        default_days
    } else {
        duration_days
    }
}

// ==========================================
// PurchasedLineItem - 已购商品明细
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchasedLineItem {
    pub product_id: Option<String>,   // 商品ID
    pub product_name: Option<String>, // 商品名称
    pub quantity: i64,                // 数量（<=0 的行不参与对账）
    pub unit_price: Option<f64>,      // 单价（缺失时查商品目录）
    pub unit_cost: Option<f64>,       // 进价（缺失时查商品目录）
    pub line_total: f64,              // 行金额（仅展示）
}

// ==========================================
// Customer - 学员
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    // ===== 主键 =====
    pub customer_id: String,

    // ===== 基础信息 =====
    pub customer_name: String,
    pub email: String,
    pub address: String,
    pub shipping_code: String, // 运单号
    pub note: String,
    pub link: String, // 学员端公开链接

    // ===== 计划信息 =====
    pub plan_ref: Option<NaiveDate>, // 计划标识（模板视频日期）
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: u32,

    // ===== 运营信息 =====
    pub assignment: AssignmentState,
    pub status: CustomerStatus,

    // ===== 财务信息 =====
    pub purchased_items: Vec<PurchasedLineItem>,
    pub declared_total: f64, // >0 时覆盖明细计算的营收

    // ===== 审计字段 =====
    pub created_at: Option<NaiveDate>,
}

impl Customer {
    /// 创建最小学员记录（其余字段取默认值）
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            customer_name: String::new(),
            email: String::new(),
            address: String::new(),
            shipping_code: String::new(),
            note: String::new(),
            link: String::new(),
            plan_ref: None,
            start_date: None,
            end_date: None,
            duration_days: DEFAULT_DURATION_DAYS,
            assignment: AssignmentState::Assigned,
            status: CustomerStatus::Active,
            purchased_items: Vec::new(),
            declared_total: 0.0,
            created_at: None,
        }
    }

    /// 有效计划天数（default_days 一般来自配置）
    pub fn effective_duration_days(&self, default_days: u32) -> u32 {
        effective_duration(self.duration_days, default_days)
    }

    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }

    pub fn has_shipping_code(&self) -> bool {
        !self.shipping_code.trim().is_empty()
    }

    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_duration_defaults_when_zero() {
        let mut c = Customer::new("C1");
        c.duration_days = 0;
        assert_eq!(c.effective_duration_days(DEFAULT_DURATION_DAYS), 62);
        assert_eq!(c.effective_duration_days(45), 45);
        c.duration_days = 30;
        assert_eq!(c.effective_duration_days(45), 30);
    }

    #[test]
    fn test_blank_contact_fields() {
        let mut c = Customer::new("C1");
        c.email = "   ".to_string();
        c.address = "Hà Nội".to_string();
        assert!(!c.has_email());
        assert!(c.has_address());
        assert!(!c.has_shipping_code());
    }
}
