// ==========================================
// 学员训练计划管理 - 运营分组引擎
// ==========================================
// 职责: 解析分配状态 + 把学员归入唯一的运营分组
// 红线: 分组互斥且完备;显式 0/1 永远优先于自由文本
// ==========================================

use crate::domain::{AssignmentState, Bucket, Customer};
use crate::engine::access_gate::has_plan;
use crate::engine::financial::FinancialSummary;
use crate::engine::text::fold_text;
use serde::{Deserialize, Serialize};

/// "未分配"的规范化短语（越南语 "chưa gán"）
pub const NOT_ASSIGNED_PHRASE: &str = "chua gan";

// ==========================================
// AssignmentFlag - 原始分配标志
// ==========================================
// 存储中可能为 0/1、"0"/"1"、布尔值或自由文本
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum AssignmentFlag {
    #[default]
    Absent,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl AssignmentFlag {
    /// 显式数值（数字或数字字符串）
    fn as_number(&self) -> Option<f64> {
        match self {
            AssignmentFlag::Number(n) => Some(*n),
            AssignmentFlag::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn is_explicit_zero(&self) -> bool {
        self.as_number() == Some(0.0)
    }

    fn is_explicit_one(&self) -> bool {
        self.as_number() == Some(1.0)
    }

    /// 是否表达"未分配"（0 / false / "false" / 含未分配短语）
    fn signals_not_assigned(&self) -> bool {
        match self {
            AssignmentFlag::Absent => false,
            AssignmentFlag::Bool(b) => !*b,
            AssignmentFlag::Number(n) => *n == 0.0,
            AssignmentFlag::Text(s) => {
                self.is_explicit_zero()
                    || s.trim().eq_ignore_ascii_case("false")
                    || fold_text(s).contains(NOT_ASSIGNED_PHRASE)
            }
        }
    }
}

/// 解析单个分配标志
///
/// 顺序（命中即返回）:
/// 1) 0 / false / "false" → 未分配
/// 2) 1 → 已分配
/// 3) 自由文本含"未分配"短语 → 未分配,否则 → 已分配
pub fn resolve_assignment(flag: &AssignmentFlag) -> AssignmentState {
    if flag.is_explicit_zero() || matches!(flag, AssignmentFlag::Bool(false)) {
        return AssignmentState::NotAssigned;
    }
    if let AssignmentFlag::Text(s) = flag {
        if s.trim().eq_ignore_ascii_case("false") {
            return AssignmentState::NotAssigned;
        }
    }
    if flag.is_explicit_one() {
        return AssignmentState::Assigned;
    }
    if flag.signals_not_assigned() {
        AssignmentState::NotAssigned
    } else {
        AssignmentState::Assigned
    }
}

/// 解析带历史字段的分配状态（存储边界使用）
///
/// 主字段为 0/1 时直接决定;否则主字段与各历史字段中
/// 任一表达"未分配"即为未分配
pub fn resolve_assignment_fields(
    primary: &AssignmentFlag,
    legacy: &[AssignmentFlag],
) -> AssignmentState {
    if primary.is_explicit_zero() {
        return AssignmentState::NotAssigned;
    }
    if primary.is_explicit_one() {
        return AssignmentState::Assigned;
    }
    let not_assigned = std::iter::once(primary)
        .chain(legacy.iter())
        .any(AssignmentFlag::signals_not_assigned);
    if not_assigned {
        AssignmentState::NotAssigned
    } else {
        AssignmentState::Assigned
    }
}

// ==========================================
// ClassificationEngine - 运营分组引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationEngine;

impl ClassificationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 判定学员分组
    ///
    /// 顺序（命中即返回）:
    /// 1) 无计划 → NoPlanYet
    /// 2) 未分配 + 无邮箱 → NotAssignedNoContact
    /// 3) 未分配 + 有邮箱 → NotAssignedHasContact
    /// 4) 已分配 + 有成本依据 + 无地址 → AssignedMissingAddress
    /// 5) 已分配 + 有成本依据 + 有地址 + 无运单号 → AssignedMissingShippingCode
    /// 6) 其他 → Nominal
    pub fn classify(&self, customer: &Customer, financial: &FinancialSummary) -> Bucket {
        if !has_plan(customer) {
            return Bucket::NoPlanYet;
        }

        match customer.assignment {
            AssignmentState::NotAssigned if !customer.has_email() => Bucket::NotAssignedNoContact,
            AssignmentState::NotAssigned => Bucket::NotAssignedHasContact,
            AssignmentState::Assigned if financial.has_cost_basis => {
                if !customer.has_address() {
                    Bucket::AssignedMissingAddress
                } else if !customer.has_shipping_code() {
                    Bucket::AssignedMissingShippingCode
                } else {
                    Bucket::Nominal
                }
            }
            AssignmentState::Assigned => Bucket::Nominal,
        }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> AssignmentFlag {
        AssignmentFlag::Text(s.to_string())
    }

    fn planned_customer() -> Customer {
        let mut c = Customer::new("C1");
        c.plan_ref = NaiveDate::from_ymd_opt(2024, 5, 1);
        c
    }

    fn with_cost() -> FinancialSummary {
        FinancialSummary {
            revenue: 500_000.0,
            cost: 200_000.0,
            profit: 300_000.0,
            has_cost_basis: true,
        }
    }

    #[test]
    fn test_resolve_explicit_values() {
        use AssignmentState::*;
        assert_eq!(resolve_assignment(&AssignmentFlag::Number(0.0)), NotAssigned);
        assert_eq!(resolve_assignment(&text("0")), NotAssigned);
        assert_eq!(resolve_assignment(&AssignmentFlag::Bool(false)), NotAssigned);
        assert_eq!(resolve_assignment(&text("FALSE")), NotAssigned);
        assert_eq!(resolve_assignment(&AssignmentFlag::Number(1.0)), Assigned);
        assert_eq!(resolve_assignment(&text(" 1 ")), Assigned);
        assert_eq!(resolve_assignment(&AssignmentFlag::Bool(true)), Assigned);
    }

    #[test]
    fn test_resolve_free_text() {
        use AssignmentState::*;
        assert_eq!(resolve_assignment(&text("Chưa gán")), NotAssigned);
        assert_eq!(resolve_assignment(&text("học viên CHUA GAN khóa")), NotAssigned);
        assert_eq!(resolve_assignment(&text("Đã gán")), Assigned);
        assert_eq!(resolve_assignment(&text("")), Assigned);
        assert_eq!(resolve_assignment(&AssignmentFlag::Absent), Assigned);
    }

    #[test]
    fn test_primary_field_wins_over_legacy_text() {
        use AssignmentState::*;
        assert_eq!(
            resolve_assignment_fields(&AssignmentFlag::Number(1.0), &[text("Chưa gán")]),
            Assigned
        );
        assert_eq!(
            resolve_assignment_fields(&text("0"), &[text("Đã gán")]),
            NotAssigned
        );
        assert_eq!(
            resolve_assignment_fields(&AssignmentFlag::Absent, &[text("Đã gán"), text("chưa gán")]),
            NotAssigned
        );
        assert_eq!(
            resolve_assignment_fields(&AssignmentFlag::Absent, &[AssignmentFlag::Absent]),
            Assigned
        );
    }

    #[test]
    fn test_no_plan_dominates() {
        let engine = ClassificationEngine::new();
        let mut c = Customer::new("C1");
        c.assignment = AssignmentState::NotAssigned;
        assert_eq!(engine.classify(&c, &with_cost()), Bucket::NoPlanYet);
    }

    #[test]
    fn test_not_assigned_without_email() {
        let engine = ClassificationEngine::new();
        let mut c = planned_customer();
        c.assignment = resolve_assignment(&AssignmentFlag::Number(0.0));
        c.email = String::new();
        assert_eq!(
            engine.classify(&c, &FinancialSummary::default()),
            Bucket::NotAssignedNoContact
        );

        c.email = "hv@example.com".to_string();
        assert_eq!(
            engine.classify(&c, &FinancialSummary::default()),
            Bucket::NotAssignedHasContact
        );
    }

    #[test]
    fn test_assigned_buckets_require_cost_basis() {
        let engine = ClassificationEngine::new();
        let mut c = planned_customer();
        c.assignment = AssignmentState::Assigned;

        assert_eq!(engine.classify(&c, &FinancialSummary::default()), Bucket::Nominal);
        assert_eq!(engine.classify(&c, &with_cost()), Bucket::AssignedMissingAddress);

        c.address = "12 Lê Lợi, Huế".to_string();
        assert_eq!(engine.classify(&c, &with_cost()), Bucket::AssignedMissingShippingCode);

        c.shipping_code = "VD123".to_string();
        assert_eq!(engine.classify(&c, &with_cost()), Bucket::Nominal);
    }
}
