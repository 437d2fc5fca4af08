// ==========================================
// 学员训练计划管理 - 领域类型定义
// ==========================================
// 红线: 分组/状态名称是界面过滤的词汇表,不可随意改名
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 学员状态 (Customer Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与存储一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,   // 正常
    Inactive, // 停用
    Deleted,  // 已删除(不参与任何计算)
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CustomerStatus {
    /// 从字符串解析状态（未知值视为 ACTIVE）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "INACTIVE" => CustomerStatus::Inactive,
            "DELETED" => CustomerStatus::Deleted,
            _ => CustomerStatus::Active,
        }
    }

    /// 转换为存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Inactive => "INACTIVE",
            CustomerStatus::Deleted => "DELETED",
        }
    }

    pub fn is_deleted(&self) -> bool {
        *self == CustomerStatus::Deleted
    }
}

// ==========================================
// 训练任务类别 (Task Category)
// ==========================================
// 存储中为越南语标签: "Bắt buộc" / "Bổ trợ"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Mandatory, // 必修
    Optional,  // 辅助
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskCategory::Mandatory => write!(f, "MANDATORY"),
            TaskCategory::Optional => write!(f, "OPTIONAL"),
        }
    }
}

impl TaskCategory {
    /// 存储标签
    pub const MANDATORY_LABEL: &'static str = "Bắt buộc";
    pub const OPTIONAL_LABEL: &'static str = "Bổ trợ";

    /// 从存储标签或枚举名解析（无法识别时视为辅助任务）
    pub fn from_str(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed == Self::MANDATORY_LABEL || trimmed.eq_ignore_ascii_case("MANDATORY") {
            TaskCategory::Mandatory
        } else {
            TaskCategory::Optional
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TaskCategory::Mandatory => Self::MANDATORY_LABEL,
            TaskCategory::Optional => Self::OPTIONAL_LABEL,
        }
    }
}

// ==========================================
// 分配状态 (Assignment State)
// ==========================================
// 在存储边界一次性解析,下游不再读取原始字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentState {
    Assigned,    // 已分配
    NotAssigned, // 未分配
}

impl AssignmentState {
    pub fn is_assigned(&self) -> bool {
        *self == AssignmentState::Assigned
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentState::Assigned => write!(f, "ASSIGNED"),
            AssignmentState::NotAssigned => write!(f, "NOT_ASSIGNED"),
        }
    }
}

// ==========================================
// 运营分组 (Bucket)
// ==========================================
// 互斥且完备: 每个学员恰好落入一个分组
// 顺序即判定优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    NoPlanYet,                   // 尚无计划
    NotAssignedNoContact,        // 未分配 + 缺邮箱
    NotAssignedHasContact,       // 未分配 + 有邮箱
    AssignedMissingAddress,      // 已分配 + 缺地址
    AssignedMissingShippingCode, // 已分配 + 缺运单号
    Nominal,                     // 正常
}

impl Bucket {
    /// 全部分组（按判定优先级排列）
    pub const ALL: [Bucket; 6] = [
        Bucket::NoPlanYet,
        Bucket::NotAssignedNoContact,
        Bucket::NotAssignedHasContact,
        Bucket::AssignedMissingAddress,
        Bucket::AssignedMissingShippingCode,
        Bucket::Nominal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::NoPlanYet => "NO_PLAN_YET",
            Bucket::NotAssignedNoContact => "NOT_ASSIGNED_NO_CONTACT",
            Bucket::NotAssignedHasContact => "NOT_ASSIGNED_HAS_CONTACT",
            Bucket::AssignedMissingAddress => "ASSIGNED_MISSING_ADDRESS",
            Bucket::AssignedMissingShippingCode => "ASSIGNED_MISSING_SHIPPING_CODE",
            Bucket::Nominal => "NOMINAL",
        }
    }

    /// 从界面过滤参数解析
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Bucket::ALL.into_iter().find(|b| b.as_str() == upper)
    }

    /// i18n 键
    pub fn label_key(&self) -> String {
        format!("bucket.{}", self.as_str().to_lowercase())
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 计划状态 (Program State)
// ==========================================
// 顺序: NotStarted < Active < Expired (随日期单调前进)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramState {
    NotStarted, // 未开始
    Active,     // 进行中
    Expired,    // 已过期
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramState::NotStarted => write!(f, "NOT_STARTED"),
            ProgramState::Active => write!(f, "ACTIVE"),
            ProgramState::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_round_trip_names() {
        for bucket in Bucket::ALL {
            assert_eq!(Bucket::from_str(bucket.as_str()), Some(bucket));
        }
        assert_eq!(Bucket::from_str("nominal"), Some(Bucket::Nominal));
        assert_eq!(Bucket::from_str("orange"), None);
    }

    #[test]
    fn test_task_category_labels() {
        assert_eq!(TaskCategory::from_str("Bắt buộc"), TaskCategory::Mandatory);
        assert_eq!(TaskCategory::from_str(" mandatory "), TaskCategory::Mandatory);
        assert_eq!(TaskCategory::from_str("Bổ trợ"), TaskCategory::Optional);
        assert_eq!(TaskCategory::from_str(""), TaskCategory::Optional);
    }

    #[test]
    fn test_customer_status_parse() {
        assert_eq!(CustomerStatus::from_str("deleted"), CustomerStatus::Deleted);
        assert_eq!(CustomerStatus::from_str("INACTIVE"), CustomerStatus::Inactive);
        assert_eq!(CustomerStatus::from_str("???"), CustomerStatus::Active);
    }

    #[test]
    fn test_program_state_order() {
        assert!(ProgramState::NotStarted < ProgramState::Active);
        assert!(ProgramState::Active < ProgramState::Expired);
    }
}
