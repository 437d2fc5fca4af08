// ==========================================
// 学员训练计划管理 - 松散值清洗器
// ==========================================
// 职责: 把存储中的松散 JSON 值(数字/数字字符串/布尔/空串/null)
//       统一为强类型值
// 红线: 清洗失败返回 None,由映射层决定默认值
// ==========================================

use crate::engine::classification::AssignmentFlag;
use crate::engine::date_normalizer::DateNormalizer;
use chrono::NaiveDate;
use serde_json::Value;

pub struct ValueCleaner {
    dates: DateNormalizer,
}

impl ValueCleaner {
    pub fn new(dates: DateNormalizer) -> Self {
        Self { dates }
    }

    pub fn date_normalizer(&self) -> &DateNormalizer {
        &self.dates
    }

    /// 文本（TRIM;数字/布尔转字符串;null → 空串）
    pub fn text(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    /// 非空文本
    pub fn opt_text(&self, value: &Value) -> Option<String> {
        Some(self.text(value)).filter(|s| !s.is_empty())
    }

    /// 数值（数字或可解析的数字字符串）
    pub fn number(&self, value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
                }
            }
            _ => None,
        }
    }

    /// 整数（小数部分截断）
    pub fn integer(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            _ => self.number(value).map(|f| f.trunc() as i64),
        }
    }

    /// 布尔（true / 非 0 数字 / "true" "1" "yes" "x"）
    pub fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "x"
            ),
            _ => false,
        }
    }

    /// 原始分配标志
    pub fn assignment_flag(&self, value: &Value) -> AssignmentFlag {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(AssignmentFlag::Number)
                .unwrap_or_default(),
            Value::Bool(b) => AssignmentFlag::Bool(*b),
            Value::String(s) if !s.trim().is_empty() => AssignmentFlag::Text(s.clone()),
            _ => AssignmentFlag::Absent,
        }
    }

    /// 日期（文本经日期规范化器;其他类型视为未知）
    pub fn date(&self, value: &Value) -> Option<NaiveDate> {
        match value {
            Value::String(s) => self.dates.normalize(s.as_str()),
            _ => None,
        }
    }
}

impl Default for ValueCleaner {
    fn default() -> Self {
        Self::new(DateNormalizer::current())
    }
}
