// ==========================================
// 学员训练计划管理 - 日期规范化
// ==========================================
// 职责: 把多种日期表示统一成"本地自然日"(NaiveDate)
// 红线: 解析失败返回 None,调用方视为"未知",绝不当作纪元日
// ==========================================
// 解析顺序（命中即返回）:
// 1) YYYY-MM-DD 前缀（其后的时间/时区后缀忽略;月、日越界按日历进位）
// 2) DD/MM 或 DD/MM/YYYY（缺省年份取参考年份,禁止日期溢出进位）
// 3) 通用格式兜底（RFC 3339 / RFC 2822 / 常见文本格式）
// ==========================================

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime};

/// 存储键格式
pub const KEY_FORMAT: &str = "%Y-%m-%d";

/// 兜底解析的纯日期格式
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// 兜底解析的日期时间格式
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%a %b %d %Y %H:%M:%S",
];

// ==========================================
// DateInput - 待规范化的日期输入
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput<'a> {
    /// 已规范化的日期（直接透传）
    Date(NaiveDate),
    /// 带时间的日期（丢弃时间部分）
    DateTime(NaiveDateTime),
    /// 原始文本
    Text(&'a str),
}

impl<'a> From<NaiveDate> for DateInput<'a> {
    fn from(value: NaiveDate) -> Self {
        DateInput::Date(value)
    }
}

impl<'a> From<NaiveDateTime> for DateInput<'a> {
    fn from(value: NaiveDateTime) -> Self {
        DateInput::DateTime(value)
    }
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(value: &'a str) -> Self {
        DateInput::Text(value)
    }
}

impl<'a> From<&'a String> for DateInput<'a> {
    fn from(value: &'a String) -> Self {
        DateInput::Text(value.as_str())
    }
}

// ==========================================
// ReferenceYear - DD/MM 缺省年份的来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceYear {
    /// 固定年份
    Fixed(i32),
    /// 每次解析时取本地当前年份
    Today,
}

// ==========================================
// DateNormalizer - 日期规范化器
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    reference_year: ReferenceYear,
}

impl DateNormalizer {
    /// 指定参考年份
    pub fn new(reference_year: i32) -> Self {
        Self {
            reference_year: ReferenceYear::Fixed(reference_year),
        }
    }

    /// 以给定"今天"的年份作为参考年份
    pub fn for_today(today: NaiveDate) -> Self {
        Self::new(today.year())
    }

    /// 跟随本地当前年份（跨年后自动切换）
    pub fn current() -> Self {
        Self {
            reference_year: ReferenceYear::Today,
        }
    }

    pub fn reference_year(&self) -> i32 {
        match self.reference_year {
            ReferenceYear::Fixed(year) => year,
            ReferenceYear::Today => today_local().year(),
        }
    }

    /// 规范化任意日期输入
    ///
    /// # 返回
    /// - Some(NaiveDate): 规范化后的自然日
    /// - None: 空输入或无法解析
    pub fn normalize<'a>(&self, input: impl Into<DateInput<'a>>) -> Option<NaiveDate> {
        match input.into() {
            DateInput::Date(date) => Some(date),
            DateInput::DateTime(dt) => Some(dt.date()),
            DateInput::Text(raw) => self.normalize_text(raw),
        }
    }

    /// 规范化为存储键（无法解析时返回空字符串）
    pub fn normalize_key<'a>(&self, input: impl Into<DateInput<'a>>) -> String {
        self.normalize(input).map(to_key).unwrap_or_default()
    }

    fn normalize_text(&self, raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        // 1) ISO 前缀
        if let Some((y, m, d)) = split_iso_prefix(s) {
            return carry_calendar(y, m, d);
        }

        // 2) 斜杠形式
        if s.contains('/') {
            return self.parse_slash_form(s);
        }

        // 3) 通用兜底
        parse_fallback(s)
    }

    /// 解析 DD/MM 或 DD/MM/YYYY
    ///
    /// 规则: 构造出的日期其日、月必须与输入完全一致,
    /// 例如 30/02 不会被进位成 3 月初,而是直接判定无法解析
    fn parse_slash_form(&self, s: &str) -> Option<NaiveDate> {
        let mut parts = s.split('/');
        let day = leading_int(parts.next()?)?;
        let month = leading_int(parts.next()?)?;
        let year = match parts.next().map(str::trim) {
            Some(y) if !y.is_empty() => expand_two_digit_year(leading_int(y)?),
            _ => i64::from(self.reference_year()),
        };

        let (y, m, d) = (
            i32::try_from(year).ok()?,
            u32::try_from(month).ok()?,
            u32::try_from(day).ok()?,
        );
        let date = NaiveDate::from_ymd_opt(y, m, d)?;
        if date.day() != d || date.month() != m {
            return None;
        }
        Some(date)
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::current()
    }
}

// ==========================================
// 纯函数工具
// ==========================================

/// 本地"今天"
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// 规范存储键 YYYY-MM-DD（同一天必得同一键）
pub fn to_key(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

/// 展示格式 DD/MM/YYYY 或 DD/MM
pub fn format_display(date: NaiveDate, with_year: bool) -> String {
    if with_year {
        date.format("%d/%m/%Y").to_string()
    } else {
        date.format("%d/%m").to_string()
    }
}

/// 相差天数: to - from
pub fn day_diff(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// 日期加减天数（越界时饱和到可表示范围边界）
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}

/// 匹配 ^\d{4}-\d{2}-\d{2}
fn split_iso_prefix(s: &str) -> Option<(i32, u32, u32)> {
    let b = s.as_bytes();
    if b.len() < 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let all_digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    if !(all_digits(0..4) && all_digits(5..7) && all_digits(8..10)) {
        return None;
    }
    Some((s[0..4].parse().ok()?, s[5..7].parse().ok()?, s[8..10].parse().ok()?))
}

/// 按日历进位构造日期: 月份 0/13 落到相邻年份,日 0 为上月最后一天,
/// 日超出当月天数时顺延到下月（如 2024-02-30 → 2024-03-01）
fn carry_calendar(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let month_index = i64::from(year) * 12 + i64::from(month) - 1;
    let y = i32::try_from(month_index.div_euclid(12)).ok()?;
    let m = u32::try_from(month_index.rem_euclid(12) + 1).ok()?;
    let first = NaiveDate::from_ymd_opt(y, m, 1)?;
    first.checked_add_signed(Duration::days(i64::from(day) - 1))
}

/// 读取前导整数（允许前导空白与符号,忽略其后的非数字字符）
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|v| sign * v)
}

/// 两位年份按 20xx 解释
fn expand_two_digit_year(year: i64) -> i64 {
    if (0..100).contains(&year) {
        2000 + year
    } else {
        year
    }
}

fn parse_fallback(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    tracing::debug!(input = s, "日期无法解析");
    None
}
