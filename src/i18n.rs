// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持越南语（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 默认语言
pub const DEFAULT_LOCALE: &str = "vi";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"vi" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数,当前语言）
///
/// # 示例
/// ```no_run
/// use coaching_plan::i18n::t;
/// let msg = t("gate.expired.title");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数,当前语言）
///
/// # 示例
/// ```no_run
/// use coaching_plan::i18n::t_with_args;
/// let msg = t_with_args("gate.future_day.message", &[("day", "3"), ("date", "03/05")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    fill_args(rust_i18n::t!(key).to_string(), args)
}

/// 翻译消息（指定语言,不改动全局语言）
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    fill_args(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn fill_args(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态,且测试默认并行执行,这里串行化
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        set_locale(DEFAULT_LOCALE);
        assert_eq!(current_locale(), DEFAULT_LOCALE);
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale(DEFAULT_LOCALE);
        let msg = t_with_args("gate.expired.message", &[("date", "30/06/2024")]);
        assert!(msg.contains("30/06/2024"));
        assert!(msg.contains("hết hạn"));

        set_locale("en");
        assert_eq!(t("gate.expired.title"), "Program expired");
        set_locale(DEFAULT_LOCALE);
    }

    #[test]
    fn test_translate_in_explicit_locale() {
        let msg = t_in("vi", "gate.future_day.message", &[("day", "3"), ("date", "03/05")]);
        assert_eq!(msg, "Ngày học thứ 3 hiện đang được đóng kín. Bài tập này sẽ tự động mở khóa vào ngày 03/05.");

        let msg = t_in("en", "gate.not_started.title", &[]);
        assert_eq!(msg, "Not started yet");
    }
}
