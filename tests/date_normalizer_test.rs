// ==========================================
// DateNormalizer 集成测试
// ==========================================


use chrono::{Datelike, Duration};
use coaching_plan::engine::date_normalizer::{day_diff, format_display, to_key};
use coaching_plan::engine::DateNormalizer;
use test_helpers::ymd;

fn normalizer() -> DateNormalizer {
    DateNormalizer::new(2024)
}

#[test]
fn test_key_round_trip_over_several_years() {
    let n = normalizer();
    let mut date = ymd(2023, 1, 1);
    let last = ymd(2025, 12, 31);
    while date <= last {
        let key = to_key(date);
        assert_eq!(n.normalize(key.as_str()), Some(date), "key={}", key);
        date += Duration::days(1);
    }
}

#[test]
fn test_slash_form_rollover_rejected() {
    let n = normalizer();
    assert_eq!(n.normalize("30/02"), None);
    assert_eq!(n.normalize("31/04/2024"), None);
    assert_eq!(n.normalize("29/02/2023"), None);
    assert_eq!(n.normalize("29/02/2024"), Some(ymd(2024, 2, 29)));
}

#[test]
fn test_slash_form_uses_reference_year() {
    let date = normalizer().normalize("05/03").unwrap();
    assert_eq!(date, ymd(2024, 3, 5));

    let date = DateNormalizer::for_today(ymd(2031, 7, 1)).normalize("05/03").unwrap();
    assert_eq!(date.year(), 2031);
}

#[test]
fn test_iso_prefix_ignores_suffix() {
    let n = normalizer();
    assert_eq!(n.normalize("2024-05-01T23:59:59+07:00"), Some(ymd(2024, 5, 1)));
    assert_eq!(n.normalize("2024-05-01 08:00"), Some(ymd(2024, 5, 1)));
    // 斜杠形式拒绝进位,ISO 前缀按日历进位
    assert_eq!(n.normalize("2024-02-30"), Some(ymd(2024, 3, 1)));
    assert_eq!(n.normalize("30/02/2024"), None);
}

#[test]
fn test_unparseable_is_unknown() {
    let n = normalizer();
    for raw in ["", "   ", "không rõ", "abc/def", "1/"] {
        assert_eq!(n.normalize(raw), None, "raw={:?}", raw);
        assert_eq!(n.normalize_key(raw), "");
    }
}

#[test]
fn test_display_and_diff_helpers() {
    let date = ymd(2024, 3, 5);
    assert_eq!(format_display(date, true), "05/03/2024");
    assert_eq!(format_display(date, false), "05/03");
    assert_eq!(day_diff(ymd(2024, 2, 28), ymd(2024, 3, 1)), 2);
    assert_eq!(day_diff(ymd(2024, 3, 1), ymd(2024, 2, 28)), -2);
}
