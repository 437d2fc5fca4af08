// ==========================================
// 学员训练计划管理 - 文本比较规范化
// ==========================================
// 规则: 小写 → NFD 分解 → 去除组合附加符号(U+0300..U+036F) → 合并空白 → TRIM
// 注意: 'đ' 是独立字母,不会被折叠成 'd'
// ==========================================

use unicode_normalization::UnicodeNormalization;

/// 规范化文本用于比较
pub fn fold_text(input: &str) -> String {
    let stripped: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_vietnamese() {
        assert_eq!(fold_text("  Chưa   GÁN "), "chua gan");
        assert_eq!(fold_text("Kem Dưỡng\tẨm"), "kem duong am");
        assert_eq!(fold_text("Đã gán"), "đa gan");
        assert_eq!(fold_text(""), "");
    }
}
