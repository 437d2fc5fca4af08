// ==========================================
// FinancialReconciler 集成测试
// ==========================================


use coaching_plan::domain::PurchasedLineItem;
use coaching_plan::engine::FinancialReconciler;
use test_helpers::{item_by_id, priced_item, product, CustomerBuilder};

#[test]
fn test_item_priced_scenario() {
    let customer = CustomerBuilder::new("C1")
        .item(priced_item(2, 500_000.0, 300_000.0))
        .build();
    let summary = FinancialReconciler::new(&[]).reconcile(&customer);

    assert_eq!(summary.revenue, 1_000_000.0);
    assert_eq!(summary.cost, 600_000.0);
    assert_eq!(summary.profit, 400_000.0);
    assert!(summary.has_cost_basis);
}

#[test]
fn test_declared_total_overrides_item_revenue() {
    let products = vec![product("SP01", "Thảm tập", 100_000.0, 250_000.0)];
    let customer = CustomerBuilder::new("C1")
        .item(item_by_id("SP01", 2))
        .declared_total(450_000.0)
        .build();
    let summary = FinancialReconciler::new(&products).reconcile(&customer);

    assert_eq!(summary.revenue, 450_000.0);
    assert_eq!(summary.cost, 200_000.0);
    assert_eq!(summary.profit, 250_000.0);
}

#[test]
fn test_cost_is_additive_over_items() {
    let products = vec![
        product("SP01", "Thảm tập", 100_000.0, 250_000.0),
        product("SP02", "Dây kháng lực", 40_000.0, 90_000.0),
    ];
    let reconciler = FinancialReconciler::new(&products);

    let a = item_by_id("SP01", 1);
    let b = item_by_id("SP02", 3);
    let cost_a = reconciler
        .reconcile(&CustomerBuilder::new("A").item(a.clone()).build())
        .cost;
    let cost_b = reconciler
        .reconcile(&CustomerBuilder::new("B").item(b.clone()).build())
        .cost;
    let both = reconciler.reconcile(&CustomerBuilder::new("AB").item(a).item(b).build());

    assert_eq!(both.cost, cost_a + cost_b);
}

#[test]
fn test_name_lookup_ignores_case_and_diacritics() {
    let products = vec![product("", "Dây Kháng Lực", 40_000.0, 90_000.0)];
    let customer = CustomerBuilder::new("C1")
        .item(PurchasedLineItem {
            product_name: Some("  day   khang luc ".to_string()),
            quantity: 1,
            ..PurchasedLineItem::default()
        })
        .build();
    let summary = FinancialReconciler::new(&products).reconcile(&customer);
    assert_eq!(summary.cost, 40_000.0);
    assert_eq!(summary.revenue, 90_000.0);
}

#[test]
fn test_unknown_product_and_zero_quantity_degrade_to_zero() {
    let customer = CustomerBuilder::new("C1")
        .item(item_by_id("KHONG_CO", 5))
        .item(priced_item(0, 999.0, 999.0))
        .build();
    let summary = FinancialReconciler::new(&[]).reconcile(&customer);

    assert_eq!(summary.revenue, 0.0);
    assert_eq!(summary.cost, 0.0);
    assert!(!summary.has_cost_basis);
}
