// ==========================================
// 学员训练计划管理 - 财务对账引擎
// ==========================================
// 职责: 由已购明细 + 商品目录计算营收/成本/利润
// 红线: 只读明细,不修改商品目录;找不到商品时按 0 处理,不报错
// ==========================================
// 规则:
// 1) 数量 <= 0 的明细整行跳过
// 2) 单位进价 = 明细进价 → 目录进价 → 0
// 3) 单位售价 = 明细单价 → 目录售价 → 0
// 4) 营收 = 申报总额 (>0 时) 否则 明细营收
// 5) 利润 = 营收 - 成本; 有成本依据 = 成本 > 0
// ==========================================

use crate::domain::{Customer, Product, PurchasedLineItem};
use crate::engine::text::fold_text;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// FinancialSummary - 对账结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    /// 成本 > 0（区分"未购买"与"购买但成本为 0"）
    pub has_cost_basis: bool,
}

// ==========================================
// ProductCatalog - 商品查找表
// ==========================================
// 按 ID 与规范化名称双键索引,ID 优先
pub struct ProductCatalog<'a> {
    by_id: HashMap<String, &'a Product>,
    by_name: HashMap<String, &'a Product>,
}

impl<'a> ProductCatalog<'a> {
    pub fn new(products: &'a [Product]) -> Self {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for product in products {
            let id = product.product_id.trim();
            if !id.is_empty() {
                by_id.insert(id.to_string(), product);
            }
            let name = fold_text(&product.product_name);
            if !name.is_empty() {
                by_name.insert(name, product);
            }
        }
        Self { by_id, by_name }
    }

    /// 查找明细对应的商品（ID 优先,名称其次）
    pub fn resolve(&self, item: &PurchasedLineItem) -> Option<&'a Product> {
        let by_id = item
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .and_then(|id| self.by_id.get(id).copied());

        by_id.or_else(|| {
            item.product_name
                .as_deref()
                .map(fold_text)
                .filter(|name| !name.is_empty())
                .and_then(|name| self.by_name.get(&name).copied())
        })
    }

    pub fn len(&self) -> usize {
        self.by_id.len().max(self.by_name.len())
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_name.is_empty()
    }
}

// ==========================================
// FinancialReconciler - 财务对账引擎
// ==========================================
pub struct FinancialReconciler<'a> {
    catalog: ProductCatalog<'a>,
}

impl<'a> FinancialReconciler<'a> {
    pub fn new(products: &'a [Product]) -> Self {
        Self {
            catalog: ProductCatalog::new(products),
        }
    }

    pub fn catalog(&self) -> &ProductCatalog<'a> {
        &self.catalog
    }

    /// 计算单个学员的营收/成本/利润
    pub fn reconcile(&self, customer: &Customer) -> FinancialSummary {
        let mut cost = 0.0;
        let mut items_revenue = 0.0;

        for item in customer.purchased_items.iter().filter(|it| it.quantity > 0) {
            let product = self.catalog.resolve(item);
            if product.is_none() && (item.unit_cost.is_none() || item.unit_price.is_none()) {
                tracing::debug!(
                    customer_id = %customer.customer_id,
                    product_id = ?item.product_id,
                    product_name = ?item.product_name,
                    "明细未匹配到商品,缺失价格按 0 处理"
                );
            }

            let quantity = item.quantity as f64;
            let unit_cost = item
                .unit_cost
                .or_else(|| product.map(|p| p.cost_price))
                .unwrap_or(0.0);
            let unit_price = item
                .unit_price
                .or_else(|| product.map(|p| p.sale_price))
                .unwrap_or(0.0);

            cost += unit_cost * quantity;
            items_revenue += unit_price * quantity;
        }

        let revenue = if customer.declared_total > 0.0 {
            customer.declared_total
        } else {
            items_revenue
        };

        FinancialSummary {
            revenue,
            cost,
            profit: revenue - cost,
            has_cost_basis: cost > 0.0,
        }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, cost: f64, price: f64) -> Product {
        Product {
            product_id: id.to_string(),
            product_name: name.to_string(),
            cost_price: cost,
            sale_price: price,
            in_stock: true,
        }
    }

    fn item(id: Option<&str>, name: Option<&str>, qty: i64) -> PurchasedLineItem {
        PurchasedLineItem {
            product_id: id.map(str::to_string),
            product_name: name.map(str::to_string),
            quantity: qty,
            ..Default::default()
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("SP01", "Kem Dưỡng Ẩm", 100_000.0, 250_000.0),
            product("SP02", "Máy Massage Mặt", 400_000.0, 900_000.0),
        ]
    }

    #[test]
    fn test_scenario_explicit_prices() {
        let products = catalog();
        let reconciler = FinancialReconciler::new(&products);

        let mut c = Customer::new("C1");
        c.purchased_items = vec![PurchasedLineItem {
            quantity: 2,
            unit_price: Some(500_000.0),
            unit_cost: Some(300_000.0),
            ..Default::default()
        }];

        let s = reconciler.reconcile(&c);
        assert_eq!(s.revenue, 1_000_000.0);
        assert_eq!(s.cost, 600_000.0);
        assert_eq!(s.profit, 400_000.0);
        assert!(s.has_cost_basis);
    }

    #[test]
    fn test_catalog_lookup_id_then_name() {
        let products = catalog();
        let reconciler = FinancialReconciler::new(&products);

        let mut c = Customer::new("C1");
        c.purchased_items = vec![
            item(Some(" SP01 "), None, 1),
            item(None, Some("  máy MASSAGE   mặt "), 2),
            // ID 命中时忽略名称
            item(Some("SP01"), Some("Máy Massage Mặt"), 1),
        ];

        let s = reconciler.reconcile(&c);
        assert_eq!(s.cost, 100_000.0 + 800_000.0 + 100_000.0);
        assert_eq!(s.revenue, 250_000.0 + 1_800_000.0 + 250_000.0);
    }

    #[test]
    fn test_unknown_product_degrades_to_zero() {
        let products = catalog();
        let reconciler = FinancialReconciler::new(&products);

        let mut c = Customer::new("C1");
        c.purchased_items = vec![item(Some("NOPE"), Some("Không tồn tại"), 3)];

        let s = reconciler.reconcile(&c);
        assert_eq!(s, FinancialSummary::default());
        assert!(!s.has_cost_basis);
    }

    #[test]
    fn test_non_positive_quantity_skipped() {
        let products = catalog();
        let reconciler = FinancialReconciler::new(&products);

        let mut c = Customer::new("C1");
        c.purchased_items = vec![item(Some("SP01"), None, 0), item(Some("SP02"), None, -1)];

        let s = reconciler.reconcile(&c);
        assert_eq!(s.cost, 0.0);
        assert_eq!(s.revenue, 0.0);
    }

    #[test]
    fn test_declared_total_overrides_items() {
        let products = catalog();
        let reconciler = FinancialReconciler::new(&products);

        let mut c = Customer::new("C1");
        c.declared_total = 1_500_000.0;
        c.purchased_items = vec![item(Some("SP02"), None, 1)];

        let s = reconciler.reconcile(&c);
        assert_eq!(s.revenue, 1_500_000.0);
        assert_eq!(s.cost, 400_000.0);
        assert_eq!(s.profit, 1_100_000.0);

        c.purchased_items.clear();
        let s = reconciler.reconcile(&c);
        assert_eq!(s.revenue, 1_500_000.0);
        assert!(!s.has_cost_basis);
    }

    #[test]
    fn test_explicit_zero_cost_is_respected() {
        let products = catalog();
        let reconciler = FinancialReconciler::new(&products);

        let mut c = Customer::new("C1");
        let mut gift = item(Some("SP01"), None, 1);
        gift.unit_cost = Some(0.0);
        gift.unit_price = Some(0.0);
        c.purchased_items = vec![gift];

        let s = reconciler.reconcile(&c);
        assert_eq!(s.cost, 0.0);
        assert!(!s.has_cost_basis, "明细显式给出 0 时不回退到目录");
    }
}
