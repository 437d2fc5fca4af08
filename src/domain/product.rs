// ==========================================
// 学员训练计划管理 - 商品目录
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Product - 商品
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,   // 商品ID
    pub product_name: String, // 商品名称
    pub cost_price: f64,      // 进价
    pub sale_price: f64,      // 售价
    pub in_stock: bool,       // 是否有货
}
