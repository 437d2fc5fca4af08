// ==========================================
// 文档导入集成测试
// ==========================================
// 目标: 原始松散文档 → 文档仓储 → 强类型记录
// ==========================================


use coaching_plan::domain::{AssignmentState, CustomerStatus, TaskCategory};
use coaching_plan::engine::FinancialReconciler;
use coaching_plan::repository::{customer_owner_key, plan_owner_key, PlanDataSource};
use serde_json::json;
use test_helpers::{create_test_store, ymd};

#[tokio::test]
async fn test_loose_customer_document_is_typed_on_read() {
    let (_temp, store) = create_test_store();

    let id = store
        .put_raw_customer(&json!({
            "customer_id": "KH01",
            "customer_name": "  Nguyễn Văn A ",
            "email": "",
            "video_date": "01/04",
            "start_date": "2024-05-01T00:00:00.000Z",
            "duration_days": "0",
            "trang_thai": "Chưa gán",
            "san_pham": "[{\"ID_SP\":\"SP01\",\"so_luong\":\"2\"}]",
            "gia_tien": "",
            "created_at": "2024-04-28 09:15",
        }))
        .unwrap();
    assert_eq!(id, "KH01");

    let customer = store.get_customer("KH01").await.unwrap().unwrap();
    assert_eq!(customer.customer_name, "Nguyễn Văn A");
    assert_eq!(customer.plan_ref, Some(ymd(2024, 4, 1)));
    assert_eq!(customer.start_date, Some(ymd(2024, 5, 1)));
    assert_eq!(customer.duration_days, 62);
    assert_eq!(customer.assignment, AssignmentState::NotAssigned);
    assert_eq!(customer.created_at, Some(ymd(2024, 4, 28)));
    assert_eq!(customer.declared_total, 0.0);
    assert_eq!(customer.purchased_items.len(), 1);
    assert_eq!(customer.purchased_items[0].quantity, 2);
}

#[tokio::test]
async fn test_products_with_legacy_keys_feed_reconciliation() {
    let (_temp, store) = create_test_store();
    store
        .put_raw_product(&json!({
            "ID_SP": "SP01",
            "Ten_SP": "Thảm tập",
            "Gia_Nhap": "100000",
            "Gia_Ban": 250000,
            "trang_thai": 1,
        }))
        .unwrap();
    store
        .put_raw_customer(&json!({
            "customer_id": "KH01",
            "san_pham": [{ "ten_sp": "THAM TAP", "so_luong": 3 }],
        }))
        .unwrap();

    let products = store.list_products().await.unwrap();
    assert_eq!(products.len(), 1);
    assert!(products[0].in_stock);

    let customer = store.get_customer("KH01").await.unwrap().unwrap();
    let summary = FinancialReconciler::new(&products).reconcile(&customer);
    assert_eq!(summary.cost, 300_000.0);
    assert_eq!(summary.revenue, 750_000.0);
    assert_eq!(summary.profit, 450_000.0);
}

#[tokio::test]
async fn test_explicit_primary_flag_beats_legacy_text() {
    let (_temp, store) = create_test_store();
    store
        .put_raw_customer(&json!({
            "customer_id": "KH01",
            "trang_thai": 1,
            "trang_thai_gan": "chưa gán",
        }))
        .unwrap();
    store
        .put_raw_customer(&json!({
            "customer_id": "KH02",
            "trang_thai": "",
            "status_gan": "Chưa gán",
        }))
        .unwrap();

    let customers = store.list_customers().await.unwrap();
    let by_id = |id: &str| customers.iter().find(|c| c.customer_id == id).unwrap();
    assert_eq!(by_id("KH01").assignment, AssignmentState::Assigned);
    assert_eq!(by_id("KH02").assignment, AssignmentState::NotAssigned);
}

#[tokio::test]
async fn test_raw_tasks_and_soft_delete() {
    let (_temp, store) = create_test_store();
    store
        .put_raw_customer(&json!({ "customer_id": "KH01", "video_date": "2024-04-01" }))
        .unwrap();
    let template = plan_owner_key(ymd(2024, 4, 1));
    store
        .put_raw_task(&template, &json!({ "day": "1", "type": "Bắt buộc", "title": "Khởi động" }))
        .unwrap();
    store
        .put_raw_task(&template, &json!({ "day": 2, "type": "Bổ trợ", "is_deleted": "1" }))
        .unwrap();
    assert!(store
        .put_raw_task(&customer_owner_key("KH01"), &json!({ "title": "thiếu ngày" }))
        .is_err());

    let tasks = store.get_plan("KH01", Some(ymd(2024, 4, 1))).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].category, TaskCategory::Mandatory);
    assert!(tasks[1].deleted);

    store.delete_customer("KH01").await.unwrap();
    let customer = store.get_customer("KH01").await.unwrap().unwrap();
    assert_eq!(customer.status, CustomerStatus::Deleted);
}

#[tokio::test]
async fn test_document_without_id_is_rejected() {
    let (_temp, store) = create_test_store();
    assert!(store
        .put_raw_customer(&json!({ "customer_name": "Không có mã" }))
        .is_err());
    assert!(store.put_raw_customer(&json!("không phải đối tượng")).is_err());
    assert!(store.list_customers().await.unwrap().is_empty());
}
