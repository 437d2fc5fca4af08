// ==========================================
// 学员训练计划管理 - 文档字段映射器
// ==========================================
// 职责: 存储文档(松散 JSON) ↔ 强类型记录
// 红线: 历史字段名/大小写变体只在这里出现,下游只见强类型字段
// ==========================================
// 学员字段:
//   customer_id / customer_name / email / dia_chi / ma_vd / note / link
//   video_date(计划标识) / start_date / end_date / duration_days
//   trang_thai(主分配标志) + 历史分配字段
//   status / san_pham(数组或 JSON 字符串) / gia_tien / created_at
// 商品字段: id_sp|ID_SP / ten_sp|Ten_SP / gia_nhap|Gia_Nhap / gia_ban|Gia_Ban / trang_thai
// 任务字段: id / day / type / title / detail / link / is_deleted / video_date
// ==========================================

use crate::domain::{
    AssignmentState, Customer, CustomerStatus, ExerciseTask, Product, PurchasedLineItem,
    TaskCategory, DEFAULT_DURATION_DAYS,
};
use crate::engine::classification::{resolve_assignment_fields, AssignmentFlag};
use crate::engine::date_normalizer::{to_key, DateNormalizer};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::value_cleaner::ValueCleaner;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// 主分配标志字段
pub const PRIMARY_ASSIGNMENT_FIELD: &str = "trang_thai";

/// 历史分配字段（按读取顺序）
pub const LEGACY_ASSIGNMENT_FIELDS: &[&str] = &[
    "trang_thai_gan",
    "status_gan",
    "trangthai",
    "trang_thai_khoa_hoc",
    "assignment_status",
];

pub struct RecordMapper {
    cleaner: ValueCleaner,
}

impl RecordMapper {
    pub fn new(dates: DateNormalizer) -> Self {
        Self {
            cleaner: ValueCleaner::new(dates),
        }
    }

    pub fn cleaner(&self) -> &ValueCleaner {
        &self.cleaner
    }

    // ==========================================
    // 学员
    // ==========================================

    pub fn map_customer(&self, doc: &Value) -> ImportResult<Customer> {
        let obj = as_object(doc, "customer")?;
        let c = &self.cleaner;

        let customer_id = self
            .first_text(obj, &["customer_id", "id"])
            .ok_or(ImportError::MissingField {
                entity: "customer",
                field: "customer_id",
            })?;

        let mut customer = Customer::new(customer_id);
        customer.customer_name = self.first_text(obj, &["customer_name", "name"]).unwrap_or_default();
        customer.email = self.first_text(obj, &["email"]).unwrap_or_default();
        customer.address = self.first_text(obj, &["dia_chi", "address"]).unwrap_or_default();
        customer.shipping_code = self.first_text(obj, &["ma_vd", "shipping_code"]).unwrap_or_default();
        customer.note = self.first_text(obj, &["note"]).unwrap_or_default();
        customer.link = self.first_text(obj, &["link"]).unwrap_or_default();

        customer.plan_ref = field(obj, "video_date").and_then(|v| c.date(v));
        customer.start_date = field(obj, "start_date").and_then(|v| c.date(v));
        customer.end_date = field(obj, "end_date").and_then(|v| c.date(v));
        customer.duration_days = field(obj, "duration_days")
            .and_then(|v| c.integer(v))
            .filter(|d| *d > 0)
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(DEFAULT_DURATION_DAYS);

        customer.assignment = self.resolve_assignment(obj);
        customer.status = field(obj, "status")
            .map(|v| CustomerStatus::from_str(&c.text(v)))
            .unwrap_or(CustomerStatus::Active);

        customer.purchased_items = self.map_line_items(field(obj, "san_pham"));
        customer.declared_total = field(obj, "gia_tien")
            .and_then(|v| c.number(v))
            .unwrap_or(0.0);
        customer.created_at = field(obj, "created_at").and_then(|v| c.date(v));

        Ok(customer)
    }

    /// 主字段 + 历史字段联合解析分配状态
    fn resolve_assignment(&self, obj: &Map<String, Value>) -> AssignmentState {
        let primary = field(obj, PRIMARY_ASSIGNMENT_FIELD)
            .map(|v| self.cleaner.assignment_flag(v))
            .unwrap_or_default();
        let legacy: Vec<AssignmentFlag> = LEGACY_ASSIGNMENT_FIELDS
            .iter()
            .filter_map(|name| field(obj, name))
            .map(|v| self.cleaner.assignment_flag(v))
            .collect();
        resolve_assignment_fields(&primary, &legacy)
    }

    /// 已购明细（数组,或内嵌 JSON 字符串）
    ///
    /// 无法解析或不是数组时按空列表处理,学员记录本身不受影响
    fn map_line_items(&self, value: Option<&Value>) -> Vec<PurchasedLineItem> {
        let parsed;
        let items = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(Value::String(s)) if s.trim().is_empty() => return Vec::new(),
            Some(Value::String(s)) => {
                parsed = match serde_json::from_str::<Value>(s) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(raw = %s, error = %e, "已购明细不是合法 JSON,按空列表处理");
                        return Vec::new();
                    }
                };
                match &parsed {
                    Value::Array(items) => items,
                    other => {
                        warn!(raw = %other, "已购明细不是数组,按空列表处理");
                        return Vec::new();
                    }
                }
            }
            Some(other) => {
                warn!(raw = %other, "已购明细类型不支持,按空列表处理");
                return Vec::new();
            }
        };

        let mut mapped = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(obj) = item else {
                debug!(item = %item, "跳过非对象明细");
                continue;
            };
            mapped.push(self.map_line_item(obj));
        }
        mapped
    }

    fn map_line_item(&self, obj: &Map<String, Value>) -> PurchasedLineItem {
        let c = &self.cleaner;
        PurchasedLineItem {
            product_id: self.first_text(obj, &["id_sp", "ID_SP"]),
            product_name: self.first_text(obj, &["ten_sp", "Ten_SP"]),
            quantity: field(obj, "so_luong").and_then(|v| c.integer(v)).unwrap_or(0),
            unit_price: self.first_number(obj, &["don_gia", "gia_ban"]),
            unit_cost: self.first_number(obj, &["gia_nhap"]),
            line_total: field(obj, "thanh_tien").and_then(|v| c.number(v)).unwrap_or(0.0),
        }
    }

    // ==========================================
    // 商品
    // ==========================================

    pub fn map_product(&self, doc: &Value) -> ImportResult<Product> {
        let obj = as_object(doc, "product")?;
        let product_id = self.first_text(obj, &["id_sp", "ID_SP"]).unwrap_or_default();
        let product_name = self.first_text(obj, &["ten_sp", "Ten_SP"]).unwrap_or_default();
        if product_id.is_empty() && product_name.is_empty() {
            return Err(ImportError::MissingField {
                entity: "product",
                field: "id_sp",
            });
        }

        Ok(Product {
            product_id,
            product_name,
            cost_price: self.first_number(obj, &["gia_nhap", "Gia_Nhap"]).unwrap_or(0.0),
            sale_price: self.first_number(obj, &["gia_ban", "Gia_Ban"]).unwrap_or(0.0),
            in_stock: self
                .first_number(obj, &["trang_thai", "Trang_Thai"])
                .map(|v| v != 0.0)
                .unwrap_or(false),
        })
    }

    // ==========================================
    // 训练任务
    // ==========================================

    pub fn map_task(&self, doc: &Value) -> ImportResult<ExerciseTask> {
        let obj = as_object(doc, "task")?;
        let c = &self.cleaner;

        let day = field(obj, "day")
            .and_then(|v| c.integer(v))
            .ok_or(ImportError::MissingField {
                entity: "task",
                field: "day",
            })?;
        // 负数天视为 0,进入访问控制前会被剔除
        let day = u32::try_from(day.max(0)).unwrap_or(0);

        let category = field(obj, "type")
            .map(|v| TaskCategory::from_str(&c.text(v)))
            .unwrap_or(TaskCategory::Optional);

        let mut task = ExerciseTask::new(
            day,
            category,
            self.first_text(obj, &["title"]).unwrap_or_default(),
        );
        task.task_id = self.first_text(obj, &["id", "task_id"]);
        task.body = self.first_text(obj, &["detail", "body"]).unwrap_or_default();
        task.link = self.first_text(obj, &["link"]).unwrap_or_default();
        task.deleted = field(obj, "is_deleted").map(|v| c.boolean(v)).unwrap_or(false);
        task.plan_ref = field(obj, "video_date").and_then(|v| c.date(v));
        Ok(task)
    }

    // ==========================================
    // 反向映射（写入存储使用规范字段名）
    // ==========================================

    pub fn customer_to_document(&self, customer: &Customer) -> Value {
        let items: Vec<Value> = customer
            .purchased_items
            .iter()
            .map(|it| {
                json!({
                    "id_sp": it.product_id,
                    "ten_sp": it.product_name,
                    "so_luong": it.quantity,
                    "don_gia": it.unit_price,
                    "gia_nhap": it.unit_cost,
                    "thanh_tien": it.line_total,
                })
            })
            .collect();

        json!({
            "customer_id": customer.customer_id,
            "customer_name": customer.customer_name,
            "email": customer.email,
            "dia_chi": customer.address,
            "ma_vd": customer.shipping_code,
            "note": customer.note,
            "link": customer.link,
            "video_date": customer.plan_ref.map(to_key),
            "start_date": customer.start_date.map(to_key),
            "end_date": customer.end_date.map(to_key),
            "duration_days": customer.duration_days,
            "trang_thai": if customer.assignment.is_assigned() { 1 } else { 0 },
            "status": customer.status.to_db_str(),
            "san_pham": items,
            "gia_tien": customer.declared_total,
            "created_at": customer.created_at.map(to_key),
        })
    }

    pub fn product_to_document(&self, product: &Product) -> Value {
        json!({
            "id_sp": product.product_id,
            "ten_sp": product.product_name,
            "gia_nhap": product.cost_price,
            "gia_ban": product.sale_price,
            "trang_thai": if product.in_stock { 1 } else { 0 },
        })
    }

    pub fn task_to_document(&self, task: &ExerciseTask) -> Value {
        json!({
            "id": task.task_id,
            "day": task.day,
            "type": task.category.to_db_str(),
            "title": task.title,
            "detail": task.body,
            "link": task.link,
            "is_deleted": task.deleted,
            "video_date": task.plan_ref.map(to_key),
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 按别名顺序取第一个非空文本
    fn first_text(&self, obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|name| field(obj, name))
            .find_map(|v| self.cleaner.opt_text(v))
    }

    /// 按别名顺序取第一个可解析的数值
    fn first_number(&self, obj: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
        aliases
            .iter()
            .filter_map(|name| field(obj, name))
            .find_map(|v| self.cleaner.number(v))
    }
}

impl Default for RecordMapper {
    fn default() -> Self {
        Self::new(DateNormalizer::current())
    }
}

fn as_object<'a>(doc: &'a Value, entity: &'static str) -> ImportResult<&'a Map<String, Value>> {
    doc.as_object().ok_or(ImportError::NotAnObject { entity })
}

/// 取字段（null 视为缺失）
fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}
