// ==========================================
// 学员训练计划管理 - SQLite 文档仓储
// ==========================================
// 职责: 以 JSON 文档形式保存学员/商品/任务,读取时经导入层映射为强类型记录
// 红线: Repository 不含业务规则;写操作后整体清空读缓存
// ==========================================
// 任务归属键:
//   customer:<customer_id>  学员专属任务
//   plan:<YYYY-MM-DD>       计划模板任务
// 缓存键:
//   customers / customer:<id> / products / templates / plan:<customer_id>:<plan_key>
// ==========================================

use crate::config::PlanConfig;
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{Customer, CustomerStatus, ExerciseTask, Product};
use crate::engine::date_normalizer::{to_key, DateNormalizer};
use crate::engine::refresh::RefreshSource;
use crate::importer::error::ImportResult;
use crate::importer::record_mapper::RecordMapper;
use crate::repository::cache::TtlCache;
use crate::repository::data_source::PlanDataSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

const CUSTOMER_OWNER_PREFIX: &str = "customer:";
const PLAN_OWNER_PREFIX: &str = "plan:";

type Docs = Arc<Vec<Value>>;

pub fn customer_owner_key(customer_id: &str) -> String {
    format!("{}{}", CUSTOMER_OWNER_PREFIX, customer_id)
}

pub fn plan_owner_key(plan_ref: NaiveDate) -> String {
    format!("{}{}", PLAN_OWNER_PREFIX, to_key(plan_ref))
}

// ==========================================
// SqliteDocumentStore - 文档仓储
// ==========================================
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    mapper: RecordMapper,
    cache: TtlCache<Docs>,
}

impl SqliteDocumentStore {
    /// 打开数据库并初始化 schema
    pub fn new(db_path: &str, config: &PlanConfig) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), config))
    }

    /// 从已有连接创建仓储实例（schema 由调用方负责）
    pub fn from_connection(conn: Arc<Mutex<Connection>>, config: &PlanConfig) -> Self {
        Self {
            conn,
            mapper: RecordMapper::default(),
            cache: TtlCache::new(config.cache_ttl(), config.cache_max_entries),
        }
    }

    /// 指定日期规范化器（缺省年份等）
    pub fn with_date_normalizer(mut self, dates: DateNormalizer) -> Self {
        self.mapper = RecordMapper::new(dates);
        self
    }

    pub fn mapper(&self) -> &RecordMapper {
        &self.mapper
    }

    pub fn cache(&self) -> &TtlCache<Docs> {
        &self.cache
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 原始文档写入（导入外部数据,字段形态原样保留）
    // ==========================================

    /// 写入原始学员文档,返回学员 ID
    pub fn put_raw_customer(&self, doc: &Value) -> RepositoryResult<String> {
        let customer = self.mapper.map_customer(doc)?;
        let conn = self.get_conn()?;
        upsert_customer_body(&conn, &customer.customer_id, doc)?;
        drop(conn);
        self.cache.clear();
        Ok(customer.customer_id)
    }

    pub fn put_raw_product(&self, doc: &Value) -> RepositoryResult<()> {
        let product = self.mapper.map_product(doc)?;
        let key = product_key(&product);
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product_doc (product_id, body) VALUES (?1, ?2)
             ON CONFLICT(product_id) DO UPDATE SET body = excluded.body",
            params![key, doc.to_string()],
        )?;
        drop(conn);
        self.cache.clear();
        Ok(())
    }

    /// 追加原始任务文档
    pub fn put_raw_task(&self, owner_key: &str, doc: &Value) -> RepositoryResult<()> {
        self.mapper.map_task(doc)?;
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO task_doc (owner_key, body) VALUES (?1, ?2)",
            params![owner_key, doc.to_string()],
        )?;
        drop(conn);
        self.cache.clear();
        Ok(())
    }

    // ==========================================
    // 读取辅助
    // ==========================================

    /// 读缓存,未命中时加载并回填
    fn cached_docs<F>(&self, key: &str, load: F) -> RepositoryResult<Docs>
    where
        F: FnOnce(&Connection) -> RepositoryResult<Vec<Value>>,
    {
        if let Some(docs) = self.cache.get(key) {
            debug!(key, "读缓存命中");
            return Ok(docs);
        }
        let docs = {
            let conn = self.get_conn()?;
            Arc::new(load(&conn)?)
        };
        self.cache.insert(key, Arc::clone(&docs));
        Ok(docs)
    }

    /// 批量映射,单条失败记日志后跳过
    fn map_each<T, F>(&self, entity: &str, docs: &[Value], map: F) -> Vec<T>
    where
        F: Fn(&RecordMapper, &Value) -> ImportResult<T>,
    {
        docs.iter()
            .filter_map(|doc| match map(&self.mapper, doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(entity, error = %e, "文档映射失败,已跳过");
                    None
                }
            })
            .collect()
    }

    fn load_tasks(&self, cache_key: &str, owner_key: &str) -> RepositoryResult<Vec<ExerciseTask>> {
        let owner = owner_key.to_string();
        let docs = self.cached_docs(cache_key, move |conn| {
            query_bodies(
                conn,
                "task_doc",
                "SELECT owner_key, body FROM task_doc WHERE owner_key = ?1 ORDER BY row_id",
                &[&owner],
            )
        })?;
        Ok(self.map_each("task", &docs, RecordMapper::map_task))
    }

    /// 替换某个归属键下的全部任务
    fn replace_tasks(&self, owner_key: &str, tasks: &[ExerciseTask]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tx.execute("DELETE FROM task_doc WHERE owner_key = ?1", params![owner_key])?;
        {
            let mut stmt = tx.prepare("INSERT INTO task_doc (owner_key, body) VALUES (?1, ?2)")?;
            for task in tasks {
                let body = self.mapper.task_to_document(task);
                stmt.execute(params![owner_key, body.to_string()])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        drop(conn);
        self.cache.clear();
        Ok(tasks.len())
    }

    fn invalidate_customer(&self, customer_id: &str) {
        self.cache.invalidate_prefix(&customer_owner_key(customer_id));
        self.cache
            .invalidate_prefix(&format!("{}{}:", PLAN_OWNER_PREFIX, customer_id));
        self.cache.invalidate_prefix("customers");
    }
}

// ==========================================
// PlanDataSource 实现
// ==========================================
#[async_trait]
impl PlanDataSource for SqliteDocumentStore {
    #[instrument(skip(self))]
    async fn list_customers(&self) -> RepositoryResult<Vec<Customer>> {
        let docs = self.cached_docs("customers", |conn| {
            query_bodies(
                conn,
                "customer_doc",
                "SELECT customer_id, body FROM customer_doc ORDER BY customer_id",
                &[],
            )
        })?;
        Ok(self.map_each("customer", &docs, RecordMapper::map_customer))
    }

    async fn get_customer(&self, customer_id: &str) -> RepositoryResult<Option<Customer>> {
        let id = customer_id.to_string();
        let docs = self.cached_docs(&customer_owner_key(customer_id), move |conn| {
            query_bodies(
                conn,
                "customer_doc",
                "SELECT customer_id, body FROM customer_doc WHERE customer_id = ?1",
                &[&id],
            )
        })?;
        match docs.first() {
            Some(doc) => Ok(Some(self.mapper.map_customer(doc)?)),
            None => Ok(None),
        }
    }

    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let docs = self.cached_docs("products", |conn| {
            query_bodies(
                conn,
                "product_doc",
                "SELECT product_id, body FROM product_doc ORDER BY product_id",
                &[],
            )
        })?;
        Ok(self.map_each("product", &docs, RecordMapper::map_product))
    }

    async fn get_plan(
        &self,
        customer_id: &str,
        plan_ref: Option<NaiveDate>,
    ) -> RepositoryResult<Vec<ExerciseTask>> {
        let plan_key = plan_ref.map(to_key).unwrap_or_default();
        let own = self.load_tasks(
            &format!("{}{}:own", PLAN_OWNER_PREFIX, customer_id),
            &customer_owner_key(customer_id),
        )?;
        if !own.is_empty() {
            return Ok(own);
        }

        let Some(plan_ref) = plan_ref else {
            return Ok(Vec::new());
        };
        let mut template = self.load_tasks(
            &format!("{}{}:{}", PLAN_OWNER_PREFIX, customer_id, plan_key),
            &plan_owner_key(plan_ref),
        )?;
        for task in template.iter_mut() {
            task.plan_ref.get_or_insert(plan_ref);
        }
        Ok(template)
    }

    async fn list_template_tasks(&self) -> RepositoryResult<Vec<ExerciseTask>> {
        let pattern = format!("{}%", PLAN_OWNER_PREFIX);
        let docs = self.cached_docs("templates", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT owner_key, body FROM task_doc WHERE owner_key LIKE ?1 ORDER BY row_id",
            )?;
            let rows = stmt.query_map(params![pattern], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut docs = Vec::new();
            for row in rows {
                let (owner, body) = row?;
                let mut doc = parse_body("task_doc", &owner, &body)?;
                // 模板任务文档缺少计划标识时由归属键补齐
                if let (Some(obj), Some(key)) =
                    (doc.as_object_mut(), owner.strip_prefix(PLAN_OWNER_PREFIX))
                {
                    let missing = obj.get("video_date").map(Value::is_null).unwrap_or(true);
                    if missing {
                        obj.insert("video_date".to_string(), Value::String(key.to_string()));
                    }
                }
                docs.push(doc);
            }
            Ok(docs)
        })?;
        Ok(self.map_each("task", &docs, RecordMapper::map_task))
    }

    async fn upsert_customer(&self, customer: &Customer) -> RepositoryResult<()> {
        let canonical = self.mapper.customer_to_document(customer);
        let conn = self.get_conn()?;
        let existing = load_customer_body(&conn, &customer.customer_id)?;
        let merged = match existing {
            Some(mut doc) => {
                merge_document(&mut doc, canonical);
                doc
            }
            None => canonical,
        };
        upsert_customer_body(&conn, &customer.customer_id, &merged)?;
        drop(conn);
        self.cache.clear();
        Ok(())
    }

    async fn delete_customer(&self, customer_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let mut doc = load_customer_body(&conn, customer_id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "customer".to_string(),
                id: customer_id.to_string(),
            }
        })?;
        if let Some(obj) = doc.as_object_mut() {
            obj.insert(
                "status".to_string(),
                Value::String(CustomerStatus::Deleted.to_db_str().to_string()),
            );
        }
        upsert_customer_body(&conn, customer_id, &doc)?;
        drop(conn);
        self.cache.clear();
        Ok(())
    }

    async fn save_products(&self, products: &[Product]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tx.execute("DELETE FROM product_doc", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO product_doc (product_id, body) VALUES (?1, ?2)")?;
            for product in products {
                let body = self.mapper.product_to_document(product);
                stmt.execute(params![product_key(product), body.to_string()])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        drop(conn);
        self.cache.clear();
        Ok(products.len())
    }

    async fn save_customer_plan(
        &self,
        customer_id: &str,
        tasks: &[ExerciseTask],
    ) -> RepositoryResult<usize> {
        self.replace_tasks(&customer_owner_key(customer_id), tasks)
    }

    async fn save_template_tasks(
        &self,
        plan_ref: NaiveDate,
        tasks: &[ExerciseTask],
    ) -> RepositoryResult<usize> {
        let stamped: Vec<ExerciseTask> = tasks
            .iter()
            .cloned()
            .map(|mut t| {
                t.plan_ref = Some(plan_ref);
                t
            })
            .collect();
        self.replace_tasks(&plan_owner_key(plan_ref), &stamped)
    }

    async fn delete_template(&self, plan_ref: NaiveDate) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM task_doc WHERE owner_key = ?1",
            params![plan_owner_key(plan_ref)],
        )?;
        drop(conn);
        self.cache.clear();
        Ok(removed)
    }
}

// ==========================================
// RefreshSource 实现: 失效该学员缓存后重新加载
// ==========================================
#[async_trait]
impl RefreshSource for SqliteDocumentStore {
    async fn refresh_customer(&self, customer_id: &str) -> RepositoryResult<()> {
        self.invalidate_customer(customer_id);
        let customer = self
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "customer".to_string(),
                id: customer_id.to_string(),
            })?;
        let tasks = self.get_plan(customer_id, customer.plan_ref).await?;
        debug!(customer_id, tasks = tasks.len(), "学员数据已重新加载");
        Ok(())
    }
}

// ==========================================
// SQL 辅助
// ==========================================

fn product_key(product: &Product) -> String {
    if product.product_id.is_empty() {
        format!("name:{}", product.product_name)
    } else {
        product.product_id.clone()
    }
}

fn parse_body(entity: &str, id: &str, body: &str) -> RepositoryResult<Value> {
    serde_json::from_str(body).map_err(|e| RepositoryError::CorruptDocument {
        entity: entity.to_string(),
        id: id.to_string(),
        message: e.to_string(),
    })
}

/// 查询 (id, body) 两列并解析 body
fn query_bodies(
    conn: &Connection,
    entity: &str,
    sql: &str,
    params: &[&dyn ToSql],
) -> RepositoryResult<Vec<Value>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut docs = Vec::new();
    for row in rows {
        let (id, body) = row?;
        docs.push(parse_body(entity, &id, &body)?);
    }
    Ok(docs)
}

fn load_customer_body(conn: &Connection, customer_id: &str) -> RepositoryResult<Option<Value>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM customer_doc WHERE customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| parse_body("customer_doc", customer_id, &b))
        .transpose()
}

fn upsert_customer_body(conn: &Connection, customer_id: &str, doc: &Value) -> RepositoryResult<()> {
    conn.execute(
        "INSERT INTO customer_doc (customer_id, body, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(customer_id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![customer_id, doc.to_string()],
    )?;
    Ok(())
}

/// 规范字段覆盖到已有文档上（保留未知字段）
fn merge_document(existing: &mut Value, canonical: Value) {
    match (existing.as_object_mut(), canonical) {
        (Some(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        (_, canonical) => *existing = canonical,
    }
}
