// ==========================================
// 学员训练计划管理 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::plan_config::PlanConfig;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    /// 读取数值配置,缺失或格式错误时返回默认值
    fn get_parsed_or<T: FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        let parsed = self
            .get_global_config_value(key)?
            .and_then(|v| v.trim().parse::<T>().ok());
        if parsed.is_none() {
            tracing::debug!(key, "配置缺失或无法解析,使用默认值");
        }
        Ok(parsed.unwrap_or(default))
    }

    /// 加载计划引擎配置（config_kv 覆写默认值）
    pub fn load_plan_config(&self) -> RepositoryResult<PlanConfig> {
        let d = PlanConfig::default();
        Ok(PlanConfig {
            default_duration_days: self
                .get_parsed_or(config_keys::DEFAULT_DURATION_DAYS, d.default_duration_days)?,
            near_expiry_days: self.get_parsed_or(config_keys::NEAR_EXPIRY_DAYS, d.near_expiry_days)?,
            refresh_day_modulus: self
                .get_parsed_or(config_keys::REFRESH_DAY_MODULUS, d.refresh_day_modulus)?
                .max(1),
            cache_ttl_secs: self.get_parsed_or(config_keys::CACHE_TTL_SECS, d.cache_ttl_secs)?,
            cache_max_entries: self
                .get_parsed_or(config_keys::CACHE_MAX_ENTRIES, d.cache_max_entries)?
                .max(1),
            collapsed_visible_days: self
                .get_parsed_or(config_keys::COLLAPSED_VISIBLE_DAYS, d.collapsed_visible_days)?,
            expanded_visible_days: self
                .get_parsed_or(config_keys::EXPANDED_VISIBLE_DAYS, d.expanded_visible_days)?,
            min_plan_year: self.get_parsed_or(config_keys::MIN_PLAN_YEAR, d.min_plan_year)?,
            max_plan_year: self.get_parsed_or(config_keys::MAX_PLAN_YEAR, d.max_plan_year)?,
            cycle_start_day: self
                .get_parsed_or(config_keys::CYCLE_START_DAY, d.cycle_start_day)?
                .clamp(1, 28),
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 计划
    pub const DEFAULT_DURATION_DAYS: &str = "default_duration_days";
    pub const NEAR_EXPIRY_DAYS: &str = "near_expiry_days";
    pub const REFRESH_DAY_MODULUS: &str = "refresh_day_modulus";

    // 缓存
    pub const CACHE_TTL_SECS: &str = "cache_ttl_secs";
    pub const CACHE_MAX_ENTRIES: &str = "cache_max_entries";

    // 学员端
    pub const COLLAPSED_VISIBLE_DAYS: &str = "collapsed_visible_days";
    pub const EXPANDED_VISIBLE_DAYS: &str = "expanded_visible_days";

    // 模板
    pub const MIN_PLAN_YEAR: &str = "min_plan_year";
    pub const MAX_PLAN_YEAR: &str = "max_plan_year";

    // 看板
    pub const CYCLE_START_DAY: &str = "cycle_start_day";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn manager() -> (NamedTempFile, ConfigManager) {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();
        let manager = ConfigManager::new(&path).unwrap();
        (temp, manager)
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let (_temp, manager) = manager();
        assert_eq!(manager.load_plan_config().unwrap(), PlanConfig::default());
    }

    #[test]
    fn test_override_and_bad_value_fallback() {
        let (_temp, manager) = manager();
        manager
            .set_global_config_value(config_keys::NEAR_EXPIRY_DAYS, "7")
            .unwrap();
        manager
            .set_global_config_value(config_keys::CACHE_TTL_SECS, "abc")
            .unwrap();

        let config = manager.load_plan_config().unwrap();
        assert_eq!(config.near_expiry_days, 7);
        assert_eq!(config.cache_ttl_secs, 60, "无法解析的值应回落到默认值");

        manager
            .set_global_config_value(config_keys::NEAR_EXPIRY_DAYS, "3")
            .unwrap();
        assert_eq!(manager.load_plan_config().unwrap().near_expiry_days, 3);
        assert_eq!(manager.get_config_snapshot().unwrap().len(), 2);
    }

    #[test]
    fn test_cache_max_entries_override_is_clamped() {
        let (_temp, manager) = manager();
        manager
            .set_global_config_value(config_keys::CACHE_MAX_ENTRIES, "32")
            .unwrap();
        assert_eq!(manager.load_plan_config().unwrap().cache_max_entries, 32);

        manager
            .set_global_config_value(config_keys::CACHE_MAX_ENTRIES, "0")
            .unwrap();
        assert_eq!(manager.load_plan_config().unwrap().cache_max_entries, 1);
    }
}
