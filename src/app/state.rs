// ==========================================
// 学员训练计划管理 - 应用状态
// ==========================================
// 职责: 组装共享连接、配置、仓储与 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{ClientViewApi, DashboardApi};
use crate::config::{ConfigManager, PlanConfig};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::refresh::RefreshCoordinator;
use crate::repository::SqliteDocumentStore;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "COACHING_PLAN_DB_PATH";

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的引擎配置
    pub config: PlanConfig,

    pub config_manager: Arc<ConfigManager>,

    pub store: Arc<SqliteDocumentStore>,

    /// 运营看板 API
    pub dashboard_api: Arc<DashboardApi>,

    /// 学员端 API
    pub client_view_api: Arc<ClientViewApi>,
}

impl AppState {
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState,数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化schema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // 配置: config_kv 覆写默认值
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));
        let config = config_manager
            .load_plan_config()
            .map_err(|e| format!("无法加载配置: {}", e))?;
        tracing::debug!(?config, "引擎配置已加载");

        let store = Arc::new(SqliteDocumentStore::from_connection(conn, &config));
        let refresher = RefreshCoordinator::new(store.clone());

        let dashboard_api = Arc::new(DashboardApi::new(store.clone(), config.clone()));
        let client_view_api = Arc::new(ClientViewApi::new(store.clone(), refresher, &config));

        Ok(Self {
            db_path,
            config,
            config_manager,
            store,
            dashboard_api,
            client_view_api,
        })
    }
}

/// 默认数据库路径
///
/// 优先读取环境变量,其次为用户数据目录,最后回退到当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./coaching_plan.db");
    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录
        #[cfg(debug_assertions)]
        let dir = data_dir.join("coaching-plan-dev");
        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("coaching-plan");

        // 目录创建失败时由打开数据库时报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("coaching_plan.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_reads_config_overrides() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();
        {
            let manager = ConfigManager::new(&db_path).unwrap();
            manager
                .set_global_config_value(crate::config::config_keys::NEAR_EXPIRY_DAYS, "7")
                .unwrap();
        }

        let state = AppState::new(db_path).unwrap();
        assert_eq!(state.config.near_expiry_days, 7);
        assert_eq!(state.config.cache_ttl_secs, 60);
    }
}
