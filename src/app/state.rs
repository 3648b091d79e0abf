// ==========================================
// 销售数据仓库 - 应用状态
// ==========================================
// 职责: 管理共享数据库连接，装配银层装载器
// ==========================================

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::cleansing::{
    CleansingError, CleansingResult, FileBronzeSource, SilverLoader, SilverLoaderImpl,
};
use crate::config::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{LoadRunSummary, RunContext};
use crate::repository::SilverRepositoryImpl;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SALES_DWH_DB_PATH";

/// 基于目录的装载器
pub type FileSilverLoader = SilverLoaderImpl<FileBronzeSource, SilverRepositoryImpl, ConfigManager>;

/// 应用状态
///
/// 仓储与配置管理器共享同一连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    /// 打开数据库并确保 schema 就绪
    pub fn new(db_path: String) -> CleansingResult<Self> {
        tracing::info!(db_path = %db_path, "初始化 AppState");

        let conn = open_sqlite_connection(&db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn config_manager(&self) -> CleansingResult<ConfigManager> {
        ConfigManager::from_connection(self.conn.clone())
    }

    pub fn silver_repo(&self) -> SilverRepositoryImpl {
        SilverRepositoryImpl::from_connection(self.conn.clone())
    }

    /// 装配读取 bronze_dir 的银层装载器
    pub fn silver_loader<P: AsRef<Path>>(&self, bronze_dir: P) -> CleansingResult<FileSilverLoader> {
        let bronze_dir = bronze_dir.as_ref();
        if !bronze_dir.is_dir() {
            return Err(CleansingError::FileNotFound(bronze_dir.display().to_string()));
        }

        Ok(SilverLoaderImpl::with_defaults(
            FileBronzeSource::new(bronze_dir),
            self.silver_repo(),
            self.config_manager()?,
        ))
    }

    /// 全量装载六个银层实体
    pub async fn run_silver_load<P: AsRef<Path>>(
        &self,
        bronze_dir: P,
        ctx: &RunContext,
    ) -> CleansingResult<LoadRunSummary> {
        let loader = self.silver_loader(bronze_dir)?;
        Ok(loader.load_all(ctx).await)
    }
}

/// 默认数据库路径
///
/// 优先级: SALES_DWH_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./sales_dwh.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("sales-dwh");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("sales_dwh.db");
        }
    }

    path.to_string_lossy().to_string()
}
