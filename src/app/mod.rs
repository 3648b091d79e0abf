// ==========================================
// 销售数据仓库 - 应用层
// ==========================================
// 职责: 装配数据库 / 配置 / 装载器，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, FileSilverLoader, DB_PATH_ENV};
