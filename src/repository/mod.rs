// ==========================================
// 销售数据仓库 - 数据仓储层
// ==========================================
// 职责: 提供银层数据访问接口，屏蔽数据库细节
// 红线: Repository 不含清洗规则
// 约束: 所有值使用参数化绑定，表名只来自 SilverEntity
// ==========================================

pub mod error;
pub mod silver_repo;
pub mod silver_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use silver_repo::SilverRepository;
pub use silver_repo_impl::SilverRepositoryImpl;
