// ==========================================
// 销售数据仓库 - 银层 Repository Trait
// ==========================================
// 职责: 定义银层数据访问接口（不包含业务逻辑）
// 红线: Repository 不含清洗规则，只做整表替换与读取
// ==========================================

use crate::domain::{
    LoadBatch, SilverCategory, SilverCustomer, SilverCustomerDemographic, SilverEntity,
    SilverLocation, SilverProduct, SilverSalesDetail,
};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// SilverRepository Trait
// ==========================================
// 实现者: SilverRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait SilverRepository: Send + Sync {
    // ===== 整表替换（暂存 → 交换，单事务）=====

    /// 替换 crm_cust_info 全部内容
    ///
    /// # 返回
    /// - Ok(usize): 写入行数
    /// - Err: 数据库错误（事务回滚，原内容保持不变）
    async fn replace_customers(&self, rows: Vec<SilverCustomer>) -> RepositoryResult<usize>;

    async fn replace_products(&self, rows: Vec<SilverProduct>) -> RepositoryResult<usize>;

    async fn replace_sales(&self, rows: Vec<SilverSalesDetail>) -> RepositoryResult<usize>;

    async fn replace_customer_demographics(
        &self,
        rows: Vec<SilverCustomerDemographic>,
    ) -> RepositoryResult<usize>;

    async fn replace_locations(&self, rows: Vec<SilverLocation>) -> RepositoryResult<usize>;

    async fn replace_categories(&self, rows: Vec<SilverCategory>) -> RepositoryResult<usize>;

    // ===== 读取（按写入顺序）=====

    async fn list_customers(&self) -> RepositoryResult<Vec<SilverCustomer>>;

    async fn list_products(&self) -> RepositoryResult<Vec<SilverProduct>>;

    async fn list_sales(&self) -> RepositoryResult<Vec<SilverSalesDetail>>;

    async fn list_customer_demographics(&self) -> RepositoryResult<Vec<SilverCustomerDemographic>>;

    async fn list_locations(&self) -> RepositoryResult<Vec<SilverLocation>>;

    async fn list_categories(&self) -> RepositoryResult<Vec<SilverCategory>>;

    /// 统计实体表行数
    async fn count_rows(&self, entity: SilverEntity) -> RepositoryResult<usize>;

    // ===== 批次审计 =====

    /// 写入装载批次记录（同 batch_id + entity 覆盖）
    async fn insert_load_batch(&self, batch: LoadBatch) -> RepositoryResult<()>;

    /// 查询批次记录
    ///
    /// # 参数
    /// - batch_id: None 表示全部批次（按装载时间倒序）
    async fn list_load_batches(&self, batch_id: Option<&str>) -> RepositoryResult<Vec<LoadBatch>>;
}
