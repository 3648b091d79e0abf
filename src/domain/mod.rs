// ==========================================
// 销售数据仓库 - 领域模型层
// ==========================================
// 职责: 铜层/银层记录、数据质量报告、装载批次
// 红线: 不含数据访问逻辑，不含清洗规则
// ==========================================

pub mod bronze;
pub mod dq;
pub mod load;
pub mod silver;

// 重导出核心类型
pub use bronze::{
    BronzeRecord, RawCategoryRecord, RawCustomerDemographicRecord, RawCustomerRecord,
    RawLocationRecord, RawProductRecord, RawSalesRecord, RecordProfile,
};
pub use dq::{AuditFinding, DqLevel, DqReport, DqSummary, DqViolation, DuplicateKeyGroup};
pub use load::{EntityLoadResult, LoadBatch, LoadRunSummary, RunContext, SilverEntity};
pub use silver::{
    SilverCategory, SilverCustomer, SilverCustomerDemographic, SilverLocation, SilverProduct,
    SilverSalesDetail,
};
