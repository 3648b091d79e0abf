// ==========================================
// 销售数据仓库 - 清洗层
// ==========================================
// 职责: 铜层 CRM/ERP 原始数据 → 银层清洗数据
// 组件: 解析 / 映射 / 校验 / 规整 / 去重 / 修复 / 派生 / 复核 / 装载
// ==========================================

pub mod bronze_source;
pub mod cleansing_trait;
pub mod consistency_repairer;
pub mod data_cleaner;
pub mod deduplicator;
pub mod derivation;
pub mod dq_validator;
pub mod entity_pipelines;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod silver_audit;
pub mod silver_loader_impl;

// 重导出核心类型
pub use bronze_source::{FileBronzeSource, InMemoryBronzeSource};
pub use cleansing_trait::{
    BronzeBatch, BronzeSource, ConsistencyRepairer, DataCleaner, DerivationService, DqValidator,
    FieldMapper, FileParser, MappedRow, SalesRepair, SilverLoader,
};
pub use consistency_repairer::ConsistencyRepairerImpl;
pub use data_cleaner::DataCleanerImpl;
pub use deduplicator::{DedupOutcome, Deduplicator};
pub use derivation::DerivationServiceImpl;
pub use dq_validator::DqValidatorImpl;
pub use entity_pipelines::{SilverTransformer, TransformOutput};
pub use error::{CleansingError, CleansingResult};
pub use field_mapper::FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use silver_audit::SilverAuditor;
pub use silver_loader_impl::SilverLoaderImpl;
