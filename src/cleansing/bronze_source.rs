// ==========================================
// 销售数据仓库 - 铜层数据源
// ==========================================
// 职责: 定位铜层文件 → 解析 → 字段映射 → BronzeBatch
// 目录约定: <root>/source_crm/{cust_info,prd_info,sales_details}.{csv,xlsx}
//          <root>/source_erp/{CUST_AZ12,LOC_A101,PX_CAT_G1V2}.{csv,xlsx}
// 说明: 映射失败的行记为 DqLevel::Error 并剔除，不中断整批
//       日期无法解析的行保留（字段置空），告警随批次带出
// ==========================================

use crate::cleansing::cleansing_trait::{BronzeBatch, BronzeSource, FieldMapper, MappedRow};
use crate::cleansing::error::{CleansingError, CleansingResult};
use crate::cleansing::field_mapper::FieldMapperImpl;
use crate::cleansing::file_parser::{UniversalFileParser, SUPPORTED_EXTENSIONS};
use crate::domain::{
    DqLevel, DqViolation, RawCategoryRecord, RawCustomerDemographicRecord, RawCustomerRecord,
    RawLocationRecord, RawProductRecord, RawSalesRecord, SilverEntity,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type MapFn<T> =
    fn(&FieldMapperImpl, &HashMap<String, String>, usize) -> CleansingResult<MappedRow<T>>;

// ==========================================
// FileBronzeSource - 基于目录的铜层数据源
// ==========================================
pub struct FileBronzeSource {
    root: PathBuf,
    parser: UniversalFileParser,
    mapper: FieldMapperImpl,
}

impl FileBronzeSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            parser: UniversalFileParser,
            mapper: FieldMapperImpl,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 定位实体源文件（按 SUPPORTED_EXTENSIONS 顺序尝试）
    pub fn resolve_file(&self, entity: SilverEntity) -> CleansingResult<PathBuf> {
        let stem = self.root.join(entity.source_file_stem());
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| stem.with_extension(ext))
            .find(|p| p.is_file())
            .ok_or_else(|| CleansingError::FileNotFound(format!("{}.{{csv,xlsx}}", stem.display())))
    }

    fn read_entity<T>(&self, entity: SilverEntity, map: MapFn<T>) -> CleansingResult<BronzeBatch<T>> {
        let path = self.resolve_file(entity)?;
        debug!(entity = %entity, path = %path.display(), "读取铜层文件");

        let raw_rows = self.parser.parse(&path)?;

        let mut batch = BronzeBatch::new(Vec::with_capacity(raw_rows.len()));
        for (idx, row) in raw_rows.iter().enumerate() {
            // 表头占第 1 行
            let row_number = idx + 2;
            match map(&self.mapper, row, row_number) {
                Ok(mapped) => {
                    batch.records.push(mapped.record);
                    batch.warnings.extend(mapped.warnings);
                }
                Err(e) => batch.rejected.push(mapping_violation(row_number, e)),
            }
        }

        if !batch.warnings.is_empty() {
            warn!(entity = %entity, warnings = batch.warnings.len(), "存在无法解析的日期字段，已置空");
        }

        if !batch.rejected.is_empty() {
            warn!(entity = %entity, rejected = batch.rejected.len(), "存在映射失败行");
        }
        Ok(batch)
    }
}

/// 行级映射错误 → DQ Error
fn mapping_violation(row_number: usize, err: CleansingError) -> DqViolation {
    let field = match &err {
        CleansingError::TypeConversionError { field, .. } => field.clone(),
        _ => "row".to_string(),
    };
    DqViolation::new(row_number, None, DqLevel::Error, &field, err.to_string())
}

#[async_trait]
impl BronzeSource for FileBronzeSource {
    async fn read_customers(&self) -> CleansingResult<BronzeBatch<RawCustomerRecord>> {
        self.read_entity(SilverEntity::Customer, |m, row, n| m.map_customer(row, n))
    }

    async fn read_products(&self) -> CleansingResult<BronzeBatch<RawProductRecord>> {
        self.read_entity(SilverEntity::Product, |m, row, n| m.map_product(row, n))
    }

    async fn read_sales(&self) -> CleansingResult<BronzeBatch<RawSalesRecord>> {
        self.read_entity(SilverEntity::SalesDetail, |m, row, n| m.map_sales(row, n))
    }

    async fn read_customer_demographics(
        &self,
    ) -> CleansingResult<BronzeBatch<RawCustomerDemographicRecord>> {
        self.read_entity(SilverEntity::CustomerDemographic, |m, row, n| {
            m.map_customer_demographic(row, n)
        })
    }

    async fn read_locations(&self) -> CleansingResult<BronzeBatch<RawLocationRecord>> {
        self.read_entity(SilverEntity::Location, |m, row, n| m.map_location(row, n))
    }

    async fn read_categories(&self) -> CleansingResult<BronzeBatch<RawCategoryRecord>> {
        self.read_entity(SilverEntity::Category, |m, row, n| m.map_category(row, n))
    }
}

// ==========================================
// InMemoryBronzeSource - 内存铜层数据源
// ==========================================
// 用途: 上游已完成抽取、或测试中直接构造铜层记录
#[derive(Debug, Clone, Default)]
pub struct InMemoryBronzeSource {
    pub customers: Vec<RawCustomerRecord>,
    pub products: Vec<RawProductRecord>,
    pub sales: Vec<RawSalesRecord>,
    pub customer_demographics: Vec<RawCustomerDemographicRecord>,
    pub locations: Vec<RawLocationRecord>,
    pub categories: Vec<RawCategoryRecord>,
}

#[async_trait]
impl BronzeSource for InMemoryBronzeSource {
    async fn read_customers(&self) -> CleansingResult<BronzeBatch<RawCustomerRecord>> {
        Ok(BronzeBatch::new(self.customers.clone()))
    }

    async fn read_products(&self) -> CleansingResult<BronzeBatch<RawProductRecord>> {
        Ok(BronzeBatch::new(self.products.clone()))
    }

    async fn read_sales(&self) -> CleansingResult<BronzeBatch<RawSalesRecord>> {
        Ok(BronzeBatch::new(self.sales.clone()))
    }

    async fn read_customer_demographics(
        &self,
    ) -> CleansingResult<BronzeBatch<RawCustomerDemographicRecord>> {
        Ok(BronzeBatch::new(self.customer_demographics.clone()))
    }

    async fn read_locations(&self) -> CleansingResult<BronzeBatch<RawLocationRecord>> {
        Ok(BronzeBatch::new(self.locations.clone()))
    }

    async fn read_categories(&self) -> CleansingResult<BronzeBatch<RawCategoryRecord>> {
        Ok(BronzeBatch::new(self.categories.clone()))
    }
}
