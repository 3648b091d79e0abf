// ==========================================
// 销售数据仓库 - 清洗组件 Trait
// ==========================================
// 职责: 定义铜层 → 银层各阶段接口（不包含实现）
// 流程: 解析 → 映射 → 校验 → 清洗/去重/修复/派生 → 复核 → 整表替换
// ==========================================

use crate::cleansing::error::CleansingResult;
use crate::config::LabelTable;
use crate::domain::{
    DqReport, DqViolation, DuplicateKeyGroup, EntityLoadResult, LoadRunSummary, RawCategoryRecord,
    RawCustomerDemographicRecord, RawCustomerRecord, RawLocationRecord, RawProductRecord,
    RawSalesRecord, RecordProfile, RunContext, SilverEntity, SilverProduct,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// SilverLoader Trait
// ==========================================
// 用途: 银层装载主接口
// 实现者: SilverLoaderImpl
#[async_trait]
pub trait SilverLoader: Send + Sync {
    /// 装载单个实体（读取 → 校验 → 转换 → 复核 → 原子替换）
    ///
    /// # 返回
    /// - Ok(EntityLoadResult): 批次信息 + DQ 汇总 + 复核结果
    /// - Err: 整批 I/O 失败；此时银层表保持上次成功状态
    async fn load_entity(
        &self,
        entity: SilverEntity,
        ctx: &RunContext,
    ) -> CleansingResult<EntityLoadResult>;

    /// 并发装载全部六个实体
    ///
    /// # 说明
    /// - 各实体互不依赖，单个失败不影响其他实体
    async fn load_all(&self, ctx: &RunContext) -> LoadRunSummary;
}

// ==========================================
// BronzeBatch - 铜层读取结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct BronzeBatch<T> {
    pub records: Vec<T>,
    pub rejected: Vec<DqViolation>, // 映射失败的行
    pub warnings: Vec<DqViolation>, // 保留行上的字段级问题
}

impl<T> BronzeBatch<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn source_rows(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

// ==========================================
// BronzeSource Trait
// ==========================================
// 用途: 铜层批量读取（外部采集协作方的交接面）
// 实现者: FileBronzeSource, InMemoryBronzeSource
#[async_trait]
pub trait BronzeSource: Send + Sync {
    async fn read_customers(&self) -> CleansingResult<BronzeBatch<RawCustomerRecord>>;
    async fn read_products(&self) -> CleansingResult<BronzeBatch<RawProductRecord>>;
    async fn read_sales(&self) -> CleansingResult<BronzeBatch<RawSalesRecord>>;
    async fn read_customer_demographics(
        &self,
    ) -> CleansingResult<BronzeBatch<RawCustomerDemographicRecord>>;
    async fn read_locations(&self) -> CleansingResult<BronzeBatch<RawLocationRecord>>;
    async fn read_categories(&self) -> CleansingResult<BronzeBatch<RawCategoryRecord>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>）
    ///
    /// # 说明
    /// - 单元格值保持原样（不 TRIM），首尾空白由校验器识别
    fn parse_to_raw_records(&self, file_path: &Path)
        -> CleansingResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// MappedRow - 单行映射结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow<T> {
    pub record: T,
    pub warnings: Vec<DqViolation>, // 非致命字段问题（如无法解析的日期，已置空）
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 实现者: FieldMapperImpl
// 说明:
// - 键/金额等数值字段转换失败返回 Err，由调用方记为 DqLevel::Error 并剔除该行
// - 日期字段无法解析时置空并附带 DqLevel::Warning，行照常保留
pub trait FieldMapper: Send + Sync {
    fn map_customer(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawCustomerRecord>>;

    fn map_product(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawProductRecord>>;

    fn map_sales(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawSalesRecord>>;

    fn map_customer_demographic(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawCustomerDemographicRecord>>;

    fn map_location(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawLocationRecord>>;

    fn map_category(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawCategoryRecord>>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单字段规整（纯函数、全函数，从不报错）
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 去除首尾空白；已规整输入原样返回
    fn trim(&self, value: &str) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None），非空值 TRIM
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 代码 → 标签（大小写/空白不敏感）
    ///
    /// # 规则
    /// - None / 空白 → table.default
    /// - 已映射 → 标签
    /// - 未映射 → table.default；透传表返回 TRIM 后的原值
    fn code_to_label(&self, code: Option<&str>, table: &LabelTable) -> String;

    /// 若以 prefix 开头则去掉前缀，否则原样返回
    fn strip_prefix(&self, id: &str, prefix: &str) -> String;

    /// 删除全部分隔符
    fn strip_separator(&self, id: &str, separator: char) -> String;

    /// 取前 length 个字符，并在其中将 from 替换为 to
    fn rewrite_separator(&self, value: &str, from: char, to: char, length: usize) -> String;

    /// 拆分复合键：(前缀, 自 offset 起的本地键)
    fn split_key(&self, compound: &str, offset: usize) -> (String, String);

    /// 解析 YYYYMMDD 整数日期
    ///
    /// # 规则
    /// - None、非正数、位数 ≠ 8 → None
    /// - 8 位但非合法日历日（如 20230230）→ None
    fn parse_int_date(&self, value: Option<i64>) -> Option<NaiveDate>;

    /// 晚于 today 的日期置空
    fn future_date_guard(&self, date: Option<NaiveDate>, today: NaiveDate) -> Option<NaiveDate>;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 铜层数据质量校验（只分类，不修改数据）
// 实现者: DqValidatorImpl
pub trait DqValidator: Send + Sync {
    /// 自然键校验：缺失 + 重复分组
    ///
    /// # 参数
    /// - require_unique: 追加型事实表（销售明细）传 false
    fn validate_natural_key(
        &self,
        profiles: &[RecordProfile],
        require_unique: bool,
    ) -> (Vec<DqViolation>, Vec<DuplicateKeyGroup>);

    /// 文本字段首尾空白校验
    fn validate_padding(&self, profile: &RecordProfile) -> Vec<DqViolation>;

    /// 数值范围校验（负数）
    fn validate_ranges(&self, profile: &RecordProfile) -> Vec<DqViolation>;

    /// 整数日期编码校验（非 8 位 / 非正数 / 非法日历日）
    fn validate_int_dates(&self, profile: &RecordProfile) -> Vec<DqViolation>;

    /// 销售明细交叉校验：日期先后 + 金额一致性
    fn validate_sales_consistency(&self, records: &[RawSalesRecord]) -> Vec<DqViolation>;

    /// 生日范围校验（过早或晚于 today）
    fn validate_birthdates(
        &self,
        records: &[RawCustomerDemographicRecord],
        floor: NaiveDate,
        today: NaiveDate,
    ) -> Vec<DqViolation>;

    /// 执行全部通用检查（键 + 空白 + 负值 + 整数日期）
    fn validate_profiles(
        &self,
        profiles: &[RecordProfile],
        require_unique: bool,
    ) -> (Vec<DqViolation>, Vec<DuplicateKeyGroup>) {
        let (mut violations, groups) = self.validate_natural_key(profiles, require_unique);
        for profile in profiles {
            violations.extend(self.validate_padding(profile));
            violations.extend(self.validate_ranges(profile));
            violations.extend(self.validate_int_dates(profile));
        }
        (violations, groups)
    }

    /// 生成 DQ 报告
    fn generate_dq_report(
        &self,
        batch_id: &str,
        entity: SilverEntity,
        total_rows: usize,
        violations: Vec<DqViolation>,
        duplicate_groups: Vec<DuplicateKeyGroup>,
    ) -> DqReport;
}

// ==========================================
// ConsistencyRepairer Trait
// ==========================================
// 实现者: ConsistencyRepairerImpl
pub trait ConsistencyRepairer: Send + Sync {
    /// 销售金额/单价一次性联合修复（均基于修复前原值计算）
    fn repair_sales(
        &self,
        sales: Option<i64>,
        quantity: Option<i64>,
        price: Option<i64>,
    ) -> SalesRepair;
}

/// 销售修复结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesRepair {
    pub sales: Option<i64>,
    pub quantity: Option<i64>,
    pub price: Option<i64>,
    pub sales_repaired: bool,
    pub price_repaired: bool,
}

// ==========================================
// DerivationService Trait
// ==========================================
// 实现者: DerivationServiceImpl
pub trait DerivationService: Send + Sync {
    /// 派生产品有效期结束日
    ///
    /// # 规则
    /// - 按本地产品键分区，按起始日升序
    /// - 结束日 = 下一条起始日 - 1 天；末条为空
    fn derive_product_end_dates(&self, products: &mut [SilverProduct]);
}
