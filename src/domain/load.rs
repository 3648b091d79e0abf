// ==========================================
// 销售数据仓库 - 装载批次模型
// ==========================================
// 依据: 银层装载过程（整表截断 + 重新插入）
// 用途: 运行上下文 / 批次审计 / 返回结果
// ==========================================

use crate::domain::dq::{AuditFinding, DqSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ==========================================
// SilverEntity - 银层实体枚举
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SilverEntity {
    Customer,
    Product,
    SalesDetail,
    CustomerDemographic,
    Location,
    Category,
}

impl SilverEntity {
    /// 全部实体（固定顺序）
    pub const ALL: [SilverEntity; 6] = [
        SilverEntity::Customer,
        SilverEntity::Product,
        SilverEntity::SalesDetail,
        SilverEntity::CustomerDemographic,
        SilverEntity::Location,
        SilverEntity::Category,
    ];

    /// 银层表名
    pub fn table_name(&self) -> &'static str {
        match self {
            SilverEntity::Customer => "crm_cust_info",
            SilverEntity::Product => "crm_prd_info",
            SilverEntity::SalesDetail => "crm_sales_details",
            SilverEntity::CustomerDemographic => "erp_cust_az12",
            SilverEntity::Location => "erp_loc_a101",
            SilverEntity::Category => "erp_px_cat_g1v2",
        }
    }

    /// 自然键列名
    pub fn natural_key_column(&self) -> &'static str {
        match self {
            SilverEntity::Customer => "cst_id",
            SilverEntity::Product => "prd_id",
            SilverEntity::SalesDetail => "sls_ord_num",
            SilverEntity::CustomerDemographic | SilverEntity::Location => "cid",
            SilverEntity::Category => "id",
        }
    }

    /// 铜层源文件（相对 bronze 根目录，不含扩展名）
    pub fn source_file_stem(&self) -> &'static str {
        match self {
            SilverEntity::Customer => "source_crm/cust_info",
            SilverEntity::Product => "source_crm/prd_info",
            SilverEntity::SalesDetail => "source_crm/sales_details",
            SilverEntity::CustomerDemographic => "source_erp/CUST_AZ12",
            SilverEntity::Location => "source_erp/LOC_A101",
            SilverEntity::Category => "source_erp/PX_CAT_G1V2",
        }
    }

    /// 是否按自然键去重
    pub fn is_deduplicated(&self) -> bool {
        matches!(self, SilverEntity::Customer | SilverEntity::Product)
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.table_name() == name)
    }
}

impl fmt::Display for SilverEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

// ==========================================
// RunContext - 单次运行上下文
// ==========================================
// 说明: today / loaded_at 由外部注入，保证同输入重复运行结果一致
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub batch_id: String,
    pub today: NaiveDate,
    pub loaded_at: DateTime<Utc>,
}

impl RunContext {
    /// 以当前时间创建上下文
    pub fn now() -> Self {
        let loaded_at = Utc::now();
        Self {
            batch_id: Uuid::new_v4().to_string(),
            today: loaded_at.date_naive(),
            loaded_at,
        }
    }

    /// 固定时钟（测试/重放）
    pub fn fixed(batch_id: &str, loaded_at: DateTime<Utc>) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            today: loaded_at.date_naive(),
            loaded_at,
        }
    }
}

// ==========================================
// LoadBatch - 装载批次审计记录
// ==========================================
// 对齐: silver_load_batch 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBatch {
    pub batch_id: String,
    pub entity: SilverEntity,
    pub source_rows: i64,     // 铜层行数（含映射失败行）
    pub rejected_rows: i64,   // 映射失败被剔除
    pub dropped_rows: i64,    // 去重淘汰 / 自然键缺失
    pub loaded_rows: i64,     // 写入银层行数
    pub warning_count: i64,
    pub conflict_count: i64,
    pub audit_failures: i64,  // 零行检查未通过项数
    pub loaded_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub dq_report_json: Option<String>,
}

// ==========================================
// EntityLoadResult - 单实体装载结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityLoadResult {
    pub batch: LoadBatch,
    pub summary: DqSummary,
    pub audit_findings: Vec<AuditFinding>,
    pub batch_recorded: bool, // silver_load_batch 审计记录是否写入成功
    pub elapsed_time: Duration,
}

// ==========================================
// LoadRunSummary - 全量运行结果
// ==========================================
#[derive(Debug, Clone)]
pub struct LoadRunSummary {
    pub batch_id: String,
    pub results: Vec<(SilverEntity, Result<EntityLoadResult, String>)>,
    pub elapsed_time: Duration,
}

impl LoadRunSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn result_for(&self, entity: SilverEntity) -> Option<&Result<EntityLoadResult, String>> {
        self.results
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_table_names_roundtrip() {
        for entity in SilverEntity::ALL {
            assert_eq!(SilverEntity::from_table_name(entity.table_name()), Some(entity));
        }
        assert_eq!(SilverEntity::from_table_name("gold_dim_customers"), None);
    }

    #[test]
    fn test_only_customer_and_product_deduplicated() {
        let dedup: Vec<_> = SilverEntity::ALL
            .into_iter()
            .filter(|e| e.is_deduplicated())
            .collect();
        assert_eq!(dedup, vec![SilverEntity::Customer, SilverEntity::Product]);
    }

    #[test]
    fn test_fixed_context_derives_today() {
        let at = chrono::DateTime::parse_from_rfc3339("2024-03-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ctx = RunContext::fixed("B1", at);
        assert_eq!(ctx.today, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }
}
