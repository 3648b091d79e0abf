// ==========================================
// 销售数据仓库 - 铜层原始记录
// ==========================================
// 依据: 源系统 CRM / ERP 抽取文件字段表
// 用途: 字段映射产物，一次运行内不可变
// 红线: 不做任何清洗，保留源端原始类型与空白
// ==========================================

use crate::domain::load::SilverEntity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// RecordProfile - 校验视图
// ==========================================
// 用途: 让 DqValidator 以统一方式处理六类实体
#[derive(Debug, Clone, Default)]
pub struct RecordProfile {
    pub row_number: usize,
    pub natural_key: Option<String>,
    pub text_fields: Vec<(&'static str, Option<String>)>,
    pub numeric_fields: Vec<(&'static str, Option<i64>)>,
    pub int_date_fields: Vec<(&'static str, Option<i64>)>,
}

/// 铜层记录公共接口
pub trait BronzeRecord {
    /// 所属实体
    fn entity() -> SilverEntity
    where
        Self: Sized;

    /// 原始文件行号（1 起）
    fn row_number(&self) -> usize;

    /// 生成校验视图
    fn profile(&self) -> RecordProfile;
}

fn text(name: &'static str, value: &Option<String>) -> (&'static str, Option<String>) {
    (name, value.clone())
}

// ==========================================
// RawCustomerRecord - crm_cust_info
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerRecord {
    pub cst_id: Option<i64>,                 // 客户 ID（自然键）
    pub cst_key: Option<String>,             // 客户业务编码
    pub cst_firstname: Option<String>,
    pub cst_lastname: Option<String>,
    pub cst_marital_status: Option<String>,  // 婚姻状况代码（S/M）
    pub cst_gndr: Option<String>,            // 性别代码（F/M）
    pub cst_create_date: Option<NaiveDate>,  // 创建日期（去重时效字段）
    pub row_number: usize,
}

impl BronzeRecord for RawCustomerRecord {
    fn entity() -> SilverEntity {
        SilverEntity::Customer
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn profile(&self) -> RecordProfile {
        RecordProfile {
            row_number: self.row_number,
            natural_key: self.cst_id.map(|id| id.to_string()),
            text_fields: vec![
                text("cst_key", &self.cst_key),
                text("cst_firstname", &self.cst_firstname),
                text("cst_lastname", &self.cst_lastname),
                text("cst_marital_status", &self.cst_marital_status),
                text("cst_gndr", &self.cst_gndr),
            ],
            numeric_fields: Vec::new(),
            int_date_fields: Vec::new(),
        }
    }
}

// ==========================================
// RawProductRecord - crm_prd_info
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProductRecord {
    pub prd_id: Option<i64>,                // 产品 ID（自然键）
    pub prd_key: Option<String>,            // 复合产品键（前 5 位为品类）
    pub prd_nm: Option<String>,
    pub prd_cost: Option<i64>,
    pub prd_line: Option<String>,           // 产品线代码（M/R/S/T）
    pub prd_start_dt: Option<NaiveDate>,
    pub prd_end_dt: Option<NaiveDate>,      // 源端结束日期（不可信，银层重新派生）
    pub row_number: usize,
}

impl BronzeRecord for RawProductRecord {
    fn entity() -> SilverEntity {
        SilverEntity::Product
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn profile(&self) -> RecordProfile {
        RecordProfile {
            row_number: self.row_number,
            natural_key: self.prd_id.map(|id| id.to_string()),
            text_fields: vec![
                text("prd_key", &self.prd_key),
                text("prd_nm", &self.prd_nm),
                text("prd_line", &self.prd_line),
            ],
            numeric_fields: vec![("prd_cost", self.prd_cost)],
            int_date_fields: Vec::new(),
        }
    }
}

// ==========================================
// RawSalesRecord - crm_sales_details
// ==========================================
// 说明: 订单号非唯一（追加型事实表），不做去重
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSalesRecord {
    pub sls_ord_num: Option<String>,
    pub sls_prd_key: Option<String>,
    pub sls_cust_id: Option<i64>,
    pub sls_order_dt: Option<i64>,  // YYYYMMDD 整数编码
    pub sls_ship_dt: Option<i64>,
    pub sls_due_dt: Option<i64>,
    pub sls_sales: Option<i64>,
    pub sls_quantity: Option<i64>,
    pub sls_price: Option<i64>,
    pub row_number: usize,
}

impl BronzeRecord for RawSalesRecord {
    fn entity() -> SilverEntity {
        SilverEntity::SalesDetail
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn profile(&self) -> RecordProfile {
        RecordProfile {
            row_number: self.row_number,
            natural_key: self.sls_ord_num.clone(),
            text_fields: vec![
                text("sls_ord_num", &self.sls_ord_num),
                text("sls_prd_key", &self.sls_prd_key),
            ],
            numeric_fields: vec![
                ("sls_sales", self.sls_sales),
                ("sls_quantity", self.sls_quantity),
                ("sls_price", self.sls_price),
            ],
            int_date_fields: vec![
                ("sls_order_dt", self.sls_order_dt),
                ("sls_ship_dt", self.sls_ship_dt),
                ("sls_due_dt", self.sls_due_dt),
            ],
        }
    }
}

// ==========================================
// RawCustomerDemographicRecord - erp_cust_az12
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerDemographicRecord {
    pub cid: Option<String>,          // 可能带 "NAS" 前缀
    pub bdate: Option<NaiveDate>,
    pub gen: Option<String>,          // 性别同义词（F/FEMALE/M/MALE）
    pub row_number: usize,
}

impl BronzeRecord for RawCustomerDemographicRecord {
    fn entity() -> SilverEntity {
        SilverEntity::CustomerDemographic
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn profile(&self) -> RecordProfile {
        RecordProfile {
            row_number: self.row_number,
            natural_key: self.cid.clone(),
            text_fields: vec![text("cid", &self.cid), text("gen", &self.gen)],
            numeric_fields: Vec::new(),
            int_date_fields: Vec::new(),
        }
    }
}

// ==========================================
// RawLocationRecord - erp_loc_a101
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocationRecord {
    pub cid: Option<String>,    // 带 '-' 分隔符
    pub cntry: Option<String>,  // 国家代码/别名
    pub row_number: usize,
}

impl BronzeRecord for RawLocationRecord {
    fn entity() -> SilverEntity {
        SilverEntity::Location
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn profile(&self) -> RecordProfile {
        RecordProfile {
            row_number: self.row_number,
            natural_key: self.cid.clone(),
            text_fields: vec![text("cid", &self.cid), text("cntry", &self.cntry)],
            numeric_fields: Vec::new(),
            int_date_fields: Vec::new(),
        }
    }
}

// ==========================================
// RawCategoryRecord - erp_px_cat_g1v2
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCategoryRecord {
    pub id: Option<String>,
    pub cat: Option<String>,
    pub subcat: Option<String>,
    pub maintenance: Option<String>,
    pub row_number: usize,
}

impl BronzeRecord for RawCategoryRecord {
    fn entity() -> SilverEntity {
        SilverEntity::Category
    }

    fn row_number(&self) -> usize {
        self.row_number
    }

    fn profile(&self) -> RecordProfile {
        RecordProfile {
            row_number: self.row_number,
            natural_key: self.id.clone(),
            text_fields: vec![
                text("id", &self.id),
                text("cat", &self.cat),
                text("subcat", &self.subcat),
                text("maintenance", &self.maintenance),
            ],
            numeric_fields: Vec::new(),
            int_date_fields: Vec::new(),
        }
    }
}
