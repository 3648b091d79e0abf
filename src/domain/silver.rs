// ==========================================
// 销售数据仓库 - 银层清洗记录
// ==========================================
// 依据: 银层表结构 silver.crm_* / silver.erp_*
// 用途: 清洗管道输出，整表替换写入
// 红线: 文本字段无首尾空白；枚举字段取值于标签集
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// SilverCustomer - silver.crm_cust_info
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverCustomer {
    pub cst_id: i64,                         // 自然键（去重后唯一且非空）
    pub cst_key: Option<String>,
    pub cst_firstname: Option<String>,
    pub cst_lastname: Option<String>,
    pub cst_marital_status: String,          // Single / Married / n/a
    pub cst_gndr: String,                    // Female / Male / Other
    pub cst_create_date: Option<NaiveDate>,
    pub dwh_create_date: DateTime<Utc>,      // 装载时间戳
}

// ==========================================
// SilverProduct - silver.crm_prd_info
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverProduct {
    pub prd_id: i64,
    pub cat_id: Option<String>,              // 由复合键前 5 位派生（'-' → '_'）
    pub prd_key: Option<String>,             // 本地产品键（复合键第 7 位起）
    pub prd_nm: Option<String>,
    pub prd_cost: i64,                       // 空值默认 0
    pub prd_line: String,                    // Mountain / Road / Other Sales / Touring / n/a
    pub prd_start_dt: Option<NaiveDate>,
    pub prd_end_dt: Option<NaiveDate>,       // 派生：下一条起始日 - 1 天，末条为空
    pub dwh_create_date: DateTime<Utc>,
}

// ==========================================
// SilverSalesDetail - silver.crm_sales_details
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverSalesDetail {
    pub sls_ord_num: Option<String>,
    pub sls_prd_key: Option<String>,
    pub sls_cust_id: Option<i64>,
    pub sls_order_dt: Option<NaiveDate>,     // 非法编码 → NULL（未知，而非错误）
    pub sls_ship_dt: Option<NaiveDate>,
    pub sls_due_dt: Option<NaiveDate>,
    pub sls_sales: Option<i64>,              // 修复后 = quantity × price
    pub sls_quantity: Option<i64>,           // 视为事实，原样透传
    pub sls_price: Option<i64>,
    pub dwh_create_date: DateTime<Utc>,
}

// ==========================================
// SilverCustomerDemographic - silver.erp_cust_az12
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverCustomerDemographic {
    pub cid: Option<String>,                 // 已去除 "NAS" 前缀
    pub bdate: Option<NaiveDate>,            // 未来日期置空
    pub gen: String,                         // Female / Male / Other
    pub dwh_create_date: DateTime<Utc>,
}

// ==========================================
// SilverLocation - silver.erp_loc_a101
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverLocation {
    pub cid: Option<String>,                 // 已去除 '-'
    pub cntry: String,                       // 规范国家名，空值 → n/a
    pub dwh_create_date: DateTime<Utc>,
}

// ==========================================
// SilverCategory - silver.erp_px_cat_g1v2
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverCategory {
    pub id: Option<String>,
    pub cat: Option<String>,
    pub subcat: Option<String>,
    pub maintenance: Option<String>,
    pub dwh_create_date: DateTime<Utc>,
}
