// ==========================================
// 销售数据仓库 - 实体转换管道
// ==========================================
// 职责: 铜层记录 → 银层记录（六个实体各一条管道）
// 流程: 去重（客户/产品）→ 字段规整 → 修复（销售）→ 派生（产品）
// 红线: 纯计算，不访问数据库；同输入 + 同 RunContext → 同输出
// ==========================================

use crate::cleansing::cleansing_trait::{ConsistencyRepairer, DataCleaner, DerivationService};
use crate::cleansing::consistency_repairer::ConsistencyRepairerImpl;
use crate::cleansing::data_cleaner::DataCleanerImpl;
use crate::cleansing::deduplicator::Deduplicator;
use crate::cleansing::derivation::DerivationServiceImpl;
use crate::config::CleansingConfig;
use crate::domain::{
    RawCategoryRecord, RawCustomerDemographicRecord, RawCustomerRecord, RawLocationRecord,
    RawProductRecord, RawSalesRecord, RunContext, SilverCategory, SilverCustomer,
    SilverCustomerDemographic, SilverLocation, SilverProduct, SilverSalesDetail,
};

/// 单实体转换结果
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput<T> {
    pub rows: Vec<T>,
    pub dropped_rows: usize,  // 去重淘汰 + 自然键缺失
    pub repaired_rows: usize, // 发生值修复的行（销售金额/单价）
}

impl<T> TransformOutput<T> {
    fn passthrough(rows: Vec<T>) -> Self {
        Self {
            rows,
            dropped_rows: 0,
            repaired_rows: 0,
        }
    }
}

// ==========================================
// SilverTransformer
// ==========================================
pub struct SilverTransformer {
    config: CleansingConfig,
    cleaner: Box<dyn DataCleaner>,
    repairer: Box<dyn ConsistencyRepairer>,
    derivation: Box<dyn DerivationService>,
    deduplicator: Deduplicator,
}

impl SilverTransformer {
    pub fn new(
        config: CleansingConfig,
        cleaner: Box<dyn DataCleaner>,
        repairer: Box<dyn ConsistencyRepairer>,
        derivation: Box<dyn DerivationService>,
    ) -> Self {
        Self {
            config,
            cleaner,
            repairer,
            derivation,
            deduplicator: Deduplicator,
        }
    }

    /// 使用默认组件
    pub fn with_config(config: CleansingConfig) -> Self {
        Self::new(
            config,
            Box::new(DataCleanerImpl),
            Box::new(ConsistencyRepairerImpl),
            Box::new(DerivationServiceImpl),
        )
    }

    pub fn config(&self) -> &CleansingConfig {
        &self.config
    }

    // ===== crm_cust_info =====

    /// 客户管道
    ///
    /// # 规则
    /// - cst_id 为空剔除；同 cst_id 保留 cst_create_date 最新者
    /// - 姓名/客户编码 TRIM
    /// - 婚姻状况 S/M → Single/Married，其余 n/a
    /// - 性别 F/M → Female/Male，其余 Other
    pub fn transform_customers(
        &self,
        records: Vec<RawCustomerRecord>,
        ctx: &RunContext,
    ) -> TransformOutput<SilverCustomer> {
        let outcome =
            self.deduplicator
                .latest_per_key(records, |r| r.cst_id, |r| r.cst_create_date);
        let dropped_rows = outcome.dropped();

        let rows = outcome
            .kept
            .into_iter()
            .filter_map(|r| {
                Some(SilverCustomer {
                    cst_id: r.cst_id?,
                    cst_key: self.cleaner.normalize_null(r.cst_key),
                    cst_firstname: self.cleaner.normalize_null(r.cst_firstname),
                    cst_lastname: self.cleaner.normalize_null(r.cst_lastname),
                    cst_marital_status: self
                        .cleaner
                        .code_to_label(r.cst_marital_status.as_deref(), &self.config.marital_status),
                    cst_gndr: self
                        .cleaner
                        .code_to_label(r.cst_gndr.as_deref(), &self.config.crm_gender),
                    cst_create_date: r.cst_create_date,
                    dwh_create_date: ctx.loaded_at,
                })
            })
            .collect();

        TransformOutput {
            rows,
            dropped_rows,
            repaired_rows: 0,
        }
    }

    // ===== crm_prd_info =====

    /// 产品管道
    ///
    /// # 规则
    /// - 同 prd_id 保留 prd_start_dt 最新者
    /// - cat_id = 复合键前 N 位，'-' → '_'
    /// - prd_key = 复合键自 offset 起的本地键
    /// - prd_cost 空值 → 默认成本
    /// - prd_line M/R/S/T → Mountain/Road/Other Sales/Touring，其余 n/a
    /// - prd_end_dt 重新派生
    pub fn transform_products(
        &self,
        records: Vec<RawProductRecord>,
        ctx: &RunContext,
    ) -> TransformOutput<SilverProduct> {
        let outcome = self
            .deduplicator
            .latest_per_key(records, |r| r.prd_id, |r| r.prd_start_dt);
        let dropped_rows = outcome.dropped();

        let mut rows: Vec<SilverProduct> = outcome
            .kept
            .into_iter()
            .filter_map(|r| {
                let compound = self.cleaner.normalize_null(r.prd_key);
                let (cat_id, prd_key) = match compound.as_deref() {
                    Some(key) => {
                        let cat = self.cleaner.rewrite_separator(
                            key,
                            self.config.category_separator_from,
                            self.config.category_separator_to,
                            self.config.category_key_length,
                        );
                        let (_, local) = self.cleaner.split_key(key, self.config.product_key_offset);
                        (non_empty(cat), non_empty(local))
                    }
                    None => (None, None),
                };

                Some(SilverProduct {
                    prd_id: r.prd_id?,
                    cat_id,
                    prd_key,
                    prd_nm: self.cleaner.normalize_null(r.prd_nm),
                    prd_cost: r.prd_cost.unwrap_or(self.config.default_product_cost),
                    prd_line: self
                        .cleaner
                        .code_to_label(r.prd_line.as_deref(), &self.config.product_line),
                    prd_start_dt: r.prd_start_dt,
                    prd_end_dt: None,
                    dwh_create_date: ctx.loaded_at,
                })
            })
            .collect();

        self.derivation.derive_product_end_dates(&mut rows);

        TransformOutput {
            rows,
            dropped_rows,
            repaired_rows: 0,
        }
    }

    // ===== crm_sales_details =====

    /// 销售明细管道
    ///
    /// # 规则
    /// - 整数日期 → 日期，非法编码置空
    /// - 金额/单价联合修复，数量透传
    /// - 不去重
    pub fn transform_sales(
        &self,
        records: Vec<RawSalesRecord>,
        ctx: &RunContext,
    ) -> TransformOutput<SilverSalesDetail> {
        let mut repaired_rows = 0;

        let rows = records
            .into_iter()
            .map(|r| {
                let repair = self
                    .repairer
                    .repair_sales(r.sls_sales, r.sls_quantity, r.sls_price);
                if repair.sales_repaired || repair.price_repaired {
                    repaired_rows += 1;
                }

                SilverSalesDetail {
                    sls_ord_num: self.cleaner.normalize_null(r.sls_ord_num),
                    sls_prd_key: self.cleaner.normalize_null(r.sls_prd_key),
                    sls_cust_id: r.sls_cust_id,
                    sls_order_dt: self.cleaner.parse_int_date(r.sls_order_dt),
                    sls_ship_dt: self.cleaner.parse_int_date(r.sls_ship_dt),
                    sls_due_dt: self.cleaner.parse_int_date(r.sls_due_dt),
                    sls_sales: repair.sales,
                    sls_quantity: repair.quantity,
                    sls_price: repair.price,
                    dwh_create_date: ctx.loaded_at,
                }
            })
            .collect();

        TransformOutput {
            rows,
            dropped_rows: 0,
            repaired_rows,
        }
    }

    // ===== erp_cust_az12 =====

    /// 客户人口统计管道
    ///
    /// # 规则
    /// - cid 去除 "NAS" 前缀
    /// - 晚于当天的生日置空
    /// - 性别同义词归一，其余 Other
    pub fn transform_customer_demographics(
        &self,
        records: Vec<RawCustomerDemographicRecord>,
        ctx: &RunContext,
    ) -> TransformOutput<SilverCustomerDemographic> {
        let rows = records
            .into_iter()
            .map(|r| SilverCustomerDemographic {
                cid: self
                    .cleaner
                    .normalize_null(r.cid)
                    .map(|id| self.cleaner.strip_prefix(&id, &self.config.demographic_id_prefix))
                    .and_then(non_empty),
                bdate: self.cleaner.future_date_guard(r.bdate, ctx.today),
                gen: self
                    .cleaner
                    .code_to_label(r.gen.as_deref(), &self.config.erp_gender),
                dwh_create_date: ctx.loaded_at,
            })
            .collect();

        TransformOutput::passthrough(rows)
    }

    // ===== erp_loc_a101 =====

    /// 地区管道
    ///
    /// # 规则
    /// - cid 删除 '-'
    /// - DE → Germany，US/USA → United States，空 → n/a，其余 TRIM 透传
    pub fn transform_locations(
        &self,
        records: Vec<RawLocationRecord>,
        ctx: &RunContext,
    ) -> TransformOutput<SilverLocation> {
        let rows = records
            .into_iter()
            .map(|r| SilverLocation {
                cid: self
                    .cleaner
                    .normalize_null(r.cid)
                    .map(|id| self.cleaner.strip_separator(&id, self.config.location_id_separator))
                    .and_then(non_empty),
                cntry: self
                    .cleaner
                    .code_to_label(r.cntry.as_deref(), &self.config.country),
                dwh_create_date: ctx.loaded_at,
            })
            .collect();

        TransformOutput::passthrough(rows)
    }

    // ===== erp_px_cat_g1v2 =====

    /// 品类管道（全部字段 TRIM）
    pub fn transform_categories(
        &self,
        records: Vec<RawCategoryRecord>,
        ctx: &RunContext,
    ) -> TransformOutput<SilverCategory> {
        let rows = records
            .into_iter()
            .map(|r| SilverCategory {
                id: self.cleaner.normalize_null(r.id),
                cat: self.cleaner.normalize_null(r.cat),
                subcat: self.cleaner.normalize_null(r.subcat),
                maintenance: self.cleaner.normalize_null(r.maintenance),
                dwh_create_date: ctx.loaded_at,
            })
            .collect();

        TransformOutput::passthrough(rows)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn ctx() -> RunContext {
        RunContext::fixed("B-TEST", Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
    }

    fn transformer() -> SilverTransformer {
        SilverTransformer::with_config(CleansingConfig::default())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_customer_pipeline() {
        let records = vec![
            RawCustomerRecord {
                cst_id: Some(29466),
                cst_key: Some("AW00029466".into()),
                cst_firstname: Some(" Lance".into()),
                cst_lastname: Some("Jimenez ".into()),
                cst_marital_status: Some("M".into()),
                cst_gndr: None,
                cst_create_date: Some(ymd(2026, 1, 25)),
                row_number: 2,
            },
            RawCustomerRecord {
                cst_id: Some(29466),
                cst_firstname: Some("Lance".into()),
                cst_marital_status: Some("s".into()),
                cst_gndr: Some("M".into()),
                cst_create_date: Some(ymd(2026, 1, 27)),
                row_number: 3,
                ..Default::default()
            },
            RawCustomerRecord {
                cst_id: None,
                cst_create_date: Some(ymd(2026, 1, 27)),
                row_number: 4,
                ..Default::default()
            },
        ];

        let out = transformer().transform_customers(records, &ctx());

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.dropped_rows, 2);
        let c = &out.rows[0];
        assert_eq!(c.cst_create_date, Some(ymd(2026, 1, 27)));
        assert_eq!(c.cst_marital_status, "Single");
        assert_eq!(c.cst_gndr, "Male");
        assert_eq!(c.cst_key, None);
        assert_eq!(c.dwh_create_date, ctx().loaded_at);
    }

    #[test]
    fn test_product_pipeline_keys_cost_line_and_end_dates() {
        let product = |id: i64, key: &str, start: NaiveDate, cost: Option<i64>, line: Option<&str>| {
            RawProductRecord {
                prd_id: Some(id),
                prd_key: Some(key.into()),
                prd_nm: Some("HL Road Frame - Black- 58".into()),
                prd_cost: cost,
                prd_line: line.map(Into::into),
                prd_start_dt: Some(start),
                prd_end_dt: Some(ymd(2000, 1, 1)),
                row_number: id as usize,
            }
        };
        let records = vec![
            product(212, "CO-RF-FR-R92B-58", ymd(2012, 7, 1), Some(13), Some("R ")),
            product(211, "CO-RF-FR-R92B-58", ymd(2011, 7, 1), None, Some("X")),
            product(213, "CO-RF-FR-R92B-58", ymd(2013, 7, 1), Some(15), None),
        ];

        let out = transformer().transform_products(records, &ctx());

        assert_eq!(out.rows.len(), 3);
        let first = &out.rows[0];
        assert_eq!(first.cat_id.as_deref(), Some("CO_RF"));
        assert_eq!(first.prd_key.as_deref(), Some("FR-R92B-58"));
        assert_eq!(first.prd_line, "Road");
        assert_eq!(first.prd_end_dt, Some(ymd(2013, 6, 30)));

        let second = &out.rows[1];
        assert_eq!(second.prd_cost, 0);
        assert_eq!(second.prd_line, "n/a");
        assert_eq!(second.prd_end_dt, Some(ymd(2012, 6, 30)));

        assert_eq!(out.rows[2].prd_end_dt, None);
    }

    #[test]
    fn test_product_short_key_has_no_local_key() {
        let records = vec![RawProductRecord {
            prd_id: Some(1),
            prd_key: Some("AB".into()),
            row_number: 2,
            ..Default::default()
        }];

        let out = transformer().transform_products(records, &ctx());

        assert_eq!(out.rows[0].cat_id.as_deref(), Some("AB"));
        assert_eq!(out.rows[0].prd_key, None);
    }

    #[test]
    fn test_sales_pipeline_repairs_and_dates() {
        let records = vec![
            RawSalesRecord {
                sls_ord_num: Some("SO43697".into()),
                sls_prd_key: Some("BK-R93R-62".into()),
                sls_cust_id: Some(21768),
                sls_order_dt: Some(20101229),
                sls_ship_dt: Some(0),
                sls_due_dt: Some(20230230),
                sls_sales: Some(0),
                sls_quantity: Some(5),
                sls_price: Some(20),
                row_number: 2,
            },
            RawSalesRecord {
                sls_ord_num: Some("SO43697".into()),
                sls_sales: Some(100),
                sls_quantity: Some(5),
                sls_price: None,
                row_number: 3,
                ..Default::default()
            },
        ];

        let out = transformer().transform_sales(records, &ctx());

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.repaired_rows, 2);
        let s = &out.rows[0];
        assert_eq!(s.sls_order_dt, Some(ymd(2010, 12, 29)));
        assert_eq!(s.sls_ship_dt, None);
        assert_eq!(s.sls_due_dt, None);
        assert_eq!((s.sls_sales, s.sls_quantity, s.sls_price), (Some(100), Some(5), Some(20)));
        let s = &out.rows[1];
        assert_eq!((s.sls_sales, s.sls_quantity, s.sls_price), (Some(100), Some(5), Some(20)));
    }

    #[test]
    fn test_demographics_pipeline() {
        let records = vec![
            RawCustomerDemographicRecord {
                cid: Some("NASAW00011000".into()),
                bdate: Some(ymd(2050, 1, 1)),
                gen: Some(" female".into()),
                row_number: 2,
            },
            RawCustomerDemographicRecord {
                cid: Some("AW00011001".into()),
                bdate: Some(ymd(1971, 10, 6)),
                gen: Some("".into()),
                row_number: 3,
            },
        ];

        let out = transformer().transform_customer_demographics(records, &ctx());

        assert_eq!(out.rows[0].cid.as_deref(), Some("AW00011000"));
        assert_eq!(out.rows[0].bdate, None);
        assert_eq!(out.rows[0].gen, "Female");
        assert_eq!(out.rows[1].cid.as_deref(), Some("AW00011001"));
        assert_eq!(out.rows[1].bdate, Some(ymd(1971, 10, 6)));
        assert_eq!(out.rows[1].gen, "Other");
    }

    #[test]
    fn test_location_pipeline() {
        let location = |cid: &str, cntry: Option<&str>| RawLocationRecord {
            cid: Some(cid.into()),
            cntry: cntry.map(Into::into),
            row_number: 2,
        };
        let records = vec![
            location("AW-00011000", Some("DE")),
            location("AW-00011001", Some("USA")),
            location("AW-00011002", Some("  ")),
            location("AW-00011003", Some(" Australia ")),
            location("AW-00011004", None),
        ];

        let out = transformer().transform_locations(records, &ctx());

        let countries: Vec<_> = out.rows.iter().map(|r| r.cntry.as_str()).collect();
        assert_eq!(countries, vec!["Germany", "United States", "n/a", "Australia", "n/a"]);
        assert_eq!(out.rows[0].cid.as_deref(), Some("AW00011000"));
    }

    #[test]
    fn test_category_pipeline_trims() {
        let records = vec![RawCategoryRecord {
            id: Some(" AC_BR".into()),
            cat: Some("Accessories ".into()),
            subcat: Some("Bike Racks".into()),
            maintenance: Some(" Yes ".into()),
            row_number: 2,
        }];

        let out = transformer().transform_categories(records, &ctx());

        let c = &out.rows[0];
        assert_eq!(c.id.as_deref(), Some("AC_BR"));
        assert_eq!(c.cat.as_deref(), Some("Accessories"));
        assert_eq!(c.maintenance.as_deref(), Some("Yes"));
    }
}
