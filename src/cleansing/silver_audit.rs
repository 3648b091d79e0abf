// ==========================================
// 销售数据仓库 - 银层零行复核
// ==========================================
// 职责: 装载前对银层记录复核不变量，每项检查期望命中 0 行
// 说明: 命中项仅记入批次审计（audit_failures），不阻断写入
// ==========================================

use crate::config::{CleansingConfig, LabelTable};
use crate::domain::{
    AuditFinding, SilverCategory, SilverCustomer, SilverCustomerDemographic, SilverEntity,
    SilverLocation, SilverProduct, SilverSalesDetail,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;

const SAMPLE_LIMIT: usize = 5;

pub struct SilverAuditor {
    config: CleansingConfig,
}

impl SilverAuditor {
    pub fn new(config: CleansingConfig) -> Self {
        Self { config }
    }

    pub fn audit_customers(&self, rows: &[SilverCustomer]) -> Vec<AuditFinding> {
        let entity = SilverEntity::Customer;
        let key = |r: &SilverCustomer| r.cst_id.to_string();
        [
            duplicate_keys(entity, rows, |r| Some(r.cst_id), key),
            check(entity, "cst_key/name 首尾空白", rows, |r| {
                padded(&r.cst_key) || padded(&r.cst_firstname) || padded(&r.cst_lastname)
            }, key),
            check(entity, "cst_marital_status 超出标签集", rows, |r| {
                !in_label_set(&self.config.marital_status, &r.cst_marital_status)
            }, key),
            check(entity, "cst_gndr 超出标签集", rows, |r| {
                !in_label_set(&self.config.crm_gender, &r.cst_gndr)
            }, key),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn audit_products(&self, rows: &[SilverProduct]) -> Vec<AuditFinding> {
        let entity = SilverEntity::Product;
        let key = |r: &SilverProduct| r.prd_id.to_string();
        [
            duplicate_keys(entity, rows, |r| Some(r.prd_id), key),
            check(entity, "prd_cost 为负", rows, |r| r.prd_cost < 0, key),
            check(entity, "prd_nm 首尾空白", rows, |r| padded(&r.prd_nm), key),
            check(entity, "prd_line 超出标签集", rows, |r| {
                !in_label_set(&self.config.product_line, &r.prd_line)
            }, key),
            check(entity, "prd_end_dt 早于 prd_start_dt", rows, |r| {
                matches!((r.prd_start_dt, r.prd_end_dt), (Some(s), Some(e)) if e < s)
            }, key),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn audit_sales(&self, rows: &[SilverSalesDetail]) -> Vec<AuditFinding> {
        let entity = SilverEntity::SalesDetail;
        let key = |r: &SilverSalesDetail| r.sls_ord_num.clone().unwrap_or_default();
        [
            check(entity, "下单日期晚于发货/到期日期", rows, |r| match r.sls_order_dt {
                Some(order) => {
                    r.sls_ship_dt.is_some_and(|d| order > d) || r.sls_due_dt.is_some_and(|d| order > d)
                }
                None => false,
            }, key),
            check(entity, "sls_sales ≠ quantity × price", rows, |r| {
                match (r.sls_sales, r.sls_quantity, r.sls_price) {
                    (Some(s), Some(q), Some(p)) => {
                        s <= 0 || q <= 0 || p <= 0 || q.checked_mul(p) != Some(s)
                    }
                    _ => true,
                }
            }, key),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn audit_customer_demographics(
        &self,
        rows: &[SilverCustomerDemographic],
        today: NaiveDate,
    ) -> Vec<AuditFinding> {
        let entity = SilverEntity::CustomerDemographic;
        let key = |r: &SilverCustomerDemographic| r.cid.clone().unwrap_or_default();
        let prefix = self.config.demographic_id_prefix.as_str();
        [
            check(entity, "bdate 晚于当天", rows, |r| r.bdate.is_some_and(|d| d > today), key),
            check(entity, "gen 超出标签集", rows, |r| {
                !in_label_set(&self.config.erp_gender, &r.gen)
            }, key),
            check(entity, "cid 仍带前缀", rows, |r| {
                !prefix.is_empty() && r.cid.as_deref().is_some_and(|c| c.starts_with(prefix))
            }, key),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn audit_locations(&self, rows: &[SilverLocation]) -> Vec<AuditFinding> {
        let entity = SilverEntity::Location;
        let key = |r: &SilverLocation| r.cid.clone().unwrap_or_default();
        let separator = self.config.location_id_separator;
        [
            check(entity, "cid 仍含分隔符", rows, |r| {
                r.cid.as_deref().is_some_and(|c| c.contains(separator))
            }, key),
            check(entity, "cntry 为空或首尾空白", rows, |r| {
                r.cntry.is_empty() || r.cntry.trim() != r.cntry
            }, key),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn audit_categories(&self, rows: &[SilverCategory]) -> Vec<AuditFinding> {
        let entity = SilverEntity::Category;
        let key = |r: &SilverCategory| r.id.clone().unwrap_or_default();
        check(entity, "字段首尾空白", rows, |r| {
            padded(&r.id) || padded(&r.cat) || padded(&r.subcat) || padded(&r.maintenance)
        }, key)
        .into_iter()
        .collect()
    }
}

fn padded(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| v.trim() != v)
}

/// 透传表的取值集合开放，只要求非空且无首尾空白
fn in_label_set(table: &LabelTable, value: &str) -> bool {
    if table.passthrough_unmapped {
        return !value.is_empty() && value.trim() == value;
    }
    table.label_set().contains(&value)
}

fn check<T>(
    entity: SilverEntity,
    name: &str,
    rows: &[T],
    offends: impl Fn(&T) -> bool,
    key: impl Fn(&T) -> String,
) -> Option<AuditFinding> {
    let offending: Vec<&T> = rows.iter().filter(|r| offends(r)).collect();
    if offending.is_empty() {
        return None;
    }
    Some(AuditFinding {
        entity,
        check: name.to_string(),
        offending_rows: offending.len(),
        sample: offending.iter().take(SAMPLE_LIMIT).map(|r| key(r)).collect(),
    })
}

fn duplicate_keys<T, K: Eq + Hash>(
    entity: SilverEntity,
    rows: &[T],
    key_of: impl Fn(&T) -> Option<K>,
    key: impl Fn(&T) -> String,
) -> Option<AuditFinding> {
    let mut counts: HashMap<K, usize> = HashMap::new();
    for row in rows {
        if let Some(k) = key_of(row) {
            *counts.entry(k).or_insert(0) += 1;
        }
    }
    check(
        entity,
        "自然键不唯一",
        rows,
        |r| key_of(r).is_some_and(|k| counts.get(&k).copied().unwrap_or(0) > 1),
        key,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn auditor() -> SilverAuditor {
        SilverAuditor::new(CleansingConfig::default())
    }

    fn customer(cst_id: i64, marital: &str) -> SilverCustomer {
        SilverCustomer {
            cst_id,
            cst_key: Some(format!("AW{:08}", cst_id)),
            cst_firstname: Some("Jon".to_string()),
            cst_lastname: Some("Yang".to_string()),
            cst_marital_status: marital.to_string(),
            cst_gndr: "Male".to_string(),
            cst_create_date: None,
            dwh_create_date: Utc::now(),
        }
    }

    #[test]
    fn test_clean_customers_have_no_findings() {
        let rows = vec![customer(1, "Single"), customer(2, "n/a")];
        assert!(auditor().audit_customers(&rows).is_empty());
    }

    #[test]
    fn test_duplicate_and_label_findings() {
        let rows = vec![customer(1, "Single"), customer(1, "Married"), customer(2, "S")];

        let findings = auditor().audit_customers(&rows);

        let checks: Vec<_> = findings.iter().map(|f| f.check.as_str()).collect();
        assert_eq!(checks, vec!["自然键不唯一", "cst_marital_status 超出标签集"]);
        assert_eq!(findings[0].offending_rows, 2);
        assert_eq!(findings[1].sample, vec!["2".to_string()]);
    }

    #[test]
    fn test_sales_mismatch_detected() {
        let row = SilverSalesDetail {
            sls_ord_num: Some("SO1".to_string()),
            sls_prd_key: None,
            sls_cust_id: None,
            sls_order_dt: None,
            sls_ship_dt: None,
            sls_due_dt: None,
            sls_sales: Some(90),
            sls_quantity: Some(5),
            sls_price: Some(20),
            dwh_create_date: Utc::now(),
        };

        let findings = auditor().audit_sales(&[row]);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].sample, vec!["SO1".to_string()]);
    }

    #[test]
    fn test_location_passthrough_country_accepted() {
        let row = SilverLocation {
            cid: Some("AW00011000".to_string()),
            cntry: "Australia".to_string(),
            dwh_create_date: Utc::now(),
        };
        assert!(auditor().audit_locations(&[row]).is_empty());
    }
}
