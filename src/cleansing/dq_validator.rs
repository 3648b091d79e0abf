// ==========================================
// 销售数据仓库 - 数据质量校验器实现
// ==========================================
// 依据: 铜层质量检查（主键唯一 / 首尾空白 / 负值 / 整数日期 / 销售一致性 / 生日范围）
// 职责: 对铜层记录分级（Error/Warning/Info/Conflict），生成 DQ 报告
// 红线: 只分类，不修改数据
// ==========================================

use crate::cleansing::cleansing_trait::{DataCleaner as _, DqValidator as DqValidatorTrait};
use crate::cleansing::data_cleaner::DataCleanerImpl;
use crate::domain::{
    DqLevel, DqReport, DqSummary, DqViolation, DuplicateKeyGroup, RawCustomerDemographicRecord,
    RawSalesRecord, RecordProfile, SilverEntity,
};
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct DqValidatorImpl;

impl DqValidatorTrait for DqValidatorImpl {
    fn validate_natural_key(
        &self,
        profiles: &[RecordProfile],
        require_unique: bool,
    ) -> (Vec<DqViolation>, Vec<DuplicateKeyGroup>) {
        let mut violations = Vec::new();
        let mut groups: Vec<DuplicateKeyGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for profile in profiles {
            let key = profile
                .natural_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty());

            let key = match key {
                Some(k) => k,
                None => {
                    // 去重实体缺键即剔除；事实表仅告警
                    let level = if require_unique {
                        DqLevel::Error
                    } else {
                        DqLevel::Warning
                    };
                    violations.push(DqViolation::new(
                        profile.row_number,
                        None,
                        level,
                        "natural_key",
                        "自然键缺失",
                    ));
                    continue;
                }
            };

            if !require_unique {
                continue;
            }

            match index.get(key) {
                Some(&group_idx) => {
                    groups[group_idx].row_numbers.push(profile.row_number);
                    violations.push(DqViolation::new(
                        profile.row_number,
                        Some(key.to_string()),
                        DqLevel::Conflict,
                        "natural_key",
                        format!("自然键重复: {}", key),
                    ));
                }
                None => {
                    index.insert(key.to_string(), groups.len());
                    groups.push(DuplicateKeyGroup {
                        natural_key: key.to_string(),
                        row_numbers: vec![profile.row_number],
                    });
                }
            }
        }

        // 只保留真正重复的分组
        groups.retain(|g| g.row_numbers.len() > 1);
        (violations, groups)
    }

    fn validate_padding(&self, profile: &RecordProfile) -> Vec<DqViolation> {
        profile
            .text_fields
            .iter()
            .filter_map(|(field, value)| {
                let v = value.as_deref()?;
                if v.trim() != v {
                    Some(DqViolation::new(
                        profile.row_number,
                        profile.natural_key.clone(),
                        DqLevel::Warning,
                        field,
                        format!("存在首尾空白: {:?}", v),
                    ))
                } else {
                    None
                }
            })
            .collect()
    }

    fn validate_ranges(&self, profile: &RecordProfile) -> Vec<DqViolation> {
        profile
            .numeric_fields
            .iter()
            .filter_map(|(field, value)| match value {
                Some(n) if *n < 0 => Some(DqViolation::new(
                    profile.row_number,
                    profile.natural_key.clone(),
                    DqLevel::Warning,
                    field,
                    format!("负值: {}", n),
                )),
                _ => None,
            })
            .collect()
    }

    fn validate_int_dates(&self, profile: &RecordProfile) -> Vec<DqViolation> {
        let cleaner = DataCleanerImpl;
        profile
            .int_date_fields
            .iter()
            .filter_map(|(field, value)| {
                let n = (*value)?;
                if cleaner.parse_int_date(Some(n)).is_some() {
                    return None;
                }
                let message = if n <= 0 {
                    format!("日期编码非正数: {}", n)
                } else if n.to_string().len() != 8 {
                    format!("日期编码非 8 位: {}", n)
                } else {
                    format!("日期编码非法日历日: {}", n)
                };
                Some(DqViolation::new(
                    profile.row_number,
                    profile.natural_key.clone(),
                    DqLevel::Warning,
                    field,
                    message,
                ))
            })
            .collect()
    }

    fn validate_sales_consistency(&self, records: &[RawSalesRecord]) -> Vec<DqViolation> {
        let cleaner = DataCleanerImpl;
        let mut violations = Vec::new();

        for record in records {
            let key = record.sls_ord_num.clone();
            let order = cleaner.parse_int_date(record.sls_order_dt);
            let ship = cleaner.parse_int_date(record.sls_ship_dt);
            let due = cleaner.parse_int_date(record.sls_due_dt);

            if let Some(order) = order {
                let late_ship = ship.is_some_and(|s| order > s);
                let late_due = due.is_some_and(|d| order > d);
                if late_ship || late_due {
                    violations.push(DqViolation::new(
                        record.row_number,
                        key.clone(),
                        DqLevel::Warning,
                        "sls_order_dt",
                        "下单日期晚于发货日期或到期日期",
                    ));
                }
            }

            let positive = |v: Option<i64>| v.filter(|n| *n > 0);
            let consistent = match (
                positive(record.sls_sales),
                positive(record.sls_quantity),
                positive(record.sls_price),
            ) {
                (Some(s), Some(q), Some(p)) => q.checked_mul(p) == Some(s),
                _ => false,
            };
            if !consistent {
                violations.push(DqViolation::new(
                    record.row_number,
                    key,
                    DqLevel::Warning,
                    "sls_sales",
                    format!(
                        "销售额与数量×单价不一致或缺失/非正 (sales={:?}, quantity={:?}, price={:?})",
                        record.sls_sales, record.sls_quantity, record.sls_price
                    ),
                ));
            }
        }

        violations
    }

    fn validate_birthdates(
        &self,
        records: &[RawCustomerDemographicRecord],
        floor: NaiveDate,
        today: NaiveDate,
    ) -> Vec<DqViolation> {
        records
            .iter()
            .filter_map(|record| {
                let bdate = record.bdate?;
                let message = if bdate < floor {
                    format!("生日早于 {}: {}", floor, bdate)
                } else if bdate > today {
                    format!("生日晚于当天，将置空: {}", bdate)
                } else {
                    return None;
                };
                Some(DqViolation::new(
                    record.row_number,
                    record.cid.clone(),
                    DqLevel::Warning,
                    "bdate",
                    message,
                ))
            })
            .collect()
    }

    fn generate_dq_report(
        &self,
        batch_id: &str,
        entity: SilverEntity,
        total_rows: usize,
        violations: Vec<DqViolation>,
        duplicate_groups: Vec<DuplicateKeyGroup>,
    ) -> DqReport {
        let count = |level: DqLevel| violations.iter().filter(|v| v.level == level).count();

        DqReport {
            batch_id: batch_id.to_string(),
            entity,
            summary: DqSummary {
                total_rows,
                error: count(DqLevel::Error),
                warning: count(DqLevel::Warning),
                info: count(DqLevel::Info),
                conflict: count(DqLevel::Conflict),
            },
            duplicate_groups,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BronzeRecord, RawCustomerRecord};

    fn customer(cst_id: Option<i64>, row_number: usize) -> RawCustomerRecord {
        RawCustomerRecord {
            cst_id,
            cst_firstname: Some("Jon".to_string()),
            row_number,
            ..Default::default()
        }
    }

    fn sales(row_number: usize, sales: Option<i64>, qty: Option<i64>, price: Option<i64>) -> RawSalesRecord {
        RawSalesRecord {
            sls_ord_num: Some(format!("SO{}", row_number)),
            sls_order_dt: Some(20101229),
            sls_ship_dt: Some(20110105),
            sls_due_dt: Some(20110110),
            sls_sales: sales,
            sls_quantity: qty,
            sls_price: price,
            row_number,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_natural_key_missing_and_duplicate() {
        let profiles: Vec<_> = [
            customer(Some(1), 2),
            customer(None, 3),
            customer(Some(1), 4),
            customer(Some(2), 5),
            customer(Some(1), 6),
        ]
        .iter()
        .map(|r| r.profile())
        .collect();

        let (violations, groups) = DqValidatorImpl.validate_natural_key(&profiles, true);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].natural_key, "1");
        assert_eq!(groups[0].row_numbers, vec![2, 4, 6]);
        assert_eq!(violations.iter().filter(|v| v.level == DqLevel::Error).count(), 1);
        assert_eq!(violations.iter().filter(|v| v.level == DqLevel::Conflict).count(), 2);
    }

    #[test]
    fn test_validate_natural_key_non_unique_entity_skips_duplicates() {
        let profiles: Vec<_> = [sales(2, Some(10), Some(1), Some(10)), sales(2, Some(10), Some(1), Some(10))]
            .iter()
            .map(|r| r.profile())
            .collect();

        let (violations, groups) = DqValidatorImpl.validate_natural_key(&profiles, false);

        assert!(violations.is_empty());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_validate_padding() {
        let mut record = customer(Some(1), 2);
        record.cst_lastname = Some(" Yang".to_string());

        let violations = DqValidatorImpl.validate_padding(&record.profile());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "cst_lastname");
        assert_eq!(violations[0].level, DqLevel::Warning);
    }

    #[test]
    fn test_validate_int_dates_flags_bad_encodings() {
        let mut record = sales(2, Some(10), Some(1), Some(10));
        record.sls_order_dt = Some(0);
        record.sls_ship_dt = Some(5489);
        record.sls_due_dt = Some(20230230);

        let violations = DqValidatorImpl.validate_int_dates(&record.profile());

        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["sls_order_dt", "sls_ship_dt", "sls_due_dt"]);
    }

    #[test]
    fn test_validate_sales_consistency() {
        let records = vec![
            sales(2, Some(100), Some(5), Some(20)),
            sales(3, Some(0), Some(5), Some(20)),
            sales(4, Some(100), Some(5), None),
        ];

        let violations = DqValidatorImpl.validate_sales_consistency(&records);

        let rows: Vec<_> = violations.iter().map(|v| v.row_number).collect();
        assert_eq!(rows, vec![3, 4]);
    }

    #[test]
    fn test_validate_sales_order_after_ship() {
        let mut record = sales(2, Some(100), Some(5), Some(20));
        record.sls_order_dt = Some(20110201);

        let violations = DqValidatorImpl.validate_sales_consistency(&[record]);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "sls_order_dt");
    }

    #[test]
    fn test_validate_birthdates() {
        let floor = NaiveDate::from_ymd_opt(1924, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let records = vec![
            RawCustomerDemographicRecord {
                cid: Some("AW1".to_string()),
                bdate: NaiveDate::from_ymd_opt(1916, 2, 10),
                row_number: 2,
                ..Default::default()
            },
            RawCustomerDemographicRecord {
                cid: Some("AW2".to_string()),
                bdate: NaiveDate::from_ymd_opt(1980, 5, 1),
                row_number: 3,
                ..Default::default()
            },
            RawCustomerDemographicRecord {
                cid: Some("AW3".to_string()),
                bdate: NaiveDate::from_ymd_opt(2050, 1, 1),
                row_number: 4,
                ..Default::default()
            },
        ];

        let violations = DqValidatorImpl.validate_birthdates(&records, floor, today);

        let rows: Vec<_> = violations.iter().map(|v| v.row_number).collect();
        assert_eq!(rows, vec![2, 4]);
    }

    #[test]
    fn test_generate_dq_report_summary() {
        let violations = vec![
            DqViolation::new(2, None, DqLevel::Error, "natural_key", "自然键缺失"),
            DqViolation::new(3, Some("1".into()), DqLevel::Conflict, "natural_key", "重复"),
            DqViolation::new(4, Some("2".into()), DqLevel::Warning, "cst_key", "空白"),
        ];

        let report =
            DqValidatorImpl.generate_dq_report("B1", SilverEntity::Customer, 10, violations, Vec::new());

        assert_eq!(report.summary.total_rows, 10);
        assert_eq!(report.summary.error, 1);
        assert_eq!(report.summary.conflict, 1);
        assert_eq!(report.summary.warning, 1);
        assert!(!report.is_clean());
    }
}
