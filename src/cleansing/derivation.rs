// ==========================================
// 销售数据仓库 - 字段派生服务实现
// ==========================================
// 职责: 产品有效期结束日派生（源端结束日不可信，整体重算）
// ==========================================

use crate::cleansing::cleansing_trait::DerivationService as DerivationServiceTrait;
use crate::domain::SilverProduct;
use chrono::Duration;
use std::collections::HashMap;

pub struct DerivationServiceImpl;

impl DerivationServiceTrait for DerivationServiceImpl {
    /// 派生 prd_end_dt
    ///
    /// # 规则
    /// - 分区: 本地产品键 prd_key（空键单独成组）
    /// - 排序: prd_start_dt 升序，空值在前，同值保持输入顺序
    /// - prd_end_dt = 下一条 prd_start_dt - 1 天；末条或下一条起始日为空 → None
    ///
    /// # 示例
    /// ```text
    /// 2011-07-01 / 2012-07-01 / 2013-07-01
    /// → 2012-06-30 / 2013-06-30 / None
    /// ```
    fn derive_product_end_dates(&self, products: &mut [SilverProduct]) {
        let mut partitions: HashMap<Option<String>, Vec<usize>> = HashMap::new();
        for (idx, product) in products.iter().enumerate() {
            partitions
                .entry(product.prd_key.clone())
                .or_default()
                .push(idx);
        }

        for indices in partitions.values_mut() {
            // sort_by_key 为稳定排序
            indices.sort_by_key(|&idx| products[idx].prd_start_dt);

            for pair in indices.windows(2) {
                let next_start = products[pair[1]].prd_start_dt;
                products[pair[0]].prd_end_dt =
                    next_start.and_then(|d| d.checked_sub_signed(Duration::days(1)));
            }
            if let Some(&last) = indices.last() {
                products[last].prd_end_dt = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product(prd_id: i64, key: &str, start: Option<NaiveDate>) -> SilverProduct {
        SilverProduct {
            prd_id,
            cat_id: Some("CO_RF".to_string()),
            prd_key: Some(key.to_string()),
            prd_nm: None,
            prd_cost: 0,
            prd_line: "Road".to_string(),
            prd_start_dt: start,
            prd_end_dt: Some(ymd(1999, 1, 1)),
            dwh_create_date: Utc::now(),
        }
    }

    #[test]
    fn test_end_date_is_day_before_next_start() {
        let mut products = vec![
            product(3, "FR-R92B-58", Some(ymd(2013, 7, 1))),
            product(1, "FR-R92B-58", Some(ymd(2011, 7, 1))),
            product(2, "FR-R92B-58", Some(ymd(2012, 7, 1))),
        ];

        DerivationServiceImpl.derive_product_end_dates(&mut products);

        assert_eq!(products[1].prd_end_dt, Some(ymd(2012, 6, 30)));
        assert_eq!(products[2].prd_end_dt, Some(ymd(2013, 6, 30)));
        assert_eq!(products[0].prd_end_dt, None);
    }

    #[test]
    fn test_partitions_are_independent() {
        let mut products = vec![
            product(1, "A", Some(ymd(2011, 7, 1))),
            product(2, "B", Some(ymd(2012, 7, 1))),
        ];

        DerivationServiceImpl.derive_product_end_dates(&mut products);

        assert_eq!(products[0].prd_end_dt, None);
        assert_eq!(products[1].prd_end_dt, None);
    }

    #[test]
    fn test_null_start_sorts_first() {
        let mut products = vec![
            product(1, "A", Some(ymd(2012, 1, 1))),
            product(2, "A", None),
        ];

        DerivationServiceImpl.derive_product_end_dates(&mut products);

        assert_eq!(products[1].prd_end_dt, Some(ymd(2011, 12, 31)));
        assert_eq!(products[0].prd_end_dt, None);
    }

    #[test]
    fn test_end_never_before_start_for_distinct_starts() {
        let mut products = vec![
            product(1, "A", Some(ymd(2011, 7, 1))),
            product(2, "A", Some(ymd(2011, 7, 2))),
        ];

        DerivationServiceImpl.derive_product_end_dates(&mut products);

        let first = &products[0];
        assert!(first.prd_end_dt >= first.prd_start_dt);
    }
}
