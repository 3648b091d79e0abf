// ==========================================
// 销售数据仓库 - 销售金额一致性修复
// ==========================================
// 规则（单次联合修复，均基于修复前原值）:
// - expected = quantity × |price|（任一为空或溢出 → 无）
// - sales 为空 / ≤ 0 / 与 expected 不等 → sales = expected
// - price 为空 / ≤ 0 → price = 原 sales / quantity（quantity 为 0 或空 → 空）
// - quantity 视为事实，原样透传
// ==========================================

use crate::cleansing::cleansing_trait::{ConsistencyRepairer, SalesRepair};

pub struct ConsistencyRepairerImpl;

impl ConsistencyRepairer for ConsistencyRepairerImpl {
    fn repair_sales(
        &self,
        sales: Option<i64>,
        quantity: Option<i64>,
        price: Option<i64>,
    ) -> SalesRepair {
        let expected = match (quantity, price) {
            (Some(q), Some(p)) => p.checked_abs().and_then(|abs| q.checked_mul(abs)),
            _ => None,
        };

        let sales_needs_repair = match sales {
            None => true,
            Some(s) if s <= 0 => true,
            Some(s) => expected.is_some_and(|e| e != s),
        };
        let repaired_sales = if sales_needs_repair { expected } else { sales };

        let price_needs_repair = !matches!(price, Some(p) if p > 0);
        let repaired_price = if price_needs_repair {
            match (sales, quantity) {
                (Some(s), Some(q)) if q != 0 => s.checked_div(q),
                _ => None,
            }
        } else {
            price
        };

        SalesRepair {
            sales: repaired_sales,
            quantity,
            price: repaired_price,
            sales_repaired: repaired_sales != sales,
            price_repaired: repaired_price != price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repair(sales: Option<i64>, qty: Option<i64>, price: Option<i64>) -> SalesRepair {
        ConsistencyRepairerImpl.repair_sales(sales, qty, price)
    }

    #[test]
    fn test_consistent_row_unchanged() {
        let r = repair(Some(100), Some(5), Some(20));
        assert_eq!((r.sales, r.quantity, r.price), (Some(100), Some(5), Some(20)));
        assert!(!r.sales_repaired);
        assert!(!r.price_repaired);
    }

    #[test]
    fn test_zero_sales_recomputed() {
        let r = repair(Some(0), Some(5), Some(20));
        assert_eq!((r.sales, r.quantity, r.price), (Some(100), Some(5), Some(20)));
        assert!(r.sales_repaired);
    }

    #[test]
    fn test_missing_price_derived_from_sales() {
        let r = repair(Some(100), Some(5), None);
        assert_eq!((r.sales, r.quantity, r.price), (Some(100), Some(5), Some(20)));
        assert!(r.price_repaired);
        assert!(!r.sales_repaired);
    }

    #[test]
    fn test_negative_price_uses_absolute_for_sales() {
        let r = repair(Some(-40), Some(2), Some(-20));
        assert_eq!(r.sales, Some(40));
        // 价格基于原 sales 推导
        assert_eq!(r.price, Some(-20));
    }

    #[test]
    fn test_mismatch_repaired_to_expected() {
        let r = repair(Some(50), Some(3), Some(20));
        assert_eq!(r.sales, Some(60));
        assert_eq!(r.price, Some(20));
    }

    #[test]
    fn test_zero_quantity_yields_null_price() {
        let r = repair(Some(100), Some(0), Some(0));
        assert_eq!(r.price, None);
        assert_eq!(r.sales, Some(0));
    }

    #[test]
    fn test_all_missing_stays_missing() {
        let r = repair(None, None, None);
        assert_eq!((r.sales, r.quantity, r.price), (None, None, None));
        assert!(!r.sales_repaired);
    }

    #[test]
    fn test_overflow_yields_null_sales() {
        let r = repair(Some(-1), Some(i64::MAX), Some(2));
        assert_eq!(r.sales, None);
    }
}
