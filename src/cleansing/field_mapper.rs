// ==========================================
// 销售数据仓库 - 字段映射器实现
// ==========================================
// 依据: 铜层抽取文件表头（CRM 小写前缀列 / ERP 大写列）
// 职责: 源列 → 铜层记录字段 + 类型转换
// 红线: 文本原样保留（含首尾空白），仅空单元格视为 NULL
//       日期字段从不导致整行剔除：无法解析 → NULL + 告警
// ==========================================

use crate::cleansing::cleansing_trait::{FieldMapper as FieldMapperTrait, MappedRow};
use crate::cleansing::error::{CleansingError, CleansingResult};
use crate::domain::{
    DqLevel, DqViolation, RawCategoryRecord, RawCustomerDemographicRecord, RawCustomerRecord,
    RawLocationRecord, RawProductRecord, RawSalesRecord,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// 可接受的日期格式（抽取工具导出格式不统一）
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct FieldMapperImpl;

impl FieldMapperTrait for FieldMapperImpl {
    fn map_customer(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawCustomerRecord>> {
        let mut reader = RowReader::new(row, row_number);
        let cst_id = reader.int("cst_id")?;
        reader.natural_key = cst_id.map(|id| id.to_string());

        let record = RawCustomerRecord {
            cst_id,
            cst_key: reader.text("cst_key"),
            cst_firstname: reader.text("cst_firstname"),
            cst_lastname: reader.text("cst_lastname"),
            cst_marital_status: reader.text("cst_marital_status"),
            cst_gndr: reader.text("cst_gndr"),
            cst_create_date: reader.date("cst_create_date"),
            row_number,
        };
        Ok(reader.finish(record))
    }

    fn map_product(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawProductRecord>> {
        let mut reader = RowReader::new(row, row_number);
        let prd_id = reader.int("prd_id")?;
        reader.natural_key = prd_id.map(|id| id.to_string());

        let record = RawProductRecord {
            prd_id,
            prd_key: reader.text("prd_key"),
            prd_nm: reader.text("prd_nm"),
            prd_cost: reader.int("prd_cost")?,
            prd_line: reader.text("prd_line"),
            prd_start_dt: reader.date("prd_start_dt"),
            prd_end_dt: reader.date("prd_end_dt"),
            row_number,
        };
        Ok(reader.finish(record))
    }

    fn map_sales(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawSalesRecord>> {
        let mut reader = RowReader::new(row, row_number);
        let sls_ord_num = reader.text("sls_ord_num");
        reader.natural_key = sls_ord_num.clone();

        let record = RawSalesRecord {
            sls_ord_num,
            sls_prd_key: reader.text("sls_prd_key"),
            sls_cust_id: reader.int("sls_cust_id")?,
            // 整数日期保持编码形态，合法性由清洗阶段判定
            sls_order_dt: reader.int_date("sls_order_dt"),
            sls_ship_dt: reader.int_date("sls_ship_dt"),
            sls_due_dt: reader.int_date("sls_due_dt"),
            sls_sales: reader.int("sls_sales")?,
            sls_quantity: reader.int("sls_quantity")?,
            sls_price: reader.int("sls_price")?,
            row_number,
        };
        Ok(reader.finish(record))
    }

    fn map_customer_demographic(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawCustomerDemographicRecord>> {
        let mut reader = RowReader::new(row, row_number);
        let cid = reader.text("cid");
        reader.natural_key = cid.clone();

        let record = RawCustomerDemographicRecord {
            cid,
            bdate: reader.date("bdate"),
            gen: reader.text("gen"),
            row_number,
        };
        Ok(reader.finish(record))
    }

    fn map_location(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawLocationRecord>> {
        let reader = RowReader::new(row, row_number);
        let record = RawLocationRecord {
            cid: reader.text("cid"),
            cntry: reader.text("cntry"),
            row_number,
        };
        Ok(reader.finish(record))
    }

    fn map_category(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> CleansingResult<MappedRow<RawCategoryRecord>> {
        let reader = RowReader::new(row, row_number);
        let record = RawCategoryRecord {
            id: reader.text("id"),
            cat: reader.text("cat"),
            subcat: reader.text("subcat"),
            maintenance: reader.text("maintenance"),
            row_number,
        };
        Ok(reader.finish(record))
    }
}

// ==========================================
// RowReader - 单行读取上下文
// ==========================================
// 列名已由解析器统一为小写
struct RowReader<'a> {
    row: &'a HashMap<String, String>,
    row_number: usize,
    natural_key: Option<String>,
    warnings: Vec<DqViolation>,
}

impl<'a> RowReader<'a> {
    fn new(row: &'a HashMap<String, String>, row_number: usize) -> Self {
        Self {
            row,
            row_number,
            natural_key: None,
            warnings: Vec::new(),
        }
    }

    fn finish<T>(self, record: T) -> MappedRow<T> {
        MappedRow {
            record,
            warnings: self.warnings,
        }
    }

    /// 文本字段：空单元格 → None；纯空白保留，交由校验器与清洗器处理
    fn text(&self, key: &str) -> Option<String> {
        self.row.get(key).filter(|v| !v.is_empty()).cloned()
    }

    /// 用于类型转换的值（TRIM 后为空视为 NULL）
    fn trimmed(&self, key: &str) -> Option<&'a str> {
        self.row
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// 解析整数（键/金额字段，失败即整行剔除）
    ///
    /// Excel 数值单元格可能以 "11000.0" 形式出现，整值浮点同样接受
    fn int(&self, key: &str) -> CleansingResult<Option<i64>> {
        let value = match self.trimmed(key) {
            None => return Ok(None),
            Some(v) => v,
        };

        parse_integer(value)
            .map(Some)
            .ok_or_else(|| CleansingError::TypeConversionError {
                row: self.row_number,
                field: key.to_string(),
                message: format!("无法解析为整数: {}", value),
            })
    }

    /// 解析 YYYYMMDD 整数日期编码
    ///
    /// # 规则
    /// - 非整数文本 → None + 告警（日期未知，不剔除行）
    /// - 整数原样返回，位数/日历合法性由清洗阶段判定
    fn int_date(&mut self, key: &str) -> Option<i64> {
        let value = self.trimmed(key)?;
        let parsed = parse_integer(value);
        if parsed.is_none() {
            self.warn(key, format!("日期编码非整数，已置空: {}", value));
        }
        parsed
    }

    /// 解析日期（YYYY-MM-DD，兼容带时间部分的导出格式）
    ///
    /// 无法解析 → None + 告警
    fn date(&mut self, key: &str) -> Option<NaiveDate> {
        let value = self.trimmed(key)?;
        let parsed = parse_date_text(value);
        if parsed.is_none() {
            self.warn(key, format!("日期格式无法识别，已置空: {}", value));
        }
        parsed
    }

    fn warn(&mut self, field: &str, message: String) {
        self.warnings.push(DqViolation::new(
            self.row_number,
            self.natural_key.clone(),
            DqLevel::Warning,
            field,
            message,
        ));
    }
}

fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

fn parse_date_text(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_map_customer_keeps_padding() {
        let r = row(&[
            ("cst_id", "29449"),
            ("cst_key", "AW00029449"),
            ("cst_firstname", " Elizabeth"),
            ("cst_lastname", "Lin "),
            ("cst_marital_status", "M"),
            ("cst_gndr", ""),
            ("cst_create_date", "2026-01-25"),
        ]);

        let mapped = FieldMapperImpl.map_customer(&r, 2).unwrap();
        let record = mapped.record;

        assert!(mapped.warnings.is_empty());
        assert_eq!(record.cst_id, Some(29449));
        assert_eq!(record.cst_firstname.as_deref(), Some(" Elizabeth"));
        assert_eq!(record.cst_lastname.as_deref(), Some("Lin "));
        assert_eq!(record.cst_gndr, None);
        assert_eq!(record.cst_create_date, NaiveDate::from_ymd_opt(2026, 1, 25));
        assert_eq!(record.row_number, 2);
    }

    #[test]
    fn test_map_product_accepts_datetime_and_float_cells() {
        let r = row(&[
            ("prd_id", "210.0"),
            ("prd_key", "CO-RF-FR-R92B-58"),
            ("prd_cost", ""),
            ("prd_start_dt", "2003-07-01 00:00:00"),
        ]);

        let record = FieldMapperImpl.map_product(&r, 3).unwrap().record;

        assert_eq!(record.prd_id, Some(210));
        assert_eq!(record.prd_cost, None);
        assert_eq!(record.prd_start_dt, NaiveDate::from_ymd_opt(2003, 7, 1));
        assert_eq!(record.prd_end_dt, None);
    }

    #[test]
    fn test_map_sales_amount_type_error_rejects_row() {
        let r = row(&[("sls_ord_num", "SO43697"), ("sls_quantity", "one")]);

        let err = FieldMapperImpl.map_sales(&r, 7).unwrap_err();

        match err {
            CleansingError::TypeConversionError { row, field, .. } => {
                assert_eq!(row, 7);
                assert_eq!(field, "sls_quantity");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_sales_text_date_code_is_nulled_with_warning() {
        let r = row(&[
            ("sls_ord_num", "SO43697"),
            ("sls_order_dt", "2010-12-29"),
            ("sls_ship_dt", "20110105"),
            ("sls_due_dt", "20110110.0"),
            ("sls_quantity", "1"),
        ]);

        let mapped = FieldMapperImpl.map_sales(&r, 2).unwrap();

        assert_eq!(mapped.record.sls_order_dt, None);
        assert_eq!(mapped.record.sls_ship_dt, Some(20110105));
        assert_eq!(mapped.record.sls_due_dt, Some(20110110));
        assert_eq!(mapped.record.sls_quantity, Some(1));
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.warnings[0].field, "sls_order_dt");
        assert_eq!(mapped.warnings[0].level, DqLevel::Warning);
        assert_eq!(mapped.warnings[0].natural_key.as_deref(), Some("SO43697"));
    }

    #[test]
    fn test_map_customer_bad_date_is_nulled_with_warning() {
        let r = row(&[("cst_id", "11002"), ("cst_create_date", "06.10.2025")]);

        let mapped = FieldMapperImpl.map_customer(&r, 2).unwrap();

        assert_eq!(mapped.record.cst_id, Some(11002));
        assert_eq!(mapped.record.cst_create_date, None);
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.warnings[0].row_number, 2);
        assert_eq!(mapped.warnings[0].field, "cst_create_date");
        assert_eq!(mapped.warnings[0].natural_key.as_deref(), Some("11002"));
    }

    #[test]
    fn test_map_demographic_invalid_calendar_date() {
        let r = row(&[("cid", "NASAW00011000"), ("bdate", "1971-13-45")]);

        let mapped = FieldMapperImpl.map_customer_demographic(&r, 4).unwrap();

        assert_eq!(mapped.record.cid.as_deref(), Some("NASAW00011000"));
        assert_eq!(mapped.record.bdate, None);
        assert_eq!(mapped.warnings[0].field, "bdate");
    }
}
