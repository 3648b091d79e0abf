// ==========================================
// 销售数据仓库 - 字段规整器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 代码 → 标签 / ID 规整 / 整数日期解析
// 红线: 全函数，从不报错；字符位置按字符而非字节计算
// ==========================================

use crate::cleansing::cleansing_trait::DataCleaner as DataCleanerTrait;
use crate::config::LabelTable;
use chrono::NaiveDate;

pub struct DataCleanerImpl;

impl DataCleanerTrait for DataCleanerImpl {
    fn trim(&self, value: &str) -> String {
        value.trim().to_string()
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn code_to_label(&self, code: Option<&str>, table: &LabelTable) -> String {
        let trimmed = match code.map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => return table.default.clone(),
        };

        match table.lookup(trimmed) {
            Some(label) => label.to_string(),
            None if table.passthrough_unmapped => trimmed.to_string(),
            None => table.default.clone(),
        }
    }

    fn strip_prefix(&self, id: &str, prefix: &str) -> String {
        if prefix.is_empty() {
            return id.to_string();
        }
        id.strip_prefix(prefix).unwrap_or(id).to_string()
    }

    fn strip_separator(&self, id: &str, separator: char) -> String {
        id.chars().filter(|c| *c != separator).collect()
    }

    fn rewrite_separator(&self, value: &str, from: char, to: char, length: usize) -> String {
        value
            .chars()
            .take(length)
            .map(|c| if c == from { to } else { c })
            .collect()
    }

    fn split_key(&self, compound: &str, offset: usize) -> (String, String) {
        let prefix: String = compound.chars().take(offset).collect();
        let local: String = compound.chars().skip(offset).collect();
        (prefix, local)
    }

    fn parse_int_date(&self, value: Option<i64>) -> Option<NaiveDate> {
        let n = value?;
        if !(10_000_000..=99_999_999).contains(&n) {
            return None;
        }

        let year = i32::try_from(n / 10_000).ok()?;
        let month = u32::try_from((n / 100) % 100).ok()?;
        let day = u32::try_from(n % 100).ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn future_date_guard(&self, date: Option<NaiveDate>, today: NaiveDate) -> Option<NaiveDate> {
        date.filter(|d| *d <= today)
    }
}
