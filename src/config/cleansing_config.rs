// ==========================================
// 销售数据仓库 - 清洗规则配置
// ==========================================
// 职责: 枚举标签表 / 前缀 / 分隔符 / 默认值
// 红线: 运行期不可变，作为参数传入各清洗函数
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// LabelTable - 代码 → 标签映射表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTable {
    /// 键为已 TRIM + UPPER 的代码
    pub labels: BTreeMap<String, String>,
    /// 空值/空白，以及（非透传时）未映射代码的回退标签
    pub default: String,
    /// 未映射代码是否原样透传（TRIM 后）
    #[serde(default)]
    pub passthrough_unmapped: bool,
}

impl LabelTable {
    pub fn new(pairs: &[(&str, &str)], default: &str) -> Self {
        let labels = pairs
            .iter()
            .map(|(code, label)| (normalize_code(code), label.to_string()))
            .collect();
        Self {
            labels,
            default: default.to_string(),
            passthrough_unmapped: false,
        }
    }

    pub fn with_passthrough(mut self) -> Self {
        self.passthrough_unmapped = true;
        self
    }

    /// 查找标签（大小写/空白不敏感）
    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.labels.get(&normalize_code(code)).map(String::as_str)
    }

    /// 该表可能产出的全部取值
    ///
    /// 透传表的取值集合是开放的，此处只返回已定义标签 + 默认值
    pub fn label_set(&self) -> Vec<&str> {
        let mut set: Vec<&str> = self.labels.values().map(String::as_str).collect();
        set.push(self.default.as_str());
        set.sort_unstable();
        set.dedup();
        set
    }
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// ==========================================
// CleansingConfig - 清洗配置全集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleansingConfig {
    // ===== 标签表 =====
    pub marital_status: LabelTable,
    pub crm_gender: LabelTable,
    pub erp_gender: LabelTable,
    pub product_line: LabelTable,
    pub country: LabelTable,

    // ===== ID 规整 =====
    pub demographic_id_prefix: String,  // 客户人口统计 ID 前缀
    pub location_id_separator: char,    // 地区 ID 分隔符

    // ===== 产品复合键 =====
    pub category_key_length: usize,     // 品类 ID 取复合键前 N 位
    pub category_separator_from: char,
    pub category_separator_to: char,
    pub product_key_offset: usize,      // 本地产品键起始偏移（0 起）

    // ===== 默认值 / 审计阈值 =====
    pub default_product_cost: i64,
    pub birthdate_floor: NaiveDate,     // 早于此日期的生日视为异常（仅告警）
}

impl Default for CleansingConfig {
    fn default() -> Self {
        Self {
            marital_status: LabelTable::new(&[("S", "Single"), ("M", "Married")], "n/a"),
            crm_gender: LabelTable::new(&[("F", "Female"), ("M", "Male")], "Other"),
            erp_gender: LabelTable::new(
                &[
                    ("F", "Female"),
                    ("FEMALE", "Female"),
                    ("M", "Male"),
                    ("MALE", "Male"),
                ],
                "Other",
            ),
            product_line: LabelTable::new(
                &[
                    ("M", "Mountain"),
                    ("R", "Road"),
                    ("S", "Other Sales"),
                    ("T", "Touring"),
                ],
                "n/a",
            ),
            country: LabelTable::new(
                &[
                    ("DE", "Germany"),
                    ("US", "United States"),
                    ("USA", "United States"),
                ],
                "n/a",
            )
            .with_passthrough(),
            demographic_id_prefix: "NAS".to_string(),
            location_id_separator: '-',
            category_key_length: 5,
            category_separator_from: '-',
            category_separator_to: '_',
            product_key_offset: 6,
            default_product_cost: 0,
            birthdate_floor: NaiveDate::from_ymd_opt(1924, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_and_space_insensitive() {
        let config = CleansingConfig::default();
        assert_eq!(config.marital_status.lookup(" s "), Some("Single"));
        assert_eq!(config.erp_gender.lookup("female"), Some("Female"));
        assert_eq!(config.product_line.lookup("X"), None);
    }

    #[test]
    fn test_label_set_includes_default() {
        let config = CleansingConfig::default();
        assert_eq!(
            config.product_line.label_set(),
            vec!["Mountain", "Other Sales", "Road", "Touring", "n/a"]
        );
        assert_eq!(config.erp_gender.label_set(), vec!["Female", "Male", "Other"]);
    }

    #[test]
    fn test_config_json_roundtrip_keeps_passthrough() {
        let config = CleansingConfig::default();
        let json = serde_json::to_string(&config.country).unwrap();
        let back: LabelTable = serde_json::from_str(&json).unwrap();
        assert!(back.passthrough_unmapped);
        assert_eq!(back, config.country);
    }
}
