// ==========================================
// 销售数据仓库 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取清洗配置覆写项
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::cleansing::error::{CleansingError, CleansingResult};
use crate::config::cleansing_config::{CleansingConfig, LabelTable};
use crate::config::cleansing_config_trait::CleansingConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const MARITAL_STATUS_LABELS: &str = "cleansing/labels/marital_status";
    pub const CRM_GENDER_LABELS: &str = "cleansing/labels/crm_gender";
    pub const ERP_GENDER_LABELS: &str = "cleansing/labels/erp_gender";
    pub const PRODUCT_LINE_LABELS: &str = "cleansing/labels/product_line";
    pub const COUNTRY_LABELS: &str = "cleansing/labels/country";
    pub const DEMOGRAPHIC_ID_PREFIX: &str = "cleansing/demographic_id_prefix";
    pub const LOCATION_ID_SEPARATOR: &str = "cleansing/location_id_separator";
    pub const CATEGORY_KEY_LENGTH: &str = "cleansing/category_key_length";
    pub const PRODUCT_KEY_OFFSET: &str = "cleansing/product_key_offset";
    pub const DEFAULT_PRODUCT_COST: &str = "cleansing/default_product_cost";
    pub const BIRTHDATE_FLOOR: &str = "cleansing/birthdate_floor";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> CleansingResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> CleansingResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| CleansingError::InternalError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> CleansingResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CleansingError::InternalError(format!("锁获取失败: {}", e)))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| CleansingError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> CleansingResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CleansingError::InternalError(format!("锁获取失败: {}", e)))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 写入标签表覆写（JSON）
    pub fn set_label_table(&self, key: &str, table: &LabelTable) -> CleansingResult<()> {
        let json = serde_json::to_string(table).map_err(|e| CleansingError::ConfigValueError {
            key: key.to_string(),
            value: String::new(),
            message: e.to_string(),
        })?;
        self.set_global_config_value(key, &json)
    }

    /// 默认配置叠加 config_kv 覆写项
    pub fn load_cleansing_config(&self) -> CleansingResult<CleansingConfig> {
        let mut config = CleansingConfig::default();

        self.overlay_label_table(config_keys::MARITAL_STATUS_LABELS, &mut config.marital_status)?;
        self.overlay_label_table(config_keys::CRM_GENDER_LABELS, &mut config.crm_gender)?;
        self.overlay_label_table(config_keys::ERP_GENDER_LABELS, &mut config.erp_gender)?;
        self.overlay_label_table(config_keys::PRODUCT_LINE_LABELS, &mut config.product_line)?;
        self.overlay_label_table(config_keys::COUNTRY_LABELS, &mut config.country)?;

        if let Some(prefix) = self.get_global_config_value(config_keys::DEMOGRAPHIC_ID_PREFIX)? {
            config.demographic_id_prefix = prefix.trim().to_string();
        }
        if let Some(raw) = self.get_global_config_value(config_keys::LOCATION_ID_SEPARATOR)? {
            config.location_id_separator = parse_char(config_keys::LOCATION_ID_SEPARATOR, &raw)?;
        }
        self.overlay_parsed(config_keys::CATEGORY_KEY_LENGTH, &mut config.category_key_length)?;
        self.overlay_parsed(config_keys::PRODUCT_KEY_OFFSET, &mut config.product_key_offset)?;
        self.overlay_parsed(config_keys::DEFAULT_PRODUCT_COST, &mut config.default_product_cost)?;

        if let Some(raw) = self.get_global_config_value(config_keys::BIRTHDATE_FLOOR)? {
            config.birthdate_floor = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|e| config_value_error(config_keys::BIRTHDATE_FLOOR, &raw, e))?;
        }

        tracing::debug!(config = ?config, "清洗配置加载完成");
        Ok(config)
    }

    fn overlay_label_table(&self, key: &str, target: &mut LabelTable) -> CleansingResult<()> {
        if let Some(raw) = self.get_global_config_value(key)? {
            let table: LabelTable =
                serde_json::from_str(&raw).map_err(|e| config_value_error(key, &raw, e))?;
            // 存储的键可能未规整，这里统一为 TRIM + UPPER
            *target = LabelTable {
                labels: table
                    .labels
                    .into_iter()
                    .map(|(code, label)| (crate::config::cleansing_config::normalize_code(&code), label))
                    .collect(),
                ..table
            };
        }
        Ok(())
    }

    fn overlay_parsed<T>(&self, key: &str, target: &mut T) -> CleansingResult<()>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = self.get_global_config_value(key)? {
            *target = raw
                .trim()
                .parse::<T>()
                .map_err(|e| config_value_error(key, &raw, e))?;
        }
        Ok(())
    }
}

fn parse_char(key: &str, raw: &str) -> CleansingResult<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(config_value_error(key, raw, "必须为单个字符")),
    }
}

fn config_value_error(key: &str, raw: &str, message: impl std::fmt::Display) -> CleansingError {
    CleansingError::ConfigValueError {
        key: key.to_string(),
        value: raw.to_string(),
        message: message.to_string(),
    }
}

// ==========================================
// CleansingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl CleansingConfigReader for ConfigManager {
    async fn get_cleansing_config(&self) -> CleansingResult<CleansingConfig> {
        self.load_cleansing_config()
    }
}
