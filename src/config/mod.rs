// ==========================================
// 销售数据仓库 - 配置层
// ==========================================
// 职责: 清洗规则配置（标签表/前缀/默认值），支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod cleansing_config;
pub mod cleansing_config_trait;
pub mod config_manager;

// 重导出核心配置类型
pub use cleansing_config::{CleansingConfig, LabelTable};
pub use cleansing_config_trait::CleansingConfigReader;
pub use config_manager::{config_keys, ConfigManager};
