// ==========================================
// 销售数据仓库 - 核心库
// ==========================================
// 定位: 铜层 (CRM/ERP 原始抽取) → 银层 (清洗后) 装载引擎
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 铜层/银层记录、DQ 报告、装载批次
pub mod domain;

// 配置层 - 清洗规则配置
pub mod config;

// 清洗层 - 校验/规整/去重/修复/派生/装载
pub mod cleansing;

// 数据仓储层 - 银层读写
pub mod repository;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use cleansing::{SilverLoader, SilverLoaderImpl, SilverTransformer};
pub use config::CleansingConfig;
pub use domain::{DqLevel, DqReport, LoadRunSummary, RunContext, SilverEntity};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售数据仓库";
