// ==========================================
// 销售数据仓库 - 清洗模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 数据质量问题不走错误通道（见 DqViolation），
//       这里只承载整批 I/O、配置与内部错误
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 清洗模块错误类型
#[derive(Error, Debug)]
pub enum CleansingError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 数据映射错误（行级，由调用方转为 DQ 违规）=====
    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 数据库错误 =====
    #[error("银层写入失败 ({entity}): {source}")]
    SilverWriteError {
        entity: String,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for CleansingError {
    fn from(err: std::io::Error) -> Self {
        CleansingError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for CleansingError {
    fn from(err: rusqlite::Error) -> Self {
        CleansingError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for CleansingError {
    fn from(err: csv::Error) -> Self {
        CleansingError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for CleansingError {
    fn from(err: calamine::Error) -> Self {
        CleansingError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type CleansingResult<T> = Result<T, CleansingError>;
