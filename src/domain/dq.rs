// ==========================================
// 销售数据仓库 - 数据质量报告模型
// ==========================================
// 依据: 铜层质量检查脚本（主键/空白/标准化/日期/销售一致性）
// 红线: 校验结果仅为提示，不直接修改数据
// ==========================================

use crate::domain::load::SilverEntity;
use serde::{Deserialize, Serialize};

// ==========================================
// DqLevel - 数据质量级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqLevel {
    Error,    // 错误（行被剔除，如类型转换失败、自然键缺失）
    Warning,  // 警告（按修复规则继续装载）
    Info,     // 提示（仅记录）
    Conflict, // 冲突（自然键重复，由去重器裁决）
}

// ==========================================
// DqViolation - 数据质量违规记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqViolation {
    pub row_number: usize,            // 原始文件行号
    pub natural_key: Option<String>,  // 自然键（如果可解析）
    pub level: DqLevel,
    pub field: String,
    pub message: String,
}

impl DqViolation {
    pub fn new(
        row_number: usize,
        natural_key: Option<String>,
        level: DqLevel,
        field: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_number,
            natural_key,
            level,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ==========================================
// DuplicateKeyGroup - 重复自然键分组
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateKeyGroup {
    pub natural_key: String,
    pub row_numbers: Vec<usize>, // 按出现顺序
}

// ==========================================
// DqSummary - 数据质量汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DqSummary {
    pub total_rows: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub conflict: usize,
}

// ==========================================
// DqReport - 数据质量报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqReport {
    pub batch_id: String,
    pub entity: SilverEntity,
    pub summary: DqSummary,
    pub duplicate_groups: Vec<DuplicateKeyGroup>,
    pub violations: Vec<DqViolation>,
}

impl DqReport {
    /// 是否无任何违规（零行检查通过）
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.duplicate_groups.is_empty()
    }

    /// 按字段筛选违规
    pub fn violations_for(&self, field: &str) -> Vec<&DqViolation> {
        self.violations.iter().filter(|v| v.field == field).collect()
    }
}

// ==========================================
// AuditFinding - 银层零行检查结果
// ==========================================
// 用途: 装载后复核不变量，期望为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub entity: SilverEntity,
    pub check: String,
    pub offending_rows: usize,
    pub sample: Vec<String>, // 最多 5 条样例（自然键或行序号）
}
