// ==========================================
// 销售数据仓库 - 清洗配置读取 Trait
// ==========================================
// 职责: 定义装载器所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::cleansing::error::CleansingResult;
use crate::config::cleansing_config::CleansingConfig;
use async_trait::async_trait;

// ==========================================
// CleansingConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表覆写默认值）/ CleansingConfig（静态配置）
#[async_trait]
pub trait CleansingConfigReader: Send + Sync {
    /// 读取一次运行使用的完整清洗配置
    ///
    /// # 返回
    /// - Ok(CleansingConfig): 默认值叠加已存储的覆写项
    /// - Err: 覆写值格式错误或数据库读取失败
    async fn get_cleansing_config(&self) -> CleansingResult<CleansingConfig>;
}

#[async_trait]
impl CleansingConfigReader for CleansingConfig {
    async fn get_cleansing_config(&self) -> CleansingResult<CleansingConfig> {
        Ok(self.clone())
    }
}
