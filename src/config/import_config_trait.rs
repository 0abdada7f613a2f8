// ==========================================
// 导入规范化引擎 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义规范化引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::engine_config::EngineConfig;
use async_trait::async_trait;
use std::error::Error;

pub type ConfigReadResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 用途: 按租户读取引擎配置（租户 scope → global → 默认值）
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 建议规则的相似度阈值
    ///
    /// # 默认值
    /// - 0.85
    async fn get_suggestion_threshold(&self, tenant_id: &str) -> ConfigReadResult<f64>;

    /// 包含匹配的最小字符数
    ///
    /// # 默认值
    /// - 2
    async fn get_min_containment_len(&self, tenant_id: &str) -> ConfigReadResult<usize>;

    /// 并行分块数
    ///
    /// # 默认值
    /// - CPU 核数
    async fn get_worker_count(&self, tenant_id: &str) -> ConfigReadResult<usize>;

    /// 批量重规范化每页条数
    ///
    /// # 默认值
    /// - 200
    async fn get_renormalize_batch_size(&self, tenant_id: &str) -> ConfigReadResult<usize>;

    /// 品牌字段名（型号别名解析使用）
    async fn get_brand_field(&self, tenant_id: &str) -> ConfigReadResult<String>;

    /// 型号字段名
    async fn get_model_field(&self, tenant_id: &str) -> ConfigReadResult<String>;

    /// 一次性读取完整配置
    async fn load_engine_config(&self, tenant_id: &str) -> ConfigReadResult<EngineConfig> {
        Ok(EngineConfig {
            suggestion_threshold: self.get_suggestion_threshold(tenant_id).await?,
            min_containment_len: self.get_min_containment_len(tenant_id).await?,
            worker_count: self.get_worker_count(tenant_id).await?,
            renormalize_batch_size: self.get_renormalize_batch_size(tenant_id).await?,
            brand_field: self.get_brand_field(tenant_id).await?,
            model_field: self.get_model_field(tenant_id).await?,
        }
        .sanitized())
    }
}
