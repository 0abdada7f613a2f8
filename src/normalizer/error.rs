// ==========================================
// 导入规范化引擎 - 规范化模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级/字段级问题是 Diagnostic 数据，不走错误通道；
//       这里只有结构性错误（快照/配置加载失败、工作线程失败）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 规范化模块错误类型
#[derive(Error, Debug)]
pub enum NormalizeError {
    // ===== 快照加载错误（致命，行处理前中止）=====
    #[error("标准字段目录加载失败 (tenant {tenant_id}): {message}")]
    CatalogueLoad { tenant_id: String, message: String },

    #[error("规则快照加载失败 (tenant {tenant_id}): {message}")]
    RuleSnapshotLoad { tenant_id: String, message: String },

    #[error("型号别名表加载失败 (tenant {tenant_id}): {message}")]
    AliasTableLoad { tenant_id: String, message: String },

    #[error("快照校验失败: {0}")]
    InvalidSnapshot(String),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ===== 执行错误 =====
    #[error("工作线程执行失败: {0}")]
    WorkerFailure(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NormalizeError {
    /// 是否属于结构性错误（整批中止）
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            NormalizeError::CatalogueLoad { .. }
                | NormalizeError::RuleSnapshotLoad { .. }
                | NormalizeError::AliasTableLoad { .. }
                | NormalizeError::InvalidSnapshot(_)
        )
    }
}

impl From<regex::Error> for NormalizeError {
    fn from(err: regex::Error) -> Self {
        NormalizeError::Other(anyhow::anyhow!("解析器正则编译失败: {}", err))
    }
}

/// Result 类型别名
pub type NormalizeResult<T> = Result<T, NormalizeError>;
