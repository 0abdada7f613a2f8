// ==========================================
// 导入规范化引擎 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    // ===== 存储数据错误 =====
    #[error("存储值无效 ({entity}.{field}={value}): {message}")]
    InvalidStoredValue {
        entity: String,
        field: String,
        value: String,
        message: String,
    },

    #[error("JSON 序列化失败: {0}")]
    SerializationError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn invalid_value(
        entity: &str,
        field: &str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RepositoryError::InvalidStoredValue {
            entity: entity.to_string(),
            field: field.to_string(),
            value: value.into(),
            message: message.into(),
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
