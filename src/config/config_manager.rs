// ==========================================
// 导入规范化引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id + key → value)
// 优先级: 租户 scope → global → 内置默认值
// ==========================================

use crate::config::engine_config::{config_keys, EngineConfig};
use crate::config::import_config_trait::{ConfigReadResult, EngineConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,                       // 全局
    Tenant { tenant_id: String }, // 租户
}

impl ConfigScope {
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Tenant { tenant_id } => format!("tenant:{}", tenant_id),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigReadResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigReadResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取单个 scope 的配置值
    fn get_config_value(&self, scope: &ConfigScope, key: &str) -> ConfigReadResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 按优先级读取：租户 scope → global
    pub fn get_scoped_value(&self, tenant_id: &str, key: &str) -> ConfigReadResult<Option<String>> {
        let tenant_scope = ConfigScope::Tenant {
            tenant_id: tenant_id.to_string(),
        };
        if let Some(v) = self.get_config_value(&tenant_scope, key)? {
            return Ok(Some(v));
        }
        self.get_config_value(&ConfigScope::Global, key)
    }

    /// 写入配置（UPSERT）
    pub fn set_value(&self, scope: &ConfigScope, key: &str, value: &str) -> ConfigReadResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3",
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 某个 scope 下的全部配置（按键排序）
    pub fn get_scope_snapshot(&self, scope: &ConfigScope) -> ConfigReadResult<BTreeMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![scope.scope_id()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            out.insert(key, value);
        }
        Ok(out)
    }

    /// 读取并解析配置，格式错误时回退默认值
    fn get_parsed_or_default<T>(&self, tenant_id: &str, key: &str, default: T) -> ConfigReadResult<T>
    where
        T: FromStr + Display,
    {
        let Some(raw) = self.get_scoped_value(tenant_id, key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    fn get_text_or_default(&self, tenant_id: &str, key: &str, default: String) -> ConfigReadResult<String> {
        Ok(self
            .get_scoped_value(tenant_id, key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default))
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_suggestion_threshold(&self, tenant_id: &str) -> ConfigReadResult<f64> {
        self.get_parsed_or_default(
            tenant_id,
            config_keys::SUGGESTION_THRESHOLD,
            EngineConfig::default().suggestion_threshold,
        )
    }

    async fn get_min_containment_len(&self, tenant_id: &str) -> ConfigReadResult<usize> {
        self.get_parsed_or_default(
            tenant_id,
            config_keys::MIN_CONTAINMENT_LEN,
            EngineConfig::default().min_containment_len,
        )
    }

    async fn get_worker_count(&self, tenant_id: &str) -> ConfigReadResult<usize> {
        self.get_parsed_or_default(
            tenant_id,
            config_keys::WORKER_COUNT,
            EngineConfig::default().worker_count,
        )
    }

    async fn get_renormalize_batch_size(&self, tenant_id: &str) -> ConfigReadResult<usize> {
        self.get_parsed_or_default(
            tenant_id,
            config_keys::RENORMALIZE_BATCH_SIZE,
            EngineConfig::default().renormalize_batch_size,
        )
    }

    async fn get_brand_field(&self, tenant_id: &str) -> ConfigReadResult<String> {
        self.get_text_or_default(tenant_id, config_keys::BRAND_FIELD, EngineConfig::default().brand_field)
    }

    async fn get_model_field(&self, tenant_id: &str) -> ConfigReadResult<String> {
        self.get_text_or_default(tenant_id, config_keys::MODEL_FIELD, EngineConfig::default().model_field)
    }
}
