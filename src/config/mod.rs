// ==========================================
// 导入规范化引擎 - 配置层
// ==========================================
// 职责: 引擎配置管理，支持租户覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{ConfigManager, ConfigScope};
pub use engine_config::{config_keys, EngineConfig};
pub use import_config_trait::{ConfigReadResult, EngineConfigReader};
