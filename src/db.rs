// ==========================================
// 导入规范化引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供建表脚本（幂等）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表脚本（CREATE IF NOT EXISTS，可重复执行）
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS canonical_field (
    tenant_id TEXT NOT NULL,
    field_name TEXT NOT NULL,
    display_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    keywords_json TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (tenant_id, field_name)
);

CREATE TABLE IF NOT EXISTS import_rule (
    rule_id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    rule_type TEXT NOT NULL,
    applies_to_field TEXT,
    input_keywords_json TEXT NOT NULL DEFAULT '[]',
    target_field TEXT,
    reference_table TEXT,
    reference_id TEXT,
    parser_id TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_import_rule_tenant ON import_rule (tenant_id, is_active);

CREATE TABLE IF NOT EXISTS reference_entity (
    tenant_id TEXT NOT NULL,
    ref_table TEXT NOT NULL,
    ref_id TEXT NOT NULL,
    display_name TEXT NOT NULL,
    PRIMARY KEY (tenant_id, ref_table, ref_id)
);

CREATE TABLE IF NOT EXISTS model_alias (
    tenant_id TEXT NOT NULL,
    brand TEXT NOT NULL,
    variant_name TEXT NOT NULL,
    canonical_name TEXT NOT NULL,
    full_model_name TEXT NOT NULL DEFAULT '',
    confidence INTEGER NOT NULL DEFAULT 100,
    PRIMARY KEY (tenant_id, brand, variant_name)
);

CREATE TABLE IF NOT EXISTS product_record (
    record_id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    brand TEXT,
    model TEXT,
    payload_json TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_product_record_tenant ON product_record (tenant_id, record_id);

CREATE TABLE IF NOT EXISTS renormalize_checkpoint (
    tenant_id TEXT PRIMARY KEY,
    last_record_id INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先级: 环境变量 IMPORT_NORMALIZER_DB_PATH → <data_dir>/import-normalizer/import_normalizer.db
/// → 当前目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var("IMPORT_NORMALIZER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./import_normalizer.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("import-normalizer");
        // 目录创建失败时由后续打开连接报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("import_normalizer.db");
    }
    path.to_string_lossy().to_string()
}

/// 建表并登记 schema_version（幂等）
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    match read_schema_version(conn)? {
        Some(v) if v == CURRENT_SCHEMA_VERSION => {}
        Some(v) => {
            warn!(
                found = v,
                expected = CURRENT_SCHEMA_VERSION,
                "schema_version 与当前代码不一致"
            );
        }
        None => {
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![CURRENT_SCHEMA_VERSION, chrono::Utc::now().to_rfc3339()],
            )?;
            info!(version = CURRENT_SCHEMA_VERSION, "数据库结构已初始化");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_default_db_path() {
        let path = default_db_path();
        assert!(path.ends_with(".db"));
    }
}
