// ==========================================
// 导入规范化引擎 - 快照数据 Repository 实现
// ==========================================
// 职责: 实现快照相关数据访问（使用 rusqlite）
// 存储: 关键字为 JSON 数组，时间为 RFC 3339
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::alias::{ModelAlias, ReferenceEntity};
use crate::domain::catalogue::CanonicalField;
use crate::domain::rule::{ImportRule, RuleOutput};
use crate::domain::types::{FieldKind, RuleType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::snapshot_repo::SnapshotRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// import_rule 表的原始行
struct RuleRow {
    rule_id: String,
    tenant_id: String,
    rule_type: String,
    applies_to_field: Option<String>,
    input_keywords_json: String,
    target_field: Option<String>,
    reference_table: Option<String>,
    reference_id: Option<String>,
    parser_id: Option<String>,
    priority: i32,
    is_active: bool,
    created_at: String,
}

fn required_column(rule_id: &str, column: &str, value: Option<String>) -> RepositoryResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RepositoryError::invalid_value("import_rule", column, rule_id, "缺少规则输出"))
}

impl RuleRow {
    fn into_rule(self) -> RepositoryResult<ImportRule> {
        let rule_type: RuleType = self
            .rule_type
            .parse()
            .map_err(|e: String| RepositoryError::invalid_value("import_rule", "rule_type", &self.rule_type, e))?;

        let output = match rule_type {
            RuleType::ColumnMapping => RuleOutput::ColumnMapping {
                target_field: required_column(&self.rule_id, "target_field", self.target_field)?,
            },
            RuleType::ValueLookup => RuleOutput::ValueLookup {
                reference_table: required_column(&self.rule_id, "reference_table", self.reference_table)?,
                reference_id: required_column(&self.rule_id, "reference_id", self.reference_id)?,
            },
            RuleType::ComponentPattern => RuleOutput::ComponentPattern {
                parser_id: required_column(&self.rule_id, "parser_id", self.parser_id)?,
            },
        };

        let input_keywords: Vec<String> = serde_json::from_str(&self.input_keywords_json)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                RepositoryError::invalid_value("import_rule", "created_at", &self.created_at, e.to_string())
            })?;

        Ok(ImportRule {
            rule_id: self.rule_id,
            tenant_id: self.tenant_id,
            applies_to_field: self.applies_to_field,
            input_keywords,
            output,
            priority: self.priority,
            is_active: self.is_active,
            created_at,
        })
    }
}

// ==========================================
// SnapshotRepositoryImpl
// ==========================================
pub struct SnapshotRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl SnapshotRepository for SnapshotRepositoryImpl {
    async fn load_catalogue(&self, tenant_id: &str) -> RepositoryResult<Vec<CanonicalField>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT field_name, display_name, kind, required, sort_order, keywords_json
            FROM canonical_field
            WHERE tenant_id = ?1
            ORDER BY sort_order, field_name
            "#,
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, i32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut fields = Vec::new();
        for row in rows {
            let (field_name, display_name, kind, required, sort_order, keywords_json) = row?;
            let kind: FieldKind = kind
                .parse()
                .map_err(|e: String| RepositoryError::invalid_value("canonical_field", "kind", &field_name, e))?;
            fields.push(CanonicalField {
                field_name,
                display_name,
                kind,
                required,
                sort_order,
                keywords: serde_json::from_str(&keywords_json)?,
            });
        }
        Ok(fields)
    }

    async fn load_rules(&self, tenant_id: &str) -> RepositoryResult<Vec<ImportRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT rule_id, tenant_id, rule_type, applies_to_field, input_keywords_json,
                   target_field, reference_table, reference_id, parser_id,
                   priority, is_active, created_at
            FROM import_rule
            WHERE tenant_id = ?1 AND is_active = 1
            ORDER BY rule_id
            "#,
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok(RuleRow {
                rule_id: row.get(0)?,
                tenant_id: row.get(1)?,
                rule_type: row.get(2)?,
                applies_to_field: row.get(3)?,
                input_keywords_json: row.get(4)?,
                target_field: row.get(5)?,
                reference_table: row.get(6)?,
                reference_id: row.get(7)?,
                parser_id: row.get(8)?,
                priority: row.get(9)?,
                is_active: row.get(10)?,
                created_at: row.get(11)?,
            })
        })?;

        let mut rules = Vec::new();
        for row in rows {
            rules.push(row?.into_rule()?);
        }
        Ok(rules)
    }

    async fn load_aliases(&self, tenant_id: &str) -> RepositoryResult<Vec<ModelAlias>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT tenant_id, brand, variant_name, canonical_name, full_model_name, confidence
            FROM model_alias
            WHERE tenant_id = ?1
            ORDER BY brand, variant_name
            "#,
        )?;

        let aliases = stmt
            .query_map(params![tenant_id], |row| {
                Ok(ModelAlias {
                    tenant_id: row.get(0)?,
                    brand: row.get(1)?,
                    variant_name: row.get(2)?,
                    canonical_name: row.get(3)?,
                    full_model_name: row.get(4)?,
                    confidence: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aliases)
    }

    async fn load_references(&self, tenant_id: &str) -> RepositoryResult<Vec<ReferenceEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT tenant_id, ref_table, ref_id, display_name
            FROM reference_entity
            WHERE tenant_id = ?1
            ORDER BY ref_table, ref_id
            "#,
        )?;

        let references = stmt
            .query_map(params![tenant_id], |row| {
                Ok(ReferenceEntity {
                    tenant_id: row.get(0)?,
                    table: row.get(1)?,
                    id: row.get(2)?,
                    display_name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(references)
    }

    async fn upsert_canonical_field(
        &self,
        tenant_id: &str,
        field: &CanonicalField,
    ) -> RepositoryResult<()> {
        let keywords_json = serde_json::to_string(&field.keywords)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO canonical_field (
                tenant_id, field_name, display_name, kind, required, sort_order, keywords_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                tenant_id,
                field.field_name,
                field.display_name,
                field.kind.to_string(),
                field.required,
                field.sort_order,
                keywords_json,
            ],
        )?;
        Ok(())
    }

    async fn upsert_reference(&self, reference: &ReferenceEntity) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO reference_entity (tenant_id, ref_table, ref_id, display_name)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                reference.tenant_id,
                reference.table,
                reference.id,
                reference.display_name,
            ],
        )?;
        Ok(())
    }

    async fn insert_rule(&self, rule: &ImportRule) -> RepositoryResult<()> {
        let keywords_json = serde_json::to_string(&rule.input_keywords)?;
        let (target_field, reference_table, reference_id, parser_id) = match &rule.output {
            RuleOutput::ColumnMapping { target_field } => (Some(target_field), None, None, None),
            RuleOutput::ValueLookup {
                reference_table,
                reference_id,
            } => (None, Some(reference_table), Some(reference_id), None),
            RuleOutput::ComponentPattern { parser_id } => (None, None, None, Some(parser_id)),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_rule (
                rule_id, tenant_id, rule_type, applies_to_field, input_keywords_json,
                target_field, reference_table, reference_id, parser_id,
                priority, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                rule.rule_id,
                rule.tenant_id,
                rule.rule_type().to_string(),
                rule.applies_to_field,
                keywords_json,
                target_field,
                reference_table,
                reference_id,
                parser_id,
                rule.priority,
                rule.is_active,
                rule.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn set_rule_active(&self, rule_id: &str, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE import_rule SET is_active = ?1 WHERE rule_id = ?2",
            params![is_active, rule_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportRule".to_string(),
                id: rule_id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_model_alias(&self, alias: &ModelAlias) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO model_alias (
                tenant_id, brand, variant_name, canonical_name, full_model_name, confidence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                alias.tenant_id,
                alias.brand,
                alias.variant_name,
                alias.canonical_name,
                alias.full_model_name,
                alias.confidence,
            ],
        )?;
        Ok(())
    }
}
