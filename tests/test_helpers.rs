// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、目录/规则/别名种子数据
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use import_normalizer::db::{initialize_schema, open_sqlite_connection};
use import_normalizer::domain::{
    CanonicalField, FieldKind, ImportRule, ModelAlias, RawImportRow, ReferenceEntity, RuleOutput,
};
use import_normalizer::repository::{SnapshotRepository, SnapshotRepositoryImpl};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const TENANT: &str = "acme";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    initialize_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()))
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn field(name: &str, kind: FieldKind, required: bool, keywords: &[&str], order: i32) -> CanonicalField {
    CanonicalField {
        field_name: name.to_string(),
        display_name: name.to_string(),
        kind,
        required,
        sort_order: order,
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn rule(
    id: &str,
    applies_to: Option<&str>,
    keywords: &[&str],
    output: RuleOutput,
    priority: i32,
    age_days: i64,
) -> ImportRule {
    ImportRule {
        rule_id: id.to_string(),
        tenant_id: TENANT.to_string(),
        applies_to_field: applies_to.map(str::to_string),
        input_keywords: keywords.iter().map(|s| s.to_string()).collect(),
        output,
        priority,
        is_active: true,
        created_at: base_time() - Duration::days(age_days),
    }
}

pub fn column(target: &str) -> RuleOutput {
    RuleOutput::ColumnMapping {
        target_field: target.to_string(),
    }
}

pub fn lookup(table: &str, id: &str) -> RuleOutput {
    RuleOutput::ValueLookup {
        reference_table: table.to_string(),
        reference_id: id.to_string(),
    }
}

pub fn alias(brand: &str, variant: &str, canonical: &str) -> ModelAlias {
    ModelAlias {
        tenant_id: TENANT.to_string(),
        brand: brand.to_string(),
        variant_name: variant.to_string(),
        canonical_name: canonical.to_string(),
        full_model_name: String::new(),
        confidence: 100,
    }
}

pub fn row(idx: usize, cells: &[(&str, &str)]) -> RawImportRow {
    RawImportRow::new(
        idx,
        cells
            .iter()
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect(),
    )
}

/// 写入标准场景：笔记本资产导入
pub async fn seed_standard_scenario(repo: &SnapshotRepositoryImpl) {
    let catalogue = vec![
        field("brand", FieldKind::Direct, true, &["manufacturer", "make"], 1),
        field("model", FieldKind::Direct, true, &["model name"], 2),
        field("product_type", FieldKind::Direct, true, &["category", "type"], 3),
        field("serial_number", FieldKind::Direct, false, &[], 4),
        field("custom_ref", FieldKind::Direct, false, &[], 5),
        field("specifications.ram", FieldKind::Specification, false, &["memory"], 6),
        field("specifications.storage", FieldKind::Specification, false, &["disk"], 7),
    ];
    for f in &catalogue {
        repo.upsert_canonical_field(TENANT, f).await.unwrap();
    }

    for (id, name) in [("PT-LAPTOP", "Laptop"), ("PT-DESKTOP", "Desktop")] {
        repo.upsert_reference(&ReferenceEntity {
            tenant_id: TENANT.to_string(),
            table: "product_type".to_string(),
            id: id.to_string(),
            display_name: name.to_string(),
        })
        .await
        .unwrap();
    }

    let rules = vec![
        rule("r-serial", None, &["serial", "s/n"], column("serial_number"), 10, 5),
        rule("r-custom", None, &["s/n#", "serial#"], column("custom_ref"), 10, 1),
        rule(
            "r-laptop",
            Some("product_type"),
            &["notebook", "laptop"],
            lookup("product_type", "PT-LAPTOP"),
            0,
            3,
        ),
        rule(
            "r-desktop",
            Some("product_type"),
            &["desktop", "tower"],
            lookup("product_type", "PT-DESKTOP"),
            0,
            3,
        ),
        rule(
            "r-ram",
            Some("specifications.ram"),
            &["gb", "mb"],
            RuleOutput::ComponentPattern {
                parser_id: "capacity_technology".to_string(),
            },
            0,
            2,
        ),
        rule(
            "r-storage",
            Some("specifications.storage"),
            &[],
            RuleOutput::ComponentPattern {
                parser_id: "capacity_technology".to_string(),
            },
            0,
            2,
        ),
    ];
    for r in &rules {
        repo.insert_rule(r).await.unwrap();
    }

    repo.insert_model_alias(&alias("HP", "840 G10", "EliteBook 840 G10"))
        .await
        .unwrap();
    repo.insert_model_alias(&alias("Dell", "7440", "Latitude 7440"))
        .await
        .unwrap();
}
