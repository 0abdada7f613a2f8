// ==========================================
// 导入规范化引擎 - 运行快照
// ==========================================
// 职责: 单次运行只加载一次的只读快照（目录 + 规则 + 别名 + 参考实体）
// 红线: 运行中规则被编辑不影响本次运行（整批一致）
// ==========================================

use crate::domain::alias::{ModelAlias, ReferenceEntity};
use crate::domain::catalogue::CanonicalField;
use crate::domain::rule::ImportRule;
use crate::domain::types::RuleType;
use crate::normalizer::error::{NormalizeError, NormalizeResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ImportSnapshot {
    pub tenant_id: String,
    pub catalogue: Vec<CanonicalField>,
    pub rules: Vec<ImportRule>,
    pub aliases: Vec<ModelAlias>,
    pub references: Vec<ReferenceEntity>,
    pub loaded_at: DateTime<Utc>,
    field_index: HashMap<String, usize>,
    reference_index: HashMap<(String, String), usize>,
}

impl ImportSnapshot {
    /// 构造并校验快照
    ///
    /// # 规则
    /// - 目录为空 → CatalogueLoad（结构性错误）
    /// - 字段名为空/重复 → InvalidSnapshot
    /// - 仅保留本租户、启用中的规则；其他租户的别名/参考实体被过滤
    pub fn new(
        tenant_id: impl Into<String>,
        mut catalogue: Vec<CanonicalField>,
        rules: Vec<ImportRule>,
        aliases: Vec<ModelAlias>,
        references: Vec<ReferenceEntity>,
    ) -> NormalizeResult<Self> {
        let tenant_id = tenant_id.into();

        if catalogue.is_empty() {
            return Err(NormalizeError::CatalogueLoad {
                tenant_id,
                message: "标准字段目录为空".to_string(),
            });
        }

        catalogue.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.field_name.cmp(&b.field_name))
        });

        let mut field_index = HashMap::with_capacity(catalogue.len());
        for (idx, field) in catalogue.iter().enumerate() {
            if field.field_name.trim().is_empty() {
                return Err(NormalizeError::InvalidSnapshot(format!(
                    "第 {} 个标准字段名称为空",
                    idx + 1
                )));
            }
            if field_index.insert(field.field_name.clone(), idx).is_some() {
                return Err(NormalizeError::InvalidSnapshot(format!(
                    "标准字段重复: {}",
                    field.field_name
                )));
            }
        }

        let total_rules = rules.len();
        let mut rules: Vec<ImportRule> = rules
            .into_iter()
            .filter(|r| r.is_active && r.tenant_id == tenant_id)
            .collect();
        rules.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        if rules.len() != total_rules {
            debug!(
                total = total_rules,
                active = rules.len(),
                "已过滤停用或其他租户的规则"
            );
        }

        let aliases: Vec<ModelAlias> = aliases
            .into_iter()
            .filter(|a| a.tenant_id == tenant_id)
            .collect();

        let references: Vec<ReferenceEntity> = references
            .into_iter()
            .filter(|r| r.tenant_id == tenant_id)
            .collect();
        let mut reference_index = HashMap::with_capacity(references.len());
        for (idx, r) in references.iter().enumerate() {
            reference_index.insert((r.table.clone(), r.id.clone()), idx);
        }

        for rule in &rules {
            if let Some(target) = rule.target_field() {
                if !field_index.contains_key(target) {
                    warn!(
                        rule_id = %rule.rule_id,
                        target_field = %target,
                        "column_mapping 规则指向目录中不存在的字段，将被忽略"
                    );
                }
            }
        }

        Ok(Self {
            tenant_id,
            catalogue,
            rules,
            aliases,
            references,
            loaded_at: Utc::now(),
            field_index,
            reference_index,
        })
    }

    pub fn field(&self, field_name: &str) -> Option<&CanonicalField> {
        self.field_index
            .get(field_name)
            .map(|&idx| &self.catalogue[idx])
    }

    pub fn reference(&self, table: &str, id: &str) -> Option<&ReferenceEntity> {
        self.reference_index
            .get(&(table.to_string(), id.to_string()))
            .map(|&idx| &self.references[idx])
    }

    pub fn rules_of(&self, rule_type: RuleType) -> impl Iterator<Item = &ImportRule> {
        self.rules.iter().filter(move |r| r.rule_type() == rule_type)
    }

    /// 作用于指定字段的某类规则
    pub fn field_rules<'a>(
        &'a self,
        rule_type: RuleType,
        field_name: &'a str,
    ) -> impl Iterator<Item = &'a ImportRule> {
        self.rules_of(rule_type)
            .filter(move |r| r.applies_to(field_name))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &CanonicalField> {
        self.catalogue.iter().filter(|f| f.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::RuleOutput;
    use crate::domain::types::FieldKind;

    fn field(name: &str, order: i32) -> CanonicalField {
        CanonicalField {
            field_name: name.to_string(),
            display_name: name.to_string(),
            kind: FieldKind::Direct,
            required: false,
            sort_order: order,
            keywords: vec![],
        }
    }

    fn rule(id: &str, tenant: &str, active: bool) -> ImportRule {
        ImportRule {
            rule_id: id.to_string(),
            tenant_id: tenant.to_string(),
            applies_to_field: None,
            input_keywords: vec!["serial".to_string()],
            output: RuleOutput::ColumnMapping {
                target_field: "serial_number".to_string(),
            },
            priority: 0,
            is_active: active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_catalogue_is_structural() {
        let err = ImportSnapshot::new("t1", vec![], vec![], vec![], vec![]).unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(err, NormalizeError::CatalogueLoad { .. }));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = ImportSnapshot::new(
            "t1",
            vec![field("brand", 1), field("brand", 2)],
            vec![],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_filters_inactive_and_foreign_rules() {
        let snapshot = ImportSnapshot::new(
            "t1",
            vec![field("serial_number", 1)],
            vec![rule("r2", "t1", true), rule("r1", "t2", true), rule("r3", "t1", false)],
            vec![],
            vec![],
        )
        .unwrap();

        let ids: Vec<_> = snapshot.rules.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["r2"]);
    }

    #[test]
    fn test_catalogue_sorted_by_sort_order() {
        let snapshot = ImportSnapshot::new(
            "t1",
            vec![field("model", 3), field("brand", 1), field("serial_number", 2)],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let names: Vec<_> = snapshot
            .catalogue
            .iter()
            .map(|f| f.field_name.as_str())
            .collect();
        assert_eq!(names, vec!["brand", "serial_number", "model"]);
        assert_eq!(snapshot.field("model").unwrap().sort_order, 3);
    }

    #[test]
    fn test_reference_lookup() {
        let snapshot = ImportSnapshot::new(
            "t1",
            vec![field("product_type", 1)],
            vec![],
            vec![],
            vec![
                ReferenceEntity {
                    tenant_id: "t1".to_string(),
                    table: "product_type".to_string(),
                    id: "PT-LAPTOP".to_string(),
                    display_name: "Laptop".to_string(),
                },
                ReferenceEntity {
                    tenant_id: "t2".to_string(),
                    table: "product_type".to_string(),
                    id: "PT-DESKTOP".to_string(),
                    display_name: "Desktop".to_string(),
                },
            ],
        )
        .unwrap();

        assert_eq!(
            snapshot.reference("product_type", "PT-LAPTOP").unwrap().display_name,
            "Laptop"
        );
        assert!(snapshot.reference("product_type", "PT-DESKTOP").is_none());
    }
}
