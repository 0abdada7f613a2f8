// ==========================================
// 导入规范化引擎 - 取值规范化器
// ==========================================
// 职责: 枚举类字段的自由文本 → 参考实体 id
// 规则:
// 1. 完全匹配直接胜出，置信度 100
// 2. 否则包含匹配，置信度按命中长度缩放，冲突裁决器取最优
// 3. 否则保留原始文本 + Warning，从不置空
// 红线: 指向已删除参考实体的规则按未解析处理，绝不伪造
// ==========================================

use crate::domain::record::{Diagnostic, ResolvedValue};
use crate::domain::rule::RuleOutput;
use crate::domain::types::RuleType;
use crate::normalizer::conflict_resolver::{RuleCandidate, RuleConflictResolver};
use crate::normalizer::keyword_matcher::{best_keyword_match, normalize_text};
use crate::normalizer::snapshot::ImportSnapshot;
use tracing::{debug, warn};

/// 取值解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ValueResolution {
    pub value: ResolvedValue,
    pub confidence: u8,
    pub rule_id: Option<String>,
    pub resolved: bool,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValueNormalizer<'s> {
    snapshot: &'s ImportSnapshot,
    min_containment_len: usize,
}

impl<'s> ValueNormalizer<'s> {
    pub fn new(snapshot: &'s ImportSnapshot, min_containment_len: usize) -> Self {
        Self {
            snapshot,
            min_containment_len,
        }
    }

    /// 字段是否为枚举类（存在作用于该字段的 value_lookup 规则）
    pub fn is_enum_like(&self, field_name: &str) -> bool {
        self.snapshot
            .field_rules(RuleType::ValueLookup, field_name)
            .next()
            .is_some()
    }

    /// 规范化单个取值
    pub fn normalize(&self, field_name: &str, raw_value: &str) -> ValueResolution {
        let normalized = normalize_text(raw_value);
        let mut diagnostics = Vec::new();

        let mut exact = Vec::new();
        let mut partial = Vec::new();

        for rule in self.snapshot.field_rules(RuleType::ValueLookup, field_name) {
            let Some(hit) =
                best_keyword_match(&normalized, &rule.input_keywords, self.min_containment_len)
            else {
                continue;
            };

            // 悬空规则：参考实体已不存在
            if let RuleOutput::ValueLookup {
                reference_table,
                reference_id,
            } = &rule.output
            {
                if self.snapshot.reference(reference_table, reference_id).is_none() {
                    warn!(
                        rule_id = %rule.rule_id,
                        reference = %format!("{}/{}", reference_table, reference_id),
                        "value_lookup 规则指向的参考实体不存在"
                    );
                    diagnostics.push(Diagnostic::warning(
                        field_name,
                        format!(
                            "规则 {} 指向的参考实体 {}/{} 不存在，按未解析处理",
                            rule.rule_id, reference_table, reference_id
                        ),
                    ));
                    continue;
                }
            }

            let candidate = RuleCandidate { rule, hit };
            if candidate.hit.exact {
                exact.push(candidate);
            } else {
                partial.push(candidate);
            }
        }

        let is_exact = !exact.is_empty();
        let winner = if is_exact {
            RuleConflictResolver::pick(exact)
        } else {
            RuleConflictResolver::pick(partial)
        };

        if let Some(winner) = winner {
            if let RuleOutput::ValueLookup {
                reference_table,
                reference_id,
            } = &winner.rule.output
            {
                if let Some(entity) = self.snapshot.reference(reference_table, reference_id) {
                    let confidence = if is_exact { 100 } else { winner.hit.confidence() };
                    if !is_exact {
                        diagnostics.push(Diagnostic::warning(
                            field_name,
                            format!(
                                "取值 '{}' 模糊匹配到 {}（关键字 '{}'，置信度 {}），需人工确认",
                                raw_value.trim(),
                                entity.display_name,
                                winner.hit.keyword,
                                confidence
                            ),
                        ));
                    }
                    debug!(
                        field = %field_name,
                        value = %raw_value,
                        rule_id = %winner.rule.rule_id,
                        confidence,
                        "取值命中规则"
                    );
                    return ValueResolution {
                        value: ResolvedValue::Reference {
                            table: entity.table.clone(),
                            id: entity.id.clone(),
                            display_name: entity.display_name.clone(),
                        },
                        confidence,
                        rule_id: Some(winner.rule.rule_id.clone()),
                        resolved: true,
                        diagnostics,
                    };
                }
            }
        }

        diagnostics.push(Diagnostic::warning(
            field_name,
            format!("未能解析取值 '{}'，保留原始文本", raw_value.trim()),
        ));
        ValueResolution {
            value: ResolvedValue::text(raw_value.trim()),
            confidence: 0,
            rule_id: None,
            resolved: false,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alias::ReferenceEntity;
    use crate::domain::catalogue::CanonicalField;
    use crate::domain::rule::ImportRule;
    use crate::domain::types::{FieldKind, Severity};
    use chrono::{Duration, TimeZone, Utc};

    fn lookup(id: &str, keywords: &[&str], ref_id: &str, priority: i32, age_days: i64) -> ImportRule {
        ImportRule {
            rule_id: id.to_string(),
            tenant_id: "t1".to_string(),
            applies_to_field: Some("product_type".to_string()),
            input_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            output: RuleOutput::ValueLookup {
                reference_table: "product_type".to_string(),
                reference_id: ref_id.to_string(),
            },
            priority,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
                - Duration::days(age_days),
        }
    }

    fn reference(id: &str, name: &str) -> ReferenceEntity {
        ReferenceEntity {
            tenant_id: "t1".to_string(),
            table: "product_type".to_string(),
            id: id.to_string(),
            display_name: name.to_string(),
        }
    }

    fn snapshot(rules: Vec<ImportRule>) -> ImportSnapshot {
        ImportSnapshot::new(
            "t1",
            vec![
                CanonicalField {
                    field_name: "product_type".to_string(),
                    display_name: "Product Type".to_string(),
                    kind: FieldKind::Direct,
                    required: true,
                    sort_order: 1,
                    keywords: vec![],
                },
                CanonicalField {
                    field_name: "serial_number".to_string(),
                    display_name: "Serial".to_string(),
                    kind: FieldKind::Direct,
                    required: false,
                    sort_order: 2,
                    keywords: vec![],
                },
            ],
            rules,
            vec![],
            vec![
                reference("PT-LAPTOP", "Laptop"),
                reference("PT-DESKTOP", "Desktop"),
                reference("PT-MONITOR", "Monitor"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_notebooks_resolves_to_laptop() {
        let snap = snapshot(vec![lookup("r-laptop", &["notebook", "laptop"], "PT-LAPTOP", 0, 0)]);
        let normalizer = ValueNormalizer::new(&snap, 2);

        let res = normalizer.normalize("product_type", "Notebooks");
        assert!(res.resolved);
        assert_eq!(res.confidence, 100);
        assert_eq!(res.value.display(), "Laptop");
        assert_eq!(res.rule_id.as_deref(), Some("r-laptop"));
        assert!(res.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolvable_value_passes_through() {
        let snap = snapshot(vec![lookup("r-laptop", &["notebook", "laptop"], "PT-LAPTOP", 0, 0)]);
        let normalizer = ValueNormalizer::new(&snap, 2);

        let res = normalizer.normalize("product_type", "Gizmo9000");
        assert!(!res.resolved);
        assert_eq!(res.value, ResolvedValue::text("Gizmo9000"));
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_exact_wins_over_higher_priority_partial() {
        let snap = snapshot(vec![
            lookup("r-desktop", &["desktop pc"], "PT-DESKTOP", 50, 0),
            lookup("r-monitor", &["desktop"], "PT-MONITOR", 1, 0),
        ]);
        let normalizer = ValueNormalizer::new(&snap, 2);

        let res = normalizer.normalize("product_type", "Desktop");
        assert_eq!(res.rule_id.as_deref(), Some("r-monitor"));
        assert_eq!(res.confidence, 100);
    }

    #[test]
    fn test_partial_match_scaled_confidence() {
        let snap = snapshot(vec![lookup("r-laptop", &["laptop"], "PT-LAPTOP", 0, 0)]);
        let normalizer = ValueNormalizer::new(&snap, 2);

        let res = normalizer.normalize("product_type", "Gaming Laptop");
        assert!(res.resolved);
        // "laptop" 6 / "gaming laptop" 13
        assert_eq!(res.confidence, 46);
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_partial_highest_priority_wins() {
        let snap = snapshot(vec![
            lookup("r-laptop", &["book"], "PT-LAPTOP", 1, 0),
            lookup("r-desktop", &["station"], "PT-DESKTOP", 9, 0),
        ]);
        let normalizer = ValueNormalizer::new(&snap, 2);
        let res = normalizer.normalize("product_type", "Book Station");
        assert_eq!(res.rule_id.as_deref(), Some("r-desktop"));
    }

    #[test]
    fn test_dangling_reference_never_fabricated() {
        let snap = snapshot(vec![
            lookup("r-ghost", &["tablet"], "PT-TABLET", 99, 0),
        ]);
        let normalizer = ValueNormalizer::new(&snap, 2);

        let res = normalizer.normalize("product_type", "Tablet");
        assert!(!res.resolved);
        assert_eq!(res.value, ResolvedValue::text("Tablet"));
        assert_eq!(res.diagnostics.len(), 2);
        assert!(res.diagnostics[0].message.contains("r-ghost"));
    }

    #[test]
    fn test_dangling_rule_falls_back_to_next_candidate() {
        let snap = snapshot(vec![
            lookup("r-ghost", &["laptop"], "PT-GONE", 99, 0),
            lookup("r-laptop", &["laptop"], "PT-LAPTOP", 1, 0),
        ]);
        let normalizer = ValueNormalizer::new(&snap, 2);

        let res = normalizer.normalize("product_type", "laptop");
        assert!(res.resolved);
        assert_eq!(res.rule_id.as_deref(), Some("r-laptop"));
        assert_eq!(res.diagnostics.len(), 1);
    }

    #[test]
    fn test_is_enum_like() {
        let snap = snapshot(vec![lookup("r-laptop", &["laptop"], "PT-LAPTOP", 0, 0)]);
        let normalizer = ValueNormalizer::new(&snap, 2);
        assert!(normalizer.is_enum_like("product_type"));
        assert!(!normalizer.is_enum_like("serial_number"));
    }
}
