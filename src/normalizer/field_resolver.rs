// ==========================================
// 导入规范化引擎 - 字段解析器
// ==========================================
// 职责: 原始列头 → 标准字段
// 流程: 标准化列头 → column_mapping 规则打分 → 冲突裁决
//       → 无规则命中时回退到目录同义词 → 仍无命中则未映射
// ==========================================

use crate::domain::catalogue::CanonicalField;
use crate::domain::types::{ResolutionSource, RuleType};
use crate::normalizer::conflict_resolver::{RuleCandidate, RuleConflictResolver};
use crate::normalizer::keyword_matcher::{best_keyword_match, normalize_text, KeywordMatch};
use crate::normalizer::snapshot::ImportSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// FieldResolution - 列头解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub raw_header: String,
    pub normalized_header: String,
    pub field_name: Option<String>,
    pub source: Option<ResolutionSource>,
    pub rule_id: Option<String>,
    pub matched_keyword: Option<String>,
    pub confidence: u8,
    pub exact: bool,
}

impl FieldResolution {
    fn unmapped(raw_header: &str, normalized_header: String) -> Self {
        Self {
            raw_header: raw_header.to_string(),
            normalized_header,
            field_name: None,
            source: None,
            rule_id: None,
            matched_keyword: None,
            confidence: 0,
            exact: false,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.field_name.is_some()
    }

    /// 是否由租户规则命中
    pub fn matched_rule(&self) -> bool {
        self.source == Some(ResolutionSource::Rule)
    }
}

// ==========================================
// HeaderCache - 列头解析缓存
// ==========================================
// 同一文件每行列头重复，按原始列头缓存一次
#[derive(Debug, Clone, Default)]
pub struct HeaderCache {
    entries: HashMap<String, FieldResolution>,
}

impl HeaderCache {
    pub fn get(&self, raw_header: &str) -> Option<&FieldResolution> {
        self.entries.get(raw_header)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 未映射列头（排序后返回）
    pub fn unmapped_headers(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .entries
            .values()
            .filter(|r| !r.is_mapped())
            .map(|r| r.raw_header.clone())
            .collect();
        out.sort();
        out
    }

    /// 没有规则命中的列头（未映射 + 仅靠目录同义词模糊命中），建议器的输入
    pub fn headers_without_rule(&self) -> Vec<&FieldResolution> {
        let mut out: Vec<&FieldResolution> = self
            .entries
            .values()
            .filter(|r| !r.matched_rule() && !r.exact)
            .collect();
        out.sort_by(|a, b| a.raw_header.cmp(&b.raw_header));
        out
    }
}

// ==========================================
// FieldResolver - 字段解析器
// ==========================================
pub struct FieldResolver<'s> {
    snapshot: &'s ImportSnapshot,
    min_containment_len: usize,
}

impl<'s> FieldResolver<'s> {
    pub fn new(snapshot: &'s ImportSnapshot, min_containment_len: usize) -> Self {
        Self {
            snapshot,
            min_containment_len,
        }
    }

    /// 解析单个列头
    pub fn resolve(&self, raw_header: &str) -> FieldResolution {
        let normalized = normalize_text(raw_header);
        if normalized.is_empty() {
            return FieldResolution::unmapped(raw_header, normalized);
        }

        // 1. 租户规则
        let candidates: Vec<RuleCandidate<'_>> = self
            .snapshot
            .rules_of(RuleType::ColumnMapping)
            .filter(|rule| {
                rule.target_field()
                    .map(|target| self.snapshot.field(target).is_some())
                    .unwrap_or(false)
            })
            .filter_map(|rule| {
                best_keyword_match(&normalized, &rule.input_keywords, self.min_containment_len)
                    .map(|hit| RuleCandidate { rule, hit })
            })
            .collect();

        if let Some(winner) = RuleConflictResolver::pick(candidates) {
            debug!(
                header = %raw_header,
                rule_id = %winner.rule.rule_id,
                keyword = %winner.hit.keyword,
                score = winner.hit.score,
                "列头命中规则"
            );
            return FieldResolution {
                raw_header: raw_header.to_string(),
                normalized_header: normalized,
                field_name: winner.rule.target_field().map(str::to_string),
                source: Some(ResolutionSource::Rule),
                rule_id: Some(winner.rule.rule_id.clone()),
                confidence: winner.hit.confidence(),
                exact: winner.hit.exact,
                matched_keyword: Some(winner.hit.keyword),
            };
        }

        // 2. 目录同义词兜底
        if let Some((field, hit)) = self.best_catalogue_match(&normalized) {
            debug!(
                header = %raw_header,
                field = %field.field_name,
                score = hit.score,
                "列头命中目录同义词"
            );
            return FieldResolution {
                raw_header: raw_header.to_string(),
                normalized_header: normalized,
                field_name: Some(field.field_name.clone()),
                source: Some(ResolutionSource::Catalogue),
                rule_id: None,
                confidence: hit.confidence(),
                exact: hit.exact,
                matched_keyword: Some(hit.keyword),
            };
        }

        debug!(header = %raw_header, "列头未映射");
        FieldResolution::unmapped(raw_header, normalized)
    }

    fn best_catalogue_match(&self, normalized: &str) -> Option<(&'s CanonicalField, KeywordMatch)> {
        let mut best: Option<(&'s CanonicalField, KeywordMatch)> = None;

        // 目录已按 sort_order 排序，同分时先出现者胜出
        let snapshot = self.snapshot;
        for field in &snapshot.catalogue {
            let Some(hit) = best_keyword_match(normalized, &field.synonyms(), self.min_containment_len)
            else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((_, current)) => hit
                    .score
                    .total_cmp(&current.score)
                    .then(hit.matched_len.cmp(&current.matched_len))
                    .is_gt(),
            };
            if better {
                best = Some((field, hit));
            }
        }

        best
    }

    /// 对一组列头逐个解析（去重）并生成缓存
    pub fn resolve_all<'h, I>(&self, headers: I) -> HeaderCache
    where
        I: IntoIterator<Item = &'h str>,
    {
        let mut entries = HashMap::new();
        for header in headers {
            if !entries.contains_key(header) {
                entries.insert(header.to_string(), self.resolve(header));
            }
        }
        HeaderCache { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{ImportRule, RuleOutput};
    use crate::domain::types::FieldKind;
    use chrono::{Duration, TimeZone, Utc};

    fn field(name: &str, display: &str, keywords: &[&str], order: i32) -> CanonicalField {
        CanonicalField {
            field_name: name.to_string(),
            display_name: display.to_string(),
            kind: FieldKind::Direct,
            required: false,
            sort_order: order,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn mapping(id: &str, keywords: &[&str], target: &str, priority: i32, age_days: i64) -> ImportRule {
        ImportRule {
            rule_id: id.to_string(),
            tenant_id: "t1".to_string(),
            applies_to_field: None,
            input_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            output: RuleOutput::ColumnMapping {
                target_field: target.to_string(),
            },
            priority,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
                - Duration::days(age_days),
        }
    }

    fn snapshot(rules: Vec<ImportRule>) -> ImportSnapshot {
        ImportSnapshot::new(
            "t1",
            vec![
                field("serial_number", "Serial Number", &[], 1),
                field("custom_ref", "Custom Reference", &[], 2),
                field("brand", "Brand", &["manufacturer", "make"], 3),
                field("specifications.cpu", "Processor", &["cpu"], 4),
            ],
            rules,
            vec![],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_serial_vs_serial_hash() {
        let snap = snapshot(vec![
            mapping("r-serial", &["serial"], "serial_number", 10, 5),
            mapping("r-custom", &["serial#"], "custom_ref", 10, 5),
        ]);
        let resolver = FieldResolver::new(&snap, 2);

        let plain = resolver.resolve("Serial");
        assert_eq!(plain.field_name.as_deref(), Some("serial_number"));
        assert!(plain.exact);

        let hashed = resolver.resolve("Serial#");
        assert_eq!(hashed.field_name.as_deref(), Some("custom_ref"));
        assert_eq!(hashed.confidence, 100);
    }

    #[test]
    fn test_s_slash_n_resolves_to_serial_number() {
        let snap = snapshot(vec![
            mapping("r-serial", &["serial", "s/n"], "serial_number", 10, 5),
            mapping("r-custom", &["s/n#"], "custom_ref", 10, 1),
        ]);
        let resolver = FieldResolver::new(&snap, 2);

        let res = resolver.resolve("S/N");
        assert_eq!(res.field_name.as_deref(), Some("serial_number"));
        assert_eq!(res.rule_id.as_deref(), Some("r-serial"));
        assert_eq!(res.source, Some(ResolutionSource::Rule));
    }

    #[test]
    fn test_priority_beats_exactness() {
        let snap = snapshot(vec![
            mapping("r-low", &["serial no"], "serial_number", 1, 0),
            mapping("r-high", &["serial"], "custom_ref", 20, 0),
        ]);
        let resolver = FieldResolver::new(&snap, 2);
        let res = resolver.resolve("Serial No.");
        assert_eq!(res.field_name.as_deref(), Some("custom_ref"));
        assert!(!res.exact);
        assert_eq!(res.confidence, 67);
    }

    #[test]
    fn test_equal_rules_resolve_to_later_created() {
        let snap = snapshot(vec![
            mapping("r-old", &["ref"], "serial_number", 5, 30),
            mapping("r-new", &["ref"], "custom_ref", 5, 1),
        ]);
        let resolver = FieldResolver::new(&snap, 2);
        for _ in 0..10 {
            assert_eq!(
                resolver.resolve("REF").field_name.as_deref(),
                Some("custom_ref")
            );
        }
    }

    #[test]
    fn test_rule_to_unknown_field_ignored() {
        let snap = snapshot(vec![mapping("r-ghost", &["serial"], "ghost_field", 99, 0)]);
        let resolver = FieldResolver::new(&snap, 2);
        let res = resolver.resolve("Serial");
        // 回退到目录同义词（短名称 serial_number 包含 serial）
        assert_eq!(res.field_name.as_deref(), Some("serial_number"));
        assert_eq!(res.source, Some(ResolutionSource::Catalogue));
        assert!(!res.exact);
    }

    #[test]
    fn test_catalogue_fallback_exact() {
        let snap = snapshot(vec![]);
        let resolver = FieldResolver::new(&snap, 2);
        let res = resolver.resolve("Manufacturer");
        assert_eq!(res.field_name.as_deref(), Some("brand"));
        assert!(res.exact);
        assert_eq!(res.source, Some(ResolutionSource::Catalogue));

        let res = resolver.resolve("processor");
        assert_eq!(res.field_name.as_deref(), Some("specifications.cpu"));
    }

    #[test]
    fn test_unmapped_header() {
        let snap = snapshot(vec![]);
        let resolver = FieldResolver::new(&snap, 2);
        let res = resolver.resolve("Warehouse Bin");
        assert!(!res.is_mapped());
        assert_eq!(res.confidence, 0);

        assert!(!resolver.resolve("   ").is_mapped());
    }

    #[test]
    fn test_header_cache_dedupes() {
        let snap = snapshot(vec![mapping("r-serial", &["serial"], "serial_number", 1, 0)]);
        let resolver = FieldResolver::new(&snap, 2);
        let cache = resolver.resolve_all(["Serial", "Serial", "Warehouse Bin", "Brand"]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.unmapped_headers(), vec!["Warehouse Bin".to_string()]);
        assert!(cache.get("Serial").unwrap().matched_rule());
    }
}
