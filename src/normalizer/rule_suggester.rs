// ==========================================
// 导入规范化引擎 - 规则建议器
// ==========================================
// 职责: 无规则命中但存在强模糊候选时，生成"建议新增规则"
// 相似度: Jaro-Winkler（strsim），阈值默认 0.85
// 红线: 建议从不自动生效，必须由管理员审批
// ==========================================

use crate::domain::record::{ProposalTarget, RuleProposal};
use crate::domain::rule::RuleOutput;
use crate::domain::types::RuleType;
use crate::normalizer::field_resolver::FieldResolution;
use crate::normalizer::keyword_matcher::normalize_text;
use crate::normalizer::snapshot::ImportSnapshot;
use std::collections::BTreeMap;
use strsim::jaro_winkler;
use uuid::Uuid;

/// 单次命中的建议候选（未去重）
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalCandidate {
    pub rule_type: RuleType,
    pub applies_to_field: Option<String>,
    pub target: ProposalTarget,
    pub keyword: String,
    pub similarity: f64,
    pub sample_text: String,
}

pub struct RuleSuggester<'s> {
    snapshot: &'s ImportSnapshot,
    threshold: f64,
}

impl<'s> RuleSuggester<'s> {
    pub fn new(snapshot: &'s ImportSnapshot, threshold: f64) -> Self {
        Self {
            snapshot,
            threshold,
        }
    }

    /// 列头建议：与目录字段的同义词/名称最相近者
    pub fn suggest_column(&self, resolution: &FieldResolution) -> Option<ProposalCandidate> {
        let header = &resolution.normalized_header;
        if header.is_empty() || resolution.matched_rule() {
            return None;
        }

        let mut best: Option<(f64, &str)> = None;
        for field in &self.snapshot.catalogue {
            for synonym in field.synonyms() {
                let similarity = jaro_winkler(header, &normalize_text(synonym));
                if best.map_or(true, |(s, _)| similarity > s) {
                    best = Some((similarity, field.field_name.as_str()));
                }
            }
        }

        let (similarity, field_name) = best?;
        if similarity < self.threshold {
            return None;
        }
        Some(ProposalCandidate {
            rule_type: RuleType::ColumnMapping,
            applies_to_field: None,
            target: ProposalTarget::Field {
                field_name: field_name.to_string(),
            },
            keyword: header.clone(),
            similarity,
            sample_text: resolution.raw_header.clone(),
        })
    }

    /// 取值建议：与该字段 value_lookup 关键字最相近者（仅指向存在的参考实体）
    pub fn suggest_value(&self, field_name: &str, raw_value: &str) -> Option<ProposalCandidate> {
        let normalized = normalize_text(raw_value);
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &str, &str)> = None;
        for rule in self.snapshot.field_rules(RuleType::ValueLookup, field_name) {
            let RuleOutput::ValueLookup {
                reference_table,
                reference_id,
            } = &rule.output
            else {
                continue;
            };
            if self.snapshot.reference(reference_table, reference_id).is_none() {
                continue;
            }
            for keyword in &rule.input_keywords {
                let similarity = jaro_winkler(&normalized, &normalize_text(keyword));
                if best.map_or(true, |(s, _, _)| similarity > s) {
                    best = Some((similarity, reference_table, reference_id));
                }
            }
        }

        let (similarity, table, id) = best?;
        if similarity < self.threshold {
            return None;
        }
        Some(ProposalCandidate {
            rule_type: RuleType::ValueLookup,
            applies_to_field: Some(field_name.to_string()),
            target: ProposalTarget::Reference {
                table: table.to_string(),
                id: id.to_string(),
            },
            keyword: normalized,
            similarity,
            sample_text: raw_value.trim().to_string(),
        })
    }
}

// ==========================================
// ProposalCollector - 建议去重与计数
// ==========================================
// 键: (规则类型, 作用字段, 目标, 关键字)
#[derive(Debug, Default)]
pub struct ProposalCollector {
    entries: BTreeMap<(RuleType, Option<String>, String, String), RuleProposal>,
}

fn target_key(target: &ProposalTarget) -> String {
    match target {
        ProposalTarget::Field { field_name } => format!("field:{}", field_name),
        ProposalTarget::Reference { table, id } => format!("reference:{}/{}", table, id),
    }
}

impl ProposalCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次候选，occurrences 累加 count
    pub fn record(&mut self, candidate: ProposalCandidate, count: usize) {
        let key = (
            candidate.rule_type,
            candidate.applies_to_field.clone(),
            target_key(&candidate.target),
            candidate.keyword.clone(),
        );
        self.entries
            .entry(key)
            .and_modify(|p| p.occurrences += count)
            .or_insert_with(|| RuleProposal {
                proposal_id: Uuid::new_v4().to_string(),
                rule_type: candidate.rule_type,
                applies_to_field: candidate.applies_to_field,
                target: candidate.target,
                keywords: vec![candidate.keyword],
                similarity: candidate.similarity,
                sample_text: candidate.sample_text,
                occurrences: count,
            });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按 (相似度 降序, 关键字 升序) 输出
    pub fn finish(self) -> Vec<RuleProposal> {
        let mut proposals: Vec<RuleProposal> = self.entries.into_values().collect();
        proposals.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.keywords.cmp(&b.keywords))
                .then_with(|| target_key(&a.target).cmp(&target_key(&b.target)))
        });
        proposals
    }
}
