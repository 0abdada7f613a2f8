// ==========================================
// 导入规范化引擎 - 规则冲突裁决器
// ==========================================
// 职责: 所有解析器共用的候选规则排序
// 排序键: priority 降序 → 命中关键字长度 降序 → 命中分数 降序
//         → created_at 降序 → rule_id 升序
// 红线: 全序、确定性，不依赖 HashMap/HashSet 遍历顺序
// ==========================================

use crate::domain::rule::ImportRule;
use crate::normalizer::keyword_matcher::KeywordMatch;
use std::cmp::Ordering;

/// 候选规则（规则 + 命中信息）
#[derive(Debug, Clone)]
pub struct RuleCandidate<'a> {
    pub rule: &'a ImportRule,
    pub hit: KeywordMatch,
}

pub struct RuleConflictResolver;

impl RuleConflictResolver {
    /// 比较两个候选，排在前面的胜出
    pub fn compare(a: &RuleCandidate<'_>, b: &RuleCandidate<'_>) -> Ordering {
        b.rule
            .priority
            .cmp(&a.rule.priority)
            .then_with(|| b.hit.matched_len.cmp(&a.hit.matched_len))
            .then_with(|| b.hit.score.total_cmp(&a.hit.score))
            .then_with(|| b.rule.created_at.cmp(&a.rule.created_at))
            .then_with(|| a.rule.rule_id.cmp(&b.rule.rule_id))
    }

    /// 原地排序
    pub fn order(candidates: &mut [RuleCandidate<'_>]) {
        candidates.sort_by(Self::compare);
    }

    /// 取胜出候选
    pub fn pick(mut candidates: Vec<RuleCandidate<'_>>) -> Option<RuleCandidate<'_>> {
        Self::order(&mut candidates);
        candidates.into_iter().next()
    }
}
