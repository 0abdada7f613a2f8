// ==========================================
// 导入规范化引擎 - 关键字匹配器
// ==========================================
// 职责: 文本标准化 + 文本与关键字集合的打分（纯函数）
// 打分: 完全相等 1.0 / 包含关系 短串长度÷长串长度 / 否则 0
// 复数: 去 s / es 后相等也算完全相等，词干至少 4 个字符；
//       "boxes" 这类短词干复数不还原，按包含关系打分
// ==========================================

/// 保留的有意义符号（"serial#"、"s/n" 不能被抹平）
const KEPT_SYMBOLS: [char; 5] = ['#', '/', '%', '&', '+'];

/// 标准化文本：小写 + 去首尾空白 + 其他标点/空白折叠为单个空格
pub fn normalize_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.chars() {
        if ch.is_alphanumeric() || KEPT_SYMBOLS.contains(&ch) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }

    out
}

/// 单个关键字命中结果
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub keyword: String,    // 标准化后的关键字
    pub score: f64,         // 0.0 - 1.0
    pub matched_len: usize, // 文本中实际出现的关键字字符数
    pub exact: bool,
}

impl KeywordMatch {
    /// 置信度（0-100）
    pub fn confidence(&self) -> u8 {
        (self.score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 复数还原后词干的最小字符数（"notes" 不还原为 "not"）
const MIN_SINGULAR_STEM_LEN: usize = 4;

/// 去掉简单复数后缀（s / es），词干过短时不还原
fn singular_forms(s: &str) -> Vec<&str> {
    let mut forms = vec![s];
    for stem in [s.strip_suffix("es"), s.strip_suffix('s')].into_iter().flatten() {
        if char_len(stem) >= MIN_SINGULAR_STEM_LEN {
            forms.push(stem);
        }
    }
    forms
}

fn is_exact(text: &str, keyword: &str) -> bool {
    if text == keyword {
        return true;
    }
    let text_forms = singular_forms(text);
    let keyword_forms = singular_forms(keyword);
    text_forms
        .iter()
        .any(|t| keyword_forms.iter().any(|k| !t.is_empty() && t == k))
}

/// 对已标准化的文本与关键字打分
///
/// # 参数
/// - text / keyword: 均已经过 normalize_text
/// - min_containment_len: 包含匹配时较短一方的最小字符数
///
/// # 返回
/// - None: 无命中
pub fn score_keyword(text: &str, keyword: &str, min_containment_len: usize) -> Option<KeywordMatch> {
    if text.is_empty() || keyword.is_empty() {
        return None;
    }

    if is_exact(text, keyword) {
        return Some(KeywordMatch {
            keyword: keyword.to_string(),
            score: 1.0,
            matched_len: char_len(keyword),
            exact: true,
        });
    }

    let text_len = char_len(text);
    let keyword_len = char_len(keyword);

    // 文本包含关键字：关键字完整出现
    if text.contains(keyword) && keyword_len >= min_containment_len {
        return Some(KeywordMatch {
            keyword: keyword.to_string(),
            score: keyword_len as f64 / text_len as f64,
            matched_len: keyword_len,
            exact: false,
        });
    }

    // 关键字包含文本：只有文本那部分是真实出现的
    if keyword.contains(text) && text_len >= min_containment_len {
        return Some(KeywordMatch {
            keyword: keyword.to_string(),
            score: text_len as f64 / keyword_len as f64,
            matched_len: text_len,
            exact: false,
        });
    }

    None
}

/// 在关键字集合中取最佳命中
///
/// 排序: score 降序 → matched_len 降序 → 关键字字典序（保证确定性）
pub fn best_keyword_match<S: AsRef<str>>(
    text: &str,
    keywords: &[S],
    min_containment_len: usize,
) -> Option<KeywordMatch> {
    let mut best: Option<KeywordMatch> = None;

    for raw_keyword in keywords {
        let keyword = normalize_text(raw_keyword.as_ref());
        let Some(hit) = score_keyword(text, &keyword, min_containment_len) else {
            continue;
        };

        let better = match &best {
            None => true,
            Some(current) => {
                hit.score
                    .total_cmp(&current.score)
                    .then(hit.matched_len.cmp(&current.matched_len))
                    .then(current.keyword.cmp(&hit.keyword))
                    .is_gt()
            }
        };
        if better {
            best = Some(hit);
        }
    }

    best
}

/// 触发关键字判断：关键字完整出现在文本中
pub fn contains_keyword(text: &str, raw_keyword: &str) -> Option<KeywordMatch> {
    let keyword = normalize_text(raw_keyword);
    if keyword.is_empty() || !text.contains(keyword.as_str()) {
        return None;
    }
    let matched_len = char_len(&keyword);
    Some(KeywordMatch {
        exact: text == keyword,
        score: matched_len as f64 / char_len(text).max(1) as f64,
        matched_len,
        keyword,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_punctuation() {
        assert_eq!(normalize_text("  Serial   No. "), "serial no");
        assert_eq!(normalize_text("Product_Type"), "product type");
        assert_eq!(normalize_text("CPU-Model (GHz)"), "cpu model ghz");
        assert_eq!(normalize_text("\tRAM\n"), "ram");
    }

    #[test]
    fn test_normalize_text_keeps_significant_symbols() {
        assert_eq!(normalize_text("S/N"), "s/n");
        assert_eq!(normalize_text("Serial#"), "serial#");
        assert_eq!(normalize_text("2x8GB DDR4 + 1x16GB"), "2x8gb ddr4 + 1x16gb");
    }

    #[test]
    fn test_plural_stripping_needs_real_stem() {
        assert!(score_keyword("notebooks", "notebook", 2).unwrap().exact);
        assert!(score_keyword("laptops", "laptop", 2).unwrap().exact);

        let notes = score_keyword("notes", "not", 2).unwrap();
        assert!(!notes.exact);
        assert!(notes.confidence() < 100);
        assert!(!score_keyword("maces", "mac", 2).unwrap().exact);
    }

    #[test]
    fn test_exact_match_scores_one() {
        let hit = score_keyword("serial", "serial", 2).unwrap();
        assert!(hit.exact);
        assert_eq!(hit.score, 1.0);
        assert_eq!(hit.matched_len, 6);
        assert_eq!(hit.confidence(), 100);
    }

    #[test]
    fn test_plural_counts_as_exact() {
        let hit = score_keyword("notebooks", "notebook", 2).unwrap();
        assert!(hit.exact);
        assert_eq!(hit.confidence(), 100);

        // 词干 "box" 过短，不还原，按包含关系打分
        let hit = score_keyword("boxes", "box", 2).unwrap();
        assert!(!hit.exact);
        assert_eq!(hit.confidence(), 60);
    }

    #[test]
    fn test_text_contains_keyword() {
        let hit = score_keyword("serial#", "serial", 2).unwrap();
        assert!(!hit.exact);
        assert_eq!(hit.matched_len, 6);
        assert!((hit.score - 6.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_contains_text_uses_text_length() {
        let hit = score_keyword("s/n", "s/n#", 2).unwrap();
        assert!(!hit.exact);
        assert_eq!(hit.matched_len, 3);
        assert!((hit.score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_min_containment_len() {
        assert!(score_keyword("gpu model", "g", 2).is_none());
        assert!(score_keyword("gpu model", "g", 1).is_some());
    }

    #[test]
    fn test_no_match() {
        assert!(score_keyword("gizmo9000", "laptop", 2).is_none());
        assert!(score_keyword("", "laptop", 2).is_none());
    }

    #[test]
    fn test_best_keyword_prefers_exact() {
        let keywords = vec!["serial".to_string(), "S/N".to_string()];
        let hit = best_keyword_match("s/n", &keywords, 2).unwrap();
        assert_eq!(hit.keyword, "s/n");
        assert!(hit.exact);
    }

    #[test]
    fn test_contains_keyword_trigger() {
        let hit = contains_keyword("2x8gb ddr4 + 1x16gb ddr4", "DDR").unwrap();
        assert_eq!(hit.matched_len, 3);
        assert!(contains_keyword("512gb ssd", "ddr").is_none());
    }
}
