// ==========================================
// 导入规范化引擎 - 组件解析器
// ==========================================
// 职责: 规格文本 → ComponentExtraction 列表
// 语法: [<qty>x]<capacity><unit> [<technology>]，以 + , / 分隔
// 歧义: 从左到右，每个位置取能组成合法条目的最长分段（贪婪最长匹配）
//       "1TB/2TB RAID" → 1TB（缺技术后缀）+ 2TB RAID，属已知限制
// 红线: 无法识别的剩余文本原样保留为 confidence = 0 的条目，不丢信息
// ==========================================

use crate::domain::record::ComponentExtraction;
use crate::normalizer::error::NormalizeResult;
use crate::normalizer::normalizer_trait::ComponentParser;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const CAPACITY_TECHNOLOGY_PARSER_ID: &str = "capacity_technology";

const SEPARATORS: [char; 3] = ['+', ',', '/'];

const TOKEN_PATTERN: &str = concat!(
    r"(?i)^(?:(\d+)\s*[x×*]\s*)?",
    r"(\d+(?:\.\d+)?)\s*(kb|mb|gb|tb)",
    r"(?:\s+([a-z][a-z0-9\-\.]*",
    r"(?:(?:\s+[a-z0-9][a-z0-9\-\.]*)|(?:\s*/\s*[a-z][a-z0-9\-\.]*))*))?$",
);

// ==========================================
// CapacityTechnologyParser
// ==========================================
pub struct CapacityTechnologyParser {
    token: Regex,
}

impl CapacityTechnologyParser {
    pub fn new() -> NormalizeResult<Self> {
        Ok(Self {
            token: Regex::new(TOKEN_PATTERN)?,
        })
    }

    /// 按分隔符切出分段（字节区间，含首尾空白）
    fn segment_spans(text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start = 0;
        for (idx, ch) in text.char_indices() {
            if SEPARATORS.contains(&ch) {
                spans.push((start, idx));
                start = idx + ch.len_utf8();
            }
        }
        spans.push((start, text.len()));
        spans
    }

    fn trim_run(run: &str) -> &str {
        run.trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
    }

    /// 位于 start 之前的分隔符及其两侧空白（原样）
    fn separator_joint(text: &str, start: usize) -> &str {
        let Some(sep_idx) = start.checked_sub(1) else {
            return " ";
        };
        if !text[sep_idx..].starts_with(&SEPARATORS[..]) {
            return " ";
        }
        let left = text[..sep_idx].trim_end().len();
        let after = &text[sep_idx + 1..];
        let right = sep_idx + 1 + (after.len() - after.trim_start().len());
        &text[left..right]
    }

    /// 尝试把一段文本解析为单个条目
    fn parse_token(
        &self,
        source_field: &str,
        component_type: &str,
        token: &str,
    ) -> Option<ComponentExtraction> {
        let caps = self.token.captures(token)?;

        let quantity = match caps.get(1) {
            Some(m) => m.as_str().parse::<u32>().ok()?,
            None => 1,
        };
        if quantity == 0 {
            return None;
        }

        let amount = caps.get(2)?.as_str();
        let unit = caps.get(3)?.as_str().to_uppercase();
        let technology_type = caps
            .get(4)
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "));

        Some(ComponentExtraction {
            component_type: component_type.to_string(),
            capacity: Some(format!("{}{}", amount, unit)),
            confidence: if technology_type.is_some() { 100 } else { 60 },
            technology_type,
            quantity,
            source_field: source_field.to_string(),
            raw_text: token.to_string(),
        })
    }
}

impl ComponentParser for CapacityTechnologyParser {
    fn parser_id(&self) -> &str {
        CAPACITY_TECHNOLOGY_PARSER_ID
    }

    fn parse(
        &self,
        source_field: &str,
        component_type: &str,
        raw_text: &str,
    ) -> Vec<ComponentExtraction> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let spans = Self::segment_spans(text);
        let mut extractions = Vec::new();
        let mut leftovers: Vec<(usize, &str)> = Vec::new();
        let mut leftover_start: Option<usize> = None;

        let mut i = 0;
        while i < spans.len() {
            // 当前位置的最长合法分段
            let matched = (i..spans.len()).rev().find_map(|j| {
                let slice = text[spans[i].0..spans[j].1].trim();
                if slice.is_empty() {
                    return None;
                }
                self.parse_token(source_field, component_type, slice)
                    .map(|extraction| (j, extraction))
            });

            match matched {
                Some((j, extraction)) => {
                    if let Some(start) = leftover_start.take() {
                        leftovers.push((start, Self::trim_run(&text[start..spans[i].0])));
                    }
                    extractions.push(extraction);
                    i = j + 1;
                }
                None => {
                    if leftover_start.is_none() && !text[spans[i].0..spans[i].1].trim().is_empty()
                    {
                        leftover_start = Some(spans[i].0);
                    }
                    i += 1;
                }
            }
        }
        if let Some(start) = leftover_start {
            leftovers.push((start, Self::trim_run(&text[start..])));
        }

        // 多段剩余文本之间保留原文中紧邻后一段的分隔符
        let mut leftover = String::new();
        for (start, run) in leftovers.into_iter().filter(|(_, run)| !run.is_empty()) {
            if !leftover.is_empty() {
                leftover.push_str(Self::separator_joint(text, start));
            }
            leftover.push_str(run);
        }
        if !leftover.is_empty() {
            debug!(
                field = %source_field,
                leftover = %leftover,
                "规格文本存在无法识别的剩余部分"
            );
            extractions.push(ComponentExtraction {
                component_type: component_type.to_string(),
                capacity: None,
                technology_type: None,
                quantity: 1,
                confidence: 0,
                source_field: source_field.to_string(),
                raw_text: leftover,
            });
        }

        extractions
    }
}

// ==========================================
// ComponentParserRegistry
// ==========================================
#[derive(Clone, Default)]
pub struct ComponentParserRegistry {
    parsers: HashMap<String, Arc<dyn ComponentParser>>,
}

impl ComponentParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册内置解析器
    pub fn with_defaults() -> NormalizeResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(CapacityTechnologyParser::new()?));
        Ok(registry)
    }

    pub fn register(&mut self, parser: Arc<dyn ComponentParser>) {
        self.parsers.insert(parser.parser_id().to_string(), parser);
    }

    pub fn get(&self, parser_id: &str) -> Option<&Arc<dyn ComponentParser>> {
        self.parsers.get(parser_id)
    }
}

impl std::fmt::Debug for ComponentParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.parsers.keys().collect();
        ids.sort();
        f.debug_struct("ComponentParserRegistry")
            .field("parsers", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ComponentExtraction> {
        CapacityTechnologyParser::new()
            .unwrap()
            .parse("specifications.ram", "ram", text)
    }

    #[test]
    fn test_memory_round_trip() {
        let items = parse("2x8GB DDR4 + 1x16GB DDR4");
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].capacity.as_deref(), Some("8GB"));
        assert_eq!(items[0].technology_type.as_deref(), Some("DDR4"));
        assert_eq!(items[0].confidence, 100);

        assert_eq!(items[1].quantity, 1);
        assert_eq!(items[1].capacity.as_deref(), Some("16GB"));
        assert_eq!(items[1].technology_type.as_deref(), Some("DDR4"));
        assert_eq!(items[1].confidence, 100);

        assert!(items.iter().all(|c| c.component_type == "ram"));
        assert!(items.iter().all(|c| c.source_field == "specifications.ram"));
    }

    #[test]
    fn test_bare_capacity_implies_single_quantity() {
        let items = parse("16gb lpddr5");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].capacity.as_deref(), Some("16GB"));
        assert_eq!(items[0].technology_type.as_deref(), Some("lpddr5"));
    }

    #[test]
    fn test_missing_technology_scores_sixty() {
        let items = parse("4 × 32GB");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);
        assert_eq!(items[0].confidence, 60);
        assert!(items[0].technology_type.is_none());
    }

    #[test]
    fn test_slash_ambiguity_left_to_right() {
        let items = parse("1TB/2TB RAID");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].capacity.as_deref(), Some("1TB"));
        assert!(items[0].technology_type.is_none());
        assert_eq!(items[1].capacity.as_deref(), Some("2TB"));
        assert_eq!(items[1].technology_type.as_deref(), Some("RAID"));
    }

    #[test]
    fn test_slash_joined_technology_is_longest_match() {
        let items = parse("512GB SSD/NVMe");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].technology_type.as_deref(), Some("SSD/NVMe"));
        assert_eq!(items[0].confidence, 100);
    }

    #[test]
    fn test_leftover_kept_verbatim() {
        let items = parse("8GB DDR4, soldered onboard + 1x8GB DDR4");
        assert_eq!(items.len(), 3);
        let leftover = items.last().unwrap();
        assert_eq!(leftover.confidence, 0);
        assert_eq!(leftover.raw_text, "soldered onboard");
        assert!(leftover.capacity.is_none());
    }

    #[test]
    fn test_separated_leftovers_keep_separator() {
        let items = parse("onboard + 8GB DDR4 + soldered, spare slot");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].capacity.as_deref(), Some("8GB"));
        assert_eq!(items[1].confidence, 0);
        assert_eq!(items[1].raw_text, "onboard + soldered, spare slot");

        let tight = parse("onboard/8GB DDR4,spare");
        assert_eq!(tight.last().unwrap().raw_text, "onboard,spare");
    }

    #[test]
    fn test_unparseable_text_single_leftover() {
        let items = parse("Intel Core i7-1365U");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].confidence, 0);
        assert_eq!(items[0].raw_text, "Intel Core i7-1365U");
    }

    #[test]
    fn test_zero_quantity_is_unparsed() {
        let items = parse("0x8GB DDR4");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].confidence, 0);
    }

    #[test]
    fn test_empty_text() {
        assert!(parse("   ").is_empty());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ComponentParserRegistry::with_defaults().unwrap();
        assert!(registry.get(CAPACITY_TECHNOLOGY_PARSER_ID).is_some());
        assert!(registry.get("unknown").is_none());
    }
}
