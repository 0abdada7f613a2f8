// ==========================================
// 导入规范化引擎 - 导入规则
// ==========================================
// 红线: 规则对管道只读；输出为显式带标签的枚举
// 对齐: import_rule 表
// ==========================================

use crate::domain::types::RuleType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RuleOutput - 规则输出
// ==========================================
// 规则类型由输出变体决定，不会出现类型与输出不一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleOutput {
    ColumnMapping {
        target_field: String,
    },
    ValueLookup {
        reference_table: String,
        reference_id: String,
    },
    ComponentPattern {
        parser_id: String,
    },
}

impl RuleOutput {
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleOutput::ColumnMapping { .. } => RuleType::ColumnMapping,
            RuleOutput::ValueLookup { .. } => RuleType::ValueLookup,
            RuleOutput::ComponentPattern { .. } => RuleType::ComponentPattern,
        }
    }
}

// ==========================================
// ImportRule - 租户导入规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub applies_to_field: Option<String>, // value_lookup / component_pattern 的作用字段
    pub input_keywords: Vec<String>,
    pub output: RuleOutput,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ImportRule {
    pub fn rule_type(&self) -> RuleType {
        self.output.rule_type()
    }

    /// 规则是否作用于指定字段
    pub fn applies_to(&self, field_name: &str) -> bool {
        self.applies_to_field.as_deref() == Some(field_name)
    }

    /// column_mapping 规则的目标字段
    pub fn target_field(&self) -> Option<&str> {
        match &self.output {
            RuleOutput::ColumnMapping { target_field } => Some(target_field.as_str()),
            _ => None,
        }
    }

    /// component_pattern 规则的解析器 ID
    pub fn parser_id(&self) -> Option<&str> {
        match &self.output {
            RuleOutput::ComponentPattern { parser_id } => Some(parser_id.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_follows_output() {
        let rule = ImportRule {
            rule_id: "r1".to_string(),
            tenant_id: "t1".to_string(),
            applies_to_field: Some("specifications.ram".to_string()),
            input_keywords: vec!["ddr".to_string()],
            output: RuleOutput::ComponentPattern {
                parser_id: "capacity_technology".to_string(),
            },
            priority: 5,
            is_active: true,
            created_at: Utc::now(),
        };

        assert_eq!(rule.rule_type(), RuleType::ComponentPattern);
        assert_eq!(rule.parser_id(), Some("capacity_technology"));
        assert_eq!(rule.target_field(), None);
        assert!(rule.applies_to("specifications.ram"));
        assert!(!rule.applies_to("specifications.storage"));
    }

    #[test]
    fn test_rule_output_serializes_with_tag() {
        let output = RuleOutput::ValueLookup {
            reference_table: "product_type".to_string(),
            reference_id: "PT-LAPTOP".to_string(),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["rule_type"], "value_lookup");
        assert_eq!(json["reference_id"], "PT-LAPTOP");
    }
}
