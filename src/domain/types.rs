// ==========================================
// 导入规范化引擎 - 领域类型定义
// ==========================================
// 职责: 字段类别 / 规则类型 / 诊断级别等枚举
// 序列化格式: snake_case (与存储表一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 字段类别 (Field Kind)
// ==========================================
// direct: 标量字段，落到主表
// specification: 规格字段，落到嵌套的 specifications 映射
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Direct,
    Specification,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Direct => write!(f, "direct"),
            FieldKind::Specification => write!(f, "specification"),
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(FieldKind::Direct),
            "specification" | "spec" => Ok(FieldKind::Specification),
            other => Err(format!("未知字段类别: {}", other)),
        }
    }
}

// ==========================================
// 规则类型 (Rule Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    ColumnMapping,    // 列头 → 标准字段
    ValueLookup,      // 取值 → 参考实体
    ComponentPattern, // 规格文本 → 解析器
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::ColumnMapping => write!(f, "column_mapping"),
            RuleType::ValueLookup => write!(f, "value_lookup"),
            RuleType::ComponentPattern => write!(f, "component_pattern"),
        }
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "column_mapping" => Ok(RuleType::ColumnMapping),
            "value_lookup" => Ok(RuleType::ValueLookup),
            "component_pattern" => Ok(RuleType::ComponentPattern),
            other => Err(format!("未知规则类型: {}", other)),
        }
    }
}

// ==========================================
// 诊断级别 (Severity)
// ==========================================
// 顺序: Info < Warning < Error
// Error: 必填字段未解析，阻断提交
// Warning: 模糊/部分匹配，需人工确认
// Info: 可选字段未映射，仅记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 字段解析来源 (Resolution Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Rule,      // 命中租户规则
    Catalogue, // 命中目录同义词（兜底）
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_round_trip_text() {
        for t in [
            RuleType::ColumnMapping,
            RuleType::ValueLookup,
            RuleType::ComponentPattern,
        ] {
            assert_eq!(t.to_string().parse::<RuleType>().unwrap(), t);
        }
        assert!("drag_drop".parse::<RuleType>().is_err());
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_field_kind_parse() {
        assert_eq!("Direct".parse::<FieldKind>().unwrap(), FieldKind::Direct);
        assert_eq!(
            "specification".parse::<FieldKind>().unwrap(),
            FieldKind::Specification
        );
    }
}
