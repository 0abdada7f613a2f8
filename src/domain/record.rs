// ==========================================
// 导入规范化引擎 - 导入行与规范化记录
// ==========================================
// 红线: 一行输入对应一条输出记录，从不丢行
// 红线: 必填字段未解析必须带 Error 诊断，不允许静默为空
// ==========================================

use crate::domain::types::{FieldKind, RuleType, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

// ==========================================
// RawImportRow - 原始导入行
// ==========================================
// 已拆分好的 (列头, 单元格) 序列，不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImportRow {
    pub row_index: usize,
    pub cells: Vec<(String, String)>,
}

impl RawImportRow {
    pub fn new(row_index: usize, cells: Vec<(String, String)>) -> Self {
        Self { row_index, cells }
    }
}

// ==========================================
// ResolvedValue - 解析后的取值
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedValue {
    Text {
        value: String,
    },
    Reference {
        table: String,
        id: String,
        display_name: String,
    },
    Model {
        brand: String,
        canonical_name: String,
        full_model_name: String,
    },
}

impl ResolvedValue {
    pub fn text(value: impl Into<String>) -> Self {
        ResolvedValue::Text {
            value: value.into(),
        }
    }

    /// 人可读的取值（品牌解析、日志等使用）
    pub fn display(&self) -> &str {
        match self {
            ResolvedValue::Text { value } => value,
            ResolvedValue::Reference { display_name, .. } => display_name,
            ResolvedValue::Model {
                full_model_name, ..
            } => full_model_name,
        }
    }

    /// 落库标量：文本原样，参考实体取 id，型号取完整名称
    pub fn scalar(&self) -> Value {
        match self {
            ResolvedValue::Text { value } => Value::String(value.clone()),
            ResolvedValue::Reference { id, .. } => Value::String(id.clone()),
            ResolvedValue::Model {
                full_model_name, ..
            } => Value::String(full_model_name.clone()),
        }
    }
}

// ==========================================
// FieldValue - 字段取值 + 置信度
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub kind: FieldKind,
    pub value: ResolvedValue,
    pub confidence: u8,           // 0-100
    pub rule_id: Option<String>,  // 产生该值的规则
    pub source_header: String,    // 来源列头
}

// ==========================================
// ComponentExtraction - 规格拆解出的组件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentExtraction {
    pub component_type: String,
    pub capacity: Option<String>,        // 如 "8GB"；剩余文本为 None
    pub technology_type: Option<String>, // 如 "DDR4"
    pub quantity: u32,
    pub confidence: u8, // 100 完整匹配 / 60 缺技术后缀 / 0 无法解析的剩余文本
    pub source_field: String,
    pub raw_text: String,
}

// ==========================================
// Diagnostic - 行级诊断
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl Diagnostic {
    pub fn info(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, field, message)
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, field, message)
    }

    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, field, message)
    }

    fn new(severity: Severity, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            field: field.into(),
            message: message.into(),
        }
    }
}

// ==========================================
// NormalizedRecord - 规范化记录
// ==========================================
// 输出后所有权移交给持久化层
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub row_index: usize,
    pub values: BTreeMap<String, FieldValue>, // 标准字段名 → 取值
    pub components: Vec<ComponentExtraction>,
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizedRecord {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            values: BTreeMap::new(),
            components: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldValue> {
        self.values.get(field_name)
    }

    pub fn is_populated(&self, field_name: &str) -> bool {
        self.values.contains_key(field_name)
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 是否阻断提交（Error 只用于必填字段未解析）
    pub fn is_blocked(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// 是否需要人工确认
    pub fn needs_review(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    /// 按级别分组（供 UI 展示）
    pub fn diagnostics_by_severity(&self) -> BTreeMap<Severity, Vec<&Diagnostic>> {
        let mut grouped: BTreeMap<Severity, Vec<&Diagnostic>> = BTreeMap::new();
        for d in &self.diagnostics {
            grouped.entry(d.severity).or_default().push(d);
        }
        grouped
    }

    /// 转换为落库结构
    ///
    /// - fields: direct 字段标量
    /// - specifications: 规格字段嵌套映射（键去掉 specifications. 前缀）
    /// - components: 独立可插入的组件列表
    pub fn to_persistence_json(&self) -> Value {
        let mut fields = Map::new();
        let mut specifications = Map::new();

        for (name, fv) in &self.values {
            match fv.kind {
                FieldKind::Direct => {
                    fields.insert(name.clone(), fv.value.scalar());
                }
                FieldKind::Specification => {
                    let key = name
                        .strip_prefix(crate::domain::catalogue::SPECIFICATION_PREFIX)
                        .unwrap_or(name.as_str());
                    specifications.insert(key.to_string(), fv.value.scalar());
                }
            }
        }

        json!({
            "row_index": self.row_index,
            "fields": fields,
            "specifications": specifications,
            "components": self.components,
            "diagnostics": self.diagnostics,
        })
    }
}

// ==========================================
// RuleProposal - 建议新增规则
// ==========================================
// 红线: 仅作建议，必须由管理员审批后才会落为规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalTarget {
    Field {
        field_name: String,
    },
    Reference {
        table: String,
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleProposal {
    pub proposal_id: String,
    pub rule_type: RuleType,
    pub applies_to_field: Option<String>,
    pub target: ProposalTarget,
    pub keywords: Vec<String>,
    pub similarity: f64,
    pub sample_text: String,
    pub occurrences: usize,
}

// ==========================================
// RunSummary / ImportRunResult - 运行结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub clean_rows: usize,   // 无 Warning / Error
    pub warning_rows: usize, // 需人工确认（无 Error）
    pub blocked_rows: usize, // 含 Error，阻断提交
    pub unmapped_headers: Vec<String>,
}

impl RunSummary {
    pub fn from_records(records: &[NormalizedRecord], unmapped_headers: Vec<String>) -> Self {
        let mut summary = RunSummary {
            total_rows: records.len(),
            unmapped_headers,
            ..Default::default()
        };
        for r in records {
            if r.is_blocked() {
                summary.blocked_rows += 1;
            } else if r.needs_review() {
                summary.warning_rows += 1;
            } else {
                summary.clean_rows += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunResult {
    pub run_id: String,
    pub tenant_id: String,
    pub records: Vec<NormalizedRecord>,
    pub proposals: Vec<RuleProposal>,
    pub summary: RunSummary,
    pub elapsed_time: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_value(kind: FieldKind, v: &str) -> FieldValue {
        FieldValue {
            kind,
            value: ResolvedValue::text(v),
            confidence: 100,
            rule_id: None,
            source_header: "h".to_string(),
        }
    }

    #[test]
    fn test_blocked_and_review_flags() {
        let mut record = NormalizedRecord::new(3);
        assert!(!record.is_blocked());
        assert!(!record.needs_review());

        record.push_diagnostic(Diagnostic::warning("product_type", "模糊匹配"));
        assert!(record.needs_review());
        assert!(!record.is_blocked());

        record.push_diagnostic(Diagnostic::error("serial_number", "必填字段未解析"));
        assert!(record.is_blocked());
    }

    #[test]
    fn test_diagnostics_grouped_by_severity() {
        let mut record = NormalizedRecord::new(0);
        record.push_diagnostic(Diagnostic::info("a", "x"));
        record.push_diagnostic(Diagnostic::warning("b", "y"));
        record.push_diagnostic(Diagnostic::info("c", "z"));

        let grouped = record.diagnostics_by_severity();
        assert_eq!(grouped[&Severity::Info].len(), 2);
        assert_eq!(grouped[&Severity::Warning].len(), 1);
        assert!(!grouped.contains_key(&Severity::Error));
    }

    #[test]
    fn test_persistence_json_splits_direct_and_specifications() {
        let mut record = NormalizedRecord::new(7);
        record
            .values
            .insert("serial_number".to_string(), text_value(FieldKind::Direct, "SN1"));
        record.values.insert(
            "specifications.ram".to_string(),
            text_value(FieldKind::Specification, "2x8GB DDR4"),
        );
        record.values.insert(
            "product_type".to_string(),
            FieldValue {
                kind: FieldKind::Direct,
                value: ResolvedValue::Reference {
                    table: "product_type".to_string(),
                    id: "PT-LAPTOP".to_string(),
                    display_name: "Laptop".to_string(),
                },
                confidence: 100,
                rule_id: Some("r1".to_string()),
                source_header: "Type".to_string(),
            },
        );

        let json = record.to_persistence_json();
        assert_eq!(json["row_index"], 7);
        assert_eq!(json["fields"]["serial_number"], "SN1");
        assert_eq!(json["fields"]["product_type"], "PT-LAPTOP");
        assert_eq!(json["specifications"]["ram"], "2x8GB DDR4");
        assert!(json["fields"].get("specifications.ram").is_none());
    }

    #[test]
    fn test_run_summary_counts() {
        let clean = NormalizedRecord::new(0);
        let mut warn = NormalizedRecord::new(1);
        warn.push_diagnostic(Diagnostic::warning("f", "w"));
        let mut blocked = NormalizedRecord::new(2);
        blocked.push_diagnostic(Diagnostic::warning("f", "w"));
        blocked.push_diagnostic(Diagnostic::error("g", "e"));

        let summary = RunSummary::from_records(&[clean, warn, blocked], vec!["x".to_string()]);
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.clean_rows, 1);
        assert_eq!(summary.warning_rows, 1);
        assert_eq!(summary.blocked_rows, 1);
        assert_eq!(summary.unmapped_headers, vec!["x".to_string()]);
    }
}
