// ==========================================
// 导入规范化引擎 - 标准字段目录
// ==========================================
// 用途: 外部提供，单次运行内只读
// 对齐: canonical_field 表
// ==========================================

use crate::domain::types::FieldKind;
use serde::{Deserialize, Serialize};

/// 规格字段名前缀
pub const SPECIFICATION_PREFIX: &str = "specifications.";

// ==========================================
// CanonicalField - 标准字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalField {
    pub field_name: String,    // 点分名称（如 specifications.cpu）
    pub display_name: String,  // 显示名称
    pub kind: FieldKind,       // direct / specification
    pub required: bool,        // 必填标记
    pub sort_order: i32,       // 排序
    pub keywords: Vec<String>, // 同义词
}

impl CanonicalField {
    /// 点分名称的最后一段（specifications.ram → ram）
    pub fn short_name(&self) -> &str {
        self.field_name
            .rsplit('.')
            .next()
            .unwrap_or(self.field_name.as_str())
    }

    /// 规格字段在嵌套映射中的键
    ///
    /// direct 字段返回 None
    pub fn specification_key(&self) -> Option<&str> {
        match self.kind {
            FieldKind::Specification => Some(
                self.field_name
                    .strip_prefix(SPECIFICATION_PREFIX)
                    .unwrap_or(self.field_name.as_str()),
            ),
            FieldKind::Direct => None,
        }
    }

    /// 目录自带的兜底同义词：keywords + 显示名称 + 短名称
    pub fn synonyms(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.keywords.iter().map(String::as_str).collect();
        out.push(self.display_name.as_str());
        out.push(self.short_name());
        out
    }
}
