// ==========================================
// 导入规范化引擎 - 型号别名与参考实体
// ==========================================
// 红线: 别名只能由管理员显式创建，管道从不隐式新增
// 对齐: model_alias / reference_entity / product_record 表
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ModelAlias - 型号别名（多对一）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAlias {
    pub tenant_id: String,
    pub brand: String,
    pub variant_name: String,   // 供应商写法（如 "840 G10"）
    pub canonical_name: String, // 标准写法（如 "EliteBook 840 G10"）
    pub full_model_name: String, // 完整型号（为空时由 brand + canonical_name 组成）
    pub confidence: u8,
}

impl ModelAlias {
    /// 完整型号名称
    pub fn resolved_full_name(&self) -> String {
        let full = self.full_model_name.trim();
        if full.is_empty() {
            format!("{} {}", self.brand.trim(), self.canonical_name.trim())
        } else {
            full.to_string()
        }
    }
}

// ==========================================
// ReferenceEntity - 参考实体
// ==========================================
// value_lookup 规则的解析目标（table + id）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    pub tenant_id: String,
    pub table: String,
    pub id: String,
    pub display_name: String,
}

// ==========================================
// StoredModelRecord - 已落库的型号记录
// ==========================================
// 用途: 批量重规范化的输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredModelRecord {
    pub record_id: i64,
    pub tenant_id: String,
    pub brand: Option<String>,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(full: &str) -> ModelAlias {
        ModelAlias {
            tenant_id: "t1".to_string(),
            brand: "HP".to_string(),
            variant_name: "840 G10".to_string(),
            canonical_name: "EliteBook 840 G10".to_string(),
            full_model_name: full.to_string(),
            confidence: 100,
        }
    }

    #[test]
    fn test_full_name_composed_when_empty() {
        assert_eq!(alias("").resolved_full_name(), "HP EliteBook 840 G10");
        assert_eq!(alias("  ").resolved_full_name(), "HP EliteBook 840 G10");
    }

    #[test]
    fn test_full_name_kept_when_present() {
        assert_eq!(
            alias("HP EliteBook 840 G10 Notebook PC").resolved_full_name(),
            "HP EliteBook 840 G10 Notebook PC"
        );
    }
}
