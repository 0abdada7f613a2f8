// ==========================================
// 导入规范化引擎 - 解析器 Trait
// ==========================================
// 职责: 定义组件解析接口（不包含实现）
// ==========================================

use crate::domain::record::ComponentExtraction;

// ==========================================
// ComponentParser Trait
// ==========================================
// 用途: 规格文本 → 组件条目（component_pattern 规则按 parser_id 选用）
// 实现者: CapacityTechnologyParser
pub trait ComponentParser: Send + Sync {
    /// 解析器标识（与规则的 parser_id 对应）
    fn parser_id(&self) -> &str;

    /// 解析规格文本
    ///
    /// # 参数
    /// - source_field: 来源标准字段名
    /// - component_type: 组件类型（如 "memory"）
    /// - raw_text: 原始单元格文本
    ///
    /// # 返回
    /// - 组件条目列表；无法识别的剩余文本以 confidence = 0 的条目保留，从不丢弃
    fn parse(
        &self,
        source_field: &str,
        component_type: &str,
        raw_text: &str,
    ) -> Vec<ComponentExtraction>;
}
