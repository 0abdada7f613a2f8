// ==========================================
// 导入规范化引擎 - 领域模型层
// ==========================================
// 职责: 定义目录、规则、别名、导入行与规范化记录
// 红线: 不含数据访问逻辑，不含解析逻辑
// ==========================================

pub mod alias;
pub mod catalogue;
pub mod record;
pub mod rule;
pub mod types;

// 重导出核心类型
pub use alias::{ModelAlias, ReferenceEntity, StoredModelRecord};
pub use catalogue::{CanonicalField, SPECIFICATION_PREFIX};
pub use record::{
    ComponentExtraction, Diagnostic, FieldValue, ImportRunResult, NormalizedRecord,
    ProposalTarget, RawImportRow, ResolvedValue, RuleProposal, RunSummary,
};
pub use rule::{ImportRule, RuleOutput};
pub use types::{FieldKind, ResolutionSource, RuleType, Severity};
