// ==========================================
// 导入规范化引擎 - 规范化层
// ==========================================
// 职责: 原始表格行 → 标准记录
// 组成: 字段解析 / 取值规范化 / 型号别名 / 组件解析 / 冲突裁决 / 管道
// ==========================================

// 模块声明
pub mod component_parser;
pub mod conflict_resolver;
pub mod error;
pub mod field_resolver;
pub mod keyword_matcher;
pub mod model_alias_resolver;
pub mod normalizer_trait;
pub mod pipeline;
pub mod renormalizer;
pub mod rule_suggester;
pub mod service;
pub mod snapshot;
pub mod value_normalizer;

// 重导出核心类型
pub use component_parser::{
    CapacityTechnologyParser, ComponentParserRegistry, CAPACITY_TECHNOLOGY_PARSER_ID,
};
pub use conflict_resolver::{RuleCandidate, RuleConflictResolver};
pub use error::{NormalizeError, NormalizeResult};
pub use field_resolver::{FieldResolution, FieldResolver, HeaderCache};
pub use keyword_matcher::{normalize_text, KeywordMatch};
pub use model_alias_resolver::{ModelAliasResolver, ModelResolution};
pub use pipeline::{ImportNormalizationPipeline, PipelineOutput};
pub use renormalizer::{ModelRenormalizer, RenormalizeOptions, RenormalizeReport};
pub use rule_suggester::{ProposalCollector, RuleSuggester};
pub use service::NormalizationService;
pub use snapshot::ImportSnapshot;
pub use value_normalizer::{ValueNormalizer, ValueResolution};

// 重导出 Trait 接口
pub use normalizer_trait::ComponentParser;
