// ==========================================
// 导入规范化引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 供应商表格导入的规范化与规则解析（人工最终确认）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 规范化层 - 解析与管道
pub mod normalizer;

// 配置层 - 引擎配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FieldKind, ResolutionSource, RuleType, Severity};

// 领域实体
pub use domain::{
    CanonicalField, ComponentExtraction, Diagnostic, ImportRule, ImportRunResult, ModelAlias,
    NormalizedRecord, RawImportRow, ReferenceEntity, RuleOutput, RuleProposal,
};

// 规范化
pub use normalizer::{
    ImportNormalizationPipeline, ImportSnapshot, NormalizationService, NormalizeError,
    NormalizeResult, RenormalizeOptions, RenormalizeReport,
};

// 配置
pub use config::{ConfigManager, EngineConfig, EngineConfigReader};

// 仓储
pub use repository::{
    ModelRecordRepository, ModelRecordRepositoryImpl, RepositoryError, SnapshotRepository,
    SnapshotRepositoryImpl,
};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const APP_NAME: &str = "导入规范化引擎";
