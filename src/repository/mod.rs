// ==========================================
// 导入规范化引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod error;
pub mod model_record_repo;
pub mod model_record_repo_impl;
pub mod snapshot_repo;
pub mod snapshot_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use model_record_repo::ModelRecordRepository;
pub use model_record_repo_impl::ModelRecordRepositoryImpl;
pub use snapshot_repo::SnapshotRepository;
pub use snapshot_repo_impl::SnapshotRepositoryImpl;
