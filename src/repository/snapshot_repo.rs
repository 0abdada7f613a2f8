// ==========================================
// 导入规范化引擎 - 快照数据 Repository Trait
// ==========================================
// 职责: 定义标准目录 / 导入规则 / 型号别名 / 参考实体的数据访问接口
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::alias::{ModelAlias, ReferenceEntity};
use crate::domain::catalogue::CanonicalField;
use crate::domain::rule::ImportRule;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// SnapshotRepository Trait
// ==========================================
// 用途: 每次运行加载一次快照；管理员维护规则与别名
// 实现者: SnapshotRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    // ===== 快照加载 =====

    /// 加载租户的标准字段目录
    async fn load_catalogue(&self, tenant_id: &str) -> RepositoryResult<Vec<CanonicalField>>;

    /// 加载租户启用中的导入规则
    ///
    /// # 返回
    /// - Err(InvalidStoredValue): 存在未知规则类型或损坏的关键字 JSON（结构性错误）
    async fn load_rules(&self, tenant_id: &str) -> RepositoryResult<Vec<ImportRule>>;

    /// 加载租户的型号别名表
    async fn load_aliases(&self, tenant_id: &str) -> RepositoryResult<Vec<ModelAlias>>;

    /// 加载租户的参考实体
    async fn load_references(&self, tenant_id: &str) -> RepositoryResult<Vec<ReferenceEntity>>;

    // ===== 管理员维护 =====

    async fn upsert_canonical_field(
        &self,
        tenant_id: &str,
        field: &CanonicalField,
    ) -> RepositoryResult<()>;

    async fn upsert_reference(&self, reference: &ReferenceEntity) -> RepositoryResult<()>;

    /// 新增规则（调整优先级即写入新的 priority）
    async fn insert_rule(&self, rule: &ImportRule) -> RepositoryResult<()>;

    async fn set_rule_active(&self, rule_id: &str, is_active: bool) -> RepositoryResult<()>;

    async fn insert_model_alias(&self, alias: &ModelAlias) -> RepositoryResult<()>;
}
