// ==========================================
// 导入规范化引擎 - 已存储记录 Repository Trait
// ==========================================
// 职责: 型号批量重规范化所需的分页读取 / 型号更新 / 断点管理
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::alias::StoredModelRecord;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ModelRecordRepository Trait
// ==========================================
// 实现者: ModelRecordRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ModelRecordRepository: Send + Sync {
    /// 按 record_id 升序分页读取
    ///
    /// # 参数
    /// - after_id: 仅返回 record_id 大于该值的记录（None 从头开始）
    /// - limit: 每页条数
    async fn fetch_page(
        &self,
        tenant_id: &str,
        after_id: Option<i64>,
        limit: usize,
    ) -> RepositoryResult<Vec<StoredModelRecord>>;

    /// 更新单条记录的型号
    async fn update_model(&self, record_id: i64, model: &str) -> RepositoryResult<()>;

    /// 新增记录，返回 record_id
    async fn insert_record(
        &self,
        tenant_id: &str,
        brand: Option<&str>,
        model: Option<&str>,
    ) -> RepositoryResult<i64>;

    // ===== 断点 =====

    async fn load_checkpoint(&self, tenant_id: &str) -> RepositoryResult<Option<i64>>;

    async fn save_checkpoint(&self, tenant_id: &str, last_record_id: i64) -> RepositoryResult<()>;

    async fn clear_checkpoint(&self, tenant_id: &str) -> RepositoryResult<()>;
}
