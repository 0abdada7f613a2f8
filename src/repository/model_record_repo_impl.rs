// ==========================================
// 导入规范化引擎 - 已存储记录 Repository 实现
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::alias::StoredModelRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::model_record_repo::ModelRecordRepository;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct ModelRecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ModelRecordRepositoryImpl {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl ModelRecordRepository for ModelRecordRepositoryImpl {
    async fn fetch_page(
        &self,
        tenant_id: &str,
        after_id: Option<i64>,
        limit: usize,
    ) -> RepositoryResult<Vec<StoredModelRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT record_id, tenant_id, brand, model
            FROM product_record
            WHERE tenant_id = ?1 AND record_id > ?2
            ORDER BY record_id
            LIMIT ?3
            "#,
        )?;

        let records = stmt
            .query_map(
                params![tenant_id, after_id.unwrap_or(0), limit as i64],
                |row| {
                    Ok(StoredModelRecord {
                        record_id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        brand: row.get(2)?,
                        model: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn update_model(&self, record_id: i64, model: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE product_record SET model = ?1, updated_at = ?2 WHERE record_id = ?3",
            params![model, Utc::now().to_rfc3339(), record_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductRecord".to_string(),
                id: record_id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_record(
        &self,
        tenant_id: &str,
        brand: Option<&str>,
        model: Option<&str>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product_record (tenant_id, brand, model, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![tenant_id, brand, model, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn load_checkpoint(&self, tenant_id: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let last = conn
            .query_row(
                "SELECT last_record_id FROM renormalize_checkpoint WHERE tenant_id = ?1",
                params![tenant_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(last)
    }

    async fn save_checkpoint(&self, tenant_id: &str, last_record_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO renormalize_checkpoint (tenant_id, last_record_id, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(tenant_id) DO UPDATE SET last_record_id = ?2, updated_at = ?3
            "#,
            params![tenant_id, last_record_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn clear_checkpoint(&self, tenant_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM renormalize_checkpoint WHERE tenant_id = ?1",
            params![tenant_id],
        )?;
        Ok(())
    }
}
