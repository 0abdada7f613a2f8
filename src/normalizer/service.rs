// ==========================================
// 导入规范化引擎 - 规范化服务
// ==========================================
// 职责: 组装 配置 + 快照 + 管道，对外提供一次完整导入运行
// 红线: 快照加载失败属于结构性错误，在任何行处理之前中止
// ==========================================

use crate::config::{EngineConfig, EngineConfigReader};
use crate::domain::record::{ImportRunResult, RawImportRow, RunSummary};
use crate::normalizer::error::{NormalizeError, NormalizeResult};
use crate::normalizer::model_alias_resolver::ModelAliasResolver;
use crate::normalizer::pipeline::ImportNormalizationPipeline;
use crate::normalizer::renormalizer::{ModelRenormalizer, RenormalizeOptions, RenormalizeReport};
use crate::normalizer::snapshot::ImportSnapshot;
use crate::repository::model_record_repo::ModelRecordRepository;
use crate::repository::snapshot_repo::SnapshotRepository;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

pub struct NormalizationService<R, C>
where
    R: SnapshotRepository,
    C: EngineConfigReader,
{
    snapshot_repo: Arc<R>,
    config_reader: Arc<C>,
}

impl<R, C> NormalizationService<R, C>
where
    R: SnapshotRepository,
    C: EngineConfigReader,
{
    pub fn new(snapshot_repo: Arc<R>, config_reader: Arc<C>) -> Self {
        Self {
            snapshot_repo,
            config_reader,
        }
    }

    /// 读取租户配置
    pub async fn load_config(&self, tenant_id: &str) -> NormalizeResult<EngineConfig> {
        self.config_reader
            .load_engine_config(tenant_id)
            .await
            .map_err(|e| NormalizeError::ConfigError(e.to_string()))
    }

    /// 加载一次运行所用的只读快照
    pub async fn load_snapshot(&self, tenant_id: &str) -> NormalizeResult<ImportSnapshot> {
        let catalogue = self
            .snapshot_repo
            .load_catalogue(tenant_id)
            .await
            .map_err(|e| NormalizeError::CatalogueLoad {
                tenant_id: tenant_id.to_string(),
                message: e.to_string(),
            })?;

        let rules = self
            .snapshot_repo
            .load_rules(tenant_id)
            .await
            .map_err(|e| NormalizeError::RuleSnapshotLoad {
                tenant_id: tenant_id.to_string(),
                message: e.to_string(),
            })?;

        let references = self
            .snapshot_repo
            .load_references(tenant_id)
            .await
            .map_err(|e| NormalizeError::RuleSnapshotLoad {
                tenant_id: tenant_id.to_string(),
                message: e.to_string(),
            })?;

        let aliases = self.load_aliases(tenant_id).await?;

        ImportSnapshot::new(tenant_id, catalogue, rules, aliases, references)
    }

    async fn load_aliases(&self, tenant_id: &str) -> NormalizeResult<Vec<crate::domain::alias::ModelAlias>> {
        self.snapshot_repo
            .load_aliases(tenant_id)
            .await
            .map_err(|e| NormalizeError::AliasTableLoad {
                tenant_id: tenant_id.to_string(),
                message: e.to_string(),
            })
    }

    /// 一次完整导入运行
    ///
    /// # 返回
    /// - Ok(ImportRunResult): 每行一条记录（顺序与输入一致）+ 建议规则 + 汇总
    /// - Err: 仅结构性错误（快照/配置加载失败、工作线程失败）
    #[instrument(skip(self, rows), fields(tenant_id = %tenant_id, rows = rows.len()))]
    pub async fn run_import(
        &self,
        tenant_id: &str,
        rows: Vec<RawImportRow>,
    ) -> NormalizeResult<ImportRunResult> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "开始规范化导入");

        let config = self.load_config(tenant_id).await?;
        let snapshot = match self.load_snapshot(tenant_id).await {
            Ok(s) => Arc::new(s),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "快照加载失败，运行中止");
                return Err(e);
            }
        };

        let pipeline = Arc::new(ImportNormalizationPipeline::new(snapshot, config)?);
        let output = pipeline.run_parallel(rows).await?;

        let summary = RunSummary::from_records(&output.records, output.unmapped_headers);
        let elapsed_time = start_time.elapsed();
        info!(
            run_id = %run_id,
            total = summary.total_rows,
            clean = summary.clean_rows,
            warning = summary.warning_rows,
            blocked = summary.blocked_rows,
            proposals = output.proposals.len(),
            elapsed_ms = elapsed_time.as_millis() as u64,
            "规范化导入完成"
        );

        Ok(ImportRunResult {
            run_id,
            tenant_id: tenant_id.to_string(),
            records: output.records,
            proposals: output.proposals,
            summary,
            elapsed_time,
        })
    }

    /// 别名表更新后的型号批量重规范化
    #[instrument(skip(self, records, options), fields(tenant_id = %tenant_id))]
    pub async fn renormalize_models<M>(
        &self,
        records: &M,
        tenant_id: &str,
        options: &RenormalizeOptions,
    ) -> NormalizeResult<RenormalizeReport>
    where
        M: ModelRecordRepository + ?Sized,
    {
        let aliases: Vec<_> = self
            .load_aliases(tenant_id)
            .await?
            .into_iter()
            .filter(|a| a.tenant_id == tenant_id)
            .collect();
        let resolver = ModelAliasResolver::new(&aliases);

        ModelRenormalizer::new(records, &resolver)
            .run(tenant_id, options)
            .await
    }
}
