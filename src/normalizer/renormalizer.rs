// ==========================================
// 导入规范化引擎 - 型号批量重规范化
// ==========================================
// 职责: 别名表更新后，按别名重写已存储记录的型号
// 流程: 按 record_id 分页 → 每页写断点 → 完成后清除断点
// 红线: 可中断（max_records / 取消标志），从断点继续；收敛后再次全量运行零更新
// ==========================================

use crate::normalizer::error::NormalizeResult;
use crate::normalizer::model_alias_resolver::ModelAliasResolver;
use crate::repository::model_record_repo::ModelRecordRepository;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RenormalizeOptions {
    pub batch_size: usize,
    pub max_records: Option<usize>, // 本次最多扫描条数
    pub resume: bool,               // 是否从断点继续
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for RenormalizeOptions {
    fn default() -> Self {
        Self {
            batch_size: 200,
            max_records: None,
            resume: true,
            cancel: None,
        }
    }
}

impl RenormalizeOptions {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenormalizeReport {
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize, // 缺品牌或型号
    pub resumed_from: Option<i64>,
    pub completed: bool,
}

pub struct ModelRenormalizer<'a, M: ModelRecordRepository + ?Sized> {
    records: &'a M,
    aliases: &'a ModelAliasResolver,
}

impl<'a, M: ModelRecordRepository + ?Sized> ModelRenormalizer<'a, M> {
    pub fn new(records: &'a M, aliases: &'a ModelAliasResolver) -> Self {
        Self { records, aliases }
    }

    pub async fn run(
        &self,
        tenant_id: &str,
        options: &RenormalizeOptions,
    ) -> NormalizeResult<RenormalizeReport> {
        let batch_size = options.batch_size.max(1);
        let mut report = RenormalizeReport::default();

        let mut cursor = if options.resume {
            self.records.load_checkpoint(tenant_id).await?
        } else {
            None
        };
        report.resumed_from = cursor;
        if let Some(from) = cursor {
            info!(tenant_id = %tenant_id, resumed_from = from, "从断点继续重规范化");
        }

        loop {
            if options.is_cancelled() {
                info!(tenant_id = %tenant_id, scanned = report.scanned, "重规范化已取消");
                break;
            }

            let limit = match options.max_records {
                Some(max) if report.scanned >= max => break,
                Some(max) => batch_size.min(max - report.scanned),
                None => batch_size,
            };

            let page = self.records.fetch_page(tenant_id, cursor, limit).await?;
            if page.is_empty() {
                report.completed = true;
                break;
            }

            for record in &page {
                report.scanned += 1;
                cursor = Some(record.record_id);

                let (Some(brand), Some(model)) = (record.brand.as_deref(), record.model.as_deref())
                else {
                    report.skipped += 1;
                    continue;
                };
                if brand.trim().is_empty() || model.trim().is_empty() {
                    report.skipped += 1;
                    continue;
                }

                let resolution = self.aliases.resolve(brand, model);
                let resolved = resolution.value.display();
                if resolution.alias_matched && resolved != model {
                    self.records.update_model(record.record_id, resolved).await?;
                    debug!(record_id = record.record_id, from = %model, to = %resolved, "型号已重写");
                    report.updated += 1;
                } else {
                    report.unchanged += 1;
                }
            }

            if let Some(last) = cursor {
                self.records.save_checkpoint(tenant_id, last).await?;
            }

            if page.len() < limit {
                report.completed = true;
                break;
            }
        }

        if report.completed {
            self.records.clear_checkpoint(tenant_id).await?;
        }

        info!(
            tenant_id = %tenant_id,
            scanned = report.scanned,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            completed = report.completed,
            "型号重规范化结束"
        );
        Ok(report)
    }
}
