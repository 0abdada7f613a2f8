// ==========================================
// 导入规范化引擎 - 规范化管道
// ==========================================
// 职责: 原始行 → NormalizedRecord（一行对一条，顺序不变）
// 流程:
// 1. 快照每次运行只加载一次（由调用方传入 Arc）
// 2. 全文件去重列头 → 列头缓存（只读共享）
// 3. 逐行: 列头映射 → 取值规范化 / 规格解析 → 型号别名 → 必填覆盖检查
// 4. 汇总未映射列头与建议规则
// 红线: 行级数据问题只产生 Diagnostic，从不中止运行
// ==========================================

use crate::config::EngineConfig;
use crate::domain::record::{
    ComponentExtraction, Diagnostic, FieldValue, NormalizedRecord, RawImportRow, ResolvedValue,
    RuleProposal,
};
use crate::domain::types::{FieldKind, RuleType};
use crate::normalizer::component_parser::ComponentParserRegistry;
use crate::normalizer::conflict_resolver::{RuleCandidate, RuleConflictResolver};
use crate::normalizer::error::{NormalizeError, NormalizeResult};
use crate::normalizer::field_resolver::{FieldResolution, FieldResolver, HeaderCache};
use crate::normalizer::keyword_matcher::{contains_keyword, normalize_text, KeywordMatch};
use crate::normalizer::model_alias_resolver::ModelAliasResolver;
use crate::normalizer::rule_suggester::{ProposalCollector, RuleSuggester};
use crate::normalizer::snapshot::ImportSnapshot;
use crate::normalizer::value_normalizer::ValueNormalizer;
use futures::future::join_all;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 管道输出
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<NormalizedRecord>,
    pub proposals: Vec<RuleProposal>,
    pub unmapped_headers: Vec<String>,
}

/// 单行处理结果（含建议器输入）
#[derive(Debug, Clone)]
struct RowOutcome {
    record: NormalizedRecord,
    value_misses: Vec<(String, String)>, // (字段, 原始取值)
}

pub struct ImportNormalizationPipeline {
    snapshot: Arc<ImportSnapshot>,
    config: EngineConfig,
    parsers: ComponentParserRegistry,
    aliases: ModelAliasResolver,
}

impl ImportNormalizationPipeline {
    /// 使用内置解析器创建管道
    pub fn new(snapshot: Arc<ImportSnapshot>, config: EngineConfig) -> NormalizeResult<Self> {
        Ok(Self::with_parsers(
            snapshot,
            config,
            ComponentParserRegistry::with_defaults()?,
        ))
    }

    pub fn with_parsers(
        snapshot: Arc<ImportSnapshot>,
        config: EngineConfig,
        parsers: ComponentParserRegistry,
    ) -> Self {
        let aliases = ModelAliasResolver::new(&snapshot.aliases);
        Self {
            snapshot,
            config: config.sanitized(),
            parsers,
            aliases,
        }
    }

    pub fn snapshot(&self) -> &ImportSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 全文件列头去重解析
    pub fn build_header_cache(&self, rows: &[RawImportRow]) -> HeaderCache {
        let resolver = FieldResolver::new(&self.snapshot, self.config.min_containment_len);
        let cache = resolver.resolve_all(
            rows.iter()
                .flat_map(|row| row.cells.iter().map(|(header, _)| header.as_str())),
        );
        debug!(distinct_headers = cache.len(), "列头缓存已建立");
        cache
    }

    /// 规范化单行
    pub fn normalize_row(&self, row: &RawImportRow, cache: &HeaderCache) -> NormalizedRecord {
        self.process_row(row, cache).record
    }

    fn process_row(&self, row: &RawImportRow, cache: &HeaderCache) -> RowOutcome {
        let resolver = FieldResolver::new(&self.snapshot, self.config.min_containment_len);
        let values = ValueNormalizer::new(&self.snapshot, self.config.min_containment_len);

        let mut record = NormalizedRecord::new(row.row_index);
        let mut value_misses = Vec::new();

        for (header, cell) in &row.cells {
            let raw = cell.trim();
            if raw.is_empty() {
                continue;
            }

            let resolution: Cow<'_, FieldResolution> = match cache.get(header) {
                Some(r) => Cow::Borrowed(r),
                None => Cow::Owned(resolver.resolve(header)),
            };

            let Some(field_name) = resolution.field_name.as_deref() else {
                record.push_diagnostic(Diagnostic::info(
                    header.as_str(),
                    format!("列 '{}' 未映射到标准字段，已忽略", header),
                ));
                continue;
            };
            let Some(field) = self.snapshot.field(field_name) else {
                continue;
            };

            if let Some(first_header) = record.get(field_name).map(|v| v.source_header.clone()) {
                record.push_diagnostic(Diagnostic::warning(
                    field_name,
                    format!(
                        "列 '{}' 与列 '{}' 映射到同一字段，保留先出现的取值，忽略 '{}'",
                        header, first_header, raw
                    ),
                ));
                continue;
            }

            if !resolution.exact {
                record.push_diagnostic(Diagnostic::warning(
                    field_name,
                    format!(
                        "列 '{}' 模糊映射到 {}（置信度 {}），需人工确认",
                        header, field_name, resolution.confidence
                    ),
                ));
            }

            let (value, confidence, rule_id) = if values.is_enum_like(field_name) {
                let resolved = values.normalize(field_name, raw);
                let partial = resolved.resolved && resolved.confidence < 100;
                if !resolved.resolved || partial {
                    value_misses.push((field_name.to_string(), raw.to_string()));
                }
                for d in resolved.diagnostics {
                    record.push_diagnostic(d);
                }
                (resolved.value, resolved.confidence, resolved.rule_id)
            } else {
                (
                    ResolvedValue::text(raw),
                    resolution.confidence,
                    resolution.rule_id.clone(),
                )
            };

            if field.kind == FieldKind::Specification {
                let components = self.extract_components(field_name, field.short_name(), raw, &mut record);
                record.components.extend(components);
            }

            record.values.insert(
                field_name.to_string(),
                FieldValue {
                    kind: field.kind,
                    value,
                    confidence,
                    rule_id,
                    source_header: header.clone(),
                },
            );
        }

        self.apply_model_alias(&mut record);
        self.check_required(&mut record);

        RowOutcome {
            record,
            value_misses,
        }
    }

    /// 规格字段 → 组件条目
    fn extract_components(
        &self,
        field_name: &str,
        component_type: &str,
        raw: &str,
        record: &mut NormalizedRecord,
    ) -> Vec<ComponentExtraction> {
        let normalized = normalize_text(raw);

        let candidates: Vec<RuleCandidate<'_>> = self
            .snapshot
            .field_rules(RuleType::ComponentPattern, field_name)
            .filter_map(|rule| {
                if rule.input_keywords.is_empty() {
                    return Some(RuleCandidate {
                        rule,
                        hit: KeywordMatch {
                            keyword: String::new(),
                            score: 0.0,
                            matched_len: 0,
                            exact: false,
                        },
                    });
                }
                rule.input_keywords
                    .iter()
                    .filter_map(|k| contains_keyword(&normalized, k))
                    .max_by(|a, b| {
                        a.matched_len
                            .cmp(&b.matched_len)
                            .then_with(|| b.keyword.cmp(&a.keyword))
                    })
                    .map(|hit| RuleCandidate { rule, hit })
            })
            .collect();

        let Some(winner) = RuleConflictResolver::pick(candidates) else {
            return Vec::new();
        };
        let Some(parser_id) = winner.rule.parser_id() else {
            return Vec::new();
        };

        let Some(parser) = self.parsers.get(parser_id) else {
            warn!(rule_id = %winner.rule.rule_id, parser_id = %parser_id, "未知解析器");
            record.push_diagnostic(Diagnostic::warning(
                field_name,
                format!(
                    "规则 {} 指定的解析器 '{}' 不存在，仅保留原始文本",
                    winner.rule.rule_id, parser_id
                ),
            ));
            return Vec::new();
        };

        let components = parser.parse(field_name, component_type, raw);
        for c in components.iter().filter(|c| c.confidence < 100) {
            let message = if c.confidence == 0 {
                format!("规格文本 '{}' 无法解析，已原样保留", c.raw_text)
            } else {
                format!("组件 '{}' 缺少技术类型，需人工确认", c.raw_text)
            };
            record.push_diagnostic(Diagnostic::warning(field_name, message));
        }
        components
    }

    /// 按 (品牌, 型号) 替换为标准型号
    fn apply_model_alias(&self, record: &mut NormalizedRecord) {
        if !record.is_populated(&self.config.model_field) {
            return;
        }
        let Some(brand) = record
            .get(&self.config.brand_field)
            .map(|v| v.value.display().to_string())
        else {
            record.push_diagnostic(Diagnostic::info(
                self.config.model_field.as_str(),
                format!(
                    "缺少品牌字段 {}，型号未做别名解析",
                    self.config.brand_field
                ),
            ));
            return;
        };
        if self.aliases.is_empty() {
            return;
        }
        let Some(model) = record.values.get_mut(&self.config.model_field) else {
            return;
        };

        let resolution = self.aliases.resolve(&brand, model.value.display());
        if resolution.alias_matched {
            debug!(
                row_index = record.row_index,
                model = %resolution.value.display(),
                "型号命中别名"
            );
            model.value = resolution.value;
            model.confidence = resolution.confidence;
        }
    }

    /// 必填字段覆盖检查
    fn check_required(&self, record: &mut NormalizedRecord) {
        let missing: Vec<String> = self
            .snapshot
            .required_fields()
            .filter(|f| !record.is_populated(&f.field_name))
            .map(|f| f.field_name.clone())
            .collect();
        for field_name in missing {
            record.push_diagnostic(Diagnostic::error(
                field_name.as_str(),
                format!("必填字段 {} 未解析", field_name),
            ));
        }
    }

    /// 汇总建议规则
    fn collect_proposals(
        &self,
        rows: &[RawImportRow],
        cache: &HeaderCache,
        outcomes: &[RowOutcome],
    ) -> Vec<RuleProposal> {
        let suggester = RuleSuggester::new(&self.snapshot, self.config.suggestion_threshold);
        let mut collector = ProposalCollector::new();

        let mut header_counts: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            for (header, cell) in &row.cells {
                if !cell.trim().is_empty() {
                    *header_counts.entry(header.as_str()).or_default() += 1;
                }
            }
        }

        for resolution in cache.headers_without_rule() {
            let count = header_counts
                .get(resolution.raw_header.as_str())
                .copied()
                .unwrap_or(0);
            if count == 0 {
                continue;
            }
            if let Some(candidate) = suggester.suggest_column(resolution) {
                collector.record(candidate, count);
            }
        }

        for outcome in outcomes {
            for (field_name, raw) in &outcome.value_misses {
                if let Some(candidate) = suggester.suggest_value(field_name, raw) {
                    collector.record(candidate, 1);
                }
            }
        }

        collector.finish()
    }

    fn assemble(
        &self,
        rows: &[RawImportRow],
        cache: &HeaderCache,
        outcomes: Vec<RowOutcome>,
    ) -> PipelineOutput {
        let proposals = self.collect_proposals(rows, cache, &outcomes);
        let unmapped_headers = cache.unmapped_headers();
        let records: Vec<NormalizedRecord> = outcomes.into_iter().map(|o| o.record).collect();

        info!(
            rows = records.len(),
            unmapped_headers = unmapped_headers.len(),
            proposals = proposals.len(),
            "规范化完成"
        );
        PipelineOutput {
            records,
            proposals,
            unmapped_headers,
        }
    }

    /// 顺序执行
    pub fn run(&self, rows: &[RawImportRow]) -> PipelineOutput {
        let cache = self.build_header_cache(rows);
        let outcomes: Vec<RowOutcome> = rows.iter().map(|row| self.process_row(row, &cache)).collect();
        self.assemble(rows, &cache, outcomes)
    }

    /// 并行执行（分块 spawn_blocking，结果按输入位置重排）
    ///
    /// 输出与 `run` 完全一致
    pub async fn run_parallel(
        self: Arc<Self>,
        rows: Vec<RawImportRow>,
    ) -> NormalizeResult<PipelineOutput> {
        if rows.is_empty() {
            return Ok(self.run(&rows));
        }

        let rows = Arc::new(rows);
        let cache = Arc::new(self.build_header_cache(&rows));
        let chunk_size = rows.len().div_ceil(self.config.worker_count);

        let tasks = (0..rows.len()).step_by(chunk_size).map(|start| {
            let pipeline = Arc::clone(&self);
            let rows = Arc::clone(&rows);
            let cache = Arc::clone(&cache);
            let end = (start + chunk_size).min(rows.len());
            tokio::task::spawn_blocking(move || {
                (start..end)
                    .map(|pos| (pos, pipeline.process_row(&rows[pos], &cache)))
                    .collect::<Vec<_>>()
            })
        });

        let mut indexed = Vec::with_capacity(rows.len());
        for result in join_all(tasks).await {
            let chunk = result.map_err(|e| NormalizeError::WorkerFailure(e.to_string()))?;
            indexed.extend(chunk);
        }
        indexed.sort_by_key(|(pos, _)| *pos);

        let outcomes: Vec<RowOutcome> = indexed.into_iter().map(|(_, o)| o).collect();
        Ok(self.assemble(&rows, &cache, outcomes))
    }
}
