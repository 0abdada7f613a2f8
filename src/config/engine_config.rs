// ==========================================
// 导入规范化引擎 - 引擎配置
// ==========================================
// 存储: config_kv 表，租户 scope 覆盖 global，global 覆盖内置默认值
// ==========================================

use serde::{Deserialize, Serialize};

/// 配置键
pub mod config_keys {
    pub const SUGGESTION_THRESHOLD: &str = "normalizer/suggestion_threshold";
    pub const MIN_CONTAINMENT_LEN: &str = "normalizer/min_containment_len";
    pub const WORKER_COUNT: &str = "normalizer/worker_count";
    pub const RENORMALIZE_BATCH_SIZE: &str = "normalizer/renormalize_batch_size";
    pub const BRAND_FIELD: &str = "normalizer/brand_field";
    pub const MODEL_FIELD: &str = "normalizer/model_field";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub suggestion_threshold: f64,     // 建议规则的 Jaro-Winkler 阈值
    pub min_containment_len: usize,    // 包含匹配的最小字符数
    pub worker_count: usize,           // 并行分块数
    pub renormalize_batch_size: usize, // 批量重规范化每页条数
    pub brand_field: String,
    pub model_field: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggestion_threshold: 0.85,
            min_containment_len: 2,
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            renormalize_batch_size: 200,
            brand_field: "brand".to_string(),
            model_field: "model".to_string(),
        }
    }
}

impl EngineConfig {
    /// 修正越界取值
    pub fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.suggestion_threshold) {
            self.suggestion_threshold = Self::default().suggestion_threshold;
        }
        self.min_containment_len = self.min_containment_len.max(1);
        self.worker_count = self.worker_count.max(1);
        self.renormalize_batch_size = self.renormalize_batch_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.suggestion_threshold, 0.85);
        assert_eq!(config.min_containment_len, 2);
        assert!(config.worker_count >= 1);
        assert_eq!(config.brand_field, "brand");
        assert_eq!(config.model_field, "model");
    }

    #[test]
    fn test_sanitized_clamps() {
        let config = EngineConfig {
            suggestion_threshold: 1.7,
            min_containment_len: 0,
            worker_count: 0,
            renormalize_batch_size: 0,
            ..EngineConfig::default()
        }
        .sanitized();
        assert_eq!(config.suggestion_threshold, 0.85);
        assert_eq!(config.min_containment_len, 1);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.renormalize_batch_size, 1);
    }
}
