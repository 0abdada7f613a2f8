// ==========================================
// 导入规范化引擎 - 型号别名解析器
// ==========================================
// 职责: (品牌, 供应商型号写法) → 唯一标准型号
// 匹配: 大小写不敏感 + 空白折叠后的完全匹配
// 红线: 无匹配时原样返回，从不隐式创建别名
// 红线: 对自身输出是不动点（已是完整型号则原样命中），重规范化因此幂等
// ==========================================

use crate::domain::alias::ModelAlias;
use crate::domain::record::ResolvedValue;
use std::collections::HashMap;
use tracing::warn;

/// 别名匹配键：空白折叠 + 小写
pub fn alias_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 型号解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResolution {
    pub value: ResolvedValue,
    pub alias_matched: bool,
    pub confidence: u8,
}

#[derive(Debug, Clone, Default)]
pub struct ModelAliasResolver {
    by_variant: HashMap<(String, String), ModelAlias>,
    by_full_name: HashMap<(String, String), ModelAlias>,
}

impl ModelAliasResolver {
    /// 由别名表构建索引
    ///
    /// 同一 (brand, variant_name) 出现多条时取 confidence 高者，
    /// 仍相同则取 canonical_name 字典序小者，再相同取完整型号字典序小者（与加载顺序无关）
    pub fn new(aliases: &[ModelAlias]) -> Self {
        let mut by_variant: HashMap<(String, String), ModelAlias> = HashMap::new();
        let mut by_full_name: HashMap<(String, String), ModelAlias> = HashMap::new();

        for alias in aliases {
            let brand = alias_key(&alias.brand);
            let variant = alias_key(&alias.variant_name);
            if brand.is_empty() || variant.is_empty() {
                warn!(
                    brand = %alias.brand,
                    variant = %alias.variant_name,
                    "别名缺少品牌或型号写法，已忽略"
                );
                continue;
            }

            Self::insert_preferred(&mut by_variant, (brand.clone(), variant), alias);
            Self::insert_preferred(
                &mut by_full_name,
                (brand, alias_key(&alias.resolved_full_name())),
                alias,
            );
        }

        Self {
            by_variant,
            by_full_name,
        }
    }

    fn insert_preferred(
        index: &mut HashMap<(String, String), ModelAlias>,
        key: (String, String),
        alias: &ModelAlias,
    ) {
        match index.get(&key) {
            Some(existing)
                if existing
                    .confidence
                    .cmp(&alias.confidence)
                    .then_with(|| alias.canonical_name.cmp(&existing.canonical_name))
                    .then_with(|| {
                        alias
                            .resolved_full_name()
                            .cmp(&existing.resolved_full_name())
                    })
                    .is_ge() =>
            {
                if existing.canonical_name != alias.canonical_name
                    || existing.resolved_full_name() != alias.resolved_full_name()
                {
                    warn!(
                        brand = %alias.brand,
                        variant = %alias.variant_name,
                        kept = %existing.canonical_name,
                        dropped = %alias.canonical_name,
                        "别名冲突"
                    );
                }
            }
            _ => {
                index.insert(key, alias.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_variant.is_empty()
    }

    /// 解析型号
    ///
    /// # 顺序
    /// 1. 已是某别名的完整型号 → 原样命中
    /// 2. (brand, variant) 完全匹配
    /// 3. 型号以品牌开头（"HP 840 G10"）→ 去掉品牌后再匹配
    /// 4. 无匹配 → 原样返回
    pub fn resolve(&self, brand: &str, raw_variant: &str) -> ModelResolution {
        let brand_key = alias_key(brand);
        let variant_key = alias_key(raw_variant);

        if !brand_key.is_empty() && !variant_key.is_empty() {
            let hit = self
                .by_full_name
                .get(&(brand_key.clone(), variant_key.clone()))
                .or_else(|| self.by_variant.get(&(brand_key.clone(), variant_key.clone())))
                .or_else(|| {
                    variant_key
                        .strip_prefix(brand_key.as_str())
                        .and_then(|rest| rest.strip_prefix(' '))
                        .and_then(|rest| self.by_variant.get(&(brand_key.clone(), rest.to_string())))
                });

            if let Some(alias) = hit {
                return ModelResolution {
                    value: ResolvedValue::Model {
                        brand: alias.brand.clone(),
                        canonical_name: alias.canonical_name.clone(),
                        full_model_name: alias.resolved_full_name(),
                    },
                    alias_matched: true,
                    confidence: alias.confidence,
                };
            }
        }

        ModelResolution {
            value: ResolvedValue::text(raw_variant),
            alias_matched: false,
            confidence: 0,
        }
    }
}
