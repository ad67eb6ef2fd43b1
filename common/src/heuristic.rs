//! ヒューリスティック補完
//!
//! AIが使えない・全試行が失敗した場合の決定的な補完結果を生成する。

use crate::categories::{CategoryRateTables, DEFAULT_CATEGORY, LICENSED_CATEGORY};
use crate::types::{EnrichmentResult, RawProductRecord};

/// 生レコードから補完結果を合成
///
/// - カテゴリ: ライセンスブランドなら専用カテゴリ、それ以外は既定カテゴリ
/// - タイトル・説明: 生フィールドを最小限のテンプレートで流用
/// - タグ: ブランド名から生成
pub fn heuristic_enrichment(record: &RawProductRecord, tables: &CategoryRateTables) -> EnrichmentResult {
    let brand = record.brand.trim();
    let is_licensed_brand = tables.is_licensed_brand(brand);
    let category = if is_licensed_brand { LICENSED_CATEGORY } else { DEFAULT_CATEGORY };

    let brand_label = if brand.is_empty() { "N/A" } else { brand };
    let origin = match record.country_of_origin.trim() {
        "" => "N/A",
        origin => origin,
    };

    let title_ro = match record.product_name.trim() {
        "" => "Produs".to_string(),
        name => name.to_string(),
    };

    let description_ro = format!("Produs {} de calitate. {}", brand_label, record.description.trim())
        .trim_end()
        .to_string();

    let tags_ro = if brand.is_empty() {
        "B2B".to_string()
    } else {
        format!("{}, B2B", brand)
    };

    EnrichmentResult {
        title_ro,
        description_ro,
        short_description_ro: format!(
            "Produs de calitate\nBrand: {}\nOrigine: {}",
            brand_label, origin
        ),
        category: category.to_string(),
        is_licensed_brand,
        tags_ro,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(brand: &str, name: &str) -> RawProductRecord {
        RawProductRecord {
            article_number: "A1".to_string(),
            brand: brand.to_string(),
            product_name: name.to_string(),
            description: "Ceramic mug 300ml".to_string(),
            country_of_origin: "China".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_heuristic_licensed_brand() {
        let tables = CategoryRateTables::default();
        let result = heuristic_enrichment(&record("Disney Frozen", "Mug Elsa"), &tables);
        assert_eq!(result.category, LICENSED_CATEGORY);
        assert!(result.is_licensed_brand);
        assert_eq!(result.title_ro, "Mug Elsa");
        assert_eq!(result.tags_ro, "Disney Frozen, B2B");
    }

    #[test]
    fn test_heuristic_regular_brand() {
        let tables = CategoryRateTables::default();
        let result = heuristic_enrichment(&record("Varta", "Batteries"), &tables);
        assert_eq!(result.category, DEFAULT_CATEGORY);
        assert!(!result.is_licensed_brand);
        assert_eq!(result.description_ro, "Produs Varta de calitate. Ceramic mug 300ml");
        assert_eq!(result.short_description_ro, "Produs de calitate\nBrand: Varta\nOrigine: China");
    }

    #[test]
    fn test_heuristic_without_brand_or_name() {
        let tables = CategoryRateTables::default();
        let result = heuristic_enrichment(&RawProductRecord::default(), &tables);
        assert_eq!(result.title_ro, "Produs");
        assert_eq!(result.tags_ro, "B2B");
        assert_eq!(result.description_ro, "Produs N/A de calitate.");
        assert_eq!(result.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_heuristic_is_deterministic() {
        let tables = CategoryRateTables::default();
        let r = record("LEGO", "Bricks");
        assert_eq!(heuristic_enrichment(&r, &tables), heuristic_enrichment(&r, &tables));
    }
}
