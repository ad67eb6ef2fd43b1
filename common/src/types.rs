//! 商品データの型定義
//!
//! パイプラインで受け渡される型:
//! - RawProductRecord: スクレイパーが出力する生の商品レコード
//! - EnrichmentResult: AI（またはヒューリスティック）による補完結果
//! - PriceBreakdown: 価格計算の結果
//! - ProcessedProduct: 最終出力（生レコード + 補完 + 価格）
//! - RunStats: 実行統計

use serde::{Deserialize, Deserializer, Serialize};

/// スクレイパーが出力する生の商品レコード
///
/// キーはスクレイパーのJSON出力に合わせている。欠落キー・null は空として扱う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProductRecord {
    /// 商品番号（バッチ照合キー）
    #[serde(deserialize_with = "string_or_number")]
    pub article_number: String,
    #[serde(deserialize_with = "string_or_number")]
    pub brand: String,
    #[serde(deserialize_with = "string_or_number")]
    pub product_name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(deserialize_with = "string_or_number")]
    pub country_of_origin: String,
    /// 価格文字列（"1,84 EUR - 2,15 EUR" のような範囲表記あり）
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    /// 1箱あたりの個数（空・0・null あり）
    pub piece_per_pu: Option<serde_json::Value>,
    #[serde(deserialize_with = "string_list")]
    pub images: Vec<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub mix_order: bool,
    pub min_order_quantity: Option<serde_json::Value>,
    #[serde(deserialize_with = "string_or_number")]
    pub ean_sku: String,
    #[serde(deserialize_with = "string_or_number")]
    pub url: String,
}

impl RawProductRecord {
    /// ログ表示用の識別子
    pub fn label(&self) -> &str {
        if self.article_number.trim().is_empty() {
            "N/A"
        } else {
            self.article_number.trim()
        }
    }
}

/// 数値・文字列・nullのいずれでも受け付けて文字列化する
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// 文字列配列（null は空、単一文字列は1要素、文字列以外の要素は捨てる）
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// 真偽値（null は false、"true"/"1"/"yes" と非0の数値は true）
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
        }
        _ => false,
    })
}

/// AI補完結果（6フィールドすべて必須）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub title_ro: String,
    pub description_ro: String,
    pub short_description_ro: String,
    pub category: String,
    pub is_licensed_brand: bool,
    pub tags_ro: String,
}

/// 補完結果の取得元
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSource {
    /// バッチAI呼び出し
    Batch,
    /// 個別AI呼び出し
    Individual,
    /// 決定的ヒューリスティック
    #[default]
    Heuristic,
    /// 補完キャッシュ
    Cache,
}

impl std::fmt::Display for EnrichmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichmentSource::Batch => write!(f, "batch"),
            EnrichmentSource::Individual => write!(f, "individual"),
            EnrichmentSource::Heuristic => write!(f, "heuristic"),
            EnrichmentSource::Cache => write!(f, "cache"),
        }
    }
}

/// 価格計算結果
///
/// 金額はすべて小数点以下2桁に丸め済み。税率・利益率は整数パーセント。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub price_eur_piece: f64,
    pub price_eur_box: f64,
    pub price_lei_piece: f64,
    pub price_lei_box: f64,
    pub vat_rate: u32,
    pub price_lei_piece_vat: f64,
    pub price_lei_box_vat: f64,
    pub margin_percent: u32,
    pub price_final_piece: f64,
    pub price_final_box: f64,
}

/// 最終出力の商品レコード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedProduct {
    pub article_number: String,
    pub sku: String,
    pub ean: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub category: String,
    pub brand: String,
    pub country_of_origin: String,
    pub pieces_per_box: u32,
    pub images: Vec<String>,
    pub source_url: String,
    pub mix_order: bool,
    pub min_order_qty: u32,
    pub is_licensed_brand: bool,
    pub tags: String,
    #[serde(flatten)]
    pub prices: PriceBreakdown,
    pub enrichment_source: EnrichmentSource,
}

/// 実行統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_products: usize,
    pub processed_products: usize,
    pub failed_products: usize,
    pub ai_calls: usize,
    #[serde(default)]
    pub batch_enriched: usize,
    #[serde(default)]
    pub individual_enriched: usize,
    #[serde(default)]
    pub heuristic_enriched: usize,
    #[serde(default)]
    pub cache_hits: usize,
}

impl RunStats {
    /// 処理済み + 失敗 が総数と一致するか
    pub fn is_consistent(&self) -> bool {
        self.processed_products + self.failed_products == self.total_products
    }

    pub fn record_source(&mut self, source: EnrichmentSource) {
        match source {
            EnrichmentSource::Batch => self.batch_enriched += 1,
            EnrichmentSource::Individual => self.individual_enriched += 1,
            EnrichmentSource::Heuristic => self.heuristic_enriched += 1,
            EnrichmentSource::Cache => self.cache_hits += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_deserialize_full() {
        let json = r#"{
            "article_number": "A-100",
            "brand": "Varta",
            "product_name": "Batteries AAA",
            "description": "4 pack",
            "country_of_origin": "Germany",
            "price": "1,84 EUR - 2,15 EUR",
            "piece_per_pu": "12",
            "images": ["https://cdn.example/a.jpg?w=210&h=210"],
            "mix_order": true,
            "min_order_quantity": 2,
            "ean_sku": "4008496",
            "url": "https://shop.example/p/100"
        }"#;

        let record: RawProductRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.article_number, "A-100");
        assert_eq!(record.price, "1,84 EUR - 2,15 EUR");
        assert_eq!(record.piece_per_pu, Some(serde_json::json!("12")));
        assert!(record.mix_order);
        assert_eq!(record.images.len(), 1);
    }

    #[test]
    fn test_raw_record_numeric_fields() {
        // 数値で来たフィールドは文字列化される
        let json = r#"{"article_number": 1234, "price": 2.5, "ean_sku": null}"#;

        let record: RawProductRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.article_number, "1234");
        assert_eq!(record.price, "2.5");
        assert_eq!(record.ean_sku, "");
    }

    #[test]
    fn test_raw_record_missing_fields() {
        let record: RawProductRecord = serde_json::from_str("{}").expect("デシリアライズ失敗");
        assert_eq!(record.article_number, "");
        assert!(record.piece_per_pu.is_none());
        assert!(record.images.is_empty());
        assert!(!record.mix_order);
        assert_eq!(record.label(), "N/A");
    }

    #[test]
    fn test_raw_record_null_fields() {
        let json = r#"{
            "article_number": "A2",
            "brand": null,
            "product_name": null,
            "description": null,
            "country_of_origin": null,
            "price": "3 EUR",
            "images": null,
            "mix_order": null,
            "url": null
        }"#;

        let record: RawProductRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.article_number, "A2");
        assert_eq!(record.brand, "");
        assert_eq!(record.product_name, "");
        assert_eq!(record.url, "");
        assert!(record.images.is_empty());
        assert!(!record.mix_order);
    }

    #[test]
    fn test_raw_record_loose_shapes() {
        let json = r#"{
            "brand": 3,
            "images": ["https://cdn.example/a.jpg", null, 7],
            "mix_order": "yes"
        }"#;

        let record: RawProductRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.brand, "3");
        assert_eq!(record.images, vec!["https://cdn.example/a.jpg".to_string()]);
        assert!(record.mix_order);

        let single: RawProductRecord =
            serde_json::from_str(r#"{"images": "https://cdn.example/b.jpg", "mix_order": 0}"#)
                .expect("デシリアライズ失敗");
        assert_eq!(single.images.len(), 1);
        assert!(!single.mix_order);
    }

    #[test]
    fn test_processed_product_flattens_prices() {
        let product = ProcessedProduct {
            article_number: "A-1".to_string(),
            prices: PriceBreakdown {
                price_final_piece: 77.35,
                vat_rate: 19,
                ..Default::default()
            },
            enrichment_source: EnrichmentSource::Batch,
            ..Default::default()
        };

        let json = serde_json::to_string(&product).expect("シリアライズ失敗");
        assert!(json.contains("\"price_final_piece\":77.35"));
        assert!(json.contains("\"vat_rate\":19"));
        assert!(json.contains("\"enrichment_source\":\"batch\""));
        assert!(!json.contains("\"prices\""));
    }

    #[test]
    fn test_run_stats_consistency() {
        let mut stats = RunStats {
            total_products: 3,
            processed_products: 2,
            failed_products: 1,
            ..Default::default()
        };
        assert!(stats.is_consistent());

        stats.failed_products = 0;
        assert!(!stats.is_consistent());
    }

    #[test]
    fn test_run_stats_record_source() {
        let mut stats = RunStats::default();
        stats.record_source(EnrichmentSource::Batch);
        stats.record_source(EnrichmentSource::Batch);
        stats.record_source(EnrichmentSource::Heuristic);
        stats.record_source(EnrichmentSource::Cache);

        assert_eq!(stats.batch_enriched, 2);
        assert_eq!(stats.heuristic_enriched, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.individual_enriched, 0);
    }
}
