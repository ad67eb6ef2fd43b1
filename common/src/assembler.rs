//! 商品レコードの組み立て
//!
//! 生レコード + 補完結果 + 価格内訳 を最終出力の ProcessedProduct にまとめる。
//! 組み立てに失敗したレコードは出力しない（部分的なレコードは作らない）。

use crate::categories::{CategoryRateTables, DEFAULT_CATEGORY, LICENSED_CATEGORY};
use crate::pricing::{compute_prices, extract_max_price, normalize_pack_size};
use crate::types::{EnrichmentResult, EnrichmentSource, ProcessedProduct, RawProductRecord};
use thiserror::Error;

/// 低解像度画像のクエリトークン
const LOW_RES_TOKEN: &str = "w=210&h=210";

/// 高解像度画像のクエリトークン
const HIGH_RES_TOKEN: &str = "w=600&h=600";

/// レコード単位の組み立てエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("タイトルが空です: {0}")]
    EmptyTitle(String),

    #[error("為替レートが不正です: {0}")]
    InvalidExchangeRate(f64),

    #[error("価格を計算できません: {article} ({price})")]
    NonFinitePrice { article: String, price: String },
}

/// カテゴリ決定の結果
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDecision {
    pub category: String,
    pub is_licensed_brand: bool,
    /// 閉じた集合に解決できなかった補完カテゴリ（既定カテゴリに置換済み）
    pub unresolved: Option<String>,
}

/// 最終カテゴリを決定
///
/// 補完カテゴリの正規化 → ライセンスブランド判定 → 実行全体の強制カテゴリ の順に適用する。
/// 強制カテゴリはカテゴリのみを上書きし、ライセンスフラグは変更しない。
pub fn decide_category(
    enrichment: &EnrichmentResult,
    brand: &str,
    forced_category: Option<&str>,
    tables: &CategoryRateTables,
) -> CategoryDecision {
    let mut unresolved = None;
    let mut category = match tables.resolve_category(&enrichment.category) {
        Some(c) => c,
        None => {
            unresolved = Some(enrichment.category.clone());
            DEFAULT_CATEGORY.to_string()
        }
    };

    let mut is_licensed_brand = enrichment.is_licensed_brand;
    if tables.is_licensed_brand(brand) {
        is_licensed_brand = true;
        category = LICENSED_CATEGORY.to_string();
    }

    if let Some(forced) = forced_category.map(str::trim).filter(|f| !f.is_empty()) {
        category = tables.resolve_category(forced).unwrap_or_else(|| forced.to_string());
    }

    CategoryDecision {
        category,
        is_licensed_brand,
        unresolved,
    }
}

/// 画像URLを高解像度版に書き換え（該当トークンがなければそのまま）
pub fn upgrade_image_url(url: &str) -> String {
    url.replace(LOW_RES_TOKEN, HIGH_RES_TOKEN)
}

/// 1商品を組み立てる
pub fn assemble_product(
    record: &RawProductRecord,
    enrichment: &EnrichmentResult,
    source: EnrichmentSource,
    forced_category: Option<&str>,
    tables: &CategoryRateTables,
    exchange_rate: f64,
) -> Result<ProcessedProduct, AssemblyError> {
    let article_number = record.article_number.trim().to_string();

    let title = enrichment.title_ro.trim();
    if title.is_empty() {
        return Err(AssemblyError::EmptyTitle(record.label().to_string()));
    }

    if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
        return Err(AssemblyError::InvalidExchangeRate(exchange_rate));
    }

    let decision = decide_category(enrichment, &record.brand, forced_category, tables);

    let price_per_unit = extract_max_price(&record.price);
    let pieces_per_box = normalize_pack_size(record.piece_per_pu.as_ref());
    let prices = compute_prices(price_per_unit, pieces_per_box, &decision.category, tables, exchange_rate);

    if !prices.price_final_box.is_finite() || !prices.price_final_piece.is_finite() {
        return Err(AssemblyError::NonFinitePrice {
            article: record.label().to_string(),
            price: record.price.clone(),
        });
    }

    Ok(ProcessedProduct {
        sku: article_number.clone(),
        article_number,
        ean: record.ean_sku.trim().to_string(),
        name: title.to_string(),
        description: enrichment.description_ro.clone(),
        short_description: enrichment.short_description_ro.clone(),
        category: decision.category,
        brand: record.brand.trim().to_string(),
        country_of_origin: record.country_of_origin.trim().to_string(),
        pieces_per_box,
        images: record.images.iter().map(|u| upgrade_image_url(u)).collect(),
        source_url: record.url.clone(),
        mix_order: record.mix_order,
        // 最小注文数も空・0・不正値は1扱い
        min_order_qty: normalize_pack_size(record.min_order_quantity.as_ref()),
        is_licensed_brand: decision.is_licensed_brand,
        tags: enrichment.tags_ro.clone(),
        prices,
        enrichment_source: source,
    })
}
