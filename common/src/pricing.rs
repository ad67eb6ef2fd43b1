//! 価格計算モジュール
//!
//! 仕入通貨単価 → 現地通貨 → VAT込み → 利益込み販売価格 の順で計算する。
//! 中間値は丸めず、返却時にのみ小数点以下2桁へ丸める。

use crate::categories::CategoryRateTables;
use crate::types::PriceBreakdown;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\d+\.?\d*").expect("valid regex");
}

/// 価格文字列から最大値を取り出す
///
/// カンマ小数点をドットに揃えたうえで、含まれる数値の最大値を返す。
/// 範囲表記（"1,84 EUR - 2,15 EUR"）は高い方で原価計算する。
/// 数値が見つからなければ 0.0。
///
/// # Examples
/// ```
/// use catalog_ai_common::extract_max_price;
///
/// assert_eq!(extract_max_price("2,15 EUR"), 2.15);
/// assert_eq!(extract_max_price("1,84 EUR - 2,15 EUR"), 2.15);
/// assert_eq!(extract_max_price("1.84 - 2.15 EUR"), 2.15);
/// ```
pub fn extract_max_price(price: &str) -> f64 {
    let normalized = price.replace(',', ".");
    NUMBER_RE
        .find_iter(&normalized)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .fold(0.0, f64::max)
}

/// 1箱あたり個数を正規化
///
/// 空・0・null・数値でない値はすべて 1 とする。
pub fn normalize_pack_size(raw: Option<&serde_json::Value>) -> u32 {
    use serde_json::Value;

    let parsed = match raw {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed.and_then(|n| u32::try_from(n).ok()) {
        Some(0) | None => 1,
        Some(n) => n,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 価格内訳を計算
///
/// 1. 箱価格 = 単価 × 個数
/// 2. 現地通貨 = 仕入通貨 × 為替レート
/// 3. VAT込み = 現地通貨 × (1 + VAT率/100)（未登録カテゴリは19%）
/// 4. 販売価格 = VAT込み × (1 + 利益率/100)（未登録カテゴリは30%）
/// 5. 返却時に2桁へ丸める
pub fn compute_prices(
    price_per_unit: f64,
    units_per_pack: u32,
    category: &str,
    tables: &CategoryRateTables,
    exchange_rate: f64,
) -> PriceBreakdown {
    let units_per_pack = units_per_pack.max(1);

    let price_eur_box = price_per_unit * f64::from(units_per_pack);

    let price_lei_piece = price_per_unit * exchange_rate;
    let price_lei_box = price_eur_box * exchange_rate;

    let vat_rate = tables.vat_for(category);
    let vat_factor = 1.0 + f64::from(vat_rate) / 100.0;
    let price_lei_piece_vat = price_lei_piece * vat_factor;
    let price_lei_box_vat = price_lei_box * vat_factor;

    let margin_percent = tables.margin_for(category);
    let margin_factor = 1.0 + f64::from(margin_percent) / 100.0;
    let price_final_piece = price_lei_piece_vat * margin_factor;
    let price_final_box = price_lei_box_vat * margin_factor;

    PriceBreakdown {
        price_eur_piece: round2(price_per_unit),
        price_eur_box: round2(price_eur_box),
        price_lei_piece: round2(price_lei_piece),
        price_lei_box: round2(price_lei_box),
        vat_rate,
        price_lei_piece_vat: round2(price_lei_piece_vat),
        price_lei_box_vat: round2(price_lei_box_vat),
        margin_percent,
        price_final_piece: round2(price_final_piece),
        price_final_box: round2(price_final_box),
    }
}
