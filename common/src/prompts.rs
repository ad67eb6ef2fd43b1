//! プロンプト生成モジュール
//!
//! - build_single_prompt: 1商品用プロンプト（JSONオブジェクトを返させる）
//! - build_batch_prompt: 複数商品用プロンプト（商品ID→結果の辞書を返させる）
//! - batch_max_tokens: バッチ件数に応じた出力トークン要求量

use crate::types::RawProductRecord;
use serde::Serialize;

/// AIサービスの出力トークン上限
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// 1商品あたりの想定出力トークン（タイトル+説明文+箇条書き+メタデータ）
pub const TOKENS_PER_PRODUCT: u32 = 1000;

/// バッチ出力のオーバーヘッド
pub const BATCH_TOKEN_OVERHEAD: u32 = 2000;

/// AIに渡す商品サマリ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub id: String,
    pub brand: String,
    pub product_name: String,
    pub description: String,
    pub country_of_origin: String,
}

impl ProductSummary {
    /// 生レコードからサマリを作成
    ///
    /// `id` はバッチ照合キー。商品番号が空の場合は呼び出し側が位置ベースのキーを渡す。
    pub fn from_record(record: &RawProductRecord, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            brand: or_na(&record.brand),
            product_name: or_na(&record.product_name),
            description: or_na(&record.description),
            country_of_origin: or_na(&record.country_of_origin),
        }
    }
}

fn or_na(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        "N/A".to_string()
    } else {
        value.to_string()
    }
}

/// バッチ件数に応じた出力トークン要求量（上限でキャップ）
pub fn batch_max_tokens(count: usize) -> u32 {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    count
        .saturating_mul(TOKENS_PER_PRODUCT)
        .saturating_add(BATCH_TOKEN_OVERHEAD)
        .min(MAX_OUTPUT_TOKENS)
}

const WRITING_RULES: &str = r#"Write every text field in Romanian, in a professional B2B tone:
- `title_ro`: the product name translated to Romanian. Concise, no marketing or SEO words ("B2B", "engros", "ideal pentru cadouri").
- `description_ro`: one plain paragraph of 40-60 words. What the product is, practical uses, key characteristics. No bold subtitles, no consumer phrasing ("dumneavoastră", "vă oferă").
- `short_description_ro`: 3-5 bullet points of 5-15 words each, separated by `\n`, technical characteristics or contents only.
- `category`: exactly one value from the category list below.
- `is_licensed_brand`: true only for major licensed brands (Disney, Marvel, Pokemon, ...).
- `tags_ro`: 5-7 relevant SEO tags separated by commas."#;

const JSON_RULES: &str = r#"Output rules:
- Valid JSON only. No text before or after the JSON, no markdown.
- Escape double quotes inside strings with a backslash.
- Use `\n` escapes for line breaks inside strings, never literal newlines."#;

fn category_list(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 1商品用プロンプト生成
pub fn build_single_prompt(summary: &ProductSummary, categories: &[String]) -> String {
    let categories = category_list(categories);

    format!(
        r#"You are an expert writer of B2B product listings for a Romanian e-commerce shop.

## Product
Brand: {brand}
Product name (EN): {name}
Description (EN): {description}
Country of origin: {origin}

## Tasks
{WRITING_RULES}

## Categories
{categories}

## Output format (a single JSON object)
{{
  "title_ro": "...",
  "description_ro": "...",
  "short_description_ro": "...\n...\n...",
  "category": "...",
  "is_licensed_brand": false,
  "tags_ro": "..., ..., ..."
}}

{JSON_RULES}"#,
        brand = summary.brand,
        name = summary.product_name,
        description = summary.description,
        origin = summary.country_of_origin,
    )
}

/// 複数商品用プロンプト生成
///
/// 入力の各商品は `id` を持ち、応答はその `id` をキーとする辞書で返させる。
pub fn build_batch_prompt(summaries: &[ProductSummary], categories: &[String]) -> String {
    let product_list = serde_json::to_string_pretty(summaries).unwrap_or_else(|_| "[]".into());
    let categories = category_list(categories);

    format!(
        r#"You are an expert writer of B2B product listings for a Romanian e-commerce shop.
You receive a JSON LIST of products. Return a JSON OBJECT whose keys are the "id" values of the input products, one entry for EVERY product.

## Products (input)
{product_list}

## Tasks for each product
{WRITING_RULES}

## Categories
{categories}

## Output format
{{
  "<id of product>": {{
    "title_ro": "...",
    "description_ro": "...",
    "short_description_ro": "...\n...\n...",
    "category": "...",
    "is_licensed_brand": false,
    "tags_ro": "..., ..., ..."
  }}
}}

{JSON_RULES}"#
    )
}
