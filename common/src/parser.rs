//! AIレスポンスの検証パーサー
//!
//! AIの出力は信頼できない半構造テキストとして扱う。
//! コードフェンスを除去してJSONとして読み、6フィールドすべてが
//! 正しい型で揃っている場合のみ EnrichmentResult として受け入れる。

use crate::error::{Error, Result};
use crate::types::EnrichmentResult;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// EnrichmentResultの必須フィールド
pub const REQUIRED_FIELDS: &[&str] = &[
    "title_ro",
    "description_ro",
    "short_description_ro",
    "category",
    "is_licensed_brand",
    "tags_ro",
];

/// 検証で除外されたエントリ
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    pub id: String,
    pub reason: String,
}

/// バッチレスポンスの検証結果
#[derive(Debug, Clone, Default)]
pub struct BatchParse {
    /// 商品ID → 検証済み結果
    pub accepted: HashMap<String, EnrichmentResult>,
    /// 除外されたエントリ（呼び出し側でログ出力）
    pub rejected: Vec<RejectedEntry>,
}

/// Markdownのコードフェンス（```json ... ```）を除去
///
/// フェンスがなければ前後の空白のみ除去して返す。
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let body = &trimmed[3..];
    // 言語タグ（"json" など）を1行目ごと読み飛ばす
    let body = match body.find('\n') {
        Some(newline) if body[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &body[newline + 1..]
        }
        _ => body.trim_start_matches("json"),
    };

    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// トップレベルがJSONオブジェクトであることを確認してパース
fn parse_object(response: &str) -> Result<Map<String, Value>> {
    let json_str = strip_code_fence(response);
    if json_str.is_empty() {
        return Err(Error::Parse("レスポンスが空です".into()));
    }

    let value: Value = serde_json::from_str(json_str)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Parse(format!(
            "JSONオブジェクトではありません: {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 1エントリの検証
///
/// 欠落フィールドがあれば全体を拒否する（部分的な結果はマージしない）。
/// カテゴリの値はここでは補正しない。
fn validate_entry(entry: &Map<String, Value>) -> std::result::Result<EnrichmentResult, String> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !entry.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(format!("必須フィールドがありません: {:?}", missing));
    }

    let text = |field: &str| -> std::result::Result<String, String> {
        match &entry[field] {
            Value::String(s) => Ok(s.clone()),
            other => Err(format!("{} が文字列ではありません: {}", field, json_type_name(other))),
        }
    };

    let is_licensed_brand = match &entry["is_licensed_brand"] {
        Value::Bool(b) => *b,
        other => {
            return Err(format!(
                "is_licensed_brand が真偽値ではありません: {}",
                json_type_name(other)
            ))
        }
    };

    // タグは配列で返ってくることがあるのでカンマ区切りに揃える
    let tags_ro = match &entry["tags_ro"] {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or("tags_ro の要素が文字列ではありません"))
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join(", "),
        other => return Err(format!("tags_ro の型が不正です: {}", json_type_name(other))),
    };

    Ok(EnrichmentResult {
        title_ro: text("title_ro")?,
        description_ro: text("description_ro")?,
        short_description_ro: text("short_description_ro")?,
        category: text("category")?,
        is_licensed_brand,
        tags_ro,
    })
}

/// 1商品レスポンスをパース
///
/// # Returns
/// * `Ok(EnrichmentResult)` - 全フィールドが揃っている
/// * `Err(Error::Json)` - JSONとして読めない（再試行対象）
/// * `Err(Error::Parse)` - 形が不正（再試行対象）
pub fn parse_single_response(response: &str) -> Result<EnrichmentResult> {
    let map = parse_object(response)?;
    validate_entry(&map).map_err(Error::Parse)
}

/// バッチレスポンスをパース
///
/// トップレベルが辞書でなければエラー。各エントリは個別に検証し、
/// 不正なものは `rejected` に回して残りを返す。
pub fn parse_batch_response(response: &str) -> Result<BatchParse> {
    let map = parse_object(response)?;
    let mut parsed = BatchParse::default();

    for (id, value) in map {
        let outcome = match &value {
            Value::Object(entry) => validate_entry(entry),
            other => Err(format!("エントリがオブジェクトではありません: {}", json_type_name(other))),
        };

        match outcome {
            Ok(result) => {
                parsed.accepted.insert(id, result);
            }
            Err(reason) => parsed.rejected.push(RejectedEntry { id, reason }),
        }
    }

    Ok(parsed)
}
