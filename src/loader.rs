//! 商品JSONの読み込み
//!
//! - ファイル: JSONオブジェクト（1商品）または配列
//! - フォルダ: 直下の `*.json` をファイル名順に連結

use crate::error::{CatalogAiError, Result};
use catalog_ai_common::RawProductRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// キャッシュファイルなど、商品データでないJSON
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// フォルダ直下のJSONファイル一覧（ファイル名順）
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(CatalogAiError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_json(p) && !is_hidden(p))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// 1ファイルを読み込み
pub fn load_file(path: &Path) -> Result<Vec<RawProductRecord>> {
    if !path.exists() {
        return Err(CatalogAiError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;

    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<RawProductRecord>(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    // 1件の不正レコードでファイル全体を落とさない
                    tracing::warn!(path = %path.display(), index, error = %e, "商品レコードをスキップ");
                    None
                }
            })
            .collect(),
        Value::Object(_) => vec![serde_json::from_value(value)?],
        _ => {
            return Err(CatalogAiError::Config(format!(
                "商品JSONはオブジェクトか配列である必要があります: {}",
                path.display()
            )))
        }
    };

    tracing::debug!(path = %path.display(), count = records.len(), "商品JSONを読み込み");
    Ok(records)
}

/// ファイルまたはフォルダから商品を読み込み
pub fn load_products(path: &Path) -> Result<Vec<RawProductRecord>> {
    if path.is_dir() {
        let mut records = Vec::new();
        for file in scan_folder(path)? {
            records.extend(load_file(&file)?);
        }
        Ok(records)
    } else {
        load_file(path)
    }
}
