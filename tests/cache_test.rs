//! キャッシュ機能テスト
//!
//! 補完結果キャッシュの動作を検証

use catalog_ai_common::{EnrichmentResult, RawProductRecord};
use catalog_ai_rust::enricher::cache::{cache_key, CacheFile};
use tempfile::tempdir;

fn result(title: &str) -> EnrichmentResult {
    EnrichmentResult {
        title_ro: title.to_string(),
        description_ro: "Descriere".to_string(),
        short_description_ro: "Linie 1\nLinie 2".to_string(),
        category: "Casă & Grădină".to_string(),
        is_licensed_brand: false,
        tags_ro: "casa, gradina".to_string(),
    }
}

/// 空のキャッシュファイル
#[test]
fn test_cache_file_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = CacheFile::load(dir.path());

    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

/// キャッシュの保存と読み込み
#[test]
fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");

    let mut cache = CacheFile::load(dir.path());
    cache.insert("abc123".to_string(), "A-1".to_string(), result("Cană ceramică"));
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    // 再読み込み
    let loaded = CacheFile::load(dir.path());
    assert_eq!(loaded.len(), 1);

    let cached = loaded.get("abc123").expect("キャッシュが見つからない");
    assert_eq!(cached.title_ro, "Cană ceramică");
    assert_eq!(cached.short_description_ro, "Linie 1\nLinie 2");
}

/// キャッシュヒット判定（同じ商品内容なら同じキー）
#[test]
fn test_cache_hit_by_record_content() {
    let dir = tempdir().expect("Failed to create temp dir");
    let record = RawProductRecord {
        article_number: "A-7".to_string(),
        brand: "Varta".to_string(),
        product_name: "Batteries AAA".to_string(),
        ..Default::default()
    };

    let mut cache = CacheFile::load(dir.path());
    cache.insert(cache_key(&record), record.article_number.clone(), result("Baterii"));

    // 価格が変わっても内容が同じならヒット
    let repriced = RawProductRecord { price: "9,99 EUR".to_string(), ..record.clone() };
    assert!(cache.get(&cache_key(&repriced)).is_some());

    // 名前が変わればミス
    let renamed = RawProductRecord { product_name: "Batteries AA".to_string(), ..record };
    assert!(cache.get(&cache_key(&renamed)).is_none());
}

/// キャッシュの上書き
#[test]
fn test_cache_overwrite() {
    let dir = tempdir().expect("Failed to create temp dir");

    let mut cache = CacheFile::load(dir.path());
    cache.insert("same".to_string(), "A-1".to_string(), result("Primul"));
    cache.insert("same".to_string(), "A-1".to_string(), result("Actualizat"));

    let cached = cache.get("same").expect("キャッシュが見つからない");
    assert_eq!(cached.title_ro, "Actualizat");
    assert_eq!(cache.len(), 1); // エントリ数は変わらない
}

/// キャッシュファイルが破損している場合
#[test]
fn test_cache_corrupted_file() {
    let dir = tempdir().expect("Failed to create temp dir");

    // 不正なJSONを書き込む
    std::fs::write(CacheFile::cache_path(dir.path()), "{ invalid json }").unwrap();

    // 破損したキャッシュは空として扱われる
    let cache = CacheFile::load(dir.path());
    assert!(cache.is_empty());
}

/// バージョン違いのキャッシュは空として扱う
#[test]
fn test_cache_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(
        CacheFile::cache_path(dir.path()),
        r#"{"version": 999, "entries": {}}"#,
    )
    .unwrap();

    let cache = CacheFile::load(dir.path());
    assert!(cache.is_empty());
}

/// キャッシュの削除
#[test]
fn test_cache_clear() {
    let dir = tempdir().expect("Failed to create temp dir");

    assert!(!CacheFile::clear(dir.path()).expect("削除失敗"));

    let mut cache = CacheFile::default();
    cache.insert("k".to_string(), "A-1".to_string(), result("X"));
    cache.save(dir.path()).expect("保存失敗");

    assert!(CacheFile::clear(dir.path()).expect("削除失敗"));
    assert!(!CacheFile::cache_path(dir.path()).exists());
}
