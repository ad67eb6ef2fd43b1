//! 実行結果のJSON出力

use crate::error::Result;
use catalog_ai_common::{ProcessedProduct, RunStats};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 後続工程（エクスポート）への受け渡しドキュメント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub generated_at: String,
    pub exchange_rate: f64,
    pub products: Vec<ProcessedProduct>,
    pub stats: RunStats,
}

impl RunOutput {
    pub fn new(products: Vec<ProcessedProduct>, stats: RunStats, exchange_rate: f64) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            exchange_rate,
            products,
            stats,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// 既定の出力ファイル名: products_YYYYMMDD_HHMMSS.json
pub fn default_output_path(dir: &Path) -> PathBuf {
    dir.join(format!("products_{}.json", Local::now().format("%Y%m%d_%H%M%S")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_output_path_format() {
        let path = default_output_path(Path::new("out"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("products_"));
        assert!(name.ends_with(".json"));
        // products_ + 8桁 + _ + 6桁 + .json
        assert_eq!(name.len(), "products_".len() + 8 + 1 + 6 + ".json".len());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().expect("一時ディレクトリ作成失敗");
        let path = dir.path().join("sub").join("out.json");
        let stats = RunStats { total_products: 1, failed_products: 1, ..Default::default() };

        RunOutput::new(Vec::new(), stats.clone(), 5.02).save(&path).expect("保存失敗");
        let loaded = RunOutput::load(&path).expect("読み込み失敗");

        assert_eq!(loaded.stats, stats);
        assert_eq!(loaded.exchange_rate, 5.02);
        assert!(loaded.products.is_empty());
    }
}
