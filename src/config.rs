//! 設定ファイル
//!
//! `~/.config/catalog-ai/config.json` に保存する。ファイルがなければ既定値。
//! 料率テーブルもここに含め、`rates` サブコマンドで編集する。

use crate::error::{CatalogAiError, Result};
use catalog_ai_common::CategoryRateTables;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// EUR → RON
    pub exchange_rate: f64,
    pub default_batch_size: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_seconds: u64,
    pub api_base_url: String,
    pub rates: CategoryRateTables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            temperature: 0.6,
            exchange_rate: 5.02,
            default_batch_size: 7,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            timeout_seconds: 120,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            rates: CategoryRateTables::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CatalogAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("catalog-ai").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.exchange_rate.is_finite() || self.exchange_rate <= 0.0 {
            return Err(CatalogAiError::Config(format!(
                "為替レートが不正です: {}",
                self.exchange_rate
            )));
        }
        if self.default_batch_size == 0 {
            return Err(CatalogAiError::Config("バッチサイズは1以上にしてください".into()));
        }
        self.rates.validate()?;
        Ok(())
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CatalogAiError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_exchange_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CatalogAiError::Config(format!("為替レートが不正です: {}", rate)));
        }
        self.exchange_rate = rate;
        self.save()
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.exchange_rate, 5.02);
        assert_eq!(config.default_batch_size, 7);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().expect("一時ディレクトリ作成失敗");
        let config = Config::load_from(&dir.path().join("config.json")).expect("読み込み失敗");
        assert_eq!(config.rates.categories.len(), 9);
    }

    #[test]
    fn test_save_and_load_roundtrip_keeps_rates() {
        let dir = tempdir().expect("一時ディレクトリ作成失敗");
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.exchange_rate = 4.97;
        config.rates.set_margin("Jucării & Copii", 50).expect("利益率設定失敗");
        config.save_to(&path).expect("保存失敗");

        let loaded = Config::load_from(&path).expect("読み込み失敗");
        assert_eq!(loaded.exchange_rate, 4.97);
        assert_eq!(loaded.rates.margin_for("Jucării & Copii"), 50);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().expect("一時ディレクトリ作成失敗");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": "gemini-2.0-flash"}"#).expect("書き込み失敗");

        let config = Config::load_from(&path).expect("読み込み失敗");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.timeout_seconds, 120);
    }

    #[test]
    fn test_invalid_exchange_rate_rejected() {
        let dir = tempdir().expect("一時ディレクトリ作成失敗");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"exchange_rate": 0}"#).expect("書き込み失敗");

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CatalogAiError::Config(_)));
    }
}
