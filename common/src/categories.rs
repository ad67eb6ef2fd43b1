//! カテゴリ・料率テーブル
//!
//! 商品カテゴリ（閉じた集合）ごとの利益率・VAT率と、
//! ライセンスブランド判定用のブランド名リストを保持する。
//! 実行中は読み取り専用として扱う。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 商品カテゴリ（閉じた集合）
pub const PRODUCT_CATEGORIES: &[&str] = &[
    "Casă & Grădină",
    "Jucării & Copii",
    "Fashion & Accesorii",
    "Beauty & Îngrijire",
    "Electronice & Birou",
    "Cadouri & Petreceri",
    "Sport & Timp Liber",
    "Alimente & Băuturi",
    "Branduri Licențiate",
];

/// 判定できない場合のカテゴリ
pub const DEFAULT_CATEGORY: &str = "Casă & Grădină";

/// ライセンスブランド専用カテゴリ
pub const LICENSED_CATEGORY: &str = "Branduri Licențiate";

/// 未登録カテゴリのVAT率（標準税率）
pub const DEFAULT_VAT_RATE: u32 = 19;

/// 未登録カテゴリの利益率
pub const DEFAULT_MARGIN: u32 = 30;

const DEFAULT_LICENSED_BRANDS: &[&str] = &[
    "Marvel", "Disney", "Star Wars", "Pixar", "Mickey Mouse", "Minnie Mouse",
    "Frozen", "Princess", "Cars", "Toy Story", "Spider-Man", "Avengers",
    "Batman", "Superman", "DC Comics", "Harry Potter", "Pokemon", "Pokémon",
    "Nintendo", "Super Mario", "Sonic", "Minecraft", "Fortnite",
    "Barbie", "Hot Wheels", "LEGO", "Paw Patrol", "Peppa Pig",
    "Hello Kitty", "Snoopy", "Looney Tunes", "Tom and Jerry",
    "Teenage Mutant Ninja Turtles", "TMNT", "Transformers",
    "My Little Pony", "Care Bears", "Winnie the Pooh",
];

/// カテゴリ別料率テーブル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRateTables {
    /// カテゴリ一覧（閉じた集合）
    pub categories: Vec<String>,
    /// カテゴリ → 利益率(%)
    pub margins: HashMap<String, u32>,
    /// カテゴリ → VAT率(%)
    pub vat: HashMap<String, u32>,
    /// ライセンスブランドとみなすブランド名（部分一致）
    pub licensed_brands: Vec<String>,
    /// 卸サイトのカテゴリ名 → 自社カテゴリ
    pub source_category_mapping: HashMap<String, String>,
}

impl Default for CategoryRateTables {
    fn default() -> Self {
        let margins = [
            ("Casă & Grădină", 30),
            ("Jucării & Copii", 35),
            ("Fashion & Accesorii", 40),
            ("Beauty & Îngrijire", 35),
            ("Electronice & Birou", 20),
            ("Cadouri & Petreceri", 40),
            ("Sport & Timp Liber", 30),
            ("Alimente & Băuturi", 25),
            ("Branduri Licențiate", 45),
        ];

        // 食品のみ軽減税率
        let vat = PRODUCT_CATEGORIES
            .iter()
            .map(|&c| {
                let rate = if c == "Alimente & Băuturi" { 9 } else { DEFAULT_VAT_RATE };
                (c.to_string(), rate)
            })
            .collect();

        let source_category_mapping = [
            ("Home & Living", "Casă & Grădină"),
            ("Household & Kitchen", "Casă & Grădină"),
            ("Garden & DIY store", "Casă & Grădină"),
            ("Pet supplies", "Casă & Grădină"),
            ("Other", "Casă & Grădină"),
            ("Toys", "Jucării & Copii"),
            ("Licensed Products", "Branduri Licențiate"),
            ("Fashion & Apparel", "Fashion & Accesorii"),
            ("Jewelry & Watches", "Fashion & Accesorii"),
            ("Bags & Travel accessories", "Fashion & Accesorii"),
            ("Drugstore & Beauty", "Beauty & Îngrijire"),
            ("Consumer Electronics", "Electronice & Birou"),
            ("Office and business supplies", "Electronice & Birou"),
            ("Gifts & Stationery", "Cadouri & Petreceri"),
            ("Party & Costumes", "Cadouri & Petreceri"),
            ("Sports & Leisure", "Sport & Timp Liber"),
            ("Food & Beverage", "Alimente & Băuturi"),
        ];

        Self {
            categories: PRODUCT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            margins: margins.iter().map(|(c, m)| (c.to_string(), *m)).collect(),
            vat,
            licensed_brands: DEFAULT_LICENSED_BRANDS.iter().map(|b| b.to_string()).collect(),
            source_category_mapping: source_category_mapping
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl CategoryRateTables {
    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let tables: Self = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// テーブルの整合性チェック
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Config("カテゴリが空です".into()));
        }
        for (category, rate) in self.margins.iter().chain(self.vat.iter()) {
            if *rate > 1000 {
                return Err(Error::Config(format!("料率が大きすぎます: {} = {}%", category, rate)));
            }
        }
        Ok(())
    }

    /// 利益率（未登録なら30%）
    pub fn margin_for(&self, category: &str) -> u32 {
        self.margins.get(category).copied().unwrap_or(DEFAULT_MARGIN)
    }

    /// VAT率（未登録なら標準税率19%）
    pub fn vat_for(&self, category: &str) -> u32 {
        self.vat.get(category).copied().unwrap_or(DEFAULT_VAT_RATE)
    }

    /// ブランド名がライセンスブランドに該当するか（大文字小文字を区別しない部分一致）
    pub fn is_licensed_brand(&self, brand: &str) -> bool {
        let brand = brand.trim();
        if brand.is_empty() {
            return false;
        }
        let brand_lower = brand.to_lowercase();
        self.licensed_brands
            .iter()
            .filter(|b| !b.trim().is_empty())
            .any(|b| brand_lower.contains(&b.trim().to_lowercase()))
    }

    /// カテゴリ名を閉じた集合に正規化
    ///
    /// 完全一致 → 大文字小文字・空白の揺れ → 卸サイトのカテゴリ名 の順に解決する。
    /// どれにも該当しなければ None。
    pub fn resolve_category(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Some(c) = self.categories.iter().find(|c| c.as_str() == value) {
            return Some(c.clone());
        }

        let key = fold(value);
        if let Some(c) = self.categories.iter().find(|c| fold(c) == key) {
            return Some(c.clone());
        }

        self.source_category_mapping
            .iter()
            .find(|(source, _)| fold(source) == key)
            .map(|(_, target)| target.clone())
            .filter(|target| self.categories.contains(target))
    }

    /// 利益率を設定（カテゴリは既存のものに限る）
    pub fn set_margin(&mut self, category: &str, percent: u32) -> Result<()> {
        let category = self.require_category(category)?;
        self.margins.insert(category, percent);
        Ok(())
    }

    /// VAT率を設定（カテゴリは既存のものに限る）
    pub fn set_vat(&mut self, category: &str, percent: u32) -> Result<()> {
        let category = self.require_category(category)?;
        self.vat.insert(category, percent);
        Ok(())
    }

    /// ライセンスブランドを追加（重複は無視）
    pub fn add_licensed_brand(&mut self, brand: &str) -> bool {
        let brand = brand.trim();
        if brand.is_empty()
            || self.licensed_brands.iter().any(|b| b.eq_ignore_ascii_case(brand))
        {
            return false;
        }
        self.licensed_brands.push(brand.to_string());
        true
    }

    /// ライセンスブランドを削除
    pub fn remove_licensed_brand(&mut self, brand: &str) -> bool {
        let before = self.licensed_brands.len();
        self.licensed_brands.retain(|b| !b.eq_ignore_ascii_case(brand.trim()));
        self.licensed_brands.len() != before
    }

    fn require_category(&self, category: &str) -> Result<String> {
        self.resolve_category(category)
            .ok_or_else(|| Error::Config(format!("不明なカテゴリ: {}", category)))
    }
}

/// 比較用に小文字化・空白正規化
fn fold(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
