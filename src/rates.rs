//! 料率テーブルの表示・編集
//!
//! `rates` サブコマンドから使う。対話モードは dialoguer で
//! カテゴリを選び、利益率・VAT率を入力する。

use crate::error::{CatalogAiError, Result};
use catalog_ai_common::CategoryRateTables;
use dialoguer::{Input, Select};

/// `カテゴリ=数値` を分解
pub fn parse_assignment(value: &str) -> Result<(String, u32)> {
    let (category, number) = value
        .rsplit_once('=')
        .ok_or_else(|| CatalogAiError::Config(format!("`カテゴリ=数値` の形式で指定してください: {}", value)))?;

    let category = category.trim();
    if category.is_empty() {
        return Err(CatalogAiError::Config(format!("カテゴリが空です: {}", value)));
    }

    let percent = number
        .trim()
        .parse::<u32>()
        .map_err(|_| CatalogAiError::Config(format!("数値が不正です: {}", number.trim())))?;

    Ok((category.to_string(), percent))
}

/// 料率一覧を整形
pub fn format_rates(tables: &CategoryRateTables) -> String {
    let width = tables
        .categories
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = vec![format!("{:<width$}  {:>6}  {:>4}", "カテゴリ", "利益率", "VAT", width = width)];
    for category in &tables.categories {
        let pad = width.saturating_sub(category.chars().count());
        lines.push(format!(
            "{}{}  {:>5}%  {:>3}%",
            category,
            " ".repeat(pad),
            tables.margin_for(category),
            tables.vat_for(category)
        ));
    }
    lines.push(String::new());
    lines.push(format!("ライセンスブランド ({}件): {}", tables.licensed_brands.len(), tables.licensed_brands.join(", ")));
    lines.join("\n")
}

/// 対話式で料率を編集（変更があれば true）
pub fn run_interactive_rates(tables: &mut CategoryRateTables) -> Result<bool> {
    let mut changed = false;

    loop {
        let mut items: Vec<String> = tables
            .categories
            .iter()
            .map(|c| format!("{} (利益率 {}%, VAT {}%)", c, tables.margin_for(c), tables.vat_for(c)))
            .collect();
        items.push("保存して終了".to_string());

        let selected = Select::new()
            .with_prompt("編集するカテゴリ")
            .items(&items)
            .default(0)
            .interact()
            .map_err(|e| CatalogAiError::CliExecution(e.to_string()))?;

        if selected >= tables.categories.len() {
            break;
        }

        let category = tables.categories[selected].clone();

        let margin: u32 = Input::new()
            .with_prompt(format!("{} の利益率(%)", category))
            .default(tables.margin_for(&category))
            .interact_text()
            .map_err(|e| CatalogAiError::CliExecution(e.to_string()))?;

        let vat: u32 = Input::new()
            .with_prompt(format!("{} のVAT率(%)", category))
            .default(tables.vat_for(&category))
            .interact_text()
            .map_err(|e| CatalogAiError::CliExecution(e.to_string()))?;

        if margin != tables.margin_for(&category) || vat != tables.vat_for(&category) {
            tables.set_margin(&category, margin)?;
            tables.set_vat(&category, vat)?;
            changed = true;
            println!("  → {}: 利益率 {}%, VAT {}%\n", category, margin, vat);
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (category, percent) = parse_assignment("Jucării & Copii=40").unwrap();
        assert_eq!(category, "Jucării & Copii");
        assert_eq!(percent, 40);

        let (category, percent) = parse_assignment(" Sport & Timp Liber = 25 ").unwrap();
        assert_eq!(category, "Sport & Timp Liber");
        assert_eq!(percent, 25);
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("Jucării & Copii").is_err());
        assert!(parse_assignment("=10").is_err());
        assert!(parse_assignment("Jucării & Copii=abc").is_err());
        assert!(parse_assignment("Jucării & Copii=-5").is_err());
    }

    #[test]
    fn test_format_rates_lists_every_category() {
        let tables = CategoryRateTables::default();
        let text = format_rates(&tables);
        for category in &tables.categories {
            assert!(text.contains(category.as_str()), "カテゴリなし: {}", category);
        }
        assert!(text.contains("45%"));
        assert!(text.contains("Disney"));
    }
}
