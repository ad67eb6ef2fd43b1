use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-ai")]
#[command(about = "卸売カタログ商品のAI補完・価格計算ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (gemini/claude)
    #[arg(long, default_value = "gemini", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 商品JSONを補完・価格計算して出力
    Process {
        /// 商品JSONファイルまたはフォルダ
        #[arg(required = true)]
        input: PathBuf,

        /// 出力JSONファイル（デフォルト: products_YYYYMMDD_HHMMSS.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// バッチサイズ（1回のAI呼び出しで補完する商品数、省略時は設定値）
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// 為替レート EUR→RON（省略時は設定値）
        #[arg(long)]
        rate: Option<f64>,

        /// 全商品に適用するカテゴリ
        #[arg(short, long)]
        category: Option<String>,

        /// AIを使わずヒューリスティックのみで補完
        #[arg(long)]
        no_ai: bool,

        /// キャッシュを使用（補完済み商品のAI呼び出しをスキップ）
        #[arg(long)]
        use_cache: bool,
    },

    /// 1商品の価格内訳を計算
    Price {
        /// 価格文字列（例: "1,84 EUR - 2,15 EUR"）
        #[arg(required = true)]
        price: String,

        /// 1箱あたりの個数
        #[arg(short, long, default_value = "1")]
        pack: String,

        /// カテゴリ
        #[arg(short, long, default_value = "Casă & Grădină")]
        category: String,

        /// 為替レート EUR→RON（省略時は設定値）
        #[arg(long)]
        rate: Option<f64>,
    },

    /// 料率テーブルを表示/編集
    Rates {
        /// 料率を表示
        #[arg(long)]
        show: bool,

        /// 利益率を設定（カテゴリ=数値）
        #[arg(long, value_name = "CATEGORY=PERCENT")]
        set_margin: Vec<String>,

        /// VAT率を設定（カテゴリ=数値）
        #[arg(long, value_name = "CATEGORY=PERCENT")]
        set_vat: Vec<String>,

        /// ライセンスブランドを追加
        #[arg(long)]
        add_brand: Vec<String>,

        /// ライセンスブランドを削除
        #[arg(long)]
        remove_brand: Vec<String>,

        /// 対話式で編集
        #[arg(short, long)]
        interactive: bool,

        /// 既定値に戻す
        #[arg(long)]
        reset: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 為替レートを設定
        #[arg(long)]
        set_rate: Option<f64>,

        /// 既定のバッチサイズを設定
        #[arg(long)]
        set_batch_size: Option<usize>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュ管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process() {
        let cli = Cli::parse_from([
            "catalog-ai", "process", "products.json", "-b", "5", "--rate", "4.97", "--no-ai", "-c", "Sport & Timp Liber",
        ]);
        match cli.command {
            Commands::Process { input, batch_size, rate, no_ai, category, use_cache, .. } => {
                assert_eq!(input, PathBuf::from("products.json"));
                assert_eq!(batch_size, Some(5));
                assert_eq!(rate, Some(4.97));
                assert!(no_ai);
                assert!(!use_cache);
                assert_eq!(category.as_deref(), Some("Sport & Timp Liber"));
            }
            _ => panic!("Processを期待"),
        }
        assert_eq!(cli.ai_provider, AiProvider::Gemini);
    }

    #[test]
    fn test_parse_rates_multiple_assignments() {
        let cli = Cli::parse_from([
            "catalog-ai", "rates", "--set-margin", "Jucării & Copii=40", "--set-margin", "Sport & Timp Liber=25",
            "--ai-provider", "claude",
        ]);
        match cli.command {
            Commands::Rates { set_margin, .. } => assert_eq!(set_margin.len(), 2),
            _ => panic!("Ratesを期待"),
        }
        assert_eq!(cli.ai_provider, AiProvider::Claude);
    }
}
