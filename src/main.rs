use catalog_ai_common::{compute_prices, extract_max_price, normalize_pack_size, RunStats};
use catalog_ai_rust::{ai_provider, cli, config, enricher, error, loader, pipeline, rates};
use catalog_ai_rust::output::{default_output_path, RunOutput};
use ai_provider::AiProvider;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use enricher::{CacheFile, ClaudeCli, Enricher, GeminiClient, RetryPolicy, TextService};
use error::{CatalogAiError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{Pipeline, RunOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// キャッシュの保存先（入力がフォルダならそこ、ファイルなら親フォルダ）
fn cache_folder(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.to_path_buf()
    } else {
        input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn build_service(provider: AiProvider, config: &Config, verbose: bool) -> Result<Box<dyn TextService>> {
    Ok(match provider {
        AiProvider::Gemini => Box::new(GeminiClient::from_config(config)?),
        AiProvider::Claude => Box::new(ClaudeCli::new(verbose)),
    })
}

fn print_stats(stats: &RunStats) {
    println!("統計:");
    println!("  総数: {}", stats.total_products);
    println!("  処理済み: {}", stats.processed_products);
    println!("  失敗: {}", stats.failed_products);
    println!("  AI呼び出し: {}", stats.ai_calls);
    println!(
        "  補完元: バッチ {} / 個別 {} / ヒューリスティック {} / キャッシュ {}",
        stats.batch_enriched, stats.individual_enriched, stats.heuristic_enriched, stats.cache_hits
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Process { input, output, batch_size, rate, category, no_ai, use_cache } => {
            println!("📦 catalog-ai - 商品補完\n");

            // 1. 読み込み
            println!("[1/3] 商品を読み込み中...");
            let records = loader::load_products(&input)?;
            println!("✔ {}件の商品を検出\n", records.len());

            if records.is_empty() {
                return Err(CatalogAiError::NoProductsFound(input.display().to_string()));
            }

            let use_ai = !no_ai;
            if use_ai && cli.ai_provider.needs_api_key() {
                // 処理開始前に確認
                config.get_api_key()?;
            }

            let options = RunOptions {
                use_ai,
                forced_category: category,
                exchange_rate: rate.unwrap_or(config.exchange_rate),
                batch_size: batch_size.unwrap_or(config.default_batch_size).max(1),
            };
            if !options.exchange_rate.is_finite() || options.exchange_rate <= 0.0 {
                return Err(CatalogAiError::Config(format!("為替レートが不正です: {}", options.exchange_rate)));
            }

            // 2. 補完・価格計算
            println!(
                "[2/3] {}で補完中...{}",
                if use_ai { cli.ai_provider.display_name() } else { "ヒューリスティック" },
                if use_cache { " (キャッシュ有効)" } else { "" }
            );

            let cache_dir = cache_folder(&input);
            let total = records.len();
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(usize, String)>();
            let provider = cli.ai_provider;
            let verbose = cli.verbose;
            let run_config = config.clone();
            let run_options = options.clone();
            let worker_cache_dir = cache_dir.clone();

            // ブロッキングHTTPとリトライ待機は専用スレッドで実行
            let worker = tokio::task::spawn_blocking(move || -> Result<_> {
                let tables = run_config.rates.clone();
                let mut enricher = if run_options.use_ai {
                    let retry = RetryPolicy {
                        max_attempts: run_config.max_retries,
                        base_delay: run_config.retry_base_delay(),
                    };
                    Enricher::new(build_service(provider, &run_config, verbose)?, tables, retry)
                } else {
                    Enricher::heuristic_only(tables)
                };
                if use_cache {
                    enricher = enricher.with_cache(CacheFile::load(&worker_cache_dir));
                }

                let mut pipeline = Pipeline::new(enricher);
                let products = pipeline.process_batch(&records, &run_options, &mut |done, _, msg| {
                    let _ = tx.send((done, msg.to_string()));
                });

                let stats = pipeline.stats().clone();
                let cache = pipeline.enricher().cache().cloned();
                Ok((products, stats, cache))
            });

            while let Some((done, msg)) = rx.recv().await {
                bar.set_position(done as u64);
                bar.set_message(msg);
            }
            bar.finish_and_clear();

            let (products, stats, cache) = worker
                .await
                .map_err(|e| CatalogAiError::Worker(e.to_string()))??;
            println!("✔ 補完完了\n");

            if let Some(cache) = cache {
                cache.save(&cache_dir)?;
                println!("✔ キャッシュを保存 ({}件)", cache.len());
            }

            // 3. 保存
            println!("[3/3] 結果を保存中...");
            let output_path = output.unwrap_or_else(|| default_output_path(Path::new(".")));
            RunOutput::new(products, stats.clone(), options.exchange_rate).save(&output_path)?;
            println!("✔ 結果を保存: {}\n", output_path.display());

            print_stats(&stats);
            println!("\n✅ 完了");
        }

        Commands::Price { price, pack, category, rate } => {
            let tables = &config.rates;
            let category = tables.resolve_category(&category).unwrap_or(category);
            let unit_price = extract_max_price(&price);
            let pack_size = normalize_pack_size(Some(&serde_json::Value::String(pack)));
            let exchange_rate = rate.unwrap_or(config.exchange_rate);

            let prices = compute_prices(unit_price, pack_size, &category, tables, exchange_rate);

            println!("💶 価格内訳 ({}, {}個入り, レート {})", category, pack_size, exchange_rate);
            println!("  EUR/個:        {:>10.2}", prices.price_eur_piece);
            println!("  EUR/箱:        {:>10.2}", prices.price_eur_box);
            println!("  RON/個:        {:>10.2}", prices.price_lei_piece);
            println!("  RON/箱:        {:>10.2}", prices.price_lei_box);
            println!("  VAT:           {:>9}%", prices.vat_rate);
            println!("  RON/個 (VAT):  {:>10.2}", prices.price_lei_piece_vat);
            println!("  RON/箱 (VAT):  {:>10.2}", prices.price_lei_box_vat);
            println!("  利益率:        {:>9}%", prices.margin_percent);
            println!("  販売価格/個:   {:>10.2}", prices.price_final_piece);
            println!("  販売価格/箱:   {:>10.2}", prices.price_final_box);
        }

        Commands::Rates { show, set_margin, set_vat, add_brand, remove_brand, interactive, reset } => {
            let mut config = config;
            let mut changed = false;

            if reset {
                config.rates = Default::default();
                changed = true;
                println!("✔ 料率を既定値に戻しました");
            }

            for assignment in &set_margin {
                let (category, percent) = rates::parse_assignment(assignment)?;
                config.rates.set_margin(&category, percent)?;
                changed = true;
                println!("✔ 利益率: {} = {}%", category, percent);
            }

            for assignment in &set_vat {
                let (category, percent) = rates::parse_assignment(assignment)?;
                config.rates.set_vat(&category, percent)?;
                changed = true;
                println!("✔ VAT率: {} = {}%", category, percent);
            }

            for brand in &add_brand {
                if config.rates.add_licensed_brand(brand) {
                    changed = true;
                    println!("✔ ライセンスブランドを追加: {}", brand);
                } else {
                    println!("登録済みです: {}", brand);
                }
            }

            for brand in &remove_brand {
                if config.rates.remove_licensed_brand(brand) {
                    changed = true;
                    println!("✔ ライセンスブランドを削除: {}", brand);
                } else {
                    println!("登録されていません: {}", brand);
                }
            }

            if interactive && rates::run_interactive_rates(&mut config.rates)? {
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("{}", rates::format_rates(&config.rates));
            }
        }

        Commands::Config { set_api_key, set_rate, set_batch_size, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(rate) = set_rate {
                config.set_exchange_rate(rate)?;
                println!("✔ 為替レートを設定しました: {}", rate);
            }

            if let Some(size) = set_batch_size {
                if size == 0 {
                    return Err(CatalogAiError::Config("バッチサイズは1以上にしてください".into()));
                }
                config.default_batch_size = size;
                config.save()?;
                println!("✔ バッチサイズを設定しました: {}", size);
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  温度: {}", config.temperature);
                println!("  為替レート (EUR→RON): {}", config.exchange_rate);
                println!("  バッチサイズ: {}", config.default_batch_size);
                println!("  再試行回数: {}", config.max_retries);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
                if let Ok(path) = Config::config_path() {
                    println!("  設定ファイル: {}", path.display());
                }
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = CacheFile::cache_path(&target);

            if info || !clear {
                // デフォルトまたは--info: 情報表示
                if cache_path.exists() {
                    let cache = CacheFile::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match CacheFile::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
