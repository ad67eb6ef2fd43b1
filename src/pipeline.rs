//! パイプライン（組み立て・統計）
//!
//! 入力をバッチに分けて補完し、1件ずつ価格計算して ProcessedProduct を組み立てる。
//! 各レコードは処理済みか失敗のどちらかに必ず1回だけ数える。

use crate::enricher::{Enricher, Enrichment};
use catalog_ai_common::{assemble_product, ProcessedProduct, RawProductRecord, RunStats};

/// 実行オプション（実行中は変更しない）
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub use_ai: bool,
    /// 全商品に適用するカテゴリ
    pub forced_category: Option<String>,
    /// EUR → RON
    pub exchange_rate: f64,
    pub batch_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_ai: true,
            forced_category: None,
            exchange_rate: 5.02,
            batch_size: 7,
        }
    }
}

pub struct Pipeline {
    enricher: Enricher,
    stats: RunStats,
}

impl Pipeline {
    pub fn new(enricher: Enricher) -> Self {
        Self {
            enricher,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// 1商品を組み立てる（失敗時は None、統計は必ず1回更新）
    pub fn process_one(
        &mut self,
        record: &RawProductRecord,
        enrichment: &Enrichment,
        options: &RunOptions,
    ) -> Option<ProcessedProduct> {
        self.stats.total_products += 1;
        let tables = self.enricher.tables();

        if record.article_number.trim().is_empty() && record.product_name.trim().is_empty() {
            tracing::warn!(title = %enrichment.result.title_ro, "商品番号・商品名のないレコード");
        }

        if options.forced_category.is_none()
            && tables.resolve_category(&enrichment.result.category).is_none()
        {
            tracing::warn!(
                article = record.label(),
                category = %enrichment.result.category,
                "不明なカテゴリ、既定カテゴリを使用"
            );
        }

        match assemble_product(
            record,
            &enrichment.result,
            enrichment.source,
            options.forced_category.as_deref(),
            tables,
            options.exchange_rate,
        ) {
            Ok(product) => {
                self.stats.processed_products += 1;
                Some(product)
            }
            Err(e) => {
                tracing::warn!(article = record.label(), error = %e, "商品の組み立てに失敗");
                self.stats.failed_products += 1;
                None
            }
        }
    }

    /// 1商品を補完して組み立てる
    pub fn enrich_and_process_one(
        &mut self,
        record: &RawProductRecord,
        options: &RunOptions,
    ) -> Option<ProcessedProduct> {
        let enrichment = self.enricher.enrich_one(record, options.use_ai, &mut self.stats);
        self.process_one(record, &enrichment, options)
    }

    /// 全商品を入力順に処理
    ///
    /// `progress(処理済み件数, 総数, メッセージ)` はバッチ完了ごとと、
    /// 個別呼び出しで補完した商品ごとに呼ばれる。
    pub fn process_batch(
        &mut self,
        records: &[RawProductRecord],
        options: &RunOptions,
        progress: &mut dyn FnMut(usize, usize, &str),
    ) -> Vec<ProcessedProduct> {
        let total = records.len();
        let batch_size = options.batch_size.max(1);
        let mut products = Vec::with_capacity(total);

        tracing::info!(
            total,
            batch_size,
            use_ai = options.use_ai,
            service = self.enricher.service_name().unwrap_or("heuristic"),
            "処理開始"
        );
        if let Some(category) = &options.forced_category {
            tracing::info!(category = %category, "カテゴリ指定あり");
        }

        for (chunk_index, chunk) in records.chunks(batch_size).enumerate() {
            let offset = chunk_index * batch_size;
            let end = offset + chunk.len();

            let enrichments = self.enricher.enrich_batch(
                chunk,
                options.use_ai,
                &mut self.stats,
                &mut |i, record| {
                    let done = offset + i + 1;
                    progress(done, total, &format!("個別処理 {}/{}: {}", done, total, record.label()));
                },
            );

            for (record, enrichment) in chunk.iter().zip(&enrichments) {
                if let Some(product) = self.process_one(record, enrichment, options) {
                    products.push(product);
                }
            }

            progress(end, total, &format!("バッチ {}-{} / {} 完了", offset + 1, end, total));
        }

        tracing::info!(
            processed = self.stats.processed_products,
            failed = self.stats.failed_products,
            ai_calls = self.stats.ai_calls,
            "処理完了"
        );
        products
    }
}
