//! 商品補完オーケストレーター
//!
//! 1バッチにつき: キャッシュ → バッチAI呼び出し → 個別AI呼び出し → ヒューリスティック
//! の順に補完結果を決める。AIの失敗は呼び出し側に出さず、必ず何らかの結果を返す。

pub mod cache;
mod claude_cli;
mod gemini;
mod types;

pub use cache::{cache_key, CacheFile};
pub use claude_cli::ClaudeCli;
pub use gemini::GeminiClient;
pub use types::{AiError, CallOutcome, Enrichment, RetryPolicy, TextService};

use catalog_ai_common::{
    batch_max_tokens, build_batch_prompt, build_single_prompt, heuristic_enrichment,
    parse_batch_response, parse_single_response, CategoryRateTables, EnrichmentResult,
    EnrichmentSource, ProductSummary, RawProductRecord, RunStats, MAX_OUTPUT_TOKENS,
};
use std::collections::HashMap;

/// バッチ内の照合キー（商品番号、なければ位置）
pub fn correlation_key(record: &RawProductRecord, index: usize) -> String {
    let article = record.article_number.trim();
    if article.is_empty() {
        format!("item-{}", index + 1)
    } else {
        article.to_string()
    }
}

pub struct Enricher {
    service: Option<Box<dyn TextService>>,
    tables: CategoryRateTables,
    retry: RetryPolicy,
    cache: Option<CacheFile>,
    /// 認証失敗などでAIを使えなくなった
    disabled: bool,
}

impl Enricher {
    pub fn new(service: Box<dyn TextService>, tables: CategoryRateTables, retry: RetryPolicy) -> Self {
        Self {
            service: Some(service),
            tables,
            retry,
            cache: None,
            disabled: false,
        }
    }

    /// AIなし（すべてヒューリスティック）
    pub fn heuristic_only(tables: CategoryRateTables) -> Self {
        Self {
            service: None,
            tables,
            retry: RetryPolicy::default(),
            cache: None,
            disabled: false,
        }
    }

    pub fn with_cache(mut self, cache: CacheFile) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn tables(&self) -> &CategoryRateTables {
        &self.tables
    }

    pub fn cache(&self) -> Option<&CacheFile> {
        self.cache.as_ref()
    }

    /// 使用中のAIサービス名（ヒューリスティックのみ・無効化後は None）
    pub fn service_name(&self) -> Option<&str> {
        if self.disabled {
            return None;
        }
        self.service.as_deref().map(|s| s.name())
    }

    fn ai_enabled(&self, use_ai: bool) -> bool {
        use_ai && self.service.is_some() && !self.disabled
    }

    fn heuristic(&self, record: &RawProductRecord) -> Enrichment {
        Enrichment::new(heuristic_enrichment(record, &self.tables), EnrichmentSource::Heuristic)
    }

    fn lookup_cache(&self, record: &RawProductRecord) -> Option<Enrichment> {
        let cache = self.cache.as_ref()?;
        cache
            .get(&cache_key(record))
            .map(|r| Enrichment::new(r.clone(), EnrichmentSource::Cache))
    }

    fn store_cache(&mut self, record: &RawProductRecord, result: &EnrichmentResult) {
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(cache_key(record), record.article_number.clone(), result.clone());
        }
    }

    /// 複数商品を補完（入力順に1件ずつ結果を返す）
    ///
    /// `on_fallback` は個別AI呼び出しで解決した商品ごとに、バッチ内の位置付きで呼ばれる。
    pub fn enrich_batch(
        &mut self,
        records: &[RawProductRecord],
        use_ai: bool,
        stats: &mut RunStats,
        on_fallback: &mut dyn FnMut(usize, &RawProductRecord),
    ) -> Vec<Enrichment> {
        let mut resolved: Vec<Option<Enrichment>> = records.iter().map(|r| self.lookup_cache(r)).collect();

        if !self.ai_enabled(use_ai) {
            return records
                .iter()
                .zip(resolved)
                .map(|(record, cached)| {
                    let enrichment = cached.unwrap_or_else(|| self.heuristic(record));
                    stats.record_source(enrichment.source);
                    enrichment
                })
                .collect();
        }

        // キャッシュにない商品だけバッチで送る
        let pending: Vec<(usize, ProductSummary)> = records
            .iter()
            .enumerate()
            .filter(|(i, _)| resolved[*i].is_none())
            .map(|(i, r)| (i, ProductSummary::from_record(r, correlation_key(r, i))))
            .collect();

        if !pending.is_empty() {
            let summaries: Vec<ProductSummary> = pending.iter().map(|(_, s)| s.clone()).collect();
            if let Some(mut accepted) = self.call_batch(&summaries, stats) {
                for (i, summary) in &pending {
                    if let Some(result) = accepted.remove(&summary.id) {
                        self.store_cache(&records[*i], &result);
                        resolved[*i] = Some(Enrichment::new(result, EnrichmentSource::Batch));
                    } else {
                        tracing::warn!(id = %summary.id, "バッチ応答に含まれていません、個別に処理します");
                    }
                }
                for id in accepted.keys() {
                    tracing::debug!(id = %id, "入力にないIDの応答を無視");
                }
            }
        }

        let mut enrichments = Vec::with_capacity(records.len());
        for (i, (record, slot)) in records.iter().zip(resolved).enumerate() {
            let enrichment = match slot {
                Some(e) => e,
                None => {
                    let e = self.enrich_uncached(record, stats);
                    on_fallback(i, record);
                    e
                }
            };
            stats.record_source(enrichment.source);
            enrichments.push(enrichment);
        }
        enrichments
    }

    /// 1商品を補完
    pub fn enrich_one(&mut self, record: &RawProductRecord, use_ai: bool, stats: &mut RunStats) -> Enrichment {
        let enrichment = match self.lookup_cache(record) {
            Some(cached) => cached,
            None if self.ai_enabled(use_ai) => self.enrich_uncached(record, stats),
            None => self.heuristic(record),
        };
        stats.record_source(enrichment.source);
        enrichment
    }

    /// 個別AI呼び出し → ヒューリスティック
    fn enrich_uncached(&mut self, record: &RawProductRecord, stats: &mut RunStats) -> Enrichment {
        if self.disabled {
            return self.heuristic(record);
        }

        match self.call_single(record, stats) {
            Some(result) => {
                self.store_cache(record, &result);
                Enrichment::new(result, EnrichmentSource::Individual)
            }
            None => {
                tracing::warn!(article = record.label(), "AI補完に失敗、ヒューリスティックを使用");
                self.heuristic(record)
            }
        }
    }

    fn call_batch(
        &mut self,
        summaries: &[ProductSummary],
        stats: &mut RunStats,
    ) -> Option<HashMap<String, EnrichmentResult>> {
        let prompt = build_batch_prompt(summaries, &self.tables.categories);
        let max_tokens = batch_max_tokens(summaries.len());
        let count = summaries.len();

        tracing::info!(count, max_tokens, "バッチAI呼び出し");
        let accepted = self.with_retry("batch", stats, |service| {
            match service.complete(&prompt, max_tokens) {
                Ok(text) => interpret_batch(&text, count),
                Err(e) => outcome_for_error(e),
            }
        })?;

        tracing::info!(accepted = accepted.len(), count, "バッチAI成功");
        Some(accepted)
    }

    fn call_single(&mut self, record: &RawProductRecord, stats: &mut RunStats) -> Option<EnrichmentResult> {
        let summary = ProductSummary::from_record(record, correlation_key(record, 0));
        let prompt = build_single_prompt(&summary, &self.tables.categories);
        let label = record.label().to_string();

        self.with_retry(&label, stats, |service| {
            match service.complete(&prompt, MAX_OUTPUT_TOKENS) {
                Ok(text) => match parse_single_response(&text) {
                    Ok(result) => CallOutcome::Accepted(result),
                    Err(e) => CallOutcome::NeedsRetry(classify_parse_error(e)),
                },
                Err(e) => outcome_for_error(e),
            }
        })
    }

    /// 再試行ループ（試行ごとにAI呼び出し数を加算、試行間は指数バックオフ）
    fn with_retry<T>(
        &mut self,
        label: &str,
        stats: &mut RunStats,
        mut attempt_fn: impl FnMut(&dyn TextService) -> CallOutcome<T>,
    ) -> Option<T> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let service = self.service.as_deref()?;
            stats.ai_calls += 1;

            match attempt_fn(service) {
                CallOutcome::Accepted(value) => return Some(value),
                CallOutcome::UseHeuristic => {
                    tracing::error!(
                        service = service.name(),
                        target_id = label,
                        "AIサービスを利用できないため、以降はヒューリスティックを使用します"
                    );
                    self.disabled = true;
                    return None;
                }
                CallOutcome::NeedsRetry(e) => {
                    tracing::warn!(
                        service = service.name(),
                        target_id = label,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "AI呼び出し失敗"
                    );
                    if attempt + 1 < max_attempts {
                        let delay = self.retry.delay_for(attempt);
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                    }
                }
            }
        }

        tracing::warn!(target_id = label, max_attempts, "AI呼び出しの再試行回数を超えました");
        None
    }
}

fn outcome_for_error<T>(error: AiError) -> CallOutcome<T> {
    if error.is_retryable() {
        CallOutcome::NeedsRetry(error)
    } else {
        tracing::error!(error = %error, "AIサービスエラー");
        CallOutcome::UseHeuristic
    }
}

fn classify_parse_error(error: catalog_ai_common::Error) -> AiError {
    match error {
        catalog_ai_common::Error::Json(e) => AiError::Malformed(e.to_string()),
        other => AiError::Validation(other.to_string()),
    }
}

/// バッチ応答の解釈（有効エントリが1件もなければ失敗扱い）
fn interpret_batch(text: &str, count: usize) -> CallOutcome<HashMap<String, EnrichmentResult>> {
    match parse_batch_response(text) {
        Ok(parsed) => {
            for rejected in &parsed.rejected {
                tracing::warn!(id = %rejected.id, reason = %rejected.reason, "不正なエントリを除外");
            }
            if parsed.accepted.is_empty() {
                CallOutcome::NeedsRetry(AiError::Validation("有効な商品が1件もありません".into()))
            } else {
                CallOutcome::Accepted(parsed.accepted)
            }
        }
        Err(catalog_ai_common::Error::Json(e)) => {
            if e.is_eof() {
                tracing::warn!(
                    suggested_batch_size = (count / 2).max(1),
                    "応答が途中で切れています（出力トークン不足）。バッチサイズを減らしてください"
                );
            }
            CallOutcome::NeedsRetry(AiError::Malformed(e.to_string()))
        }
        Err(e) => CallOutcome::NeedsRetry(AiError::Validation(e.to_string())),
    }
}
