//! AIテキストサービスの境界型

use catalog_ai_common::{EnrichmentResult, EnrichmentSource};
use std::time::Duration;
use thiserror::Error;

/// AIテキスト生成サービス
///
/// プロンプトと出力トークン上限を受け取り、生成テキストをそのまま返す。
/// 実装は Gemini API / Claude CLI / テスト用のスクリプト化サービス。
pub trait TextService: Send {
    /// ログ表示用の名前
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AiError>;
}

/// AI呼び出し1回分の失敗理由
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    /// 安全フィルタ等で応答が空
    #[error("応答がブロックされました (finish_reason: {finish_reason}, block_reason: {block_reason})")]
    Blocked {
        finish_reason: String,
        block_reason: String,
    },

    /// 通信・HTTP・プロセス実行の失敗
    #[error("リクエスト失敗: {0}")]
    Request(String),

    /// JSONとして読めない応答
    #[error("JSONとして読めません: {0}")]
    Malformed(String),

    /// JSONだが形が不正
    #[error("検証エラー: {0}")]
    Validation(String),

    /// サービス自体が利用できない（認証失敗・CLI未インストール）
    #[error("AIサービスを利用できません: {0}")]
    Unavailable(String),
}

impl AiError {
    /// 同じ呼び出しを再試行する意味があるか
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AiError::Unavailable(_))
    }
}

/// 1回の試行の結果
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// 検証済みの結果
    Accepted(T),
    /// 再試行対象の失敗
    NeedsRetry(AiError),
    /// AIを諦めてヒューリスティックへ
    UseHeuristic,
}

/// 再試行ポリシー（指数バックオフ）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// 待機なし（テスト用）
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// `attempt` 回目（0始まり）の失敗後の待機時間: base × 2^attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// 1商品分の補完結果と取得元
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub result: EnrichmentResult,
    pub source: EnrichmentSource,
}

impl Enrichment {
    pub fn new(result: EnrichmentResult, source: EnrichmentSource) -> Self {
        Self { result, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for(2), Duration::ZERO);
    }

    #[test]
    fn test_unavailable_is_not_retryable() {
        assert!(!AiError::Unavailable("401".into()).is_retryable());
        assert!(AiError::Malformed("eof".into()).is_retryable());
        assert!(AiError::Blocked {
            finish_reason: "SAFETY".into(),
            block_reason: "N/A".into()
        }
        .is_retryable());
    }
}
