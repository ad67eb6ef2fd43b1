//! Gemini API クライアント
//!
//! `POST {base}/models/{model}:generateContent` をブロッキングHTTPで呼ぶ。
//! APIキーは `x-goog-api-key` ヘッダで渡す（URLに載せるとエラー文経由でログに出る）。
//! JSON mime type は指定しない（指定すると壊れたJSONが返ることがあった）。

use super::types::{AiError, TextService};
use crate::config::Config;
use crate::error::{CatalogAiError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// 安全フィルタを無効化するカテゴリ
const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: &str,
        base_url: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogAiError::ApiCall(format!("HTTPクライアント作成失敗: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            temperature,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.get_api_key()?,
            &config.model,
            &config.api_base_url,
            config.temperature,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn build_request(prompt: &str, max_tokens: u32, temperature: f32) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature,
            max_output_tokens: max_tokens,
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: "BLOCK_NONE",
            })
            .collect(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// 失敗ステータスを分類（キー不正は再試行しても無駄なので Unavailable）
fn status_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let auth_failed = status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || (status == reqwest::StatusCode::BAD_REQUEST && body.contains("API_KEY_INVALID"));

    if auth_failed {
        AiError::Unavailable(format!("認証エラー (HTTP {})", status.as_u16()))
    } else {
        AiError::Request(format!("HTTP {}: {}", status.as_u16(), body))
    }
}

/// レスポンスから生成テキストを取り出す（空ならブロック扱い）
fn extract_text(response: GenerateResponse) -> std::result::Result<String, AiError> {
    let first = response.candidates.first();
    let text: String = first
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::Blocked {
            finish_reason: first
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "UNKNOWN".into()),
            block_reason: response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "N/A".into()),
        });
    }

    Ok(text)
}

impl TextService for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str, max_tokens: u32) -> std::result::Result<String, AiError> {
        let body = build_request(prompt, max_tokens, self.temperature);

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .map_err(|e| {
                let timed_out = e.is_timeout();
                let e = e.without_url();
                if timed_out {
                    AiError::Request(format!("タイムアウト: {}", e))
                } else {
                    AiError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| AiError::Malformed(format!("レスポンス形式が不正: {}", e)))?;

        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = build_request("hello", 3000, 0.6);
        let json = serde_json::to_value(&body).expect("シリアライズ失敗");

        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 3000);
        assert!(json["generationConfig"].get("responseMimeType").is_none());
        assert_eq!(json["safetySettings"].as_array().map(|a| a.len()), Some(4));
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}, "finishReason": "STOP"}]}"#,
        )
        .expect("デシリアライズ失敗");
        assert_eq!(extract_text(response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_text_blocked_by_safety() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"finishReason": "SAFETY"}], "promptFeedback": {"blockReason": "OTHER"}}"#,
        )
        .expect("デシリアライズ失敗");

        let err = extract_text(response).unwrap_err();
        assert_eq!(
            err,
            AiError::Blocked {
                finish_reason: "SAFETY".into(),
                block_reason: "OTHER".into()
            }
        );
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let err = extract_text(GenerateResponse::default()).unwrap_err();
        assert!(matches!(err, AiError::Blocked { ref finish_reason, .. } if finish_reason == "UNKNOWN"));
    }

    #[test]
    fn test_status_error_classification() {
        let invalid_key = r#"{"error": {"code": 400, "status": "INVALID_ARGUMENT", "details": [{"reason": "API_KEY_INVALID"}]}}"#;
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_REQUEST, invalid_key),
            AiError::Unavailable(_)
        ));
        assert!(matches!(status_error(reqwest::StatusCode::FORBIDDEN, ""), AiError::Unavailable(_)));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_REQUEST, r#"{"error": {"status": "INVALID_ARGUMENT"}}"#),
            AiError::Request(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            AiError::Request(_)
        ));
    }

    #[test]
    fn test_request_failure_does_not_expose_api_key() {
        // 接続できないアドレスへ送ってエラー文を確認
        let client = GeminiClient::new(
            "SECRET_KEY_123".into(),
            "m",
            "http://127.0.0.1:9",
            0.6,
            Duration::from_secs(2),
        )
        .expect("クライアント作成失敗");

        let err = client.complete("hello", 16).unwrap_err();
        assert!(matches!(err, AiError::Request(_)));
        assert!(!err.to_string().contains("SECRET_KEY_123"), "キーが漏れている: {}", err);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(
            "key".into(),
            "gemini-2.5-flash",
            "https://example.test/v1beta/",
            0.6,
            Duration::from_secs(5),
        )
        .expect("クライアント作成失敗");
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
