//! Gemini API連携
//!
//! 元画像（inlineData）と指示文を generateContent に送り、
//! レスポンスの最初の画像パートを取り出す。
//!
//! - サーバ内部エラー（5xx / INTERNAL）は指数バックオフで再試行
//! - 画像が返らなかった場合はフォールバックプロンプトで1回だけ再依頼

use super::client::{GenerationClient, GenerationError, GenerationRequest, GenerationResult};
use crate::config::Config;
use crate::error::{Result, RetroAlbumError};
use crate::source::SourceImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use retro_album_common::{build_fallback_prompt, parse_api_error, parse_generation_response, GenerationResponse};
use serde::Serialize;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

/// 1回の呼び出し失敗の分類
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallError {
    /// 再試行で回復しうる
    Transient(String),
    Fatal(String),
}

impl CallError {
    fn into_message(self) -> String {
        match self {
            CallError::Transient(msg) | CallError::Fatal(msg) => msg,
        }
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration, max_retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetroAlbumError::ApiCall(format!("HTTPクライアント初期化エラー: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model,
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.get_api_key()?,
            config.model.clone(),
            Duration::from_secs(config.timeout_seconds),
            config.max_retries,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    async fn call_once(&self, source: &SourceImage, prompt: &str) -> std::result::Result<GenerationResponse, CallError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &source.mime_type,
                            data: STANDARD.encode(&source.data),
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::Fatal("timeout".to_string())
                } else {
                    CallError::Fatal(format!("通信エラー: {}", e))
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transient(format!("レスポンス読み込みエラー: {}", e)))?;

        classify_response(status, &body)
    }

    /// 一時的エラーを再試行しながら呼び出す
    async fn call_with_retry(&self, source: &SourceImage, prompt: &str) -> std::result::Result<GenerationResponse, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.call_once(source, prompt).await {
                Ok(response) => return Ok(response),
                Err(CallError::Transient(msg)) if attempt < self.max_retries => {
                    let delay = backoff_delay(self.backoff_base, attempt);
                    tracing::warn!(attempt = attempt + 1, ?delay, "transient API error, retrying: {}", msg);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(GenerationError::new(e.into_message())),
            }
        }
    }
}

impl GenerationClient for GeminiClient {
    fn generate<'a>(&'a self, request: GenerationRequest<'a>) -> BoxFuture<'a, GenerationResult> {
        Box::pin(async move {
            match self.call_with_retry(request.source, request.prompt).await? {
                GenerationResponse::Image(image) => Ok(image),
                GenerationResponse::Text(text) => {
                    tracing::warn!(decade = %request.decade, "no image returned, trying fallback prompt: {}", text);
                    let fallback = build_fallback_prompt(request.decade);
                    match self.call_with_retry(request.source, &fallback).await? {
                        GenerationResponse::Image(image) => Ok(image),
                        GenerationResponse::Text(text) => Err(GenerationError::new(text)),
                    }
                }
            }
        })
    }
}

/// n回目の再試行までの待ち時間（base * 2^n）
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// HTTPステータスと本文から結果を分類
fn classify_response(status: u16, body: &str) -> std::result::Result<GenerationResponse, CallError> {
    if (200..300).contains(&status) {
        return parse_generation_response(body)
            .map_err(|e| CallError::Fatal(format!("レスポンス解析エラー: {}", e)));
    }

    match parse_api_error(body) {
        Some(error) if error.is_transient() => Err(CallError::Transient(error.message)),
        Some(error) if !error.message.is_empty() => Err(CallError::Fatal(error.message)),
        _ if status >= 500 => Err(CallError::Transient(format!("API error: {}", status))),
        _ => Err(CallError::Fatal(format!("API error: {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
    }

    #[test]
    fn test_classify_success_image() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
        ]}}]}"#;
        let result = classify_response(200, body).unwrap();
        assert!(matches!(result, GenerationResponse::Image(_)));
    }

    #[test]
    fn test_classify_internal_is_transient() {
        let body = r#"{"error": {"code": 500, "message": "Internal error encountered.", "status": "INTERNAL"}}"#;
        assert_eq!(
            classify_response(500, body),
            Err(CallError::Transient("Internal error encountered.".into()))
        );
        assert!(matches!(classify_response(503, "<html>"), Err(CallError::Transient(_))));
    }

    #[test]
    fn test_classify_client_error_is_fatal() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            classify_response(400, body),
            Err(CallError::Fatal("API key not valid.".into()))
        );
        assert_eq!(
            classify_response(404, ""),
            Err(CallError::Fatal("API error: 404".into()))
        );
    }

    #[test]
    fn test_classify_malformed_success_body() {
        assert!(matches!(classify_response(200, "oops"), Err(CallError::Fatal(_))));
    }

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AQID".into(),
                        },
                    },
                    Part::Text { text: "make it 1950s" },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "make it 1950s");
    }
}
