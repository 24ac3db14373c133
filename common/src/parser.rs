//! APIレスポンスパーサー
//!
//! 画像生成API（generateContent）のレスポンスから画像データを取り出す。
//! 送信用のData URL組み立てもここで扱う。

use crate::error::{Error, Result};
use crate::types::GeneratedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

/// APIエラーレスポンス（`{"error": {...}}`）
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

impl ApiErrorBody {
    /// 再試行で回復しうるエラーか（サーバ内部エラー）
    pub fn is_transient(&self) -> bool {
        self.code >= 500 || self.status == "INTERNAL"
    }
}

/// generateContentの解釈結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResponse {
    /// 画像パートが含まれていた
    Image(GeneratedImage),
    /// 画像がなく、テキストのみ（拒否・説明など）
    Text(String),
}

/// generateContentレスポンスをパース
///
/// 抽出優先順位:
/// 1. 最初の候補に含まれる最初の inlineData パート
/// 2. テキストパートの連結
/// 3. ブロック理由 / 終了理由
///
/// # Arguments
/// * `body` - レスポンスJSON文字列
///
/// # Returns
/// * `Ok(GenerationResponse)` - 画像またはテキスト
/// * `Err` - JSONとして不正、または候補が空
pub fn parse_generation_response(body: &str) -> Result<GenerationResponse> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(Error::Parse(format!("候補がありません: {}", reason)));
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    if let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) {
        let data = STANDARD
            .decode(inline.data.trim())
            .map_err(|e| Error::Decode(format!("画像データのBase64デコードに失敗: {}", e)))?;
        return Ok(GenerationResponse::Image(GeneratedImage::new(
            inline.mime_type.clone(),
            data,
        )));
    }

    let text = parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Ok(GenerationResponse::Text(format!(
            "モデルが画像を返しませんでした (finishReason: {})",
            reason
        )));
    }

    Ok(GenerationResponse::Text(text.trim().to_string()))
}

/// APIエラーレスポンスをパース（エラー形式でなければNone）
pub fn parse_api_error(body: &str) -> Option<ApiErrorBody> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|e| e.error)
}

/// バイト列からData URLを組み立て
pub fn to_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================
    // parse_generation_response テスト
    // =============================================

    #[test]
    fn test_parse_image_part() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                ]},
                "finishReason": "STOP"
            }]
        }"#;

        let parsed = parse_generation_response(body).unwrap();
        match parsed {
            GenerationResponse::Image(image) => {
                assert_eq!(image.mime_type, "image/png");
                assert_eq!(&*image.data, &[1u8, 2, 3]);
            }
            other => panic!("Expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_snake_case_inline_data() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"inline_data": {"mime_type": "image/jpeg", "data": "AQID"}}
        ]}}]}"#;

        let parsed = parse_generation_response(body).unwrap();
        assert!(matches!(parsed, GenerationResponse::Image(ref i) if i.mime_type == "image/jpeg"));
    }

    #[test]
    fn test_parse_text_only() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "I can't help with that."}
        ]}, "finishReason": "STOP"}]}"#;

        let parsed = parse_generation_response(body).unwrap();
        assert_eq!(parsed, GenerationResponse::Text("I can't help with that.".into()));
    }

    #[test]
    fn test_parse_empty_parts_reports_finish_reason() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;

        let parsed = parse_generation_response(body).unwrap();
        match parsed {
            GenerationResponse::Text(msg) => assert!(msg.contains("SAFETY")),
            other => panic!("Expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "OTHER"}}"#;

        let result = parse_generation_response(body);
        if let Err(Error::Parse(msg)) = result {
            assert!(msg.contains("OTHER"));
        } else {
            panic!("Expected Parse error");
        }
    }

    #[test]
    fn test_parse_invalid_base64() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": "!!!"}}
        ]}}]}"#;

        assert!(matches!(parse_generation_response(body), Err(Error::Decode(_))));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(parse_generation_response("not json"), Err(Error::Json(_))));
    }

    // =============================================
    // parse_api_error テスト
    // =============================================

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}}"#;
        let error = parse_api_error(body).unwrap();
        assert_eq!(error.code, 500);
        assert!(error.is_transient());

        let body = r#"{"error": {"code": 400, "message": "bad", "status": "INVALID_ARGUMENT"}}"#;
        assert!(!parse_api_error(body).unwrap().is_transient());

        assert!(parse_api_error("{}").is_none());
    }

    // =============================================
    // Data URL テスト
    // =============================================

    #[test]
    fn test_to_data_url() {
        let url = to_data_url("image/webp", &[1, 2, 3]);
        assert_eq!(url, "data:image/webp;base64,AQID");
    }
}
