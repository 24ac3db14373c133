//! 画像生成クライアントの境界
//!
//! 実体（HTTP・認証・モデル選択）は実装側に閉じ込め、
//! オーケストレータは `GenerationClient` だけを見る。

use crate::source::SourceImage;
use futures::future::BoxFuture;
use retro_album_common::{Decade, GeneratedImage};
use std::fmt;

/// クライアントがメッセージを返さなかった場合の表示文
pub const GENERIC_FAILURE_MESSAGE: &str = "画像の生成に失敗しました";

/// 1件分の生成リクエスト
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub source: &'a SourceImage,
    pub decade: &'a Decade,
    /// 変換指示文
    pub prompt: &'a str,
}

/// 生成失敗（メッセージは任意）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationError {
    pub message: Option<String>,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    /// 表示用メッセージ（空なら汎用文）
    pub fn display_message(&self) -> String {
        match self.message.as_deref().map(str::trim) {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_message())
    }
}

impl std::error::Error for GenerationError {}

pub type GenerationResult = std::result::Result<GeneratedImage, GenerationError>;

/// 画像生成サービス
pub trait GenerationClient: Send + Sync {
    fn generate<'a>(&'a self, request: GenerationRequest<'a>) -> BoxFuture<'a, GenerationResult>;
}

/// 元画像をそのまま返すオフライン用クライアント
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoClient;

impl GenerationClient for EchoClient {
    fn generate<'a>(&'a self, request: GenerationRequest<'a>) -> BoxFuture<'a, GenerationResult> {
        Box::pin(async move {
            tracing::debug!(decade = %request.decade, "echo client returning source image");
            Ok(GeneratedImage::new(
                request.source.mime_type.clone(),
                request.source.data.clone(),
            ))
        })
    }
}
