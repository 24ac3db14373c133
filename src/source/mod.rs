use crate::error::{Result, RetroAlbumError};
use retro_album_common::to_data_url;
use std::path::Path;
use std::sync::Arc;

/// アップロード画像の上限サイズ
pub const MAX_SOURCE_BYTES: u64 = 20 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
];

/// 変換元のポートレート画像
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file_name: String,
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl SourceImage {
    /// メモリ上のデータから作成（デコード可能か検証する）
    pub fn from_bytes(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        image::load_from_memory(&data)
            .map_err(|e| RetroAlbumError::ImageLoad(format!("{}: {}", file_name, e)))?;

        Ok(Self {
            file_name,
            mime_type: mime_type.into(),
            data: data.into(),
        })
    }

    /// API送信用のData URL
    pub fn to_data_url(&self) -> String {
        to_data_url(&self.mime_type, &self.data)
    }
}

/// 拡張子からMIMEタイプを判定（大文字小文字は区別しない）
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// 画像ファイルを読み込む
pub fn load_source_image(path: &Path) -> Result<SourceImage> {
    if !path.is_file() {
        return Err(RetroAlbumError::FileNotFound(path.display().to_string()));
    }

    let mime_type = mime_type_for(path)
        .ok_or_else(|| RetroAlbumError::UnsupportedImage(path.display().to_string()))?;

    let size = std::fs::metadata(path)?.len();
    if size > MAX_SOURCE_BYTES {
        return Err(RetroAlbumError::ImageLoad(format!(
            "{} は大きすぎます ({} bytes)",
            path.display(),
            size
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let data = std::fs::read(path)?;
    tracing::debug!(file = %file_name, bytes = data.len(), "source image loaded");

    SourceImage::from_bytes(file_name, mime_type, data)
}
