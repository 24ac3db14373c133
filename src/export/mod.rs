pub mod album;

pub use album::{compose_album, AlbumOptions};

use crate::error::{Result, RetroAlbumError};
use crate::generator::StoreSnapshot;
use image::codecs::jpeg::JpegEncoder;
use retro_album_common::{Decade, GeneratedImage, GenerationStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// アルバムの固定ファイル名
pub const ALBUM_FILE_NAME: &str = "retro-album.jpg";

const ITEM_FILE_PREFIX: &str = "retro-album-";
const ITEM_JPEG_QUALITY: u8 = 92;

/// 年代ごとの保存ファイル名
pub fn item_file_name(decade: &Decade) -> String {
    let safe: String = decade
        .label()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}{}.jpg", ITEM_FILE_PREFIX, safe)
}

/// アルバムの出力先（ディレクトリ指定ならその中の固定名）
pub fn album_output_path(output: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(ALBUM_FILE_NAME)
    } else {
        output.to_path_buf()
    }
}

/// 画像をJPEGとして得る（JPEG以外は再エンコード）
fn to_jpeg_bytes(decade: &Decade, image: &GeneratedImage) -> Result<Vec<u8>> {
    if image.mime_type == "image/jpeg" {
        return Ok(image.data.to_vec());
    }

    let decoded = image::load_from_memory(&image.data)
        .map_err(|e| RetroAlbumError::ImageLoad(format!("{}: {}", decade, e)))?;
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, ITEM_JPEG_QUALITY)
        .encode_image(&decoded.to_rgb8())
        .map_err(|e| RetroAlbumError::ImageEncode(format!("{}: {}", decade, e)))?;
    Ok(buf)
}

/// 完成した1年代の画像を保存
pub fn save_item_image(snapshot: &StoreSnapshot, decade: &Decade, output_dir: &Path) -> Result<PathBuf> {
    let image = match snapshot.get(decade) {
        Some(GenerationStatus::Done { image }) => image,
        Some(_) => return Err(RetroAlbumError::NotReady(decade.clone())),
        None => return Err(RetroAlbumError::UnknownDecade(decade.clone())),
    };

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(item_file_name(decade));
    std::fs::write(&path, to_jpeg_bytes(decade, image)?)?;
    tracing::debug!(%decade, path = %path.display(), "item image saved");
    Ok(path)
}

/// 保存済みの年代画像を読み込む（見つからない年代は含めない）
pub fn load_saved_images(dir: &Path, decades: &[Decade]) -> Result<Vec<(Decade, GeneratedImage)>> {
    if !dir.is_dir() {
        return Err(RetroAlbumError::FileNotFound(dir.display().to_string()));
    }

    let mut images = Vec::new();
    for decade in decades {
        let path = dir.join(item_file_name(decade));
        if !path.is_file() {
            tracing::debug!(%decade, "saved image not found");
            continue;
        }
        let data = std::fs::read(&path)?;
        images.push((decade.clone(), GeneratedImage::new("image/jpeg", data)));
    }
    Ok(images)
}

/// アルバム書き出し（多重実行防止つき）
///
/// 成功・失敗どちらでも実行中フラグは戻る。
#[derive(Debug, Default)]
pub struct AlbumExporter {
    in_progress: AtomicBool,
}

struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AlbumExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// 完成済み画像からアルバムを作り `output` に保存
    ///
    /// 必要枚数は `decades` の件数。1枚でも足りなければ何も描画しない。
    pub async fn export(
        &self,
        images: &[(Decade, GeneratedImage)],
        decades: &[Decade],
        output: &Path,
        options: &AlbumOptions,
    ) -> Result<PathBuf> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RetroAlbumError::AlbumRender("アルバムを作成中です".into()));
        }
        let _guard = InProgressGuard(&self.in_progress);

        // 並び順どおりに揃える
        let ordered: Vec<(Decade, GeneratedImage)> = decades
            .iter()
            .filter_map(|d| images.iter().find(|(id, _)| id == d).cloned())
            .collect();

        let jpeg = compose_album(&ordered, decades.len(), options).await?;

        let path = album_output_path(output);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, jpeg)?;
        Ok(path)
    }

    /// ストアのスナップショットからアルバムを作る
    pub async fn export_snapshot(
        &self,
        snapshot: &StoreSnapshot,
        output: &Path,
        options: &AlbumOptions,
    ) -> Result<PathBuf> {
        self.export(&snapshot.done_images(), &snapshot.decades(), output, options)
            .await
    }
}
