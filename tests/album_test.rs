//! アルバム合成の結合テスト
//!
//! 実際にSVG→ラスタライズ→JPEGまで通して出力を確認する

use retro_album::error::RetroAlbumError;
use retro_album::export::{self, album, compose_album, AlbumExporter, AlbumOptions, ALBUM_FILE_NAME};
use retro_album::generator::StoreSnapshot;
use retro_album_common::{default_decades, Decade, GeneratedImage, GenerationStatus};
use std::io::Cursor;

const PHOTO_COLORS: [[u8; 3]; 6] = [
    [200, 30, 30],
    [30, 160, 40],
    [40, 60, 200],
    [220, 200, 40],
    [150, 40, 160],
    [30, 170, 170],
];

fn png_image(width: u32, height: u32, color: [u8; 3]) -> GeneratedImage {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(color));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    GeneratedImage::new("image/png", buf)
}

fn six_items() -> Vec<(Decade, GeneratedImage)> {
    default_decades()
        .into_iter()
        .zip(PHOTO_COLORS)
        .enumerate()
        .map(|(i, (d, color))| (d, png_image(24 + i as u32 * 4, 18, color)))
        .collect()
}

fn assert_close(got: &image::Rgb<u8>, want: [u8; 3], what: &str) {
    for (g, w) in got.0.iter().zip(want) {
        assert!((*g as i32 - w as i32).abs() <= 12, "{}: got {:?}, want {:?}", what, got, want);
    }
}

/// 6枚そろえば A4 300dpi のJPEGができ、各写真が並び順どおりのカードに描かれる
#[tokio::test]
async fn test_compose_six_cards() {
    let items = six_items();
    let options = AlbumOptions {
        seed: Some(2024),
        ..Default::default()
    };
    let jpeg = compose_album(&items, 6, &options).await.unwrap();

    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let page = image::load_from_memory(&jpeg).unwrap().to_rgb8();
    assert_eq!(page.dimensions(), (2480, 3508));

    // 左上の余白は背景色
    assert_close(page.get_pixel(10, 10), [0xFD, 0xF5, 0xE6], "background");

    // 同じシードで計画し直し、写真中心の色を確認
    let photos: Vec<_> = items
        .iter()
        .map(|(d, image)| album::decode_photo(d, image).unwrap())
        .collect();
    let plan = album::plan_album(&photos, options.seed);
    for (card, color) in plan.cards.iter().zip(PHOTO_COLORS) {
        let (x, y) = card.photo_center_on_canvas();
        let pixel = page.get_pixel(x.round() as u32, y.round() as u32);
        assert_close(pixel, color, card.decade.label());
    }
}

/// 1枚でもデコードできなければ全体が失敗
#[tokio::test]
async fn test_compose_fails_on_broken_image() {
    let mut items = six_items();
    items[3].1 = GeneratedImage::new("image/png", vec![0u8; 16]);

    let result = compose_album(&items, 6, &AlbumOptions::default()).await;
    assert!(matches!(result, Err(RetroAlbumError::ImageLoad(msg)) if msg.contains("1980s")));
}

/// 枚数不足なら描画しない
#[tokio::test]
async fn test_compose_incomplete() {
    let items = &six_items()[..5];
    let result = compose_album(items, 6, &AlbumOptions::default()).await;
    assert!(matches!(result, Err(RetroAlbumError::AlbumIncomplete { done: 5, required: 6 })));

    let result = compose_album(&[], 0, &AlbumOptions::default()).await;
    assert!(matches!(result, Err(RetroAlbumError::AlbumIncomplete { done: 0, required: 0 })));
}

/// キャンバスに収まらない枚数は描画しない
#[tokio::test]
async fn test_compose_too_many_cards() {
    let items: Vec<(Decade, GeneratedImage)> = (0..63)
        .map(|i| (Decade::new(format!("item{}", i)).unwrap(), png_image(4, 4, [10, 10, 10])))
        .collect();

    let result = compose_album(&items, items.len(), &AlbumOptions::default()).await;
    assert!(matches!(result, Err(RetroAlbumError::AlbumRender(_))));
}

/// 保存 → 読み込み → アルバム書き出し
#[tokio::test]
async fn test_save_and_export_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let decades: Vec<Decade> = default_decades().into_iter().take(2).collect();

    let snapshot = StoreSnapshot {
        run: 1,
        entries: decades
            .iter()
            .map(|d| (d.clone(), GenerationStatus::Done { image: png_image(20, 20, [90, 100, 50]) }))
            .collect(),
    };
    for decade in &decades {
        let path = export::save_item_image(&snapshot, decade, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap().to_string_lossy(), export::item_file_name(decade));
        // PNGはJPEGに変換して保存
        assert_eq!(&std::fs::read(&path).unwrap()[..2], &[0xFF, 0xD8]);
    }

    let images = export::load_saved_images(dir.path(), &decades).unwrap();
    assert_eq!(images.len(), 2);

    let out = dir.path().join("album");
    let options = AlbumOptions {
        seed: Some(5),
        ..Default::default()
    };
    let path = AlbumExporter::new()
        .export(&images, &decades, &out, &options)
        .await
        .unwrap();
    assert_eq!(path, out.join(ALBUM_FILE_NAME));
    assert!(path.is_file());
}

/// 存在しないディレクトリからは読み込めない
#[test]
fn test_load_saved_images_missing_dir() {
    let result = export::load_saved_images(std::path::Path::new("/nonexistent/album"), &default_decades());
    assert!(matches!(result, Err(RetroAlbumError::FileNotFound(_))));
}
