//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use retro_album::error::RetroAlbumError;
use retro_album::source;
use retro_album_common::Decade;
use std::path::Path;
use tempfile::tempdir;

/// 存在しない画像を読み込んだ場合
#[test]
fn test_load_nonexistent_image() {
    let result = source::load_source_image(Path::new("/nonexistent/path/12345.png"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, RetroAlbumError::FileNotFound(_)));
}

/// ディレクトリを画像として指定した場合
#[test]
fn test_load_directory_as_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = source::load_source_image(dir.path());
    assert!(matches!(result, Err(RetroAlbumError::FileNotFound(_))));
}

/// 対応外の形式
#[test]
fn test_load_unsupported_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("portrait.bmp");
    std::fs::write(&path, b"BM").unwrap();

    let err = source::load_source_image(&path).unwrap_err();
    assert!(matches!(err, RetroAlbumError::UnsupportedImage(_)));
    assert!(format!("{}", err).contains("PNG/JPEG/WebP"));
}

/// 拡張子は正しいが中身が壊れている
#[test]
fn test_load_corrupted_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("portrait.jpg");
    std::fs::write(&path, b"\xFF\xD8 broken").unwrap();

    let result = source::load_source_image(&path);
    assert!(matches!(result, Err(RetroAlbumError::ImageLoad(_))));
}

/// RetroAlbumErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let decade = Decade::new("1970s").unwrap();
    let errors = vec![
        RetroAlbumError::Config("テスト設定エラー".to_string()),
        RetroAlbumError::FileNotFound("me.png".to_string()),
        RetroAlbumError::ApiCall("API呼び出し失敗".to_string()),
        RetroAlbumError::UnknownDecade(decade.clone()),
        RetroAlbumError::NotReady(decade),
        RetroAlbumError::AlbumIncomplete { done: 4, required: 6 },
        RetroAlbumError::AlbumRender("描画失敗".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// 年代がメッセージに含まれる
#[test]
fn test_decade_in_message() {
    let err = RetroAlbumError::NotReady(Decade::new("1980s").unwrap());
    assert!(format!("{}", err).contains("1980s"));

    let err = RetroAlbumError::AlbumIncomplete { done: 5, required: 6 };
    assert!(format!("{}", err).contains("5/6"));
}

/// MissingApiKeyエラーのメッセージ確認
#[test]
fn test_missing_api_key_message() {
    let err = RetroAlbumError::MissingApiKey;
    let display = format!("{}", err);

    assert!(display.contains("APIキー"));
    assert!(display.contains("retro-album config"));
    assert!(display.contains("GEMINI_API_KEY"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: RetroAlbumError = io_err.into();

    assert!(matches!(err, RetroAlbumError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: RetroAlbumError = json_err.into();

    assert!(matches!(err, RetroAlbumError::JsonParse(_)));
}

/// common::Errorは透過的に表示される
#[test]
fn test_common_error_transparent() {
    let common_err = "  ".parse::<Decade>().unwrap_err();
    let err: RetroAlbumError = common_err.into();

    assert!(matches!(err, RetroAlbumError::Common(_)));
    assert!(format!("{}", err).contains("Invalid decade label"));
}
