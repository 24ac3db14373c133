use retro_album_common::Decade;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetroAlbumError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`retro-album config --set-api-key YOUR_KEY` で設定するか GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していない画像形式です: {0}（PNG/JPEG/WebPのみ）")]
    UnsupportedImage(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像エンコードエラー: {0}")]
    ImageEncode(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("未登録の年代です: {0}")]
    UnknownDecade(Decade),

    #[error("年代 {0} と {1} は同じ保存ファイル名になります")]
    DecadeFileNameCollision(Decade, Decade),

    #[error("{0} はまだ生成が完了していません")]
    NotReady(Decade),

    #[error("アルバムを作成できません: 完成した画像が {done}/{required} 枚です")]
    AlbumIncomplete { done: usize, required: usize },

    #[error("アルバム生成エラー: {0}")]
    AlbumRender(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] retro_album_common::Error),
}

pub type Result<T> = std::result::Result<T, RetroAlbumError>;
