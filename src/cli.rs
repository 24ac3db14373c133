use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use crate::error::{Result, RetroAlbumError};
use crate::export::item_file_name;
use retro_album_common::{default_decades, Decade};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retro-album")]
#[command(about = "ポートレートを年代別スタイルに生成し、ポラロイド風アルバムにまとめる", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (gemini/echo)
    #[arg(long, default_value = "gemini", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 全年代の画像を生成して保存
    Generate {
        /// 元のポートレート画像 (PNG/JPEG/WebP)
        #[arg(required = true)]
        image: PathBuf,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// 同時生成数（省略時は設定値）
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// 年代リスト（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        decades: Option<Vec<Decade>>,

        /// 失敗した年代を1回ずつ再生成
        #[arg(long)]
        retry_failed: bool,

        /// 全年代がそろったらアルバムも作成
        #[arg(long)]
        album: bool,

        /// アルバムの回転角シード
        #[arg(long)]
        seed: Option<u64>,
    },

    /// 1年代だけ再生成して保存
    Regenerate {
        /// 元のポートレート画像
        #[arg(required = true)]
        image: PathBuf,

        /// 再生成する年代
        #[arg(short, long, required = true)]
        decade: Decade,

        /// 保存済み画像のディレクトリ（出力先も同じ）
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// 年代リスト（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        decades: Option<Vec<Decade>>,
    },

    /// 保存済み画像からアルバムを作成
    Album {
        /// 年代画像のディレクトリ
        #[arg(required = true)]
        dir: PathBuf,

        /// 出力ファイル/ディレクトリ（省略時は入力ディレクトリ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 年代リスト（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        decades: Option<Vec<Decade>>,

        /// 回転角シード
        #[arg(long)]
        seed: Option<u64>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// 指定がなければ既定の年代一覧（重複は先勝ちで除去）
///
/// 保存ファイル名が衝突する年代の組はエラーにする。
pub fn resolve_decades(decades: Option<Vec<Decade>>) -> Result<Vec<Decade>> {
    let Some(decades) = decades else {
        return Ok(default_decades());
    };
    let mut unique: Vec<Decade> = Vec::with_capacity(decades.len());
    for decade in decades {
        if unique.contains(&decade) {
            continue;
        }
        let file_name = item_file_name(&decade);
        if let Some(existing) = unique.iter().find(|d| item_file_name(d) == file_name) {
            return Err(RetroAlbumError::DecadeFileNameCollision(existing.clone(), decade));
        }
        unique.push(decade);
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "retro-album", "generate", "me.png", "-c", "3", "--decades", "1950s,1960s", "--album",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate { image, concurrency, decades, album, .. } => {
                assert_eq!(image, PathBuf::from("me.png"));
                assert_eq!(concurrency, Some(3));
                assert_eq!(decades.map(|d| d.len()), Some(2));
                assert!(album);
            }
            _ => panic!("Expected Generate"),
        }
    }

    #[test]
    fn test_parse_regenerate_requires_decade() {
        assert!(Cli::try_parse_from(["retro-album", "regenerate", "me.png"]).is_err());
        let cli = Cli::try_parse_from(["retro-album", "--ai-provider", "echo", "regenerate", "me.png", "-d", "1970s"]).unwrap();
        assert!(matches!(cli.ai_provider, AiProvider::Echo));
    }

    #[test]
    fn test_resolve_decades() {
        assert_eq!(resolve_decades(None).unwrap().len(), 6);

        let cli = Cli::try_parse_from(["retro-album", "album", "out", "--decades", "1950s,1960s,1950s"]).unwrap();
        match cli.command {
            Commands::Album { decades, .. } => {
                let resolved = resolve_decades(decades).unwrap();
                assert_eq!(resolved, vec![Decade::new("1950s").unwrap(), Decade::new("1960s").unwrap()]);
            }
            _ => panic!("Expected Album"),
        }
    }

    #[test]
    fn test_resolve_decades_file_name_collision() {
        let decades = vec![Decade::new("80s/90s").unwrap(), Decade::new("80s_90s").unwrap()];
        assert!(matches!(
            resolve_decades(Some(decades)),
            Err(RetroAlbumError::DecadeFileNameCollision(a, b)) if a.label() == "80s/90s" && b.label() == "80s_90s"
        ));
    }
}
