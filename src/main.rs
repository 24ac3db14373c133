use clap::Parser;
use retro_album::{cli, config, error, export, generator, progress, source};
use cli::{resolve_decades, Cli, Commands};
use config::Config;
use error::{Result, RetroAlbumError};
use export::{AlbumExporter, AlbumOptions};
use generator::{Orchestrator, ResultStore, StoreSnapshot};
use progress::ProgressReporter;
use retro_album_common::{Decade, GenerationStatus};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "retro_album=debug,retro_album_common=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// 完成した画像を保存し、失敗した年代を表示
fn save_results(snapshot: &StoreSnapshot, output: &Path) -> Result<usize> {
    let mut saved = 0;
    for (decade, status) in &snapshot.entries {
        match status {
            GenerationStatus::Done { .. } => {
                let path = export::save_item_image(snapshot, decade, output)?;
                println!("✔ {}: {}", decade, path.display());
                saved += 1;
            }
            GenerationStatus::Error { message } => {
                println!("✖ {}: {}", decade, message);
            }
            GenerationStatus::Pending => {
                println!("… {}: 未完了", decade);
            }
        }
    }
    Ok(saved)
}

/// アルバム作成（不足時はメッセージのみ）
async fn try_export_album(snapshot: &StoreSnapshot, output: &Path, seed: Option<u64>) -> Result<()> {
    let exporter = AlbumExporter::new();
    let options = AlbumOptions {
        seed,
        ..Default::default()
    };

    match exporter.export_snapshot(snapshot, output, &options).await {
        Ok(path) => {
            println!("✔ アルバム出力: {}", path.display());
            Ok(())
        }
        Err(e @ RetroAlbumError::AlbumIncomplete { .. }) => {
            println!("⚠ {}", e);
            println!("  失敗した年代を `retro-album regenerate` で再生成してください");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Generate { image, output, concurrency, decades, retry_failed, album, seed } => {
            println!("📸 retro-album - 年代別生成\n");
            let decades = resolve_decades(decades)?;

            // 1. 画像読み込み
            println!("[1/3] 画像を読み込み中...");
            let source = source::load_source_image(&image)?;
            println!("✔ {} ({})\n", source.file_name, source.mime_type);

            // 2. 生成
            let client = generator::build_client(cli.ai_provider, &config)?;
            let store = Arc::new(ResultStore::new());
            let reporter = Arc::new(ProgressReporter::new(decades.len()));
            store.subscribe(reporter.clone());

            let orchestrator = Orchestrator::new(
                client,
                store.clone(),
                concurrency.unwrap_or(config.concurrency),
            );
            println!(
                "[2/3] 生成中... (プロバイダ: {}, 同時実行数: {}, {}件)",
                cli.ai_provider.name(),
                orchestrator.concurrency(),
                decades.len()
            );
            let report = orchestrator.run_batch(&source, &decades).await;

            if retry_failed && report.failed > 0 {
                let failed: Vec<Decade> = store
                    .snapshot()
                    .entries
                    .into_iter()
                    .filter(|(_, s)| s.error_message().is_some())
                    .map(|(d, _)| d)
                    .collect();
                println!("  失敗した{}件を再生成中...", failed.len());
                let retries = failed.iter().map(|d| orchestrator.regenerate(&source, d));
                for result in futures::future::join_all(retries).await {
                    result?;
                }
            }
            reporter.finish();

            let snapshot = store.snapshot();
            println!(
                "✔ 生成完了: 成功 {} / 失敗 {}\n",
                snapshot.done_count(),
                snapshot.error_count()
            );

            // 3. 保存
            println!("[3/3] 保存中...");
            save_results(&snapshot, &output)?;

            if album {
                try_export_album(&snapshot, &output, seed).await?;
            }

            println!("\n✅ 完了");
        }

        Commands::Regenerate { image, decade, output, decades } => {
            println!("🔁 retro-album - 再生成 ({})\n", decade);
            let decades = resolve_decades(decades)?;
            if !decades.contains(&decade) {
                return Err(RetroAlbumError::UnknownDecade(decade));
            }

            let source = source::load_source_image(&image)?;
            std::fs::create_dir_all(&output)?;
            let saved = export::load_saved_images(&output, &decades)?;

            let store = Arc::new(ResultStore::new());
            store.restore(
                decades
                    .iter()
                    .map(|d| {
                        let status = match saved.iter().find(|(id, _)| id == d) {
                            Some((_, image)) => GenerationStatus::Done { image: image.clone() },
                            None => GenerationStatus::Error { message: "未生成".into() },
                        };
                        (d.clone(), status)
                    })
                    .collect(),
            );

            let client = generator::build_client(cli.ai_provider, &config)?;
            let orchestrator = Orchestrator::new(client, store.clone(), config.concurrency);
            orchestrator.regenerate(&source, &decade).await?;

            let snapshot = store.snapshot();
            match snapshot.get(&decade) {
                Some(GenerationStatus::Done { .. }) => {
                    let path = export::save_item_image(&snapshot, &decade, &output)?;
                    println!("✔ {}: {}", decade, path.display());
                }
                Some(GenerationStatus::Error { message }) => {
                    return Err(RetroAlbumError::ApiCall(format!("{}: {}", decade, message)));
                }
                _ => return Err(RetroAlbumError::NotReady(decade)),
            }

            println!("\n✅ 完了");
        }

        Commands::Album { dir, output, decades, seed } => {
            println!("🖼 retro-album - アルバム作成\n");
            let decades = resolve_decades(decades)?;
            let images = export::load_saved_images(&dir, &decades)?;
            println!("- {}/{}枚の画像を検出", images.len(), decades.len());

            let exporter = AlbumExporter::new();
            let options = AlbumOptions {
                seed,
                ..Default::default()
            };
            let target = output.unwrap_or_else(|| dir.clone());
            let path = exporter.export(&images, &decades, &target, &options).await?;
            println!("✔ アルバム出力: {}", path.display());

            println!("\n✅ 完了");
        }

        Commands::Config { set_api_key, set_model, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(model) = set_model {
                config.set_model(model)?;
                println!("✔ モデルを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  同時実行数: {}", config.concurrency);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  再試行回数: {}", config.max_retries);
                println!("  APIキー: {}", if config.get_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}
