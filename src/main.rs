use anyhow::{Context, Result};
use env_logger::Env;
use std::path::{Path, PathBuf};
use voice_enroll::config::Config;
use voice_enroll::pipeline::{self, MemoryProfileStore};
use voice_enroll::text_cleaner::TextCleaner;
use voice_enroll::tts_backend::XttsServerBackend;
use voice_enroll::whisper_api::WhisperClient;
use voice_enroll::{dataset, error::EnrollError};

fn print_usage() {
    println!("使い方:");
    println!("  voice-enroll --generate-config [path]");
    println!("      デフォルト設定ファイルを生成");
    println!("  voice-enroll enroll <person_dir> [--config path]");
    println!("      話者ディレクトリから参照セグメントを抽出");
    println!("  voice-enroll speak <person_dir> <text> [--config path]");
    println!("      登録してからテキストを合成（[tts] 設定が必要）");
    println!("  voice-enroll dataset <person_dir> <speaker_id> [--config path]");
    println!("      学習データセットを生成（[whisper] 設定が必要）");
    println!("  voice-enroll clean-metadata <metadata.csv> [--config path]");
    println!("      metadata.csv のテキストをLLMで整形（[cleaner] 設定が必要）");
}

/// `--config <path>` を取り出す。指定がなければ config.toml
fn config_path(args: &[String]) -> &str {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("config.toml")
}

fn enroll(person_dir: &Path, config: &Config) -> Result<()> {
    let mut store = MemoryProfileStore::new();
    let profile = pipeline::enroll_person_dir(person_dir, config, &mut store)?;

    println!("voice_id: {}", profile.voice_id);
    println!("有効音声時間: {:.1} 秒", profile.total_duration_sec);
    println!("参照セグメント:");
    for path in &profile.ref_paths {
        println!("  {}", path.display());
    }
    Ok(())
}

async fn speak(person_dir: &Path, text: &str, config: &Config) -> Result<()> {
    let tts_config = config
        .tts
        .clone()
        .context("設定ファイルに [tts] セクションがありません")?;
    let language = tts_config.language.clone();
    let backend = XttsServerBackend::new(tts_config)?;

    let cleaner = match &config.cleaner {
        Some(cleaner_config) => Some(TextCleaner::new(cleaner_config.clone())?),
        None => None,
    };

    let mut store = MemoryProfileStore::new();
    let profile = pipeline::enroll_person_dir(person_dir, config, &mut store)?;
    let out_path = pipeline::synthesize_with_voice(
        &store,
        &backend,
        cleaner.as_ref(),
        config,
        &profile.voice_id,
        text,
        &language,
    )
    .await?;

    println!("合成結果: {}", out_path.display());
    Ok(())
}

async fn build_dataset(person_dir: &Path, speaker_id: &str, config: &Config) -> Result<()> {
    let whisper_config = config
        .whisper
        .clone()
        .context("設定ファイルに [whisper] セクションがありません")?;
    let whisper = WhisperClient::new(whisper_config)?;

    let metadata_path = dataset::build_training_dataset(person_dir, speaker_id, config, &whisper)
        .await?;
    println!("metadata: {}", metadata_path.display());
    Ok(())
}

async fn clean_metadata(metadata_path: &Path, config: &Config) -> Result<()> {
    let cleaner_config = config
        .cleaner
        .clone()
        .context("設定ファイルに [cleaner] セクションがありません")?;
    let cleaner = TextCleaner::new(cleaner_config)?;

    let out_path = cleaner.clean_metadata_file(metadata_path, None).await?;
    println!("cleaned metadata: {}", out_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    // 設定ファイル生成モード
    if args[1] == "--generate-config" {
        let path = if args.len() > 2 { &args[2] } else { "config.toml" };
        Config::write_default(path)?;
        println!("設定ファイルを生成しました: {}", path);
        return Ok(());
    }

    let config = Config::load_or_default(config_path(&args))?;

    let result = match args[1].as_str() {
        "enroll" => {
            let person_dir = args.get(2).context("person_dir を指定してください")?;
            enroll(Path::new(person_dir), &config)
        }
        "speak" => {
            let person_dir = args.get(2).context("person_dir を指定してください")?;
            let text = args.get(3).context("合成するテキストを指定してください")?;
            speak(Path::new(person_dir), text, &config).await
        }
        "dataset" => {
            let person_dir = args.get(2).context("person_dir を指定してください")?;
            let speaker_id = args.get(3).context("speaker_id を指定してください")?;
            build_dataset(Path::new(person_dir), speaker_id, &config).await
        }
        "clean-metadata" => {
            let metadata = args.get(2).context("metadata.csv を指定してください")?;
            clean_metadata(&PathBuf::from(metadata), &config).await
        }
        _ => {
            print_usage();
            Ok(())
        }
    };

    // 登録固有のエラーは入力側の問題なので補足情報を添えて終了する
    if let Err(e) = &result {
        if let Some(enroll_err) = e.downcast_ref::<EnrollError>() {
            match enroll_err {
                EnrollError::InsufficientAudio { .. } => {
                    log::error!("録音を追加して再実行してください");
                }
                EnrollError::NoViableSegments => {
                    log::error!("入力の大部分が無音です。録音内容を確認してください");
                }
                _ => {}
            }
        }
    }

    result
}
