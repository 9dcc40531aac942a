use crate::chunker;
use crate::conditioner;
use crate::config::Config;
use crate::error::{EnrollError, Result};
use crate::exporter;
use crate::ingest;
use crate::scorer;
use crate::text_cleaner::TextCleaner;
use crate::trimmer;
use crate::tts_backend::TtsBackend;
use crate::types::VoiceProfile;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 音声プロファイルの保管先
///
/// プロセス全体のグローバルレジストリは持たず、呼び出し側が
/// 保管方法（メモリ・DBなど）と生存期間を決めてオーケストレータへ
/// 渡す。キーは voice_id。
pub trait ProfileStore {
    /// プロファイルを保存
    fn put(&mut self, profile: VoiceProfile);

    /// voice_id でプロファイルを取得
    fn get(&self, voice_id: &str) -> Option<VoiceProfile>;
}

/// インメモリのプロファイルストア
///
/// 1プロセス内での登録→合成の流れに使う最小実装。
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<String, VoiceProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn put(&mut self, profile: VoiceProfile) {
        self.profiles.insert(profile.voice_id.clone(), profile);
    }

    fn get(&self, voice_id: &str) -> Option<VoiceProfile> {
        self.profiles.get(voice_id).cloned()
    }
}

/// 話者ディレクトリから参照セグメントを抽出
///
/// コアパイプラインの本体。次を順に実行する。
///
/// 1. 対応ファイルを列挙し、正準形式へ変換して連結
/// 2. 帯域制限 + ラウドネス正規化
/// 3. 先頭・末尾の無音トリミング
/// 4. 最小時間ゲート（デフォルト 50 秒）
/// 5. 固定長チャンク分割と音声スコアリング
/// 6. 上位チャンクのフェード付きエクスポート
///
/// # Returns
///
/// `(ランク順の参照セグメントパス, トリミング後の有効時間[秒])`
///
/// # Errors
///
/// [`EnrollError`] の各ケース。途中失敗時の部分結果は返さない。
pub fn extract_speaker_segments(
    person_dir: &Path,
    voice_id: &str,
    config: &Config,
) -> Result<(Vec<PathBuf>, f64)> {
    let files = ingest::list_audio_files(person_dir)?;
    let mut combined = ingest::load_and_concat(&files, config.audio.target_sample_rate)?;

    conditioner::condition(&mut combined, &config.conditioner);
    let cleaned = trimmer::trim_silence(&combined, &config.trim);

    let duration_sec = cleaned.duration_seconds();
    if duration_sec < config.segment.min_duration_secs {
        return Err(EnrollError::InsufficientAudio {
            actual_sec: duration_sec,
            required_sec: config.segment.min_duration_secs,
        });
    }

    let windows = chunker::split_into_windows(&cleaned, config.segment.chunk_ms);
    let scored = scorer::score_all(&cleaned, &windows, &config.scorer);

    let voice_dir = PathBuf::from(&config.output.voices_dir).join(voice_id);
    let ref_paths = exporter::export_top_segments(&cleaned, &scored, &config.segment, &voice_dir)?;

    Ok((ref_paths, duration_sec))
}

/// 話者ディレクトリから音声プロファイルを登録
///
/// voice_id を新規採番し、参照セグメントの抽出結果を
/// [`VoiceProfile`] として渡されたストアへ保存する。
pub fn enroll_person_dir(
    person_dir: &Path,
    config: &Config,
    store: &mut dyn ProfileStore,
) -> Result<VoiceProfile> {
    let voice_id = Uuid::new_v4().to_string();
    log::info!("登録開始: {:?} (voice_id: {})", person_dir, voice_id);

    let (ref_paths, total_duration_sec) = extract_speaker_segments(person_dir, &voice_id, config)?;

    let profile = VoiceProfile {
        voice_id,
        person_dir: person_dir.to_path_buf(),
        ref_paths,
        total_duration_sec,
    };

    log::info!(
        "登録完了: voice_id {} (参照 {} 本, 有効時間 {:.2} 秒)",
        profile.voice_id,
        profile.ref_paths.len(),
        profile.total_duration_sec
    );

    store.put(profile.clone());
    Ok(profile)
}

/// 登録済みプロファイルでテキストを合成
///
/// テキストクリーナが渡されている場合は合成前にテキストを整形する
/// （クリーナの失敗は元テキストへのフォールバックで吸収される）。
/// 出力は `outputs_dir` 配下の `{voice_id}_{出力ID}.wav`。
///
/// # Errors
///
/// * [`EnrollError::UnknownVoiceId`] - ストアに存在しない voice_id
/// * 合成バックエンドの失敗はそのまま伝播する
pub async fn synthesize_with_voice(
    store: &dyn ProfileStore,
    tts: &dyn TtsBackend,
    cleaner: Option<&TextCleaner>,
    config: &Config,
    voice_id: &str,
    text: &str,
    language: &str,
) -> anyhow::Result<PathBuf> {
    let profile = store
        .get(voice_id)
        .ok_or_else(|| EnrollError::UnknownVoiceId(voice_id.to_string()))?;

    let cleaned_text = match cleaner {
        Some(cleaner) => cleaner.clean_text(text).await,
        None => text.to_string(),
    };

    let out_id = Uuid::new_v4().to_string();
    let out_path =
        PathBuf::from(&config.output.outputs_dir).join(format!("{}_{}.wav", voice_id, out_id));

    tts.synthesize(&cleaned_text, &profile.ref_paths, language, &out_path)
        .await?;

    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    const SR: u32 = 24000;

    /// -18 dBFS 前後のサイン波に末尾無音を足したWAVを書き出す
    fn write_speech_wav(path: &Path, speech_secs: f32, trailing_silence_secs: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();

        // RMS ≈ 0.126 (-18 dBFS) になる振幅
        let amplitude = 0.178f32;
        let speech_samples = (SR as f32 * speech_secs) as usize;
        for i in 0..speech_samples {
            let t = i as f32 / SR as f32;
            let value = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * amplitude;
            writer.write_sample((value * 32767.0) as i16).unwrap();
        }
        let silence_samples = (SR as f32 * trailing_silence_secs) as usize;
        for _ in 0..silence_samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn test_config(voices_dir: &Path, outputs_dir: &Path) -> Config {
        let mut config = Config::default();
        config.output.voices_dir = voices_dir.to_string_lossy().into_owned();
        config.output.outputs_dir = outputs_dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_scenario_three_speech_files() {
        // 20秒×3ファイル → 60秒 → 8チャンク (8秒×7 + 4秒×1) → 8本採用
        let input_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        for name in ["a.wav", "b.wav", "c.wav"] {
            write_speech_wav(&input_dir.path().join(name), 20.0, 0.0);
        }

        let config = test_config(data_dir.path(), data_dir.path());
        let (ref_paths, duration_sec) =
            extract_speaker_segments(input_dir.path(), "voice_test", &config).unwrap();

        assert!((duration_sec - 60.0).abs() < 0.5);
        // max_segments=12 の上限には届かず、スコア付き8本全てが採用される
        assert_eq!(ref_paths.len(), 8);
        assert!(ref_paths[0].ends_with("voice_test/ref_01.wav"));
        for path in &ref_paths {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_scenario_trailing_silence_fails_gate() {
        // 45秒音声 + 10秒無音: トリミングで約45秒となり50秒ゲートで失敗
        let input_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        write_speech_wav(&input_dir.path().join("rec.wav"), 45.0, 10.0);

        let config = test_config(data_dir.path(), data_dir.path());
        let result = extract_speaker_segments(input_dir.path(), "voice_test", &config);

        assert!(matches!(
            result,
            Err(EnrollError::InsufficientAudio { .. })
        ));
        if let Err(EnrollError::InsufficientAudio { actual_sec, .. }) = result {
            assert!(actual_sec < 50.0);
            assert!(actual_sec > 40.0);
        }
    }

    #[test]
    fn test_enroll_not_found_before_decoding() {
        let data_dir = TempDir::new().unwrap();
        let config = test_config(data_dir.path(), data_dir.path());
        let mut store = MemoryProfileStore::new();

        let result = enroll_person_dir(Path::new("/no/such/person"), &config, &mut store);
        assert!(matches!(result, Err(EnrollError::NotFound(_))));
    }

    #[test]
    fn test_enroll_empty_input() {
        let input_dir = TempDir::new().unwrap();
        fs::write(input_dir.path().join("notes.txt"), b"x").unwrap();
        let data_dir = TempDir::new().unwrap();
        let config = test_config(data_dir.path(), data_dir.path());
        let mut store = MemoryProfileStore::new();

        let result = enroll_person_dir(input_dir.path(), &config, &mut store);
        assert!(matches!(result, Err(EnrollError::EmptyInput(_))));
    }

    #[test]
    fn test_enroll_stores_profile() {
        let input_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        write_speech_wav(&input_dir.path().join("rec.wav"), 60.0, 0.0);

        let config = test_config(data_dir.path(), data_dir.path());
        let mut store = MemoryProfileStore::new();
        let profile = enroll_person_dir(input_dir.path(), &config, &mut store).unwrap();

        let fetched = store.get(&profile.voice_id).unwrap();
        assert_eq!(fetched.ref_paths, profile.ref_paths);
        assert!(fetched.total_duration_sec >= 50.0);
    }

    /// 合成せずに出力ファイルだけ作るテスト用バックエンド
    struct FakeTtsBackend;

    #[async_trait]
    impl TtsBackend for FakeTtsBackend {
        async fn synthesize(
            &self,
            _text: &str,
            speaker_wavs: &[PathBuf],
            _language: &str,
            out_path: &Path,
        ) -> AnyResult<()> {
            assert!(!speaker_wavs.is_empty());
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(out_path, b"RIFF")?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_synthesize_unknown_voice_id() {
        let data_dir = TempDir::new().unwrap();
        let config = test_config(data_dir.path(), data_dir.path());
        let store = MemoryProfileStore::new();

        let result = synthesize_with_voice(
            &store,
            &FakeTtsBackend,
            None,
            &config,
            "missing-id",
            "test",
            "tr",
        )
        .await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EnrollError>(),
            Some(EnrollError::UnknownVoiceId(_))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_with_stored_profile() {
        let data_dir = TempDir::new().unwrap();
        let config = test_config(data_dir.path(), data_dir.path());

        let mut store = MemoryProfileStore::new();
        store.put(VoiceProfile {
            voice_id: "voice-1".to_string(),
            person_dir: PathBuf::from("/tmp/person"),
            ref_paths: vec![PathBuf::from("/tmp/person/ref_01.wav")],
            total_duration_sec: 60.0,
        });

        let out_path = synthesize_with_voice(
            &store,
            &FakeTtsBackend,
            None,
            &config,
            "voice-1",
            "Merhaba",
            "tr",
        )
        .await
        .unwrap();

        assert!(out_path.exists());
        let name = out_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("voice-1_"));
    }
}
