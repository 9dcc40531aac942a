use crate::conditioner;
use crate::config::Config;
use crate::ingest;
use crate::trimmer;
use crate::types::{AudioBuffer, TranscriptSegment, Window};
use crate::wav_writer;
use crate::whisper_api::WhisperClient;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// 話者ディレクトリからTTSファインチューニング用データセットを生成
///
/// 登録パイプラインと同じ前処理（連結・帯域制限・正規化・
/// 無音トリミング）を通した長尺WAVを文字起こしコラボレータへ送り、
/// タイムスタンプ付きセグメントで発話単位に切り出す。
///
/// 出力レイアウト:
///
/// ```text
/// {training_dir}/{speaker_id}/
/// ├── audio/
/// │   ├── utt_0001.wav
/// │   ├── utt_0002.wav
/// │   └── ...
/// └── metadata.csv        # audio/utt_0001.wav|テキスト
/// ```
///
/// # Returns
///
/// 生成した metadata.csv のパス
///
/// # Errors
///
/// 文字起こし結果が空の場合、およびデコード・書き込み・API失敗時。
pub async fn build_training_dataset(
    person_dir: &Path,
    speaker_id: &str,
    config: &Config,
    whisper: &WhisperClient,
) -> Result<PathBuf> {
    log::info!("データセット生成開始: {:?} (speaker: {})", person_dir, speaker_id);

    let files = ingest::list_audio_files(person_dir)?;
    let mut combined = ingest::load_and_concat(&files, config.audio.target_sample_rate)?;
    conditioner::condition(&mut combined, &config.conditioner);
    let cleaned = trimmer::trim_silence(&combined, &config.trim);

    // 文字起こしにはファイル送信が必要なので、一旦中間WAVとして保存する
    let tmp_dir =
        PathBuf::from(&config.output.voices_dir).join(format!("{}_training_tmp", speaker_id));
    let long_wav_path = tmp_dir.join("long_cleaned.wav");
    wav_writer::write_wav(&cleaned, &long_wav_path)?;

    let segments = whisper.transcribe_file(&long_wav_path).await?;
    if segments.is_empty() {
        anyhow::bail!("文字起こし結果が空です: {:?}", long_wav_path);
    }

    let usable = filter_segments(&segments, config.dataset.min_utterance_secs);
    log::info!(
        "セグメント {} 件中 {} 件を発話として採用 (最小 {:.1} 秒)",
        segments.len(),
        usable.len(),
        config.dataset.min_utterance_secs
    );

    let speaker_dir = PathBuf::from(&config.output.training_dir).join(speaker_id);
    let audio_dir = speaker_dir.join("audio");

    let mut metadata_lines: Vec<String> = Vec::with_capacity(usable.len());
    for (idx, segment) in usable.iter().enumerate() {
        let window = segment_window(segment, cleaned.duration_ms());
        let mut utterance = cleaned.extract(window);
        utterance.fade_in(config.dataset.fade_ms);
        utterance.fade_out(config.dataset.fade_ms);

        let file_name = utterance_file_name(idx);
        wav_writer::write_wav(&utterance, &audio_dir.join(&file_name))?;
        metadata_lines.push(format!("audio/{}|{}", file_name, segment.text.trim()));
    }

    let metadata_path = speaker_dir.join("metadata.csv");
    tokio::fs::write(&metadata_path, metadata_lines.join("\n"))
        .await
        .with_context(|| format!("metadata の書き込みに失敗: {:?}", metadata_path))?;

    log::info!(
        "データセット生成完了: {:?} ({} 発話)",
        metadata_path,
        metadata_lines.len()
    );
    Ok(metadata_path)
}

/// 発話として使えるセグメントだけ残す
///
/// 短すぎるセグメント（相槌・単語の切れ端）と空テキストの
/// セグメントは学習データから外す。
fn filter_segments(segments: &[TranscriptSegment], min_secs: f64) -> Vec<TranscriptSegment> {
    segments
        .iter()
        .filter(|s| s.duration_seconds() >= min_secs && !s.text.trim().is_empty())
        .cloned()
        .collect()
}

/// セグメントの秒区間をバッファ上のミリ秒窓へ変換
///
/// 終端はバッファ長でクランプする（ASRのタイムスタンプは
/// 末尾を僅かに超えることがある）。
fn segment_window(segment: &TranscriptSegment, buffer_ms: u64) -> Window {
    let start_ms = (segment.start.max(0.0) * 1000.0) as u64;
    let end_ms = ((segment.end * 1000.0) as u64).min(buffer_ms);
    Window::new(start_ms.min(end_ms), end_ms)
}

/// 発話WAVのファイル名 (`utt_0001.wav` 始まり)
fn utterance_file_name(idx: usize) -> String {
    format!("utt_{:04}.wav", idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_filter_segments_drops_short_ones() {
        let segments = vec![
            segment(0.0, 3.0, "merhaba dünya"),
            segment(3.0, 4.0, "evet"),
            segment(4.0, 8.5, "bugün hava çok güzel"),
        ];

        let usable = filter_segments(&segments, 1.5);
        assert_eq!(usable.len(), 2);
        assert_eq!(usable[0].text, "merhaba dünya");
        assert_eq!(usable[1].text, "bugün hava çok güzel");
    }

    #[test]
    fn test_filter_segments_drops_empty_text() {
        let segments = vec![segment(0.0, 5.0, "   ")];
        assert!(filter_segments(&segments, 1.5).is_empty());
    }

    #[test]
    fn test_segment_window_clamps_to_buffer() {
        // ASRタイムスタンプがバッファ末尾を超えるケース
        let window = segment_window(&segment(8.0, 12.5, "x"), 10_000);
        assert_eq!(window.start_ms, 8000);
        assert_eq!(window.end_ms, 10_000);
    }

    #[test]
    fn test_segment_window_normal_case() {
        let window = segment_window(&segment(1.25, 4.75, "x"), 60_000);
        assert_eq!(window.start_ms, 1250);
        assert_eq!(window.end_ms, 4750);
    }

    #[test]
    fn test_utterance_file_name_is_one_based() {
        assert_eq!(utterance_file_name(0), "utt_0001.wav");
        assert_eq!(utterance_file_name(9), "utt_0010.wav");
        assert_eq!(utterance_file_name(122), "utt_0123.wav");
    }
}
