use crate::config::SegmentConfig;
use crate::error::{EnrollError, Result};
use crate::types::{AudioBuffer, ScoredChunk};
use crate::wav_writer;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// スコア付きチャンクから上位セグメントを選定して保存
///
/// スコアの降順でソートし（同点はチャンク番号の昇順、つまり
/// タイムライン上で早い方が勝つ）、上位 `max_segments` 本を採用する。
/// 採用された各チャンクには境界のクリックノイズを避けるため
/// `fade_ms` の線形フェードイン・アウトを適用し、ランク順に
/// `ref_01.wav`, `ref_02.wav`, ... として `voice_dir` 配下へ保存する。
///
/// # Errors
///
/// * [`EnrollError::NoViableSegments`] - スコアを持つチャンクが1つもない
pub fn export_top_segments(
    buffer: &AudioBuffer,
    scored: &[ScoredChunk],
    config: &SegmentConfig,
    voice_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut viable: Vec<(f32, ScoredChunk)> = scored
        .iter()
        .filter_map(|chunk| chunk.score.map(|score| (score, *chunk)))
        .collect();

    if viable.is_empty() {
        return Err(EnrollError::NoViableSegments);
    }

    // スコア降順、同点はタイムライン順
    viable.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.index.cmp(&b.1.index))
    });

    let selected = &viable[..viable.len().min(config.max_segments)];
    log::info!(
        "候補 {} チャンク中 {} 本を参照セグメントとして採用",
        viable.len(),
        selected.len()
    );

    let mut ref_paths = Vec::with_capacity(selected.len());
    for (rank, (score, chunk)) in selected.iter().enumerate() {
        let mut segment = buffer.extract(chunk.window);
        segment.fade_in(config.fade_ms);
        segment.fade_out(config.fade_ms);

        let ref_path = voice_dir.join(format!("ref_{:02}.wav", rank + 1));
        wav_writer::write_wav(&segment, &ref_path)?;
        log::debug!(
            "ランク {}: チャンク {} (スコア {:.2}) → {:?}",
            rank + 1,
            chunk.index,
            score,
            ref_path
        );
        ref_paths.push(ref_path);
    }

    Ok(ref_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Window;
    use tempfile::TempDir;

    fn chunk(index: usize, score: Option<f32>, start_ms: u64) -> ScoredChunk {
        ScoredChunk {
            index,
            score,
            window: Window::new(start_ms, start_ms + 1000),
        }
    }

    fn segment_config(max_segments: usize) -> SegmentConfig {
        SegmentConfig {
            chunk_ms: 1000,
            max_segments,
            fade_ms: 30,
            min_duration_secs: 0.0,
        }
    }

    fn test_buffer(duration_ms: u64) -> AudioBuffer {
        let count = (duration_ms * 24) as usize;
        AudioBuffer::new(vec![0.3; count], 24000)
    }

    #[test]
    fn test_no_viable_segments() {
        let temp_dir = TempDir::new().unwrap();
        let buffer = test_buffer(3000);
        let scored = vec![chunk(0, None, 0), chunk(1, None, 1000)];

        let result = export_top_segments(&buffer, &scored, &segment_config(12), temp_dir.path());
        assert!(matches!(result, Err(EnrollError::NoViableSegments)));
    }

    #[test]
    fn test_ranking_descending_by_score() {
        let temp_dir = TempDir::new().unwrap();
        let buffer = test_buffer(3000);
        let scored = vec![
            chunk(0, Some(-25.0), 0),
            chunk(1, Some(-15.0), 1000),
            chunk(2, Some(-20.0), 2000),
        ];

        let paths =
            export_top_segments(&buffer, &scored, &segment_config(12), temp_dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
        // ref_01 が最良（チャンク1）になるよう名前順で保存される
        assert!(paths[0].ends_with("ref_01.wav"));
        assert!(paths[1].ends_with("ref_02.wav"));
        assert!(paths[2].ends_with("ref_03.wav"));
    }

    #[test]
    fn test_tie_break_earlier_index_wins() {
        let temp_dir = TempDir::new().unwrap();
        let buffer = test_buffer(3000);
        // 同点スコア: タイムライン上で早いチャンク0が上位
        let scored = vec![chunk(1, Some(-18.0), 1000), chunk(0, Some(-18.0), 0)];

        let paths =
            export_top_segments(&buffer, &scored, &segment_config(1), temp_dir.path()).unwrap();
        assert_eq!(paths.len(), 1);

        // 採用されたセグメントはチャンク0の区間（先頭1秒）のはず
        let reader = hound::WavReader::open(&paths[0]).unwrap();
        assert_eq!(reader.len(), 24000);
    }

    #[test]
    fn test_max_segments_cap() {
        let temp_dir = TempDir::new().unwrap();
        let buffer = test_buffer(5000);
        let scored: Vec<ScoredChunk> = (0..5)
            .map(|i| chunk(i, Some(-20.0 - i as f32), i as u64 * 1000))
            .collect();

        let paths =
            export_top_segments(&buffer, &scored, &segment_config(3), temp_dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_export_count_is_min_of_cap_and_viable() {
        let temp_dir = TempDir::new().unwrap();
        let buffer = test_buffer(4000);
        let scored = vec![
            chunk(0, Some(-20.0), 0),
            chunk(1, None, 1000),
            chunk(2, Some(-22.0), 2000),
            chunk(3, None, 3000),
        ];

        let paths =
            export_top_segments(&buffer, &scored, &segment_config(12), temp_dir.path()).unwrap();
        // min(max_segments=12, スコアあり=2)
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_fades_applied_to_exported_segment() {
        let temp_dir = TempDir::new().unwrap();
        let buffer = test_buffer(1000);
        let scored = vec![chunk(0, Some(-10.0), 0)];

        let paths =
            export_top_segments(&buffer, &scored, &segment_config(1), temp_dir.path()).unwrap();

        let mut reader = hound::WavReader::open(&paths[0]).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        // フェードインにより先頭サンプルはゼロ付近
        assert!(samples[0].abs() < 100);
        // 中央はフェードの影響を受けない
        let mid = samples[samples.len() / 2];
        assert!(mid.abs() > 5000);
        // フェードアウトにより末尾サンプルはゼロ付近
        assert!(samples[samples.len() - 1].abs() < 100);
    }
}
