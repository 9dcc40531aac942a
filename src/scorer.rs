use crate::config::ScorerConfig;
use crate::types::{dbfs_of, AudioBuffer, ScoredChunk, Window};

/// 音声スコアラ
///
/// チャンク毎の「話し声らしさ」を決定的なヒューリスティックで採点する。
/// 学習済みモデルは一切使わない。
///
/// # アルゴリズム
///
/// 1. チャンクを `frame_ms` の非重複サブフレームに分割（末尾は短くてよい）
/// 2. 各フレームのレベル (dBFS) を計算
/// 3. レベルが閾値未満のフレームを「無音」と数える
/// 4. 無音割合が `max_silence_ratio` を超えたら非音声として除外
/// 5. `score = 平均レベル − 無音割合 × silence_penalty_db`
///
/// 音量が高く無音が少ないほどスコアが上がる。ペナルティ係数 20.0 は、
/// 無音割合が上限近く（0.7）のチャンクに約 14 dB 相当の減点を与え、
/// 無音を顕著なラウドネス低下と同程度に扱う。
///
/// # Returns
///
/// * `Some(score)` - 有限の実数スコア
/// * `None` - 無音が支配的、またはフレーム1つ分に満たず評価不能
pub fn score_chunk(buffer: &AudioBuffer, chunk: Window, config: &ScorerConfig) -> Option<f32> {
    if chunk.duration_ms() < config.frame_ms {
        return None;
    }

    let mut silent_frames = 0usize;
    let mut total_frames = 0usize;
    let mut level_sum = 0.0f32;

    let mut start = chunk.start_ms;
    while start < chunk.end_ms {
        let end = (start + config.frame_ms).min(chunk.end_ms);
        let level = dbfs_of(buffer.window(Window::new(start, end)));

        level_sum += level;
        total_frames += 1;
        if level < config.silence_threshold_dbfs {
            silent_frames += 1;
        }
        start = end;
    }

    if total_frames == 0 {
        return None;
    }

    let avg_level = level_sum / total_frames as f32;
    let silence_ratio = silent_frames as f32 / total_frames as f32;

    if silence_ratio > config.max_silence_ratio {
        // 無音が支配的なチャンクは話し声とみなさない
        return None;
    }

    Some(avg_level - silence_ratio * config.silence_penalty_db)
}

/// 全チャンクを採点する
///
/// 出力はタイムライン順で、除外されたチャンクも `score = None` の
/// まま保持する。`index` は分割時の番号のまま変わらない。
pub fn score_all(buffer: &AudioBuffer, windows: &[Window], config: &ScorerConfig) -> Vec<ScoredChunk> {
    windows
        .iter()
        .enumerate()
        .map(|(index, &window)| ScoredChunk {
            index,
            score: score_chunk(buffer, window, config),
            window,
        })
        .collect()
}
