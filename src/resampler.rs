use crate::error::Result;
use rubato::{FftFixedIn, Resampler};

/// リサンプル処理のブロック長（フレーム数）
const CHUNK: usize = 1024;

/// FFTリサンプラのサブチャンク数
const SUB_CHUNKS: usize = 2;

/// 任意のインターリーブPCMを目標レートのモノラルに変換
///
/// 連結前の正準化の本体。チャンネルは全チャンネル平均でダウンミックスし、
/// サンプリングレートが異なる場合は FFT ベースのリサンプラで変換する。
///
/// # Arguments
///
/// * `pcm` - インターリーブされたサンプル（長さ = フレーム数 × チャンネル数）
/// * `sr_in` - 入力サンプリングレート (Hz)
/// * `channels` - `pcm` のチャンネル数
/// * `target_sr` - 出力サンプリングレート (Hz)
pub fn to_target_mono(pcm: Vec<f32>, sr_in: u32, channels: usize, target_sr: u32) -> Result<Vec<f32>> {
    let mono = downmix_to_mono(pcm, channels);
    resample_mono(&mono, sr_in, target_sr)
}

/// インターリーブPCMを全チャンネル平均でモノラル化
fn downmix_to_mono(pcm: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return pcm;
    }
    let mut mono = Vec::with_capacity(pcm.len() / channels);
    for frame in pcm.chunks_exact(channels) {
        let sum: f32 = frame.iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}

/// モノラルPCMを任意のレートへリサンプル
///
/// レートが一致する場合はコピーをそのまま返す。
/// それ以外は `FftFixedIn` で固定長ブロックごとに処理する。
/// 最終ブロックのゼロ詰めとフィルタ遅延で生じる余剰サンプルは
/// 出力から取り除き、長さを `round(入力長 × 比率)` に揃える。
/// 連結タイムラインの途中にパディングが混入しないための不変条件。
pub fn resample_mono(input: &[f32], sr_in: u32, sr_out: u32) -> Result<Vec<f32>> {
    if sr_in == sr_out {
        return Ok(input.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(sr_in as usize, sr_out as usize, CHUNK, SUB_CHUNKS, 1)?;
    let delay = resampler.output_delay();

    let expected_len = (input.len() as f64 * sr_out as f64 / sr_in as f64).round() as usize;
    let mut out = Vec::with_capacity(expected_len + delay + CHUNK);

    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + CHUNK).min(input.len());
        let chunk_len = end - pos;

        let mut input_chunk = vec![0.0; CHUNK];
        input_chunk[..chunk_len].copy_from_slice(&input[pos..end]);

        let block = vec![input_chunk];
        let frames = resampler.process(&block, None)?;
        out.extend_from_slice(&frames[0]);

        pos += chunk_len;
    }

    // フィルタ遅延分が末尾に残っている間はゼロブロックでフラッシュする
    while out.len() < delay + expected_len {
        let block = vec![vec![0.0; CHUNK]];
        let frames = resampler.process(&block, None)?;
        out.extend_from_slice(&frames[0]);
    }

    // 先頭の遅延サンプルを捨て、ちょうど期待長に切り詰める
    out.drain(..delay.min(out.len()));
    out.truncate(expected_len);

    Ok(out)
}
