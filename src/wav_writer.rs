use crate::error::Result;
use crate::types::AudioBuffer;
use std::fs;
use std::path::Path;

/// オーディオバッファを16ビットPCMのWAVファイルとして保存
///
/// 親ディレクトリが存在しない場合は作成する。f32サンプルは
/// -1.0〜1.0 にクランプしてから i16 に量子化する。
pub fn write_wav<P: AsRef<Path>>(buffer: &AudioBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let spec = hound::WavSpec {
        channels: 1, // パイプラインの正準表現はモノラル
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &buffer.samples {
        let quantized = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(quantized)?;
    }
    writer.finalize()?;

    log::debug!(
        "WAVファイル書き込み完了: {:?} ({}サンプル, {:.2}秒)",
        path,
        buffer.samples.len(),
        buffer.duration_seconds()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_wav_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.wav");

        let samples: Vec<f32> = (0..24000)
            .map(|i| ((i as f32 * 0.05).sin() * 0.5))
            .collect();
        let buffer = AudioBuffer::new(samples, 24000);
        write_wav(&buffer, &path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 24000);
    }

    #[test]
    fn test_write_wav_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("voice_x/nested/ref_01.wav");

        let buffer = AudioBuffer::new(vec![0.0; 2400], 24000);
        write_wav(&buffer, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_wav_clamps_overdrive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hot.wav");

        // クリッピングしてもエラーにならない
        let buffer = AudioBuffer::new(vec![2.0, -2.0, 0.5], 24000);
        write_wav(&buffer, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[0], 32767);
        assert_eq!(samples[1], -32767);
    }
}
