use crate::error::{EnrollError, Result};
use crate::resampler;
use crate::types::AudioBuffer;
use std::fs;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// 対応する音声ファイルの拡張子
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac", "ogg", "mp4"];

/// 話者ディレクトリ内の対応音声ファイルを列挙
///
/// ファイル名の辞書順でソートして返す。連結順序が実行毎に変わらず、
/// 後段のタイムスタンプが再現可能になる。
///
/// # Errors
///
/// * [`EnrollError::NotFound`] - ディレクトリが存在しない
/// * [`EnrollError::EmptyInput`] - 対応拡張子のファイルが1つもない
pub fn list_audio_files(person_dir: &Path) -> Result<Vec<PathBuf>> {
    if !person_dir.is_dir() {
        return Err(EnrollError::NotFound(person_dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(person_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_supported_extension(path))
        .collect();

    if files.is_empty() {
        return Err(EnrollError::EmptyInput(person_dir.to_path_buf()));
    }

    files.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 1ファイルをデコードして生PCMを取得
///
/// symphonia のプローブでコンテナ・コーデックを自動判別し、
/// 最初のオーディオトラックをインターリーブ f32 に展開する。
///
/// # Returns
///
/// `(インターリーブPCM, サンプリングレート, チャンネル数)`
pub fn decode_file(path: &Path) -> Result<(Vec<f32>, u32, usize)> {
    let src = fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    // 拡張子をプローブのヒントに使う
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format = probed.format;

    // デコード可能な最初のオーディオトラックを選択
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(EnrollError::Decode(
            symphonia::core::errors::Error::Unsupported("デコード可能なトラックがありません"),
        ))?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;
    let track_id = track.id;

    let sample_rate = track.codec_params.sample_rate.ok_or(EnrollError::Decode(
        symphonia::core::errors::Error::Unsupported("サンプリングレートが不明です"),
    ))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut pcm: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    // デコードループ。EOFで next_packet がエラーを返したら終了
    while let Ok(packet) = format.next_packet() {
        while !format.metadata().is_latest() {
            format.metadata().pop();
        }

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet)?;
        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(capacity, spec));
        }
        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(decoded);
            pcm.extend_from_slice(buf.samples());
        }
    }

    Ok((pcm, sample_rate, channels))
}

/// ファイル群をデコード・正準化して1本のタイムラインに連結
///
/// 各ファイルは連結の**前に**目標レートのモノラルへ変換される。
/// 出力の総時間は変換後の各ファイル時間の合計に一致する。
///
/// # Arguments
///
/// * `files` - 連結順のファイルパス（[`list_audio_files`] の出力）
/// * `target_sr` - 目標サンプリングレート (Hz)
pub fn load_and_concat(files: &[PathBuf], target_sr: u32) -> Result<AudioBuffer> {
    let mut combined: Vec<f32> = Vec::new();

    for file in files {
        let (pcm, sample_rate, channels) = decode_file(file)?;
        let mono = resampler::to_target_mono(pcm, sample_rate, channels, target_sr)?;
        log::debug!(
            "デコード完了: {:?} ({} Hz, {}ch, 変換後 {:.2} 秒)",
            file.file_name().unwrap_or_default(),
            sample_rate,
            channels,
            mono.len() as f64 / target_sr as f64
        );
        combined.extend_from_slice(&mono);
    }

    let buffer = AudioBuffer::new(combined, target_sr);
    log::info!(
        "{} ファイルを連結しました (合計 {:.2} 秒)",
        files.len(),
        buffer.duration_seconds()
    );
    Ok(buffer)
}
