use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub conditioner: ConditionerConfig,
    #[serde(default)]
    pub trim: TrimConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub whisper: Option<WhisperConfig>,
    pub cleaner: Option<CleanerConfig>,
    pub tts: Option<TtsConfig>,
}

/// オーディオ正準化設定
///
/// デコード直後の変換に関する設定。全入力はこのレートのモノラルに
/// 揃えてから連結される。
///
/// # デフォルト値
///
/// - `target_sample_rate`: 24000 Hz (XTTS-v2 の参照音声と同じレート)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,
}

/// 信号コンディショナ設定
///
/// 連結後のバッファに適用する帯域制限とラウドネス正規化の設定。
///
/// # デフォルト値
///
/// - `highpass_hz`: 80.0 Hz (低域のうなりを除去)
/// - `lowpass_hz`: 8000.0 Hz (高域ノイズを除去)
/// - `target_dbfs`: -20.0 dBFS
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionerConfig {
    #[serde(default = "default_highpass_hz")]
    pub highpass_hz: f32,
    #[serde(default = "default_lowpass_hz")]
    pub lowpass_hz: f32,
    #[serde(default = "default_target_dbfs")]
    pub target_dbfs: f32,
}

/// 無音トリミング設定
///
/// 先頭・末尾の低エネルギー区間を除去するスキャンの設定。
///
/// # デフォルト値
///
/// - `silence_threshold_dbfs`: -45.0 dBFS
/// - `scan_window_ms`: 300 ms
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrimConfig {
    #[serde(default = "default_silence_threshold_dbfs")]
    pub silence_threshold_dbfs: f32,
    #[serde(default = "default_scan_window_ms")]
    pub scan_window_ms: u64,
}

/// 音声スコアラ設定
///
/// チャンク毎の品質スコア計算の設定。無音閾値はトリミングと
/// 同じ意味だが、独立して調整できる。
///
/// # デフォルト値
///
/// - `silence_threshold_dbfs`: -45.0 dBFS
/// - `frame_ms`: 200 ms
/// - `max_silence_ratio`: 0.7 (これを超えると非音声として除外)
/// - `silence_penalty_db`: 20.0 (無音割合1.0あたりの減点)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScorerConfig {
    #[serde(default = "default_silence_threshold_dbfs")]
    pub silence_threshold_dbfs: f32,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
    #[serde(default = "default_max_silence_ratio")]
    pub max_silence_ratio: f32,
    #[serde(default = "default_silence_penalty_db")]
    pub silence_penalty_db: f32,
}

/// 参照セグメント選定設定
///
/// チャンク分割と上位セグメントのエクスポートに関する設定。
///
/// # デフォルト値
///
/// - `chunk_ms`: 8000 ms (セグメント1本 ≈ 8秒)
/// - `max_segments`: 12 (合計 ≈ 1.5〜2分の参照音声)
/// - `fade_ms`: 30 ms
/// - `min_duration_secs`: 50.0 秒
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentConfig {
    #[serde(default = "default_chunk_ms")]
    pub chunk_ms: u64,
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
    #[serde(default = "default_segment_fade_ms")]
    pub fade_ms: u64,
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: f64,
}

/// 学習データセット生成設定
///
/// # デフォルト値
///
/// - `min_utterance_secs`: 1.5 秒 (これより短いASRセグメントは破棄)
/// - `fade_ms`: 10 ms
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetConfig {
    #[serde(default = "default_min_utterance_secs")]
    pub min_utterance_secs: f64,
    #[serde(default = "default_dataset_fade_ms")]
    pub fade_ms: u64,
}

/// OpenAI Whisper API 設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperConfig {
    /// OpenAI API Key
    pub api_key: String,
    /// Whisper モデル名（通常 "whisper-1"）
    #[serde(default = "default_whisper_model")]
    pub model: String,
    /// 言語コード（"tr", "ja", "en" など）。省略可能
    pub language: Option<String>,
    /// APIリクエストのタイムアウト（秒）
    #[serde(default = "default_whisper_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// LLMテキストクリーニング設定
///
/// TTS前のテキスト整形と metadata.csv のクリーニングに使う。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanerConfig {
    /// OpenAI API Key
    pub api_key: String,
    /// チャットモデル名
    #[serde(default = "default_cleaner_model")]
    pub model: String,
    /// 対象言語コード
    #[serde(default = "default_language")]
    pub language: String,
    /// リクエスト間の待機（ミリ秒）。レートリミット対策
    #[serde(default = "default_sleep_between_ms")]
    pub sleep_between_ms: u64,
}

/// XTTS合成サーバ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsConfig {
    /// XTTSサーバのベースURL
    pub server_url: String,
    /// 既定の言語コード
    #[serde(default = "default_language")]
    pub language: String,
    /// 合成リクエストのタイムアウト（秒）
    #[serde(default = "default_tts_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// 出力設定
///
/// 成果物の保存先とログに関する設定。
///
/// # デフォルト値
///
/// - `voices_dir`: "./data/voices"
/// - `training_dir`: "./data/training_data"
/// - `outputs_dir`: "./data/outputs"
/// - `log_level`: "info"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_voices_dir")]
    pub voices_dir: String,
    #[serde(default = "default_training_dir")]
    pub training_dir: String,
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default functions
fn default_target_sample_rate() -> u32 {
    24000 // XTTS-v2 の参照音声レート
}

fn default_highpass_hz() -> f32 {
    80.0
}

fn default_lowpass_hz() -> f32 {
    8000.0
}

fn default_target_dbfs() -> f32 {
    -20.0
}

fn default_silence_threshold_dbfs() -> f32 {
    -45.0
}

fn default_scan_window_ms() -> u64 {
    300
}

fn default_frame_ms() -> u64 {
    200
}

fn default_max_silence_ratio() -> f32 {
    0.7
}

fn default_silence_penalty_db() -> f32 {
    20.0
}

fn default_chunk_ms() -> u64 {
    8000
}

fn default_max_segments() -> usize {
    12
}

fn default_segment_fade_ms() -> u64 {
    30
}

fn default_min_duration_secs() -> f64 {
    50.0
}

fn default_min_utterance_secs() -> f64 {
    1.5
}

fn default_dataset_fade_ms() -> u64 {
    10
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_whisper_timeout_seconds() -> u64 {
    120
}

fn default_cleaner_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_language() -> String {
    "tr".to_string()
}

fn default_sleep_between_ms() -> u64 {
    200
}

fn default_tts_timeout_seconds() -> u64 {
    120
}

fn default_voices_dir() -> String {
    "./data/voices".to_string()
}

fn default_training_dir() -> String {
    "./data/training_data".to_string()
}

fn default_outputs_dir() -> String {
    "./data/outputs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            conditioner: ConditionerConfig::default(),
            trim: TrimConfig::default(),
            scorer: ScorerConfig::default(),
            segment: SegmentConfig::default(),
            dataset: DatasetConfig::default(),
            output: OutputConfig::default(),
            whisper: None, // デフォルトではWhisper設定なし
            cleaner: None,
            tts: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: default_target_sample_rate(),
        }
    }
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            highpass_hz: default_highpass_hz(),
            lowpass_hz: default_lowpass_hz(),
            target_dbfs: default_target_dbfs(),
        }
    }
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            silence_threshold_dbfs: default_silence_threshold_dbfs(),
            scan_window_ms: default_scan_window_ms(),
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            silence_threshold_dbfs: default_silence_threshold_dbfs(),
            frame_ms: default_frame_ms(),
            max_silence_ratio: default_max_silence_ratio(),
            silence_penalty_db: default_silence_penalty_db(),
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            chunk_ms: default_chunk_ms(),
            max_segments: default_max_segments(),
            fade_ms: default_segment_fade_ms(),
            min_duration_secs: default_min_duration_secs(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            min_utterance_secs: default_min_utterance_secs(),
            fade_ms: default_dataset_fade_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            voices_dir: default_voices_dir(),
            training_dir: default_training_dir(),
            outputs_dir: default_outputs_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use voice_enroll::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    ///
    /// # Arguments
    ///
    /// * `path` - 出力先のパス
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// 設定ファイルの存在を確認し、存在する場合は読み込み、
    /// 存在しない場合はデフォルト設定を返す。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}
