use serde::Deserialize;
use std::path::PathBuf;

/// 無音時の dBFS 下限値
///
/// RMS がゼロのバッファの理論値は -∞ dBFS になるため、
/// 計算上はこの値で打ち切る。閾値比較（-45 dBFS など）より
/// 十分低く、スコア計算が有限値に収まることを保証する。
pub const SILENCE_FLOOR_DBFS: f32 = -100.0;

/// モノラルPCMオーディオバッファ
///
/// パイプライン全体で使う正準表現。サンプルは -1.0〜1.0 に正規化された
/// f32 で、連結（Concatenator）以降は常にモノラル・目標サンプルレート
/// （デフォルト 24000 Hz）であることが不変条件。
///
/// # Examples
///
/// ```
/// # use voice_enroll::types::AudioBuffer;
/// let buffer = AudioBuffer::new(vec![0.0f32; 24000], 24000);
/// assert_eq!(buffer.duration_ms(), 1000);
/// ```
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    /// PCMサンプル配列（モノラル）
    pub samples: Vec<f32>,

    /// サンプリングレート (Hz)
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// バッファの長さ（ミリ秒）
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// バッファの長さ（秒）
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// ミリ秒位置をサンプルインデックスに変換
    pub fn ms_to_samples(&self, ms: u64) -> usize {
        (ms * self.sample_rate as u64 / 1000) as usize
    }

    /// 指定範囲のサンプルスライスを取得
    ///
    /// 範囲はバッファ長でクランプされる。所有権は移動しない
    /// （親バッファへのビュー）。
    pub fn window(&self, window: Window) -> &[f32] {
        let start = self.ms_to_samples(window.start_ms).min(self.samples.len());
        let end = self.ms_to_samples(window.end_ms).min(self.samples.len());
        &self.samples[start..end]
    }

    /// 指定範囲を独立したバッファとして切り出す
    pub fn extract(&self, window: Window) -> AudioBuffer {
        AudioBuffer::new(self.window(window).to_vec(), self.sample_rate)
    }

    /// RMS (Root Mean Square) を計算
    pub fn rms(&self) -> f32 {
        rms_of(&self.samples)
    }

    /// バッファ全体の音量レベル (dBFS)
    ///
    /// フルスケール 1.0 に対する `20 * log10(RMS)`。
    /// 完全な無音は [`SILENCE_FLOOR_DBFS`] を返す。
    pub fn dbfs(&self) -> f32 {
        dbfs_of(&self.samples)
    }

    /// 一様なゲイン（dB）を適用
    pub fn apply_gain(&mut self, gain_db: f32) {
        let factor = 10f32.powf(gain_db / 20.0);
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// 先頭に線形フェードインを適用
    ///
    /// チャンク境界のクリックノイズを防ぐ。`fade_ms` がバッファ長を
    /// 超える場合はバッファ全体をフェード区間として扱う。
    pub fn fade_in(&mut self, fade_ms: u64) {
        let fade_samples = self.ms_to_samples(fade_ms).min(self.samples.len());
        if fade_samples == 0 {
            return;
        }
        for i in 0..fade_samples {
            self.samples[i] *= i as f32 / fade_samples as f32;
        }
    }

    /// 末尾に線形フェードアウトを適用
    pub fn fade_out(&mut self, fade_ms: u64) {
        let fade_samples = self.ms_to_samples(fade_ms).min(self.samples.len());
        if fade_samples == 0 {
            return;
        }
        let len = self.samples.len();
        for i in 0..fade_samples {
            self.samples[len - 1 - i] *= i as f32 / fade_samples as f32;
        }
    }
}

/// サンプルスライスの RMS を計算
pub fn rms_of(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_of_squares / samples.len() as f64).sqrt() as f32
}

/// サンプルスライスの音量レベル (dBFS) を計算
///
/// RMS が 0 以下の場合は [`SILENCE_FLOOR_DBFS`] を返す。
pub fn dbfs_of(samples: &[f32]) -> f32 {
    let rms = rms_of(samples);
    if rms <= 0.0 {
        return SILENCE_FLOOR_DBFS;
    }
    (20.0 * rms.log10()).max(SILENCE_FLOOR_DBFS)
}

/// バッファ内の連続区間 [start_ms, end_ms)
///
/// 無音スキャン・スコアリングフレーム・最終セグメントのいずれにも
/// 使う軽量なビュー。サンプルの所有権は持たない。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// 区間の開始位置（ミリ秒）
    pub start_ms: u64,

    /// 区間の終了位置（ミリ秒、排他的）
    pub end_ms: u64,
}

impl Window {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// 区間の長さ（ミリ秒）
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// スコア付きチャンク
///
/// `score` が `None` のチャンクは「無音が支配的、または短すぎて
/// 評価不能」として除外されたことを表す。`index` はフィルタ前の
/// タイムライン上の位置で、同点時のタイブレークに使う。
#[derive(Clone, Copy, Debug)]
pub struct ScoredChunk {
    /// フィルタ前のチャンク番号（タイムライン順、0始まり）
    pub index: usize,

    /// 音声スコア。除外されたチャンクは None
    pub score: Option<f32>,

    /// トリミング済みバッファ上の区間
    pub window: Window,
}

/// 話者の音声プロファイル
///
/// 登録1回につき1つ生成される不変の成果物。
/// `ref_paths` はランク順（先頭が最良）で、合成コラボレータへ
/// 複数参照入力としてそのまま渡せる。
#[derive(Clone, Debug)]
pub struct VoiceProfile {
    /// 一意な音声識別子（UUID v4）
    pub voice_id: String,

    /// 登録元の話者ディレクトリ
    pub person_dir: PathBuf,

    /// 保存済み参照セグメントのパス（ランク順）
    pub ref_paths: Vec<PathBuf>,

    /// トリミング後・チャンク分割前の有効音声時間（秒）
    pub total_duration_sec: f64,
}

/// 文字起こしセグメント
///
/// 文字起こしコラボレータ（Whisper API verbose_json）が返す
/// タイムスタンプ付きテキスト。秒単位。
#[derive(Clone, Debug, Deserialize)]
pub struct TranscriptSegment {
    /// 開始位置（秒）
    pub start: f64,

    /// 終了位置（秒）
    pub end: f64,

    /// 文字起こしテキスト
    pub text: String,
}

impl TranscriptSegment {
    /// セグメントの長さ（秒）
    pub fn duration_seconds(&self) -> f64 {
        self.end - self.start
    }
}
