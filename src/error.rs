use std::path::PathBuf;
use thiserror::Error;

/// 登録パイプラインのエラー分類
///
/// 想定内の失敗条件（ファイルなし・音声不足など）を列挙型として明示し、
/// 呼び出し側が各ケースを個別に処理できるようにする。
/// パイプラインはリトライも部分的な結果の返却も行わず、
/// どの段階の失敗もそのまま呼び出し側へ伝播する。
#[derive(Debug, Error)]
pub enum EnrollError {
    /// 入力ディレクトリが存在しない
    #[error("入力ディレクトリが見つかりません: {0:?}")]
    NotFound(PathBuf),

    /// ディレクトリは存在するが対応拡張子のファイルがない
    #[error("対応する音声ファイルがありません: {0:?}")]
    EmptyInput(PathBuf),

    /// クリーニング後の総時間が最小要件を満たさない
    #[error("総時間が短すぎます ({actual_sec:.2} 秒)。最低 {required_sec:.1} 秒必要です")]
    InsufficientAudio {
        /// トリミング後の実時間（秒）
        actual_sec: f64,
        /// 要求される最小時間（秒）
        required_sec: f64,
    },

    /// どのチャンクも無音判定を超えるスコアを得られなかった
    #[error("音声を含む有効なセグメントが見つかりませんでした")]
    NoViableSegments,

    /// プロファイルストアに存在しない voice_id が指定された
    #[error("不明な voice_id: {0}")]
    UnknownVoiceId(String),

    /// デコード失敗（symphonia）
    #[error("音声デコードに失敗: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// リサンプラの構築失敗
    #[error("リサンプラの作成に失敗: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// リサンプル処理の失敗
    #[error("リサンプル処理に失敗: {0}")]
    Resample(#[from] rubato::ResampleError),

    /// WAV読み書きの失敗
    #[error("WAVファイル処理に失敗: {0}")]
    Wav(#[from] hound::Error),

    /// ファイルI/Oの失敗
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),
}

/// パイプライン内部で使う Result 型
pub type Result<T> = std::result::Result<T, EnrollError>;
