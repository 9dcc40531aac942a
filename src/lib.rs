//! voice-enroll - 話者登録オーディオパイプライン
//!
//! このクレートは、1人の話者の雑多な録音ファイル群から音声クローン合成用の
//! クリーンな参照セグメントを抽出するパイプラインを提供します。
//!
//! # 主な機能
//!
//! - **マルチフォーマット取り込み**: WAV/MP3/M4A などを正準形式（モノラル 24kHz）へ変換して連結
//! - **信号コンディショニング**: 帯域制限フィルタとラウドネス正規化
//! - **無音トリミング**: 先頭・末尾の低エネルギー区間を固定窓スキャンで除去
//! - **音声スコアリング**: チャンク毎のエネルギー指標で参照候補をランキング
//! - **参照エクスポート**: 上位チャンクをフェード付きWAVとして保存
//! - **学習データセット生成**: Whisper API の文字起こしで発話単位に分割
//! - **音声合成連携**: 登録済みプロファイルを条件付け入力として合成サーバへ送信
//!
//! # アーキテクチャ
//!
//! ```text
//! [音声ファイル群] → [Ingest/Concat] → [Conditioner] → [Trimmer]
//!                                                          ↓
//!                                                   (最小時間ゲート)
//!                                                          ↓
//!                                       [Chunker] → [Scorer] → [Exporter]
//!                                                                  ↓
//!                                                           [ref_NN.wav]
//!                                                                  ↓
//!                                              [ProfileStore] → [TtsBackend]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use voice_enroll::config::Config;
//! use voice_enroll::pipeline::{self, MemoryProfileStore};
//! use std::path::Path;
//!
//! let config = Config::load_or_default("config.toml").unwrap();
//! let mut store = MemoryProfileStore::new();
//! let profile =
//!     pipeline::enroll_person_dir(Path::new("./recordings/alice"), &config, &mut store).unwrap();
//! println!("voice_id: {}", profile.voice_id);
//! ```

pub mod chunker;
pub mod conditioner;
pub mod config;
pub mod dataset;
pub mod error;
pub mod exporter;
pub mod ingest;
pub mod pipeline;
pub mod resampler;
pub mod scorer;
pub mod text_cleaner;
pub mod trimmer;
pub mod tts_backend;
pub mod types;
pub mod wav_writer;
pub mod whisper_api;
