use crate::config::TtsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 音声合成バックエンドの共通トレイト
///
/// 合成コラボレータは参照セグメント（単一または複数）を条件付け
/// 入力として受け取り、テキストを音声に変換する。実装は構築時に
/// 一度だけ生成され、必要とするコンポーネントへ明示的に注入される。
/// 遅延初期化のシングルトンは使わない。
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// テキストを合成してWAVファイルとして保存
    ///
    /// # Arguments
    /// * `text` - 読み上げるテキスト
    /// * `speaker_wavs` - 参照セグメントのパス（ランク順の複数参照）
    /// * `language` - 言語コード ("tr", "en" など)
    /// * `out_path` - 出力WAVのパス
    async fn synthesize(
        &self,
        text: &str,
        speaker_wavs: &[PathBuf],
        language: &str,
        out_path: &Path,
    ) -> Result<()>;
}

/// XTTSサーバ バックエンド
///
/// XTTS API サーバの `/tts_to_audio/` エンドポイントへ合成リクエストを
/// 送り、返却されたWAVバイト列をそのまま保存する。
pub struct XttsServerBackend {
    config: TtsConfig,
    client: reqwest::Client,
}

impl XttsServerBackend {
    /// バックエンドを構築
    ///
    /// HTTPクライアントの構築失敗は初回リクエスト時ではなく
    /// この時点で報告される。
    pub fn new(config: TtsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("XTTSサーバHTTPクライアント作成失敗")?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl TtsBackend for XttsServerBackend {
    async fn synthesize(
        &self,
        text: &str,
        speaker_wavs: &[PathBuf],
        language: &str,
        out_path: &Path,
    ) -> Result<()> {
        let speaker_args: Vec<String> = speaker_wavs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let body = serde_json::json!({
            "text": text,
            "speaker_wav": speaker_args,
            "language": language,
        });

        let url = format!("{}/tts_to_audio/", self.config.server_url.trim_end_matches('/'));
        log::debug!("XTTS合成リクエスト: {} (参照 {} 本)", url, speaker_wavs.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("XTTSサーバへのリクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("XTTSサーバエラー: {} - {}", status, error_text);
        }

        let wav_bytes = response
            .bytes()
            .await
            .context("XTTSサーバレスポンスの読み取り失敗")?;

        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("出力ディレクトリの作成に失敗: {:?}", parent))?;
        }
        tokio::fs::write(out_path, &wav_bytes)
            .await
            .with_context(|| format!("合成結果の書き込みに失敗: {:?}", out_path))?;

        log::info!(
            "合成完了: {:?} ({} バイト)",
            out_path,
            wav_bytes.len()
        );
        Ok(())
    }
}
