use crate::config::WhisperConfig;
use crate::types::TranscriptSegment;
use anyhow::{Context, Result};
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

/// OpenAI Whisper API レスポンス (verbose_json)
///
/// `segments` にタイムスタンプ付きのセグメント列が入る。
#[derive(Debug, Deserialize)]
struct WhisperVerboseResponse {
    text: String,
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
}

/// OpenAI Whisper API クライアント
///
/// クリーニング済みの長尺WAVを文字起こしコラボレータへ送信し、
/// タイムスタンプ付きセグメント列を受け取る。リトライは行わず、
/// 失敗はそのまま呼び出し側へ伝播する。
pub struct WhisperClient {
    config: WhisperConfig,
    client: reqwest::Client,
}

impl WhisperClient {
    /// クライアントを構築
    ///
    /// HTTPクライアントの構築失敗はこの時点で報告される。
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Whisper API HTTPクライアント作成失敗")?;

        Ok(Self { config, client })
    }

    /// WAVファイルを文字起こししてセグメント列を取得
    ///
    /// `response_format=verbose_json` を指定し、開始・終了秒付きの
    /// セグメントを受け取る。
    ///
    /// # Arguments
    ///
    /// * `wav_path` - 送信するWAVファイルのパス
    pub async fn transcribe_file(&self, wav_path: &Path) -> Result<Vec<TranscriptSegment>> {
        let wav_data = tokio::fs::read(wav_path)
            .await
            .with_context(|| format!("WAVファイルの読み込みに失敗: {:?}", wav_path))?;
        log::debug!("Whisper API: {} バイトを送信", wav_data.len());

        let part = multipart::Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");

        if let Some(ref language) = self.config.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .context("Whisper API リクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Whisper API エラー: {} - {}", status, error_text);
        }

        let parsed: WhisperVerboseResponse = response
            .json::<WhisperVerboseResponse>()
            .await
            .context("Whisper API レスポンスパース失敗")?;

        log::info!(
            "文字起こし完了: {} セグメント, 全文 {} 文字",
            parsed.segments.len(),
            parsed.text.chars().count()
        );
        Ok(parsed.segments)
    }
}
