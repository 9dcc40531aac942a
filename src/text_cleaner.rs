use crate::config::CleanerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Chat Completions リクエスト
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat Completions レスポンス
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// LLMテキストクリーナ
///
/// TTS前のテキスト整形と、ASR transcriptの後処理を行う
/// テキストクリーニングコラボレータのクライアント。
///
/// # フォールバックポリシー
///
/// [`TextCleaner::clean_text`] はコラボレータの失敗でパイプラインを
/// 落とさない。API呼び出しに失敗した場合は警告ログを出して
/// **元のテキストをそのまま返す**（意図したベストエフォート動作）。
pub struct TextCleaner {
    config: CleanerConfig,
    client: reqwest::Client,
}

impl TextCleaner {
    pub fn new(config: CleanerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("テキストクリーナHTTPクライアント作成失敗")?;

        Ok(Self { config, client })
    }

    /// TTS向けにテキストを整形（失敗時は元テキストを返す）
    ///
    /// 絵文字やチャット略語の除去、数字の読み下し、句読点の補正を
    /// LLMに指示する。
    pub async fn clean_text(&self, text: &str) -> String {
        let instructions = tts_prompt(&self.config.language);
        match self.request_cleaning(&instructions, text).await {
            Ok(cleaned) => cleaned,
            Err(e) => {
                log::warn!("テキストクリーニング失敗。元のテキストを使用します: {}", e);
                text.trim().to_string()
            }
        }
    }

    /// ASR transcript 1行をクリーニング（失敗はエラーとして返す）
    async fn clean_transcript_line(&self, text: &str) -> Result<String> {
        let instructions = transcript_prompt(&self.config.language);
        self.request_cleaning(&instructions, text).await
    }

    async fn request_cleaning(&self, instructions: &str, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("クリーニングAPIリクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("クリーニングAPIエラー: {} - {}", status, error_text);
        }

        let parsed: ChatResponse = response
            .json::<ChatResponse>()
            .await
            .context("クリーニングAPIレスポンスパース失敗")?;

        let cleaned = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        if cleaned.is_empty() {
            anyhow::bail!("クリーニングAPIが空のテキストを返しました");
        }
        Ok(cleaned)
    }

    /// metadata.csv の全行をクリーニング
    ///
    /// `audio/utt_0001.wav|生テキスト` 形式の各行のテキスト部分を
    /// LLMで整形し、`*.cleaned.csv` として保存する。元のファイルには
    /// 手を付けない。行単位の失敗は警告を出して元テキストへ
    /// フォールバックする。
    ///
    /// # Arguments
    ///
    /// * `metadata_path` - 入力の metadata.csv
    /// * `out_path` - 出力先。None の場合は `metadata.cleaned.csv`
    pub async fn clean_metadata_file(
        &self,
        metadata_path: &Path,
        out_path: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let out_path = out_path.unwrap_or_else(|| metadata_path.with_extension("cleaned.csv"));

        log::info!("metadata クリーニング開始: {:?} → {:?}", metadata_path, out_path);

        let content = tokio::fs::read_to_string(metadata_path)
            .await
            .with_context(|| format!("metadata の読み込みに失敗: {:?}", metadata_path))?;

        let lines: Vec<&str> = content.lines().collect();
        let mut cleaned_lines: Vec<String> = Vec::with_capacity(lines.len());

        for (idx, line) in lines.iter().enumerate() {
            let Some((audio_rel, raw_text)) = parse_metadata_line(line) else {
                continue;
            };

            log::info!("[{}/{}] クリーニング中: {}", idx + 1, lines.len(), audio_rel);
            let cleaned_text = match self.clean_transcript_line(raw_text).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("行のクリーニングに失敗。元のテキストを使用します: {}", e);
                    raw_text.to_string()
                }
            };

            cleaned_lines.push(format!("{}|{}", audio_rel, cleaned_text));

            // レートリミットを圧迫しないよう小休止
            tokio::time::sleep(std::time::Duration::from_millis(self.config.sleep_between_ms))
                .await;
        }

        tokio::fs::write(&out_path, cleaned_lines.join("\n"))
            .await
            .with_context(|| format!("cleaned metadata の書き込みに失敗: {:?}", out_path))?;

        log::info!("metadata クリーニング完了: {} 行", cleaned_lines.len());
        Ok(out_path)
    }
}

/// metadata.csv の1行をパース
///
/// `パス|テキスト` 形式以外の行と空テキストの行は None を返す。
fn parse_metadata_line(line: &str) -> Option<(&str, &str)> {
    let (audio_rel, raw_text) = line.split_once('|')?;
    let raw_text = raw_text.trim();
    if raw_text.is_empty() {
        return None;
    }
    Some((audio_rel, raw_text))
}

/// TTS前整形のシステムプロンプト
fn tts_prompt(language: &str) -> String {
    format!(
        "You are a text cleaning assistant for text-to-speech input, working in the \
         '{language}' language.\n\
         - Remove emojis and chat abbreviations.\n\
         - Spell out digits as words where natural.\n\
         - End sentences with proper punctuation.\n\
         - Output ONLY the cleaned text, nothing else."
    )
}

/// ASR transcript 整形のシステムプロンプト
fn transcript_prompt(language: &str) -> String {
    format!(
        "You are cleaning a spoken-speech transcript in the '{language}' language for \
         TTS training data.\n\
         - Fix spelling and punctuation.\n\
         - Remove pure filler words where possible.\n\
         - Preserve the meaning and word order; do not summarize or shorten.\n\
         - Do not change numbers or proper names.\n\
         - Output ONLY the corrected sentence, no explanations."
    )
}
