use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use async_trait::async_trait;

use reqwest::multipart::{Form, Part};
use reqwest::Client;

use serde::Deserialize;

use secrecy::Secret;

use url::Url;

use crate::media::Transcriber;

/// REST client for an OpenAI-compatible speech-to-text API
#[derive(Debug)]
pub struct TranscriptionClient {
    client: Client,

    api_transcriptions_url: Url,
    api_key: Secret<String>,
    model: String,
}

impl TranscriptionClient {
    pub fn new(
        api_timeout: Duration,
        api_base_url: Url,
        api_key: Secret<String>,
        model: String,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_transcriptions_url = api_base_url
            .join("v1/audio/transcriptions")
            .context("Failed to create transcription endpoint URL")?;

        Ok(Self {
            client,
            api_transcriptions_url,
            api_key,
            model,
        })
    }

    /// Upload an audio file and return its transcript text
    #[tracing::instrument(name = "Transcribe audio via API", skip(self))]
    pub async fn transcribe_file(&self, audio: &Path) -> anyhow::Result<String> {
        use secrecy::ExposeSecret;

        let bytes = tokio::fs::read(audio)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio.display()))?;
        let file_name = audio
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".into());

        let file = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", file);

        let response: TranscriptionResponse = self
            .client
            .post(self.api_transcriptions_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(response.text)
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<String> {
        self.transcribe_file(audio).await
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}
