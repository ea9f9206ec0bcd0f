use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::{
    error::CaptionError,
    model::{CaptionRequest, CaptionResult},
    settings::AppSettings,
    wire,
};

#[async_trait]
pub trait CaptionProvider: Send + Sync {
    fn display_name(&self) -> &'static str;
    async fn generate(&self, request: CaptionRequest) -> Result<CaptionResult, CaptionError>;
}

/// Talks to the Hurai caption endpoint over HTTP.
pub struct HttpCaptionProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCaptionProvider {
    pub fn new(settings: &AppSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed building http client")?;
        Ok(Self {
            client,
            endpoint: settings.endpoint_url(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CaptionProvider for HttpCaptionProvider {
    fn display_name(&self) -> &'static str {
        "Hurai caption service"
    }

    async fn generate(&self, request: CaptionRequest) -> Result<CaptionResult, CaptionError> {
        let file = request.file;
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(file.media_type.as_str())
            .map_err(|err| CaptionError::Transport(err.to_string()))?;
        let form = Form::new().part(wire::FILE_FIELD, part);

        tracing::info!(endpoint = %self.endpoint, file = %file.name, bytes = file.len(), "requesting caption");
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[(wire::CREDENTIAL_PARAM, request.credential.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                // the URL carries the credential
                let err = err.without_url();
                tracing::warn!(error = %err, "caption request failed");
                CaptionError::Transport(err.to_string())
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            let err = err.without_url();
            tracing::warn!(%status, error = %err, "failed reading caption response");
            CaptionError::Transport(err.to_string())
        })?;

        if !status.is_success() {
            tracing::warn!(%status, "caption service returned an error");
            return Err(wire::protocol_error(status.as_u16(), &body));
        }

        wire::parse_caption_body(&body).inspect_err(|err| {
            tracing::warn!(detail = err.detail().unwrap_or_default(), "unparseable caption response");
        })
    }
}

/// Offline stand-in that fabricates a caption from the file metadata.
#[derive(Default)]
pub struct PlaceholderProvider;

#[async_trait]
impl CaptionProvider for PlaceholderProvider {
    fn display_name(&self) -> &'static str {
        "Placeholder (simulated)"
    }

    async fn generate(&self, request: CaptionRequest) -> Result<CaptionResult, CaptionError> {
        let file = &request.file;
        let en = format!("Simulated caption for {} ({} bytes).", file.name, file.len());
        let ms = format!("Kapsyen simulasi untuk {} ({} bait).", file.name, file.len());
        Ok(CaptionResult::new(Some(&en), Some(&ms)))
    }
}
