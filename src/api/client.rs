use futures::Stream;
use futures::TryStreamExt;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::domain::DownloadRequest;

use super::models::{
    ApiConfig, ErrorBody, FileEntry, FileListResponse, ProgressSnapshot, StartDownloadResponse,
    VideoInfo,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    // The server's own message, shown to the user as-is
    #[error("{0}")]
    Server(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid endpoint URL")]
    InvalidUrl,
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// HTTP client for the remote download service.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    /// Filenames can contain spaces and slashes, so they must never be
    /// spliced into the path verbatim.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        {
            let mut parts = url.path_segments_mut().map_err(|_| ApiError::InvalidUrl)?;
            parts.pop_if_empty();
            for segment in segments {
                parts.push(segment);
            }
        }
        Ok(url)
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::server_error(status, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    /// Extract the server's `{error}` message from a failed response,
    /// falling back to a generic status line.
    async fn server_error(status: StatusCode, response: Response) -> ApiError {
        match response.json::<ErrorBody>().await {
            Ok(body) if !body.error.is_empty() => ApiError::Server(body.error),
            _ => ApiError::Server(format!("Request failed with status {}", status)),
        }
    }

    async fn expect_ok(response: Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::server_error(status, response).await);
        }
        Ok(())
    }

    /// `POST /info` — fetch video metadata without downloading
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let endpoint = self.endpoint(&["info"])?;
        debug!("POST {}", endpoint);
        let response = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        Self::parse_json(response).await
    }

    /// `POST /download` — ask the server to start a job, returns its id
    pub async fn start_download(&self, request: &DownloadRequest) -> Result<String> {
        let endpoint = self.endpoint(&["download"])?;
        debug!("POST {}", endpoint);
        let response = self.http.post(endpoint).json(request).send().await?;
        let body: StartDownloadResponse = Self::parse_json(response).await?;
        Ok(body.download_id)
    }

    /// `GET /progress/{id}` — latest snapshot of a job
    pub async fn progress(&self, download_id: &str) -> Result<ProgressSnapshot> {
        let endpoint = self.endpoint(&["progress", download_id])?;
        let response = self.http.get(endpoint).send().await?;
        Self::parse_json(response).await
    }

    /// `GET /downloads` — completed files, newest first
    pub async fn list_downloads(&self) -> Result<Vec<FileEntry>> {
        let endpoint = self.endpoint(&["downloads"])?;
        let response = self.http.get(endpoint).send().await?;
        let body: FileListResponse = Self::parse_json(response).await?;
        Ok(body.files)
    }

    /// `POST /delete_file/{name}`
    pub async fn delete_file(&self, filename: &str) -> Result<()> {
        let endpoint = self.endpoint(&["delete_file", filename])?;
        debug!("POST {}", endpoint);
        let response = self.http.post(endpoint).send().await?;
        Self::expect_ok(response).await
    }

    /// `POST /cleanup` — delete every completed file server-side
    pub async fn cleanup(&self) -> Result<()> {
        let endpoint = self.endpoint(&["cleanup"])?;
        debug!("POST {}", endpoint);
        let response = self.http.post(endpoint).send().await?;
        Self::expect_ok(response).await
    }

    /// `GET /download_file/{name}` — stream a completed file.
    /// Returns (total_size, chunk stream).
    pub async fn download_file_stream(
        &self,
        filename: &str,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let endpoint = self.endpoint(&["download_file", filename])?;
        let response = self.http.get(endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::server_error(status, response).await);
        }

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::Request);
        Ok((total_size, stream))
    }
}
