//! HTTP upload client

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;

/// Fields we care about from the service's upload response
#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub url: String,
}

#[derive(Debug)]
pub enum UploadError {
    Http(reqwest::Error),
    Status(StatusCode),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Http(err) => write!(f, "HTTP error: {}", err),
            UploadError::Status(status) => write!(f, "Service returned status {}", status),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Http(err) => Some(err),
            UploadError::Status(_) => None,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Http(err)
    }
}

/// Uploads file content to a file share service instance
pub struct UploadClient {
    api_url: String,
    lifetime_secs: u64,
    client: Client,
}

impl UploadClient {
    pub fn new(api_url: &str, lifetime_secs: u64) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            lifetime_secs,
            client: Client::new(),
        }
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload/{}", self.api_url, self.lifetime_secs)
    }

    /// Upload `data` under `name`; returns the download URL the service built.
    pub async fn upload(&self, data: Vec<u8>, name: &str) -> Result<String, UploadError> {
        let part = Part::bytes(data).file_name(name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .put(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Status(response.status()));
        }

        let body: ServiceResponse = response.json().await?;
        Ok(body.url)
    }
}
