use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;

use super::Downloader;
use crate::error::{Result, SiteError};

/// Fetches images over HTTP, one blocking request at a time
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        debug!("GET {} -> {}", url, status);

        if !status.is_success() {
            return Err(SiteError::Download {
                url: url.to_string(),
                reason: format!("server responded with {status}"),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}
