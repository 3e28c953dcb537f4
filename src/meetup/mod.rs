use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::FetchConfig;

pub mod parser;

pub use self::parser::{RawEvent, RawTimestamp, parse_events};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("event page exceeded {limit} bytes cap")]
    TooLarge { limit: usize },

    #[error("malformed event page: {0}")]
    MalformedBody(String),
}

// Turns a group URL into the provider's upcoming events.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, url: &str) -> Result<Vec<RawEvent>, SourceError>;
}

pub struct MeetupClient {
    client: Client,
    max_body_bytes: usize,
}

impl MeetupClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl EventSource for MeetupClient {
    async fn fetch_events(&self, url: &str) -> Result<Vec<RawEvent>, SourceError> {
        debug!("fetching meetup page {}", url);

        let mut response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_body_bytes as u64 {
                return Err(SourceError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        // The cap bounds what gets buffered, not just the final body size.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(SourceError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body);
        let events = parse_events(&html)?;

        debug!("parsed {} events from {}", events.len(), url);
        Ok(events)
    }
}
