use super::client::HttpClient;
use crate::error::AcquireError;
use std::io::Read;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> Result<Self, AcquireError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AcquireError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AcquireError::Network {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self(client))
    }
}

impl HttpClient for BasicClient {
    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>, AcquireError> {
        let resp = self.0.get(url).send().map_err(|e| AcquireError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(AcquireError::Network {
                url: url.to_string(),
                reason: format!("remote returned status {}", resp.status()),
            });
        }

        Ok(Box::new(resp))
    }
}
