use anyhow::{Context, Result, bail};
#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;
use std::time::Duration;

/// HTTP client trait for fetching remote content, mockable in tests
pub trait HttpClient: Send + Sync {
    /// Fetch the body of `url`, failing on transport errors and non-2xx statuses
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Real HTTP client using reqwest
pub struct ReqwestClient;

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !response.status().is_success() {
            bail!(
                "HTTP request failed with status {}: {}",
                response.status(),
                url
            );
        }

        let body = response
            .bytes()
            .with_context(|| format!("Failed to read response body from: {}", url))?;

        Ok(body.to_vec())
    }
}

/// Mock HTTP client returning canned responses keyed by URL
#[cfg(test)]
pub struct MockHttpClient {
    responses: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<(String, Duration)>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Register a response body for a URL
    pub fn with_response(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), (status, body.as_bytes().to_vec()));
        self
    }

    /// URLs requested so far, with the timeout each request was given
    pub fn requests(&self) -> Vec<(String, Duration)> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl HttpClient for MockHttpClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push((url.to_string(), timeout));

        let (status, body) = self
            .responses
            .get(url)
            .cloned()
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !(200..300).contains(&status) {
            bail!("HTTP request failed with status {}: {}", status, url);
        }

        Ok(body)
    }
}
