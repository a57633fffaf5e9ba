// src/transport/http.rs

use super::{PackageBuffer, ProgressTracker, Transport};
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tracing::{debug, info};

/// Size of each read from the response body
const CHUNK_SIZE: usize = 64 * 1024;

/// Blocking HTTP(S) transport
///
/// Discovery requests see redirects as responses; package downloads follow
/// them so mirrors and CDNs can answer.
pub struct HttpTransport {
    discovery: Client,
    download: Client,
}

impl HttpTransport {
    /// Create a transport using the configured timeout and user agent
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_timeout(config.timeout(), &config.user_agent)
    }

    /// The timeout applies to each network wait separately, including every
    /// body read, never to a whole download.
    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self> {
        let discovery = build_client(timeout, user_agent, Policy::none())?;
        let download = build_client(timeout, user_agent, Policy::default())?;

        Ok(Self {
            discovery,
            download,
        })
    }
}

fn build_client(timeout: Duration, user_agent: &str, redirects: Policy) -> Result<Client> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(redirects)
        .build()
        .map_err(|e| Error::TransportFailure(format!("Failed to create HTTP client: {}", e)))
}

impl Transport for HttpTransport {
    fn redirect_target(&self, url: &str) -> Result<String> {
        debug!("Requesting redirect target of {}", url);

        let response = self.discovery.head(url).send().map_err(|e| {
            Error::RemoteVersionUnavailable(format!("HEAD {} failed: {}", url, e))
        })?;

        let location = response.headers().get(LOCATION).ok_or_else(|| {
            Error::RemoteVersionUnavailable(format!(
                "HTTP {} from {} carried no Location header",
                response.status(),
                url
            ))
        })?;

        let location = location.to_str().map_err(|e| {
            Error::RemoteVersionUnavailable(format!("Location header is not valid text: {}", e))
        })?;

        // Relative redirects resolve against the URL that answered
        let target = response.url().join(location).map_err(|e| {
            Error::RemoteVersionUnavailable(format!("Invalid redirect target {:?}: {}", location, e))
        })?;

        debug!("{} redirects to {}", url, target);
        Ok(target.to_string())
    }

    fn fetch(&self, url: &str, progress: &mut dyn FnMut(f64)) -> Result<PackageBuffer> {
        info!("Downloading {}", url);

        let mut response = self
            .download
            .get(url)
            .send()
            .map_err(|e| Error::TransportFailure(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::TransportFailure(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let total = response.content_length();
        let mut tracker = ProgressTracker::new(total);
        let mut bytes = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];

        loop {
            let n = match response.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::TransportFailure(format!(
                        "Failed reading body of {} after {} bytes: {}",
                        url,
                        bytes.len(),
                        e
                    )));
                }
            };

            bytes.extend_from_slice(&chunk[..n]);
            if let Some(ratio) = tracker.advance(n as u64) {
                progress(ratio);
            }
        }

        if let Some(expected) = total
            && expected != bytes.len() as u64
        {
            return Err(Error::TransportFailure(format!(
                "Body of {} ended after {} of {} bytes",
                url,
                bytes.len(),
                expected
            )));
        }

        if let Some(ratio) = tracker.finish() {
            progress(ratio);
        }

        info!("Downloaded {} bytes from {}", bytes.len(), response.url());
        Ok(PackageBuffer::new(bytes))
    }
}
