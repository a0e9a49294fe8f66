//! HTTP transfer client talking to a Cloudflare-style speed test sink
//!
//! The sink contract is tiny: `GET <download>?bytes=N` streams back `N` bytes
//! and `POST <upload>` accepts any body. Every request carries a fresh `t`
//! query parameter so intermediaries never serve a cached response.


use crate::{
    error::{AppError, Result},
    models::Config,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Incremental body of a download response
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Transport seam between the measurement engine and the network
///
/// Implementations report any failed request as `AppError::TransferFailed`
/// (or a timeout/network variant); callers decide whether to retry. Timeouts
/// are applied by the caller, not here.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Zero-byte round trip used by the latency prober
    async fn ping(&self) -> Result<()>;

    /// Start a download of `bytes` bytes and return the body as a stream
    async fn open_download(&self, bytes: u64) -> Result<ByteStream>;

    /// Send one payload to the upload sink, resolving once the sink answers
    async fn upload(&self, payload: Bytes) -> Result<()>;
}

/// reqwest-backed implementation of [`TransferClient`]
pub struct HttpTransferClient {
    client: Client,
    download_url: Url,
    upload_url: Url,
}

impl HttpTransferClient {
    /// Create a client for the given sink endpoints
    pub fn new(download_url: &str, upload_url: &str, connect_timeout: Duration) -> Result<Self> {
        let download_url = Url::parse(download_url)
            .map_err(|e| AppError::config(format!("Invalid download URL '{}': {}", download_url, e)))?;
        let upload_url = Url::parse(upload_url)
            .map_err(|e| AppError::config(format!("Invalid upload URL '{}': {}", upload_url, e)))?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(format!("network-speed-tester/{}", crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            download_url,
            upload_url,
        })
    }

    /// Create a client from application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.download_url, &config.upload_url, config.request_timeout())
    }

    fn download_request_url(&self, bytes: u64) -> Url {
        let mut url = self.download_url.clone();
        url.query_pairs_mut()
            .append_pair("bytes", &bytes.to_string())
            .append_pair("t", &cache_buster());
        url
    }

    fn upload_request_url(&self) -> Url {
        let mut url = self.upload_url.clone();
        url.query_pairs_mut().append_pair("t", &cache_buster());
        url
    }
}

fn cache_buster() -> String {
    Uuid::new_v4().simple().to_string()
}

fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::transfer_failed(format!("{} returned HTTP {}", what, status.as_u16())))
    }
}

fn send_error(what: &str, error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::timeout(format!("{} timed out: {}", what, error))
    } else {
        AppError::transfer_failed(format!("{} failed: {}", what, error))
    }
}

#[async_trait]
impl TransferClient for HttpTransferClient {
    async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(self.download_request_url(0))
            .send()
            .await
            .map_err(|e| send_error("Ping", e))?;

        // Drain the (empty) body so the connection goes back to the pool
        check_status(response, "Ping")?
            .bytes()
            .await
            .map_err(|e| send_error("Ping", e))?;

        Ok(())
    }

    async fn open_download(&self, bytes: u64) -> Result<ByteStream> {
        let response = self
            .client
            .get(self.download_request_url(bytes))
            .send()
            .await
            .map_err(|e| send_error("Download", e))?;

        let stream = check_status(response, "Download")?
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| AppError::transfer_failed(format!("Download stream interrupted: {}", e)))
            })
            .boxed();

        Ok(stream)
    }

    async fn upload(&self, payload: Bytes) -> Result<()> {
        let response = self
            .client
            .post(self.upload_request_url())
            .body(payload)
            .send()
            .await
            .map_err(|e| send_error("Upload", e))?;

        check_status(response, "Upload")?
            .bytes()
            .await
            .map_err(|e| send_error("Upload", e))?;

        Ok(())
    }
}

/// Transfer client factory
pub struct ClientFactory;

impl ClientFactory {
    /// Create the HTTP transfer client described by `config`
    pub fn create(config: &Config) -> Result<Arc<dyn TransferClient>> {
        Ok(Arc::new(HttpTransferClient::from_config(config)?))
    }
}
