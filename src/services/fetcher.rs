// src/services/fetcher.rs

//! Listing page fetcher.

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::ScrapeConfig;
use crate::utils::http;

/// Fetches the raw listing page HTML.
///
/// One attempt per call: network errors, timeouts and non-2xx responses
/// are returned to the caller.
pub struct PageFetcher {
    client: Client,
    timeout_secs: u64,
}

impl PageFetcher {
    /// Create a fetcher with the configured user agent and timeout.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
            timeout_secs: config.timeout_secs,
        })
    }

    /// GET `url` and return the response body as text.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.describe(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP status {status}")));
        }

        let html = response.text().await.map_err(|e| self.describe(url, e))?;
        log::debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(html)
    }

    fn describe(&self, url: &str, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::fetch(url, format!("request timed out after {}s", self.timeout_secs))
        } else {
            AppError::fetch(url, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one canned HTTP response on a random local port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/jobs")
    }

    fn config(timeout_secs: u64) -> ScrapeConfig {
        ScrapeConfig {
            timeout_secs,
            ..ScrapeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<p>hello</p>\n",
        )
        .await;
        let fetcher = PageFetcher::new(&config(5)).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "<p>hello</p>\n");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let fetcher = PageFetcher::new(&config(5)).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without answering
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        });

        let fetcher = PageFetcher::new(&config(1)).unwrap();
        let err = fetcher.fetch(&format!("http://{addr}/jobs")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }
}
