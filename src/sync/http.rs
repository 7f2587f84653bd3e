use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use crate::models::LocationSample;

use super::{LocationSink, LocationUpdate, TokenSource};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub struct HttpSyncForwarder {
    client: Client,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpSyncForwarder {
    pub fn new(endpoint: String, timeout: Duration, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::with_client(client, endpoint, tokens))
    }

    pub fn with_client(client: Client, endpoint: String, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            endpoint,
            tokens,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, token: &str, body: &LocationUpdate) -> Result<()> {
        let request_id = Uuid::new_v4();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("X-Request-ID", request_id.to_string())
            .json(body)
            .send()
            .await
            .with_context(|| format!("location push {request_id} failed to send"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("location push {request_id} rejected with {status}"));
        }

        log_debug!("location push {request_id} accepted (online={})", body.is_online);
        Ok(())
    }
}

#[async_trait]
impl LocationSink for HttpSyncForwarder {
    async fn push(&self, sample: &LocationSample, is_online: bool) {
        let token = match self.tokens.bearer_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                log_debug!("No session token; skipping location push");
                return;
            }
            Err(err) => {
                log_warn!("Failed to read session token: {err:?}");
                return;
            }
        };

        let body = LocationUpdate::new(sample, is_online);
        if let Err(err) = self.send(&token, &body).await {
            log_warn!("Dropping location sample: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::MemoryStore, sync::SessionTokenStore};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
    };

    struct CapturedRequest {
        request_line: String,
        headers: HashMap<String, String>,
        body: serde_json::Value,
    }

    fn sample() -> LocationSample {
        LocationSample {
            latitude: 12.97,
            longitude: 77.59,
            accuracy: Some(4.5),
            heading: None,
            speed: Some(0.0),
            captured_at: Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(),
        }
    }

    async fn forwarder(endpoint: String, token: Option<&str>) -> HttpSyncForwarder {
        let tokens = SessionTokenStore::new(Arc::new(MemoryStore::new()));
        tokens.set_token(token).await.unwrap();
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpSyncForwarder::with_client(client, endpoint, Arc::new(tokens))
    }

    fn parse_request(raw: &[u8], head_end: usize) -> CapturedRequest {
        let head = String::from_utf8_lossy(&raw[..head_end]).into_owned();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        let body = serde_json::from_slice(&raw[head_end + 4..]).unwrap();
        CapturedRequest {
            request_line,
            headers,
            body,
        }
    }

    /// Accepts one request, answers it with `status_line` and hands back what
    /// was received.
    async fn serve_once(status_line: &'static str) -> (String, oneshot::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/api/agent/location", listener.local_addr().unwrap());
        let (captured_tx, captured_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            let head_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before the request completed");
                raw.extend_from_slice(&buf[..n]);

                let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&raw[..head_end]).to_ascii_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break head_end;
                }
            };

            let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = captured_tx.send(parse_request(&raw, head_end));
        });

        (endpoint, captured_rx)
    }

    #[tokio::test]
    async fn push_posts_authorized_json_and_swallows_server_errors() {
        let (endpoint, captured) = serve_once("HTTP/1.1 500 Internal Server Error").await;
        let forwarder = forwarder(endpoint, Some("tok_1")).await;

        // Returns normally even though the server rejects the sample.
        forwarder.push(&sample(), true).await;

        let request = captured.await.unwrap();
        assert_eq!(request.request_line, "POST /api/agent/location HTTP/1.1");
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer tok_1")
        );
        let request_id = request.headers.get("x-request-id").unwrap();
        assert_eq!(Uuid::parse_str(request_id).unwrap().get_version_num(), 4);
        assert!(request
            .headers
            .get("content-type")
            .is_some_and(|value| value.starts_with("application/json")));
        assert_eq!(
            request.body,
            serde_json::to_value(LocationUpdate::new(&sample(), true)).unwrap()
        );
        assert_eq!(request.body["is_online"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn accepted_push_carries_offline_flag() {
        let (endpoint, captured) = serve_once("HTTP/1.1 200 OK").await;
        let forwarder = forwarder(endpoint, Some("tok_2")).await;

        forwarder.push(&sample(), false).await;

        let request = captured.await.unwrap();
        assert_eq!(request.body["is_online"], serde_json::json!(false));
        assert_eq!(request.body["latitude"], serde_json::json!(12.97));
    }

    #[tokio::test]
    async fn missing_token_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/api/agent/location", listener.local_addr().unwrap());
        let forwarder = forwarder(endpoint, None).await;

        forwarder.push(&sample(), false).await;

        let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_returns_within_timeout() {
        let tokens = SessionTokenStore::new(Arc::new(MemoryStore::new()));
        tokens.set_token(Some("tok_1")).await.unwrap();
        let forwarder = HttpSyncForwarder::new(
            "http://127.0.0.1:9/api/agent/location".into(),
            Duration::from_secs(2),
            Arc::new(tokens),
        )
        .unwrap();

        let pushed = tokio::time::timeout(Duration::from_secs(5), forwarder.push(&sample(), true)).await;
        assert!(pushed.is_ok());
        assert_eq!(forwarder.endpoint(), "http://127.0.0.1:9/api/agent/location");
    }
}
