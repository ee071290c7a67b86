use async_trait::async_trait;
use reqwest::{Request, Response, StatusCode};

use crate::error::{AggregationError, Result};

/// Executes a prepared request. Wrappers layer headers on top of an inner
/// client; tests substitute canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// Sends `req` and returns the body when the status is one of
    /// `expected`. Any other status becomes [`AggregationError::Upstream`]
    /// carrying the status and body, retryable for 5xx. A body that cannot
    /// be read in full is an upstream error too.
    async fn send_expecting(&self, req: Request, expected: &[StatusCode]) -> Result<String> {
        let method = req.method().clone();
        let path = req.url().path().to_string();

        let resp = self.execute(req).await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !expected.contains(&status) {
            return Err(AggregationError::Upstream {
                message: format!("{method} {path} returned status {status}: {body}"),
                retryable: status.is_server_error(),
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use reqwest::{Method, Url};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one connection: reads the request, writes `head` and then
    /// either stalls or hangs up before the promised body arrives.
    async fn serve_once(head: &'static str, stall: bool) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            if stall {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
        format!("http://{addr}/v2/entities").parse().unwrap()
    }

    const PARTIAL_OK: &str = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n[{\"id\":";

    #[tokio::test]
    async fn test_stalled_body_is_retryable_upstream_error() {
        let url = serve_once(PARTIAL_OK, true).await;
        let client = BasicClient::new(Duration::from_millis(300), Duration::from_secs(1)).unwrap();

        let err = client
            .send_expecting(Request::new(Method::GET, url), &[StatusCode::OK])
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::Upstream { .. }));
        assert!(err.is_retryable(), "{err}");
    }

    #[tokio::test]
    async fn test_truncated_body_is_retryable_upstream_error() {
        let url = serve_once(PARTIAL_OK, false).await;
        let client = BasicClient::new(Duration::from_secs(5), Duration::from_secs(1)).unwrap();

        let err = client
            .send_expecting(Request::new(Method::GET, url), &[StatusCode::OK])
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::Upstream { .. }));
        assert!(err.is_retryable(), "{err}");
    }

    #[tokio::test]
    async fn test_unexpected_status_carries_body() {
        let url = serve_once(
            "HTTP/1.1 400 Bad Request\r\ncontent-length: 14\r\nconnection: close\r\n\r\nInvalid query!",
            false,
        )
        .await;
        let client = BasicClient::new(Duration::from_secs(5), Duration::from_secs(1)).unwrap();

        let err = client
            .send_expecting(Request::new(Method::GET, url), &[StatusCode::OK])
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Invalid query!"));
    }
}
