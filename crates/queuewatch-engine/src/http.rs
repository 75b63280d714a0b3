use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use queuewatch_core::{FetchError, ItemId, Snapshot};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::SourceConfig;
use crate::source::QueueSource;

/// Polls a JSON view endpoint that lists queue items, e.g.
/// `/api/v2/views/<id>/tickets.json?per_page=100`.
pub struct HttpSource {
    client: Client,
    url: String,
    items_field: String,
    id_field: String,
}

impl HttpSource {
    pub fn new(cfg: &SourceConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &cfg.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {name:?}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.insert(name, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            url: cfg.url.clone(),
            items_field: cfg.items_field.clone(),
            id_field: cfg.id_field.clone(),
        })
    }
}

#[async_trait]
impl QueueSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(FetchError::transport)?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!("http status {status}")));
        }
        let body: Value = resp.json().await.map_err(FetchError::malformed)?;
        parse_item_ids(&body, &self.items_field, &self.id_field)
    }
}

/// Pull item ids out of a listing body such as `{"tickets": [{"id": 1}, ...]}`.
///
/// A missing or null listing is an empty queue. Entries without a usable id are
/// skipped.
pub fn parse_item_ids(body: &Value, items_field: &str, id_field: &str) -> Result<Snapshot, FetchError> {
    let obj = body
        .as_object()
        .ok_or_else(|| FetchError::malformed("expected a json object"))?;
    let items = match obj.get(items_field) {
        None | Some(Value::Null) => return Ok(Snapshot::empty()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(FetchError::MalformedResponse(format!(
                "`{items_field}` is not an array"
            )))
        }
    };
    Ok(items
        .iter()
        .filter_map(|item| {
            let raw = item.get(id_field);
            let id = match raw {
                Some(Value::Number(n)) => n.as_u64().map(ItemId::Num),
                Some(Value::String(s)) => Some(ItemId::Text(s.clone())),
                _ => None,
            };
            if id.is_none() {
                debug!("skipping item without usable `{id_field}`: {raw:?}");
            }
            id
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn extracts_numeric_and_string_ids() {
        let body = json!({"tickets": [{"id": 11}, {"id": "x-2"}, {"subject": "no id"}], "count": 3});
        let snap = parse_item_ids(&body, "tickets", "id").unwrap();
        assert_eq!(snap.ids(), &[ItemId::from(11), ItemId::from("x-2")]);
    }

    #[test]
    fn missing_listing_is_empty_queue() {
        assert!(parse_item_ids(&json!({}), "tickets", "id").unwrap().is_empty());
        assert!(parse_item_ids(&json!({"tickets": null}), "tickets", "id").unwrap().is_empty());
        assert!(parse_item_ids(&json!({"tickets": []}), "tickets", "id").unwrap().is_empty());
    }

    #[test]
    fn wrong_shapes_are_malformed() {
        assert!(matches!(
            parse_item_ids(&json!([1, 2]), "tickets", "id"),
            Err(FetchError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_item_ids(&json!({"tickets": {"id": 1}}), "tickets", "id"),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn ids_outside_u64_are_skipped() {
        let body = json!({"tickets": [{"id": -3}, {"id": 1.5}, {"id": 9}]});
        let snap = parse_item_ids(&body, "tickets", "id").unwrap();
        assert_eq!(snap.ids(), &[ItemId::from(9)]);
    }

    #[test]
    fn custom_field_names() {
        let body = json!({"rows": [{"key": 5}]});
        let snap = parse_item_ids(&body, "rows", "key").unwrap();
        assert_eq!(snap.ids(), &[ItemId::from(5)]);
    }

    /// Serve one canned HTTP/1.1 response; the task yields the raw request.
    async fn serve_once(status: &str, body: &str) -> (SourceConfig, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        let cfg = SourceConfig {
            url: format!("http://{addr}/api/v2/views/1/tickets.json"),
            items_field: "tickets".to_string(),
            id_field: "id".to_string(),
            headers: BTreeMap::from([("X-Queue-Token".to_string(), "abc123".to_string())]),
        };
        (cfg, server)
    }

    async fn fetch_from(status: &str, body: &str) -> (Result<Snapshot, FetchError>, String) {
        let (cfg, server) = serve_once(status, body).await;
        let source = HttpSource::new(&cfg, Duration::from_secs(5)).unwrap();
        let outcome = source.fetch().await;
        (outcome, server.await.unwrap())
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let (outcome, _) = fetch_from("429 Too Many Requests", "{}").await;
        assert_eq!(outcome, Err(FetchError::RateLimited));
    }

    #[tokio::test]
    async fn server_error_is_transport_failure() {
        let (outcome, _) = fetch_from("503 Service Unavailable", "{}").await;
        match outcome {
            Err(FetchError::Transport(msg)) => assert!(msg.contains("503"), "{msg}"),
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let (outcome, _) = fetch_from("200 OK", "<html>login</html>").await;
        assert!(matches!(outcome, Err(FetchError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn sends_accept_and_configured_headers() {
        let (outcome, request) = fetch_from("200 OK", r#"{"tickets": [{"id": 4}, {"id": 2}]}"#).await;
        assert_eq!(outcome.unwrap().ids(), &[ItemId::from(4), ItemId::from(2)]);
        let request = request.to_ascii_lowercase();
        assert!(request.starts_with("get /api/v2/views/1/tickets.json"), "{request}");
        assert!(request.contains("accept: application/json"), "{request}");
        assert!(request.contains("x-queue-token: abc123"), "{request}");
    }
}
