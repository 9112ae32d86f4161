use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::BoxFuture;
use serde::Serialize;
use tracing::debug;

/// JSON body posted to the webhook: `{"text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub text: String,
}

impl WebhookMessage {
    /// Expand `{frame}` and `{utc}` placeholders in a message template.
    pub fn render(template: &str, seq: u64, now: DateTime<Utc>) -> Self {
        let text = template
            .replace("{frame}", &seq.to_string())
            .replace("{utc}", &now.to_rfc3339_opts(SecondsFormat::Secs, true));
        Self { text }
    }
}

/// Outbound notification capability used by the `slackmsg` filter.
pub trait Notifier: Send + Sync {
    fn send<'a>(&'a self, message: &'a WebhookMessage) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Posts messages to an incoming-webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let url = reqwest::Url::parse(url).map_err(|e| NotifyError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn send<'a>(&'a self, message: &'a WebhookMessage) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            // `json` sets `Content-Type: application/json`.
            let response = self
                .client
                .post(self.url.clone())
                .json(message)
                .send()
                .await
                .map_err(NotifyError::Http)?;

            let status = response.status();
            if !status.is_success() {
                return Err(NotifyError::HttpStatus(status.as_u16()));
            }
            debug!(status = %status, host = self.url.host_str(), "webhook accepted message");
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid webhook url: {0}")]
    InvalidUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("webhook request failed: {0}")]
    Http(reqwest::Error),
    #[error("webhook returned HTTP status {0}")]
    HttpStatus(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(Option<String>, String)>>>;

    async fn spawn_webhook(status: StatusCode) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let app = Router::new().route(
            "/hook",
            post(move |headers: HeaderMap, body: String| {
                let sink = Arc::clone(&sink);
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push((content_type, body));
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), seen)
    }

    #[test]
    fn render_expands_placeholders() {
        let now = Utc.with_ymd_and_hms(2024, 2, 19, 8, 30, 0).unwrap();
        let msg = WebhookMessage::render("frame {frame} at {utc}", 101, now);
        assert_eq!(msg.text, "frame 101 at 2024-02-19T08:30:00Z");

        let plain = WebhookMessage::render("Hello, World!", 0, now);
        assert_eq!(plain.text, "Hello, World!");
    }

    #[test]
    fn message_serializes_as_text_object() {
        let msg = WebhookMessage {
            text: "Hello, World!".into(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"text":"Hello, World!"}"#
        );
    }

    #[test]
    fn rejects_bad_urls() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            WebhookNotifier::new("not a url", timeout),
            Err(NotifyError::InvalidUrl(_))
        ));
        assert!(matches!(
            WebhookNotifier::new("ftp://example.com/hook", timeout),
            Err(NotifyError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn posts_json_payload() {
        let (url, seen) = spawn_webhook(StatusCode::OK).await;
        let notifier = WebhookNotifier::new(&url, Duration::from_secs(5)).unwrap();
        let msg = WebhookMessage {
            text: "Hello, World!".into(),
        };
        notifier.send(&msg).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("application/json"));
        assert_eq!(seen[0].1, r#"{"text":"Hello, World!"}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _seen) = spawn_webhook(StatusCode::FORBIDDEN).await;
        let notifier = WebhookNotifier::new(&url, Duration::from_secs(5)).unwrap();
        let msg = WebhookMessage { text: "x".into() };
        let err = notifier.send(&msg).await.unwrap_err();
        assert!(matches!(err, NotifyError::HttpStatus(403)));
    }
}
