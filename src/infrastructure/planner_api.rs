use crate::domain::models::{Event, EventId};
use crate::error::PlannerError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct PlannerApiConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl Default for PlannerApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

/// Boundary to the planner backend. Implementations do network I/O only;
/// no local state beyond the transport handle.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    /// Fetch the full event list. An empty list is a valid result.
    async fn fetch_all(&self) -> Result<Vec<Event>, PlannerError>;

    /// Persist a new event and return the server's canonical record, whose
    /// id and date may differ from what was sent. An empty `date` means
    /// the event is undated.
    async fn create(&self, title: &str, date: &str) -> Result<Event, PlannerError>;
}

#[derive(Debug, Clone)]
pub struct HttpPlannerApi {
    client: Client,
    base_url: Url,
}

impl HttpPlannerApi {
    pub fn new(config: &PlannerApiConfig) -> Result<Self, PlannerError> {
        let base_url = Url::parse(&config.base_url).map_err(|error| {
            PlannerError::InvalidArgument(format!(
                "invalid planner base url '{}': {error}",
                config.base_url
            ))
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| PlannerError::Network(format!("failed to build http client: {error}")))?;

        Ok(Self { client, base_url })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), PlannerError> {
        if value.trim().is_empty() {
            return Err(PlannerError::Validation(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn planner_endpoint(&self) -> Result<Url, PlannerError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                PlannerError::InvalidArgument("planner base URL cannot be a base".to_string())
            })?;
            segments.push("api");
            segments.push("planner");
        }
        Ok(url)
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> PlannerError {
        let message = if body.trim().is_empty() {
            format!("planner api error: http {}", status.as_u16())
        } else {
            format!("planner api error: http {}; body={body}", status.as_u16())
        };
        PlannerError::Network(message)
    }
}

#[derive(Debug, serde::Deserialize)]
struct PlannerListResponse {
    planner: Option<Vec<EventPayload>>,
}

#[derive(Debug, serde::Deserialize)]
struct EventPayload {
    id: Option<EventId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct CreateEventRequest<'a> {
    title: &'a str,
    date: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct CreateEventResponse {
    #[serde(default)]
    ok: bool,
    event: Option<EventPayload>,
    #[serde(default)]
    error: Option<String>,
}

/// The backend sends blank dates for undated events and may, in principle,
/// send entries without a usable title; titles are required non-empty, so
/// such entries are dropped rather than surfaced.
fn normalize_event(payload: EventPayload) -> Option<Event> {
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())?
        .to_string();
    let date = payload
        .date
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Some(Event {
        id: payload.id,
        title,
        date,
    })
}

#[async_trait]
impl PlannerApi for HttpPlannerApi {
    async fn fetch_all(&self) -> Result<Vec<Event>, PlannerError> {
        let endpoint = self.planner_endpoint()?;
        let response = self.client.get(endpoint).send().await.map_err(|error| {
            PlannerError::Network(format!("network error while fetching planner events: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            PlannerError::Network(format!("failed reading planner list response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let parsed: PlannerListResponse = serde_json::from_str(&body).map_err(|error| {
            PlannerError::Decode(format!("invalid planner list payload: {error}; body={body}"))
        })?;

        let events: Vec<Event> = parsed
            .planner
            .unwrap_or_default()
            .into_iter()
            .filter_map(normalize_event)
            .collect();
        debug!(count = events.len(), "fetched planner events");
        Ok(events)
    }

    async fn create(&self, title: &str, date: &str) -> Result<Event, PlannerError> {
        Self::ensure_non_empty(title, "event title")?;

        let request = CreateEventRequest {
            title: title.trim(),
            date: date.trim(),
        };
        let endpoint = self.planner_endpoint()?;
        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                PlannerError::Network(format!("network error while creating planner event: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            PlannerError::Network(format!("failed reading planner create response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let parsed: CreateEventResponse = serde_json::from_str(&body).map_err(|error| {
            PlannerError::Decode(format!("invalid planner create payload: {error}; body={body}"))
        })?;

        if !parsed.ok {
            let reason = parsed
                .error
                .unwrap_or_else(|| "server rejected the event".to_string());
            return Err(PlannerError::Network(format!("planner create failed: {reason}")));
        }

        let event = parsed.event.and_then(normalize_event).ok_or_else(|| {
            PlannerError::Decode("planner create response did not include a valid event".to_string())
        })?;
        debug!(id = ?event.id, "created planner event");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_for(server: &mockito::Server) -> HttpPlannerApi {
        HttpPlannerApi::new(&PlannerApiConfig {
            base_url: server.url(),
            timeout: Some(Duration::from_secs(5)),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn fetch_all_decodes_integer_ids_and_blank_dates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/planner")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"planner": [
                    {"title": "Quiz", "date": "2024-04-10", "id": 1712000000000},
                    {"title": "No date yet", "date": "", "id": 1712000000001},
                    {"title": "   ", "date": "2024-04-11", "id": 1712000000002}
                ]}"#,
            )
            .create_async()
            .await;

        let events = api_for(&server).fetch_all().await.expect("fetch");
        mock.assert_async().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Quiz");
        assert_eq!(events[0].date.as_deref(), Some("2024-04-10"));
        assert_eq!(events[0].id, Some(EventId::new("1712000000000")));
        assert_eq!(events[1].title, "No date yet");
        assert_eq!(events[1].date, None);
    }

    #[tokio::test]
    async fn fetch_all_accepts_an_empty_planner() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/planner")
            .with_status(200)
            .with_body(r#"{"planner": []}"#)
            .create_async()
            .await;

        let events = api_for(&server).fetch_all().await.expect("fetch");
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn fetch_all_maps_http_failure_to_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/planner")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let error = api_for(&server).fetch_all().await.expect_err("failure");
        assert!(matches!(error, PlannerError::Network(_)));
    }

    #[tokio::test]
    async fn fetch_all_maps_malformed_body_to_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/planner")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let error = api_for(&server).fetch_all().await.expect_err("failure");
        assert!(matches!(error, PlannerError::Decode(_)));
    }

    #[tokio::test]
    async fn create_returns_the_canonical_server_event() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/planner")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "title": "Quiz",
                "date": "2024-04-10"
            })))
            .with_status(200)
            .with_body(
                r#"{"ok": true, "event": {"title": "Quiz", "date": "2024-04-10", "id": 1712000000099}}"#,
            )
            .create_async()
            .await;

        let event = api_for(&server)
            .create("  Quiz  ", "2024-04-10")
            .await
            .expect("create");
        mock.assert_async().await;

        assert_eq!(event.title, "Quiz");
        assert_eq!(event.id, Some(EventId::new("1712000000099")));
    }

    #[tokio::test]
    async fn create_rejects_blank_title_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/planner")
            .expect(0)
            .create_async()
            .await;

        let error = api_for(&server).create("   ", "").await.expect_err("failure");
        assert!(matches!(error, PlannerError::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_treats_non_ok_body_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/planner")
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "Missing title"}"#)
            .create_async()
            .await;

        let error = api_for(&server).create("Quiz", "").await.expect_err("failure");
        match error {
            PlannerError::Network(message) => assert!(message.contains("Missing title")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_treats_rejection_status_as_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/planner")
            .with_status(400)
            .with_body(r#"{"error": "Missing title"}"#)
            .create_async()
            .await;

        let error = api_for(&server).create("Quiz", "").await.expect_err("failure");
        assert!(matches!(error, PlannerError::Network(_)));
    }

    #[test]
    fn default_config_targets_the_dev_server() {
        let config = PlannerApiConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert!(config.timeout.is_none());
        assert!(HttpPlannerApi::new(&config).is_ok());
    }

    #[test]
    fn rejects_an_unusable_base_url() {
        let result = HttpPlannerApi::new(&PlannerApiConfig {
            base_url: "not a url".to_string(),
            timeout: None,
        });
        assert!(matches!(result, Err(PlannerError::InvalidArgument(_))));
    }
}
