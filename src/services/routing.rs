use crate::constants::{ROUTING_HTTP_TIMEOUT_SECONDS, ROUTING_MAX_RETRIES, ROUTING_RETRY_BACKOFF_MS};
use crate::error::RoutingError;
use crate::models::{BoundingBox, Incident, Location, TimeRange, TravelMode};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Predicted travel time for one departure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEta {
    pub duration_seconds: f64,
    pub has_incident: bool,
}

/// Time-dependent travel-time source.
#[async_trait]
pub trait RoutingSource: Send + Sync {
    async fn eta(
        &self,
        from: &Location,
        to: &Location,
        departure: OffsetDateTime,
        mode: TravelMode,
    ) -> Result<RouteEta, RoutingError>;

    /// Incidents reported inside `area` during `window`. Sources without an
    /// incident feed report none.
    async fn incidents(
        &self,
        _area: &BoundingBox,
        _window: &TimeRange,
    ) -> Result<Vec<Incident>, RoutingError> {
        Ok(Vec::new())
    }
}

/// Client for INRIX-style `/routing/route` and `/incidents` endpoints.
#[derive(Clone)]
pub struct InrixClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl InrixClient {
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        InrixClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn request_once(
        &self,
        from: &Location,
        to: &Location,
        departure: &str,
        mode: TravelMode,
    ) -> Result<RouteEta, Attempt> {
        let url = format!("{}/routing/route", self.base_url);
        let provider = if mode == TravelMode::Drive { "inrix" } else { "here" };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("origin", format!("{},{}", from.latitude, from.longitude)),
                ("destination", format!("{},{}", to.latitude, to.longitude)),
                ("departureTime", departure.to_string()),
                ("profile", mode.routing_profile().to_string()),
                ("provider", provider.to_string()),
            ])
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(ROUTING_HTTP_TIMEOUT_SECONDS))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Attempt::Transient(RoutingError::Timeout)
                } else {
                    Attempt::Transient(RoutingError::Transport(format!("Request failed: {}", e)))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Attempt::Transient(RoutingError::Quota));
        }
        if status.is_server_error() {
            return Err(Attempt::Transient(RoutingError::Transport(format!(
                "HTTP {}",
                status
            ))));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Attempt::Permanent(RoutingError::Transport(format!(
                "HTTP {}: {}",
                status, body
            ))));
        }

        let body: RouteResponse = response.json().await.map_err(|e| {
            Attempt::Permanent(RoutingError::Malformed(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        parse_route(body).map_err(Attempt::Permanent)
    }
}

/// Whether a failed request is worth repeating.
enum Attempt {
    Transient(RoutingError),
    Permanent(RoutingError),
}

#[async_trait]
impl RoutingSource for InrixClient {
    /// Retries timeouts, 429 and 5xx with exponential backoff.
    async fn eta(
        &self,
        from: &Location,
        to: &Location,
        departure: OffsetDateTime,
        mode: TravelMode,
    ) -> Result<RouteEta, RoutingError> {
        let departure = departure
            .format(&Rfc3339)
            .map_err(|e| RoutingError::Malformed(format!("departure time: {}", e)))?;

        let mut retry_count = 0;
        loop {
            match self.request_once(from, to, &departure, mode).await {
                Ok(eta) => return Ok(eta),
                Err(Attempt::Permanent(e)) => return Err(e),
                Err(Attempt::Transient(e)) => {
                    if retry_count >= ROUTING_MAX_RETRIES {
                        return Err(e);
                    }
                    retry_count += 1;
                    let backoff_ms = ROUTING_RETRY_BACKOFF_MS * 2_u64.pow(retry_count as u32 - 1);
                    tracing::debug!(
                        from = %from.name,
                        to = %to.name,
                        "Routing request {}, retrying in {}ms (attempt {}/{})",
                        e,
                        backoff_ms,
                        retry_count + 1,
                        ROUTING_MAX_RETRIES + 1
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn incidents(
        &self,
        area: &BoundingBox,
        window: &TimeRange,
    ) -> Result<Vec<Incident>, RoutingError> {
        let url = format!("{}/incidents", self.base_url);
        let stamp = |t: OffsetDateTime| {
            t.format(&Rfc3339)
                .map_err(|e| RoutingError::Malformed(format!("incident window: {}", e)))
        };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("boundingBox", area.to_query()),
                ("startTime", stamp(window.start)?),
                ("endTime", stamp(window.end)?),
            ])
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(ROUTING_HTTP_TIMEOUT_SECONDS))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutingError::Timeout
                } else {
                    RoutingError::Transport(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::Quota);
        }
        if !status.is_success() {
            return Err(RoutingError::Transport(format!("HTTP {}", status)));
        }

        let body: IncidentsResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::Malformed(format!("Failed to parse incidents: {}", e)))?;

        Ok(parse_incidents(body))
    }
}

#[derive(Debug, Deserialize)]
struct IncidentsResponse {
    #[serde(default)]
    incidents: Vec<IncidentBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncidentBody {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(rename = "type")]
    kind: Option<String>,
    start_time: Option<String>,
    severity: Option<String>,
}

/// Missing type and severity default to `unknown` and `moderate`.
fn parse_incidents(body: IncidentsResponse) -> Vec<Incident> {
    body.incidents
        .into_iter()
        .map(|raw| Incident {
            segment_id: match raw.id {
                serde_json::Value::String(id) => id,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            },
            kind: raw.kind.unwrap_or_else(|| "unknown".to_string()),
            start: raw
                .start_time
                .and_then(|t| OffsetDateTime::parse(&t, &Rfc3339).ok()),
            severity: raw.severity.unwrap_or_else(|| "moderate".to_string()),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<RouteBody>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    duration: LegDuration,
    #[serde(default)]
    incidents: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LegDuration {
    value: f64,
}

/// Sum leg durations; any leg incident flags the whole route.
fn parse_route(body: RouteResponse) -> Result<RouteEta, RoutingError> {
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::Malformed("no routes returned".to_string()))?;

    if route.legs.is_empty() {
        return Err(RoutingError::Malformed("no route legs returned".to_string()));
    }

    let mut duration_seconds = 0.0;
    let mut has_incident = false;
    for leg in &route.legs {
        if !leg.duration.value.is_finite() || leg.duration.value < 0.0 {
            return Err(RoutingError::Malformed(format!(
                "invalid leg duration {}",
                leg.duration.value
            )));
        }
        duration_seconds += leg.duration.value;
        has_incident |= !leg.incidents.is_empty();
    }

    Ok(RouteEta {
        duration_seconds,
        has_incident,
    })
}
