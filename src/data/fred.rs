//! FRED API integration for weekly H.4.1 series.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Observation, SeriesTable};

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const OBSERVATIONS_PATH: &str = "/fred/series/observations";

/// Per-series fetch failure.
///
/// Everything except `Unauthorized` only affects the series being fetched;
/// a rejected key will be rejected for every series, so callers stop there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("FRED rejected the API key")]
    Unauthorized,

    #[error("no usable observations")]
    NoData,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected FRED payload: {0}")]
    Unexpected(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Anything that can produce a `SeriesTable` for a series id.
///
/// `FredClient` is the real implementation; tests plug in in-memory sources.
pub trait SeriesSource: Send + Sync {
    fn fetch(&self, series_id: &str, credential: &str, start: NaiveDate) -> Result<SeriesTable, FetchError>;
}

pub struct FredClient {
    client: Client,
    base_url: String,
}

impl FredClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl SeriesSource for FredClient {
    fn fetch(&self, series_id: &str, credential: &str, start: NaiveDate) -> Result<SeriesTable, FetchError> {
        validate_request(series_id, credential, start, Local::now().date_naive())?;

        let url = format!("{}{OBSERVATIONS_PATH}", self.base_url);
        let start_str = start.format("%Y-%m-%d").to_string();
        tracing::debug!(series_id, start = %start_str, "requesting FRED observations");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", credential),
                ("file_type", "json"),
                ("observation_start", start_str.as_str()),
                ("frequency", "w"),
                ("units", "lin"),
            ])
            .send()
            .map_err(transport_error)?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }

        let body = resp.text().map_err(transport_error)?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| format!(": {}", e.error_message))
                .unwrap_or_default();
            return Err(FetchError::Transport(format!("FRED responded with status {status}{detail}")));
        }

        let table = parse_observations(series_id, &body)?;
        tracing::debug!(series_id, n_obs = table.len(), "parsed FRED observations");
        Ok(table)
    }
}

/// Check the request constraints before anything goes over the wire.
pub fn validate_request(
    series_id: &str,
    credential: &str,
    start: NaiveDate,
    today: NaiveDate,
) -> Result<(), FetchError> {
    if series_id.trim().is_empty() {
        return Err(FetchError::InvalidRequest("series id is empty".into()));
    }
    if credential.trim().is_empty() {
        return Err(FetchError::InvalidRequest("API key is empty".into()));
    }
    if start > today {
        return Err(FetchError::InvalidRequest(format!(
            "start date {start} is in the future"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_message: String,
}

/// Parse an observations payload into a `SeriesTable`.
///
/// Missing-value markers and anything that does not parse to a finite number
/// are dropped. A payload with no usable values is `NoData`.
pub fn parse_observations(series_id: &str, body: &str) -> Result<SeriesTable, FetchError> {
    let parsed: ObservationsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Unexpected(e.to_string()))?;

    let mut out = Vec::with_capacity(parsed.observations.len());
    for obs in parsed.observations {
        let Some(value) = parse_value(&obs.value) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(obs.date.trim(), "%Y-%m-%d")
            .map_err(|e| FetchError::Unexpected(format!("invalid date '{}': {e}", obs.date)))?;
        out.push(Observation::new(date, value));
    }

    if out.is_empty() {
        return Err(FetchError::NoData);
    }
    Ok(SeriesTable::new(series_id, out))
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

// reqwest errors carry the full URL, and the URL carries the API key.
fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Transport("request timed out".into())
    } else {
        FetchError::Transport(err.without_url().to_string())
    }
}
