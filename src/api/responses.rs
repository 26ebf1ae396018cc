//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, StoreError},
    routine::{DisplayMode, Lifecycle},
    state::CountdownState,
    timer::{Timer, TimerView},
};

/// Body of `POST /timers`
#[derive(Debug, Clone, Deserialize)]
pub struct StartTimerRequest {
    pub minutes: u32,
}

/// Query of `GET /popular`
#[derive(Debug, Clone, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// Response carrying the active timer after an action
#[derive(Debug, Clone, Serialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: Option<TimerView>,
}

impl TimerResponse {
    /// Create a new timer response
    pub fn new(message: impl Into<String>, timer: Option<Timer>, now: DateTime<Utc>) -> Self {
        let status = match timer {
            Some(timer) if timer.is_running() => "running",
            Some(_) => "paused",
            None => "idle",
        };

        Self {
            status: status.to_string(),
            message: message.into(),
            timestamp: now,
            timer: timer.map(|timer| timer.view(now)),
        }
    }
}

/// One entry of the popular list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopularEntry {
    pub minutes: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularResponse {
    pub popular: Vec<PopularEntry>,
}

impl PopularResponse {
    pub fn from_ranked(ranked: Vec<(u32, u32)>) -> Self {
        Self {
            popular: ranked
                .into_iter()
                .map(|(minutes, count)| PopularEntry { minutes, count })
                .collect(),
        }
    }
}

/// Response of the display switching endpoints
#[derive(Debug, Clone, Serialize)]
pub struct DisplayResponse {
    pub mode: DisplayMode,
    pub lifecycle: Lifecycle,
}

/// Status response with timer, display and alarm information
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: Option<TimerView>,
    pub countdown: CountdownState,
    pub display: DisplayResponse,
    pub alarm_ringing: bool,
    pub alarm_armed_for: Option<DateTime<Utc>>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

/// Error wrapper mapping timer errors onto HTTP statuses
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::IllegalState(_) => StatusCode::CONFLICT,
            Error::Store(StoreError::Corrupt { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Store(_) | Error::Wake(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
