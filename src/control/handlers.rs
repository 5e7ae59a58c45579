//! Request handling for the signal control endpoint.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ControlState;
use crate::lifecycle::{Error, LogicalSignal, UnknownSignal};
use crate::observability::{metrics, DispatchSource};

/// Body of `POST <control path>`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignalRequest {
    #[serde(default)]
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whole seconds the handlers get before their token is cancelled.
    /// Absent means no bound beyond server shutdown. Negative or fractional
    /// values fail to deserialize and are rejected with 400.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
}

/// Response envelope for every outcome, success or not.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignalResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("method not allowed: use POST")]
    MethodNotAllowed,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("signal field is required")]
    MissingSignal,

    #[error(transparent)]
    UnknownSignal(#[from] UnknownSignal),

    #[error(transparent)]
    Dispatch(#[from] Error),
}

impl ControlError {
    pub fn status(&self) -> StatusCode {
        match self {
            ControlError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ControlError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ControlError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ControlError::InvalidBody(_)
            | ControlError::MissingSignal
            | ControlError::UnknownSignal(_)
            | ControlError::Dispatch(Error::UnsupportedSignal { .. }) => StatusCode::BAD_REQUEST,
            ControlError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = self.status();
        let signal = match &self {
            ControlError::Dispatch(Error::UnsupportedSignal { signal, .. })
            | ControlError::Dispatch(Error::Handler { signal, .. }) => Some(signal.to_string()),
            _ => None,
        };
        let body = SignalResponse {
            success: false,
            message: None,
            signal,
            error: Some(self.to_string()),
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Outermost layer: counts every response by status.
pub async fn record_status(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    metrics::record_control_request(response.status().as_u16());
    response
}

pub async fn require_post(request: Request, next: Next) -> Result<Response, ControlError> {
    if request.method() != Method::POST {
        return Err(ControlError::MethodNotAllowed);
    }
    Ok(next.run(request).await)
}

pub async fn rate_limit(
    State(state): State<ControlState>,
    request: Request,
    next: Next,
) -> Result<Response, ControlError> {
    if !state.limiter.try_acquire() {
        tracing::warn!("Control endpoint rate limit exceeded");
        return Err(ControlError::RateLimited);
    }
    Ok(next.run(request).await)
}

/// Parse the request, then run the signal through the manager's dispatch
/// path exactly as if it had been delivered by the OS.
pub async fn dispatch_signal(
    State(state): State<ControlState>,
    body: Bytes,
) -> Result<Json<SignalResponse>, ControlError> {
    let request: SignalRequest = serde_json::from_slice(&body)?;
    let name = request.signal.trim();
    if name.is_empty() {
        return Err(ControlError::MissingSignal);
    }
    let signal: LogicalSignal = name.parse()?;

    let manager = &state.manager;
    if !manager.supports(signal) {
        let hint = manager
            .capability(signal)
            .map(|cap| cap.operation_hint.clone())
            .unwrap_or_default();
        return Err(Error::UnsupportedSignal { signal, hint }.into());
    }

    let grace = request.grace_period_seconds.map(Duration::from_secs);

    let dispatch_id = Uuid::new_v4();
    tracing::info!(
        %dispatch_id,
        %signal,
        reason = request.reason.as_deref().unwrap_or(""),
        requester = request.requester.as_deref().unwrap_or(""),
        grace_ms = grace.map(|g| g.as_millis() as u64),
        "Dispatching signal from control endpoint"
    );

    let token = state.root.child_token();
    let deadline = grace.map(|grace| {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            token.cancel();
        })
    });
    let result = manager
        .dispatch_from(signal, token, DispatchSource::Control)
        .await;
    if let Some(deadline) = deadline {
        deadline.abort();
    }
    result?;

    tracing::info!(%dispatch_id, %signal, "Control dispatch completed");
    Ok(Json(SignalResponse {
        success: true,
        message: Some(format!("{signal} dispatched")),
        signal: Some(signal.to_string()),
        error: None,
    }))
}
