//! End-to-end tests for the HTTP control endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use signalman::config::{ControlConfig, RateLimitConfig};
use signalman::control::SignalResponse;
use signalman::lifecycle::Harness;
use signalman::observability::{DispatchSource, TelemetryEvent};
use signalman::platform::Simulated;
use signalman::{BoxError, HandlerResult, LogicalSignal};
use tokio_util::sync::CancellationToken;

mod common;

use common::{ControlServer, TestManager};

fn recorder(
    log: &Arc<Mutex<Vec<String>>>,
    entry: &'static str,
) -> impl Fn(CancellationToken) -> std::future::Ready<HandlerResult> + Send + Sync + 'static {
    let log = log.clone();
    move |_token| {
        log.lock().unwrap().push(entry.to_string());
        std::future::ready(Ok(()))
    }
}

#[tokio::test]
async fn test_non_post_is_rejected() {
    let fixture = TestManager::new(Simulated::all());
    let server = ControlServer::start(fixture.manager.clone(), ControlConfig::default()).await;

    let res = reqwest::Client::new().get(server.url()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_empty_signal_is_bad_request() {
    let fixture = TestManager::new(Simulated::all());
    let server = ControlServer::start(fixture.manager.clone(), ControlConfig::default()).await;

    let res = reqwest::Client::new()
        .post(server.url())
        .json(&json!({ "signal": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: SignalResponse = res.json().await.unwrap();
    assert!(!body.success);
    assert_eq!(body.error.as_deref(), Some("signal field is required"));
}

#[tokio::test]
async fn test_bearer_token_is_enforced() {
    let fixture = TestManager::new(Simulated::all());
    let config = ControlConfig {
        bearer_token: Some("hunter2".into()),
        ..ControlConfig::default()
    };
    let server = ControlServer::start(fixture.manager.clone(), config).await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url())
        .bearer_auth("wrong")
        .json(&json!({ "signal": "SIGUSR1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(server.url())
        .bearer_auth("hunter2")
        .json(&json!({ "signal": "SIGUSR1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_one_per_minute() {
    let fixture = TestManager::new(Simulated::all());
    let config = ControlConfig {
        rate_limit: RateLimitConfig {
            requests_per_second: 1.0 / 60.0,
            burst: 1,
        },
        ..ControlConfig::default()
    };
    let server = ControlServer::start(fixture.manager.clone(), config).await;
    let client = reqwest::Client::new();

    let first = client
        .post(server.url())
        .json(&json!({ "signal": "SIGUSR2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .post(server.url())
        .json(&json!({ "signal": "SIGUSR2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_hangup_unavailable_natively_is_rejected() {
    let fixture = TestManager::new(Simulated::windows_like());
    let server = ControlServer::start(fixture.manager.clone(), ControlConfig::default()).await;

    let res = reqwest::Client::new()
        .post(server.url())
        .json(&json!({ "signal": "SIGHUP" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: SignalResponse = res.json().await.unwrap();
    assert!(body.error.unwrap().contains("SIGHUP"));
}

/// The HTTP path and the injected path run the same handlers in the same order.
#[tokio::test]
async fn test_http_dispatch_matches_injected_dispatch() {
    async fn run(via_http: bool) -> (Vec<String>, Vec<TelemetryEvent>) {
        let fixture = TestManager::new(Simulated::all());
        let log = Arc::new(Mutex::new(Vec::new()));
        fixture.manager.handle(LogicalSignal::Terminate, recorder(&log, "per-signal"));
        fixture.manager.on_shutdown(recorder(&log, "close-db"));
        fixture.manager.on_shutdown(recorder(&log, "drain-http"));

        if via_http {
            let server = ControlServer::start(fixture.manager.clone(), ControlConfig::default()).await;
            let res = reqwest::Client::new()
                .post(server.url())
                .json(&json!({ "signal": "TERM", "reason": "deploy", "requester": "ci" }))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            let body: SignalResponse = res.json().await.unwrap();
            assert_eq!(body.signal.as_deref(), Some("SIGTERM"));
        } else {
            let harness = Harness::new(&fixture.manager);
            let listener = {
                let manager = fixture.manager.clone();
                tokio::spawn(async move { manager.listen(CancellationToken::new()).await })
            };
            harness.wait_for_listen(Duration::from_secs(1)).await.unwrap();
            harness.inject(LogicalSignal::Terminate).await.unwrap();
            let received = listener.await.unwrap().unwrap();
            assert_eq!(received, Some(LogicalSignal::Terminate));
        }

        let entries = log.lock().unwrap().clone();
        (entries, fixture.telemetry.events())
    }

    let (http, http_events) = run(true).await;
    let (injected, injected_events) = run(false).await;
    assert_eq!(http, vec!["per-signal", "drain-http", "close-db"]);
    assert_eq!(http, injected);

    assert!(http_events.contains(&TelemetryEvent::Dispatched {
        signal: LogicalSignal::Terminate,
        source: DispatchSource::Control,
        success: true,
    }));
    assert!(injected_events.contains(&TelemetryEvent::Dispatched {
        signal: LogicalSignal::Terminate,
        source: DispatchSource::Listen,
        success: true,
    }));
}

#[tokio::test]
async fn test_handler_failure_returns_server_error() {
    let fixture = TestManager::new(Simulated::all());
    fixture
        .manager
        .handle(LogicalSignal::User1, |_token| async { Err(BoxError::from("disk full")) });
    let server = ControlServer::start(fixture.manager.clone(), ControlConfig::default()).await;

    let res = reqwest::Client::new()
        .post(server.url())
        .json(&json!({ "signal": "SIGUSR1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: SignalResponse = res.json().await.unwrap();
    assert_eq!(body.signal.as_deref(), Some("SIGUSR1"));
    assert!(body.error.unwrap().contains("disk full"));
}

#[tokio::test]
async fn test_grace_period_cancels_handler_token() {
    let fixture = TestManager::new(Simulated::all());
    fixture.manager.handle(LogicalSignal::User2, |token| async move {
        tokio::select! {
            () = token.cancelled() => Err(BoxError::from("grace period elapsed")),
            () = tokio::time::sleep(Duration::from_secs(10)) => Ok(()),
        }
    });
    let server = ControlServer::start(fixture.manager.clone(), ControlConfig::default()).await;

    let res = reqwest::Client::new()
        .post(server.url())
        .json(&json!({ "signal": "SIGUSR2", "grace_period_seconds": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: SignalResponse = res.json().await.unwrap();
    assert!(body.error.unwrap().contains("grace period elapsed"));
}
