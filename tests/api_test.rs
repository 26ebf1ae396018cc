mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use clap::Parser;
use common::{at, T0_MS};
use serde_json::{json, Value};
use tower::ServiceExt;
use wake_timer::{
    api::create_router,
    config::Config,
    error::{Error, StoreError},
    state::{AppState, KeyValueStore, MemoryStore, PersistedState, TimerStore, KEY_TIMERS},
    timer::{Clock, ManualClock},
    wake::TokioWakeScheduler,
};

struct TestApp {
    state: Arc<AppState>,
    clock: Arc<ManualClock>,
}

fn assemble(
    backend: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    args: &[&str],
) -> wake_timer::Result<Arc<AppState>> {
    let config = Config::try_parse_from(std::iter::once("wake-timer").chain(args.iter().copied()))
        .unwrap();
    let clock_dyn: Arc<dyn Clock> = clock;
    let wake = TokioWakeScheduler::new(Arc::clone(&clock_dyn));

    AppState::assemble(&config, TimerStore::new(backend), wake, clock_dyn)
}

impl TestApp {
    fn new() -> Self {
        Self::on(Arc::new(MemoryStore::new()))
    }

    fn on(backend: Arc<MemoryStore>) -> Self {
        let clock = Arc::new(ManualClock::at_millis(T0_MS));
        let state = assemble(backend, Arc::clone(&clock), &[]).unwrap();
        Self { state, clock }
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = create_router(Arc::clone(&self.state))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn start(&self, minutes: u32) -> (StatusCode, Value) {
        self.call("POST", "/timers", Some(json!({ "minutes": minutes })))
            .await
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();

    let (status, body) = app.call("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn starting_a_timer_arms_the_alarm_and_counts_the_use() {
    let app = TestApp::new();

    let (status, body) = app.start(5).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["timer"]["time_left_ms"], 300_000);

    let (_, popular) = app.call("GET", "/popular", None).await;
    assert_eq!(popular["popular"], json!([{ "minutes": 5, "count": 1 }]));

    let (_, status_body) = app.call("GET", "/status", None).await;
    assert_eq!(
        status_body["alarm_armed_for"],
        serde_json::to_value(at(T0_MS + 300_000)).unwrap()
    );
    assert_eq!(status_body["last_action"], "start 5m");
}

#[tokio::test]
async fn bad_requests_map_to_client_errors() {
    let app = TestApp::new();

    let (status, body) = app.start(0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = app.call("POST", "/timer/pause", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call("DELETE", "/timer", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call("POST", "/timer/resume", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn pause_resume_and_stop_round_trip() {
    let app = TestApp::new();
    app.start(5).await;
    app.clock.advance_ms(60_000);

    let (status, paused) = app.call("POST", "/timer/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["status"], "paused");
    assert_eq!(paused["timer"]["time_left_ms"], 240_000);

    app.clock.advance_ms(120_000);
    let (_, active) = app.call("GET", "/timer", None).await;
    assert_eq!(active["timer"]["time_left_ms"], 240_000);

    let (status, resumed) = app.call("POST", "/timer/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["status"], "running");
    assert_eq!(resumed["timer"]["time_left_ms"], 240_000);

    // Resuming a running timer is refused
    let (status, _) = app.call("POST", "/timer/resume", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stopped) = app.call("DELETE", "/timer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["status"], "idle");

    let (_, active) = app.call("GET", "/timer", None).await;
    assert_eq!(active["timer"], Value::Null);

    let (_, status_body) = app.call("GET", "/status", None).await;
    assert_eq!(status_body["alarm_armed_for"], Value::Null);
}

#[tokio::test]
async fn popular_list_is_ranked_and_forgettable() {
    let app = TestApp::new();
    for minutes in [5, 10, 10, 3, 10, 5] {
        app.start(minutes).await;
    }

    let (_, body) = app.call("GET", "/popular?limit=2", None).await;
    assert_eq!(
        body["popular"],
        json!([{ "minutes": 10, "count": 3 }, { "minutes": 5, "count": 2 }])
    );

    let (status, body) = app.call("DELETE", "/popular/10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["popular"],
        json!([{ "minutes": 5, "count": 2 }, { "minutes": 3, "count": 1 }])
    );

    let (status, _) = app.call("DELETE", "/popular/42", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn display_switches_between_tick_sources() {
    let app = TestApp::new();

    let (status, body) = app.call("POST", "/display/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "mode": "foreground", "lifecycle": "resumed" }));

    // Starting the foreground routine ticks right away
    let (_, countdown) = app.call("GET", "/countdown", None).await;
    assert_eq!(countdown["phase"], "idle");

    app.start(5).await;
    let (_, body) = app.call("POST", "/display/background", None).await;
    assert_eq!(body, json!({ "mode": "background", "lifecycle": "resumed" }));

    let (_, countdown) = app.call("GET", "/countdown", None).await;
    assert_eq!(countdown["phase"], "running");
    assert_eq!(countdown["remaining_ms"], 300_000);

    let (_, body) = app.call("POST", "/display/pause", None).await;
    assert_eq!(body, json!({ "mode": "background", "lifecycle": "paused" }));

    let (_, status_body) = app.call("GET", "/status", None).await;
    assert_eq!(status_body["display"]["lifecycle"], "paused");

    app.state.shutdown();
}

#[tokio::test(start_paused = true)]
async fn expired_timer_rings_until_dismissed() {
    let app = TestApp::new();
    app.start(1).await;

    app.clock.advance_ms(61_000);
    tokio::time::sleep(Duration::from_secs(61)).await;

    let (_, status_body) = app.call("GET", "/status", None).await;
    assert_eq!(status_body["alarm_ringing"], true);
    assert_eq!(status_body["timer"], Value::Null);

    let (status, body) = app.call("POST", "/alarm/dismiss", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Alarm dismissed");

    let (_, status_body) = app.call("GET", "/status", None).await;
    assert_eq!(status_body["alarm_ringing"], false);

    let (_, body) = app.call("POST", "/alarm/dismiss", None).await;
    assert_eq!(body["message"], "Alarm was not ringing");
}

#[tokio::test(start_paused = true)]
async fn paused_timer_never_rings() {
    let app = TestApp::new();
    app.start(1).await;
    app.call("POST", "/timer/pause", None).await;

    app.clock.advance_ms(120_000);
    tokio::time::sleep(Duration::from_secs(120)).await;

    let (_, status_body) = app.call("GET", "/status", None).await;
    assert_eq!(status_body["alarm_ringing"], false);
    assert_eq!(status_body["timer"]["running"], false);
}

#[tokio::test]
async fn restart_restores_the_expiry_alarm() {
    let backend = Arc::new(MemoryStore::new());
    let first = TestApp::on(Arc::clone(&backend));
    first.start(5).await;
    first.state.shutdown();

    let second = TestApp::on(backend);
    assert_eq!(
        second.state.wake.pending_at(&wake_timer::WakeToken::expiry()),
        Some(at(T0_MS + 300_000))
    );

    let (_, active) = second.call("GET", "/timer", None).await;
    assert_eq!(active["status"], "running");
}

#[tokio::test]
async fn corrupt_state_is_fatal_unless_reset() {
    let backend = Arc::new(MemoryStore::new());
    backend.put(KEY_TIMERS, "not json at all").unwrap();
    let clock = Arc::new(ManualClock::at_millis(T0_MS));

    let result = assemble(Arc::clone(&backend), Arc::clone(&clock), &[]);
    assert!(matches!(
        result,
        Err(Error::Store(StoreError::Corrupt { .. }))
    ));

    let state = assemble(Arc::clone(&backend), clock, &["--reset-corrupt-state"]);
    assert!(state.is_ok());
    assert_eq!(
        TimerStore::new(backend).load().unwrap(),
        PersistedState::default()
    );
}

#[tokio::test]
async fn handlers_see_writes_made_behind_their_back() {
    let backend = Arc::new(MemoryStore::new());
    let app = TestApp::on(Arc::clone(&backend));
    app.start(5).await;

    // Another entry point clears the timer directly in the store
    let store = TimerStore::new(backend);
    let cleared = store.load().unwrap().with_active(None);
    store.save(&cleared).unwrap();

    let (_, active) = app.call("GET", "/timer", None).await;
    assert_eq!(active["status"], "idle");
}
