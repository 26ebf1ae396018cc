//! HTTP endpoint handlers
//!
//! Every handler that reads or writes timer state first reloads it from the
//! store, since the alarm entry point or another process may have written it.
//! Store access runs on the blocking pool.

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use tokio::task;
use tracing::{error, info};

use crate::{
    error::Error,
    state::AppState,
    wake::WakeToken,
};
use super::responses::{
    ApiError, DisplayResponse, HealthResponse, PopularQuery, PopularResponse, StartTimerRequest,
    StatusResponse, TimerResponse,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn log_failure(action: &str, e: Error) -> ApiError {
    if e.is_precondition() {
        info!("Rejected {}: {}", action, e);
    } else {
        error!("Failed to {}: {}", action, e);
    }
    ApiError(e)
}

/// Run `work` on the blocking pool, since it touches the durable store
async fn run_blocking<T, F>(state: &Arc<AppState>, action: &'static str, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> crate::error::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| Error::IllegalState(format!("{} task failed: {}", action, e)))
        .and_then(|result| result)
        .map_err(|e| log_failure(action, e))
}

/// Handle POST /timers - Start a new timer of the given minutes
pub async fn start_new_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartTimerRequest>,
) -> ApiResult<TimerResponse> {
    let minutes = request.minutes;
    let timer = run_blocking(&state, "start timer", move |state| {
        state.refreshed_manager()?.start_new_timer(minutes)
    })
    .await?;

    state.record_action(&format!("start {}m", minutes));
    Ok(Json(TimerResponse::new(
        format!("Started {} minute timer", minutes),
        Some(timer),
        state.clock.now(),
    )))
}

/// Handle GET /timer - Return the active timer
pub async fn active_timer_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let timer = run_blocking(&state, "read timer", |state| {
        Ok(state.refreshed_manager()?.active_timer())
    })
    .await?;

    Ok(Json(TimerResponse::new("Active timer", timer, state.clock.now())))
}

/// Handle POST /timer/pause - Pause the active timer
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let timer = run_blocking(&state, "pause timer", |state| {
        state.refreshed_manager()?.pause_active_timer()
    })
    .await?;

    state.record_action("pause");
    Ok(Json(TimerResponse::new("Timer paused", Some(timer), state.clock.now())))
}

/// Handle POST /timer/resume - Resume the paused active timer
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let timer = run_blocking(&state, "resume timer", |state| {
        let mut manager = state.refreshed_manager()?;
        let paused = manager.active_timer().ok_or_else(|| {
            Error::IllegalState("there is no active timer to resume".to_string())
        })?;
        manager.start_timer(paused)
    })
    .await?;

    state.record_action("resume");
    Ok(Json(TimerResponse::new("Timer resumed", Some(timer), state.clock.now())))
}

/// Handle DELETE /timer - Stop the active timer
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    run_blocking(&state, "stop timer", |state| {
        state.refreshed_manager()?.stop_active_timer()
    })
    .await?;

    state.record_action("stop");
    Ok(Json(TimerResponse::new("Timer stopped", None, state.clock.now())))
}

/// Handle GET /popular - Most used durations first
pub async fn popular_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> ApiResult<PopularResponse> {
    let limit = query.limit.unwrap_or(state.popular_limit);
    let ranked = run_blocking(&state, "read popular timers", move |state| {
        Ok(state.refreshed_manager()?.ranked_popular(limit))
    })
    .await?;

    Ok(Json(PopularResponse::from_ranked(ranked)))
}

/// Handle DELETE /popular/:minutes - Forget a duration
pub async fn forget_handler(
    State(state): State<Arc<AppState>>,
    Path(minutes): Path<u32>,
) -> ApiResult<PopularResponse> {
    let ranked = run_blocking(&state, "forget timer", move |state| {
        let mut manager = state.refreshed_manager()?;
        manager.forget_timer(minutes)?;
        Ok(manager.ranked_popular(state.popular_limit))
    })
    .await?;

    state.record_action(&format!("forget {}m", minutes));
    Ok(Json(PopularResponse::from_ranked(ranked)))
}

/// Apply a display transition and report the resulting selection
fn change_display<F>(state: &AppState, action: &str, change: F) -> ApiResult<DisplayResponse>
where
    F: FnOnce(&mut crate::routine::RoutineSwitch) -> crate::error::Result<()>,
{
    let mut display = state.display().map_err(|e| log_failure(action, e))?;
    change(&mut *display).map_err(|e| log_failure(action, e))?;
    let response = DisplayResponse {
        mode: display.mode(),
        lifecycle: display.lifecycle(),
    };
    drop(display);

    state.record_action(action);
    Ok(Json(response))
}

/// Handle POST /display/foreground - Tick from the in-process routine
pub async fn foreground_handler(State(state): State<Arc<AppState>>) -> ApiResult<DisplayResponse> {
    change_display(&state, "display foreground", |display| display.enter_foreground())
}

/// Handle POST /display/background - Tick from the wake-driven routine
pub async fn background_handler(State(state): State<Arc<AppState>>) -> ApiResult<DisplayResponse> {
    change_display(&state, "display background", |display| display.enter_background())
}

/// Handle POST /display/resume - Start ticking
pub async fn display_resume_handler(State(state): State<Arc<AppState>>) -> ApiResult<DisplayResponse> {
    change_display(&state, "display resume", |display| display.resume())
}

/// Handle POST /display/pause - Stop ticking
pub async fn display_pause_handler(State(state): State<Arc<AppState>>) -> ApiResult<DisplayResponse> {
    change_display(&state, "display pause", |display| display.pause())
}

/// Handle GET /countdown - Latest countdown published by the display tick
pub async fn countdown_handler(
    State(state): State<Arc<AppState>>,
) -> Json<crate::state::CountdownState> {
    Json(state.countdown())
}

/// Handle POST /alarm/dismiss - Stop a ringing alarm
pub async fn dismiss_alarm_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let message = if state.alarm.dismiss() {
        "Alarm dismissed"
    } else {
        "Alarm was not ringing"
    };
    state.record_action("dismiss alarm");

    let timer = run_blocking(&state, "read timer", |state| {
        Ok(state.refreshed_manager()?.active_timer())
    })
    .await?;
    Ok(Json(TimerResponse::new(message, timer, state.clock.now())))
}

/// Handle GET /status - Return current timer, display and alarm status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let timer = run_blocking(&state, "read timer", |state| {
        Ok(state.refreshed_manager()?.active_timer())
    })
    .await?;
    let now = state.clock.now();

    let display = {
        let display = state.display().map_err(|e| log_failure("read display", e))?;
        DisplayResponse {
            mode: display.mode(),
            lifecycle: display.lifecycle(),
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: timer.map(|timer| timer.view(now)),
        countdown: state.countdown(),
        display,
        alarm_ringing: state.alarm.is_ringing(now),
        alarm_armed_for: state.wake.pending_at(&WakeToken::expiry()),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
