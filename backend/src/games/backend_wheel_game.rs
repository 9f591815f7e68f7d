use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    debug_handler, Json, Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use shared::animator::{SpinAnimator, SpinObserver, SpinPhase, SpinRequest};
use shared::render::{sector_geometry, SectorGeometry};
use shared::shared_wheel_game::{Celebration, SpinResult, WheelConfig, WheelError};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::AppState;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything pushed to websocket clients.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WheelEvent {
    Frame { rotation: f64, progress: f64, sector: usize },
    Crossed { sector: usize },
    Settled { result: SpinResult },
    Announcement(Announcement),
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Announcement {
    pub result: SpinResult,
    pub message: String,
    pub celebration: Celebration,
}

struct WheelCore {
    animator: SpinAnimator,
    rng: StdRng,
}

/// The one wheel this process serves. Ticks come from a spawned interval
/// task while a spin is in flight.
pub struct WheelRuntime {
    core: Mutex<WheelCore>,
    events: broadcast::Sender<WheelEvent>,
    frame_period: Duration,
    last_announcement: Mutex<Option<Announcement>>,
}

impl WheelRuntime {
    pub fn new(config: WheelConfig, frame_period: Duration) -> Result<Self, WheelError> {
        Self::with_rng(config, frame_period, StdRng::from_entropy())
    }

    pub fn with_rng(config: WheelConfig, frame_period: Duration, rng: StdRng) -> Result<Self, WheelError> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            core: Mutex::new(WheelCore {
                animator: SpinAnimator::new(config)?,
                rng,
            }),
            events,
            frame_period,
            last_announcement: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WheelEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: WheelEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Per-crossing feedback, published as a `Crossed` event.
struct TickFeedback<'a> {
    events: &'a broadcast::Sender<WheelEvent>,
}

impl SpinObserver for TickFeedback<'_> {
    fn on_boundary_crossed(&mut self, sector: usize) {
        debug!("tick: pointer entered sector {}", sector);
        let _ = self.events.send(WheelEvent::Crossed { sector });
    }
}

#[derive(Debug, Serialize)]
pub struct SpinResponse {
    pub started: bool,
    pub winner_index: Option<usize>,
    pub duration_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct WheelStateResponse {
    pub rotation: f64,
    pub spinning: bool,
    pub phase: SpinPhase,
    pub sector: Option<usize>,
    pub last_announcement: Option<Announcement>,
}

#[derive(Debug, Serialize)]
pub struct LayoutResponse {
    pub rotation: f64,
    pub sectors: Vec<SectorGeometry>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/spin", post(spin_wheel))
        .route("/state", get(get_wheel_state))
        .route("/layout", get(get_wheel_layout))
        .route("/ws", get(ws_handler))
}

/// Picks a winner and starts the animation. A request while a spin is in
/// flight is dropped and reported as `started: false`.
pub async fn start_spin(state: &AppState) -> Result<SpinRequest, Error> {
    let slices = state.slices.get_slices()?;

    let request = {
        let mut core = state.wheel.core.lock().await;
        let WheelCore { animator, rng } = &mut *core;
        animator.spin(&slices, rng)?
    };

    match &request {
        SpinRequest::Started(plan) => {
            info!(
                "🎡 WHEEL SPIN: started, winner is slice {} ({}), {} extra turns",
                plan.winner, slices[plan.winner].label, plan.extra_spins
            );
            tokio::spawn(drive_spin(state.clone()));
        }
        SpinRequest::Ignored => debug!("Spin request ignored, wheel already spinning"),
    }
    Ok(request)
}

async fn drive_spin(state: AppState) {
    let clock = Instant::now();
    let mut interval = tokio::time::interval(state.wheel.frame_period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let now_ms = clock.elapsed().as_secs_f64() * 1000.0;

        let (frame, settle_delay) = {
            let mut core = state.wheel.core.lock().await;
            let mut feedback = TickFeedback { events: &state.wheel.events };
            let frame = core.animator.tick(now_ms, &mut feedback);
            (frame, core.animator.config().settle_delay_ms)
        };

        let Some(frame) = frame else {
            warn!("Spin driver found no spin in flight");
            break;
        };

        state.wheel.publish(WheelEvent::Frame {
            rotation: frame.rotation,
            progress: frame.progress,
            sector: frame.sector,
        });

        if let Some(result) = frame.result {
            info!(
                "🎡 WHEEL SPIN: settled on {} {} (reward {})",
                result.slice.glyph, result.slice.label, result.slice.reward
            );
            tokio::spawn(complete_spin(state.clone(), result, Duration::from_millis(settle_delay)));
            break;
        }
    }
}

/// Completion hook. Runs off the frame loop; every step is best effort.
async fn complete_spin(state: AppState, result: SpinResult, settle_delay: Duration) {
    tokio::time::sleep(settle_delay).await;
    state.wheel.publish(WheelEvent::Settled { result: result.clone() });

    if let Err(e) = state.history.record_result(&result) {
        error!("Failed to record spin in history: {}", e);
    }

    let celebration = Celebration::for_reward(result.slice.reward);
    if celebration.confetti {
        info!("🎉 Confetti for {}", result.slice.label);
    }

    let message = state.congrats.message_for(&result.slice).await;
    let announcement = Announcement {
        result,
        message,
        celebration,
    };

    // Held while publishing so clients see announcements in spin order
    let mut last = state.wheel.last_announcement.lock().await;
    if replace_if_newer(&mut last, &announcement) {
        state.wheel.publish(WheelEvent::Announcement(announcement));
    } else {
        debug!(
            "Dropping announcement for {}, a later spin was already announced",
            announcement.result.slice.label
        );
    }
}

/// Keeps the announcement of the most recent spin. A slow congratulation
/// for an older spin must not replace a newer one.
fn replace_if_newer(slot: &mut Option<Announcement>, announcement: &Announcement) -> bool {
    if let Some(current) = slot.as_ref() {
        if current.result.timestamp > announcement.result.timestamp {
            return false;
        }
    }
    *slot = Some(announcement.clone());
    true
}

#[debug_handler]
async fn spin_wheel(State(state): State<AppState>) -> Result<Json<SpinResponse>, Error> {
    let request = start_spin(&state).await?;
    let duration_ms = state.wheel.core.lock().await.animator.config().spin_duration_ms;

    Ok(Json(match request {
        SpinRequest::Started(plan) => SpinResponse {
            started: true,
            winner_index: Some(plan.winner),
            duration_ms,
        },
        SpinRequest::Ignored => SpinResponse {
            started: false,
            winner_index: None,
            duration_ms,
        },
    }))
}

#[debug_handler]
async fn get_wheel_state(State(state): State<AppState>) -> Result<Json<WheelStateResponse>, Error> {
    let (rotation, phase, sector) = {
        let core = state.wheel.core.lock().await;
        // Sectors of the set that is spinning, same as the frames report
        let slice_count = match core.animator.animation() {
            Some(animation) => animation.slices.len(),
            None => state.slices.get_slices()?.len(),
        };
        (
            core.animator.rotation(),
            core.animator.phase(),
            core.animator.sector_under_pointer(slice_count),
        )
    };
    let last_announcement = state.wheel.last_announcement.lock().await.clone();

    Ok(Json(WheelStateResponse {
        rotation,
        spinning: phase == SpinPhase::Spinning,
        phase,
        sector,
        last_announcement,
    }))
}

#[debug_handler]
async fn get_wheel_layout(State(state): State<AppState>) -> Result<Json<LayoutResponse>, Error> {
    let core = state.wheel.core.lock().await;
    // Draw what is actually spinning, not a config edit made mid-spin
    let slices = match core.animator.animation() {
        Some(animation) => animation.slices.clone(),
        None => state.slices.get_slices()?,
    };
    let rotation = core.animator.rotation();

    Ok(Json(LayoutResponse {
        rotation,
        sectors: sector_geometry(&slices, rotation),
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.wheel.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode wheel event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Websocket client lagged, skipped {} wheel events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        if let Message::Close(_) = message {
            break;
        }
    }
    send_task.abort();
    debug!("Wheel websocket closed");
}
