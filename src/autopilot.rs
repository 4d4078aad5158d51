//! Autopilot sequencer: streams animation commands from the director service
//! and plays them back against the shared avatar with per-command timing.
//!
//! The stream is newline-delimited JSON. Lines arrive in arbitrary chunk
//! boundaries, so a framer buffers partial lines; malformed lines are skipped,
//! an explicit error record aborts the sequence, and a `done` sentinel is
//! consumed without playing. Playback starts on the first queued command and
//! drains concurrently with the rest of the stream.
//!
//! Starting or stopping bumps a generation counter; scheduled continuations
//! and the stream task check it and drop themselves when stale, so a restart
//! can never double-drive the queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::avatar::Avatar;
use crate::config::AvatarConfig;
use crate::error::AvatarError;
use crate::tts::SpeechClient;

/// Ground-plane point, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundPoint {
    pub x: f32,
    pub z: f32,
}

/// One element of the autopilot stream. At most one of `full` or the
/// body/arms/face triple is meaningful per command; `goto`/`comeback` are
/// navigation directives that expand into step commands before playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnimationCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub say: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Nominal playback time in seconds. Speech duration takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    /// Unsupported actions the director asked for, surfaced for UI feedback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goto: Option<GroundPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comeback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

#[derive(Debug, Serialize)]
struct AutopilotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    session_id: String,
    position: GroundPoint,
    rotation: f32,
}

/// Identity of the director backend, display-only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorInfo {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AutopilotStatus {
    #[default]
    Idle,
    Thinking,
    /// Playing, with the short status text shown to the user.
    Playing(String),
    Complete,
    Failed(String),
}

/// Reassembles whole lines from arbitrarily chunked stream bytes. The tail
/// past the last newline is carried over to the next chunk, so both lines
/// and multi-byte characters may split anywhere.
#[derive(Debug, Default)]
pub struct LineFramer {
    leftover: Vec<u8>,
}

impl LineFramer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.leftover.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.leftover.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.leftover.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// Duration of one synthesized navigation step.
const NAV_STEP_SECONDS: f32 = 1.0;

fn step_command(key: &str) -> AnimationCommand {
    AnimationCommand {
        body: Some(key.to_string()),
        duration: Some(NAV_STEP_SECONDS),
        ..AnimationCommand::default()
    }
}

/// Expand a navigation directive into primitive step commands: the committed
/// displacement rounded to whole steps, X axis before Z.
pub fn expand_navigation(
    cmd: &AnimationCommand,
    position: Vec2,
    step_size: f32,
) -> Vec<AnimationCommand> {
    let target = if cmd.comeback.unwrap_or(false) {
        Vec2::ZERO
    } else if let Some(point) = &cmd.goto {
        Vec2::new(point.x, point.z)
    } else {
        return Vec::new();
    };

    let step = step_size.max(f32::EPSILON);
    let delta = target - position;
    let sx = (delta.x / step).round() as i32;
    let sz = (delta.y / step).round() as i32;

    let mut steps = Vec::with_capacity((sx.unsigned_abs() + sz.unsigned_abs()) as usize);
    let x_key = if sx > 0 { "step-right" } else { "step-left" };
    for _ in 0..sx.unsigned_abs() {
        steps.push(step_command(x_key));
    }
    let z_key = if sz > 0 { "step-front" } else { "step-back" };
    for _ in 0..sz.unsigned_abs() {
        steps.push(step_command(z_key));
    }
    steps
}

fn status_text(cmd: &AnimationCommand) -> String {
    if let Some(say) = &cmd.say {
        let short: String = say.chars().take(40).collect();
        if short.len() < say.len() {
            format!("\"{short}...\"")
        } else {
            format!("\"{short}\"")
        }
    } else if let Some(note) = &cmd.note {
        note.clone()
    } else {
        "...".to_string()
    }
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<AnimationCommand>,
    generation: u64,
    running: bool,
    started: bool,
    status: AutopilotStatus,
    missing: Vec<String>,
    stream: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
}

/// Drives the shared avatar from a streamed command sequence. Cloning shares
/// the same underlying sequence state.
#[derive(Clone)]
pub struct Sequencer {
    avatar: Arc<Mutex<Avatar>>,
    inner: Arc<Mutex<Inner>>,
    speech: SpeechClient,
    client: reqwest::Client,
    config: AvatarConfig,
    session_id: String,
}

impl Sequencer {
    pub fn new(avatar: Arc<Mutex<Avatar>>, config: AvatarConfig) -> Self {
        Self {
            avatar,
            inner: Arc::new(Mutex::new(Inner::default())),
            speech: SpeechClient::new(&config),
            client: reqwest::Client::new(),
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn speech_client(&self) -> &SpeechClient {
        &self.speech
    }

    /// Which provider/model drives the director, for display. Callers treat
    /// failure as "unknown".
    pub async fn director_info(&self) -> Result<DirectorInfo, AvatarError> {
        let response = self.client.get(&self.config.config_url).send().await?;
        if !response.status().is_success() {
            return Err(AvatarError::Transport(format!(
                "config query returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    pub async fn status(&self) -> AutopilotStatus {
        self.inner.lock().await.status.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }

    /// Actions the director asked for that no animation implements.
    pub async fn missing_actions(&self) -> Vec<String> {
        self.inner.lock().await.missing.clone()
    }

    /// Begin a new sequence, cancelling any sequence already in flight.
    pub async fn start(&self, prompt: Option<String>) {
        let generation = {
            let mut inner = self.inner.lock().await;
            if let Some(handle) = inner.stream.take() {
                handle.abort();
            }
            if let Some(handle) = inner.timer.take() {
                handle.abort();
            }
            inner.generation += 1;
            inner.queue.clear();
            inner.started = false;
            inner.running = true;
            inner.missing.clear();
            inner.status = AutopilotStatus::Thinking;
            inner.generation
        };

        let request = {
            let mut avatar = self.avatar.lock().await;
            let now = avatar.now();
            avatar.spatial.commit(now);
            AutopilotRequest {
                prompt,
                session_id: self.session_id.clone(),
                position: GroundPoint {
                    x: avatar.spatial.position.x,
                    z: avatar.spatial.position.y,
                },
                rotation: avatar.spatial.heading,
            }
        };

        info!(session = %self.session_id, "autopilot starting");
        let seq = self.clone();
        let handle = tokio::spawn(async move {
            seq.run_stream(generation, request).await;
        });
        let mut inner = self.inner.lock().await;
        if inner.generation == generation {
            inner.stream = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Cancel the sequence: abort the stream and any scheduled continuation,
    /// drop the queue, and reset the avatar per the configured stop policy.
    pub async fn stop(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            if let Some(handle) = inner.stream.take() {
                handle.abort();
            }
            if let Some(handle) = inner.timer.take() {
                handle.abort();
            }
            inner.queue.clear();
            inner.running = false;
            inner.started = false;
            inner.missing.clear();
            inner.status = AutopilotStatus::Idle;
        }
        let mut avatar = self.avatar.lock().await;
        let reset_spatial = avatar.config.reset_spatial_on_stop;
        avatar.reset(reset_spatial);
        info!("autopilot stopped");
    }

    async fn run_stream(self, generation: u64, request: AutopilotRequest) {
        match self.stream_commands(generation, &request).await {
            Ok(()) => {}
            // A newer sequence took over; not a failure, leave its state alone
            Err(AvatarError::Cancelled) => debug!("autopilot stream superseded"),
            Err(err) => {
                let mut inner = self.inner.lock().await;
                if inner.generation == generation {
                    warn!(error = %err, "autopilot stream failed");
                    inner.status = AutopilotStatus::Failed(err.to_string());
                    inner.running = false;
                }
            }
        }
    }

    async fn stream_commands(
        &self,
        generation: u64,
        request: &AutopilotRequest,
    ) -> Result<(), AvatarError> {
        let response = self
            .client
            .post(&self.config.autopilot_url)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AvatarError::Transport(format!(
                "autopilot returned {}",
                response.status()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut framer = LineFramer::default();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            for line in framer.push(&bytes) {
                self.accept_line(generation, &line).await?;
            }
        }
        Ok(())
    }

    /// Parse one stream line and enqueue it. Fails with `Cancelled` once this
    /// sequence has been superseded, which stops the stream read.
    async fn accept_line(&self, generation: u64, line: &str) -> Result<(), AvatarError> {
        let cmd: AnimationCommand = match serde_json::from_str(line) {
            Ok(cmd) => cmd,
            Err(err) => {
                debug!(error = %err, "skipping malformed stream line");
                return Ok(());
            }
        };
        if let Some(message) = &cmd.error {
            return Err(AvatarError::Stream(message.clone()));
        }
        if cmd.done.unwrap_or(false) {
            return Ok(());
        }

        let first = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return Err(AvatarError::Cancelled);
            }
            inner.queue.push_back(cmd);
            !std::mem::replace(&mut inner.started, true)
        };
        if first {
            self.schedule_next(generation, Duration::ZERO).await;
        }
        Ok(())
    }

    /// Drain the queue head. Zero-time entries (missing feedback, navigation)
    /// loop straight to the next entry; playable commands schedule the next
    /// drain after their effective duration.
    ///
    /// Boxed because the future is recursive through `schedule_next`; the
    /// type erasure is what lets the compiler size it.
    fn play_next(self, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            loop {
                let mut cmd = {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation || !inner.running {
                        return;
                    }
                    match inner.queue.pop_front() {
                        Some(cmd) => cmd,
                        None => {
                            inner.running = false;
                            inner.status = AutopilotStatus::Complete;
                            drop(inner);
                            // Natural completion returns the layers to neutral
                            // but leaves the avatar where it stands.
                            self.avatar.lock().await.reset(false);
                            info!("autopilot sequence complete");
                            return;
                        }
                    }
                };

                if let Some(missing) = cmd.missing.take() {
                    warn!(?missing, "director requested unsupported actions");
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        return;
                    }
                    inner.missing = missing;
                    continue;
                }

                if cmd.goto.is_some() || cmd.comeback.unwrap_or(false) {
                    let (position, step_size) = {
                        let mut avatar = self.avatar.lock().await;
                        let now = avatar.now();
                        avatar.spatial.commit(now);
                        (avatar.spatial.position, avatar.config.step_size)
                    };
                    let steps = expand_navigation(&cmd, position, step_size);
                    debug!(count = steps.len(), "navigation expanded");
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        return;
                    }
                    for step in steps.into_iter().rev() {
                        inner.queue.push_front(step);
                    }
                    continue;
                }

                let applied = {
                    let mut avatar = self.avatar.lock().await;
                    let now = avatar.now();
                    avatar.apply_command(&cmd, now)
                };
                {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        return;
                    }
                    if let Err(AvatarError::MissingCapability(keys)) = &applied {
                        warn!(keys = %keys, "command keys have no animation");
                        inner.missing = keys.split(", ").map(str::to_string).collect();
                    }
                    inner.status = AutopilotStatus::Playing(status_text(&cmd));
                }

                let nominal = cmd.duration.unwrap_or(self.config.default_duration) as f64;
                let wait = match &cmd.say {
                    Some(text) => {
                        match self
                            .speech
                            .speak(text, cmd.voice.as_deref(), cmd.emotion.as_deref())
                            .await
                        {
                            Some(speech) => speech.duration,
                            None => nominal,
                        }
                    }
                    None => nominal,
                };

                self.schedule_next(generation, Duration::from_secs_f64(wait.max(0.0)))
                    .await;
                return;
            }
        })
    }

    async fn schedule_next(&self, generation: u64, delay: Duration) {
        let seq = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            seq.play_next(generation).await;
        });
        let mut inner = self.inner.lock().await;
        if inner.generation == generation {
            inner.timer = Some(handle);
        } else {
            handle.abort();
        }
    }
}
