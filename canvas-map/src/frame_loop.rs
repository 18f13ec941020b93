//! FPS-paced frame loop.
//!
//! Hosts that have no animation-frame callback of their own (headless rendering, texture
//! export into another UI toolkit) can use [`FrameLoop`] to drive a [`FrameScheduler`].
//! The loop runs as a tokio local task and handles:
//! - timing control for a consistent frame rate
//! - start / stop / pause / resume
//! - frame statistics

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

use crate::frame_clock::FrameScheduler;

const MAX_FPS: u32 = 240;

/// Commands that can be sent to the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCommand {
    /// Start delivering frames
    Start,
    /// Stop the loop and end its task
    Stop,
    /// Stop delivering frames but keep the loop alive
    Pause,
    /// Continue delivering frames after a pause
    Resume,
    /// Change the frame rate
    SetFps(u32),
    /// Deliver one frame immediately
    RequestFrame,
}

/// Current state of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not started yet, or stopped for good
    Stopped,
    /// Delivering frames
    Running,
    /// Alive but not delivering frames
    Paused,
}

/// Error types for frame loop operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameLoopError {
    /// The loop is stopped
    #[error("Frame loop is not running")]
    NotRunning,
    /// FPS is zero or above the supported maximum
    #[error("Invalid FPS value: {0}")]
    InvalidFps(u32),
    /// The loop task has already exited
    #[error("Channel send error: {0}")]
    ChannelSendError(String),
}

/// Configuration of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLoopConfig {
    /// Frames per second (default: 60)
    pub fps: u32,
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

/// Statistics about frame loop performance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Frames per second being achieved, from the average frame interval
    pub actual_fps: f64,
    /// Target frames per second
    pub target_fps: u32,
    /// Average time spent in frame callbacks, milliseconds
    pub avg_frame_time_ms: f64,
    /// Number of frames delivered
    pub frame_count: u64,
    /// Number of frames that arrived later than one and a half frame intervals
    pub dropped_frames: u64,
}

impl FrameStats {
    const SMOOTHING: f64 = 0.1;

    /// Creates empty statistics.
    pub fn new(target_fps: u32) -> Self {
        Self {
            actual_fps: 0.0,
            target_fps,
            avg_frame_time_ms: 0.0,
            frame_count: 0,
            dropped_frames: 0,
        }
    }

    fn record(&mut self, delta_time: f64, callback_time: Duration) {
        let callback_ms = callback_time.as_secs_f64() * 1000.0;
        if self.frame_count == 0 {
            self.avg_frame_time_ms = callback_ms;
        } else {
            self.avg_frame_time_ms += (callback_ms - self.avg_frame_time_ms) * Self::SMOOTHING;
        }

        if delta_time > 0.0 {
            let fps = 1.0 / delta_time;
            self.actual_fps = if self.actual_fps == 0.0 {
                fps
            } else {
                self.actual_fps + (fps - self.actual_fps) * Self::SMOOTHING
            };

            if self.target_fps > 0 && delta_time > 1.5 / self.target_fps as f64 {
                self.dropped_frames += 1;
            }
        }

        self.frame_count += 1;
    }
}

/// Frame loop delivering ticks to a [`FrameScheduler`] at a configurable rate.
///
/// The loop task is spawned with [`tokio::task::spawn_local`], so the loop must be created
/// from inside a [`tokio::task::LocalSet`]. Dropping the loop stops it.
pub struct FrameLoop {
    command_sender: mpsc::UnboundedSender<FrameCommand>,
    state: Arc<Mutex<LoopState>>,
    config: Arc<Mutex<FrameLoopConfig>>,
    stats: Arc<Mutex<FrameStats>>,
    task: JoinHandle<()>,
}

impl FrameLoop {
    /// Spawns a loop driving `scheduler`.
    ///
    /// The loop starts in a stopped state and must be explicitly started using
    /// [`FrameLoop::start`].
    pub fn spawn_local(scheduler: FrameScheduler, config: FrameLoopConfig) -> Self {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(LoopState::Stopped));
        let stats = Arc::new(Mutex::new(FrameStats::new(config.fps)));
        let config = Arc::new(Mutex::new(config));

        let task = tokio::task::spawn_local(Self::frame_task(
            command_receiver,
            scheduler,
            state.clone(),
            config.clone(),
            stats.clone(),
        ));

        Self {
            command_sender,
            state,
            config,
            stats,
            task,
        }
    }

    /// Starts delivering frames.
    pub fn start(&self) -> Result<(), FrameLoopError> {
        self.send_command(FrameCommand::Start)
    }

    /// Stops the loop. The loop cannot be restarted.
    pub fn stop(&self) -> Result<(), FrameLoopError> {
        self.send_command(FrameCommand::Stop)
    }

    /// Pauses frame delivery.
    pub fn pause(&self) -> Result<(), FrameLoopError> {
        self.send_command(FrameCommand::Pause)
    }

    /// Resumes frame delivery after a pause.
    pub fn resume(&self) -> Result<(), FrameLoopError> {
        self.send_command(FrameCommand::Resume)
    }

    /// Sets the target FPS.
    pub fn set_fps(&self, fps: u32) -> Result<(), FrameLoopError> {
        if fps == 0 || fps > MAX_FPS {
            return Err(FrameLoopError::InvalidFps(fps));
        }
        self.send_command(FrameCommand::SetFps(fps))
    }

    /// Requests a single frame to be delivered immediately.
    pub fn request_frame(&self) -> Result<(), FrameLoopError> {
        if self.state() == LoopState::Stopped {
            return Err(FrameLoopError::NotRunning);
        }
        self.send_command(FrameCommand::RequestFrame)
    }

    /// Current state of the loop.
    ///
    /// The state changes when the loop task handles a command, not when the command is sent.
    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    /// Current configuration.
    pub fn config(&self) -> FrameLoopConfig {
        *self.config.lock()
    }

    /// Frame statistics so far.
    pub fn stats(&self) -> FrameStats {
        *self.stats.lock()
    }

    /// Returns true once the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn send_command(&self, command: FrameCommand) -> Result<(), FrameLoopError> {
        self.command_sender
            .send(command)
            .map_err(|e| FrameLoopError::ChannelSendError(e.to_string()))
    }

    async fn frame_task(
        mut command_receiver: mpsc::UnboundedReceiver<FrameCommand>,
        scheduler: FrameScheduler,
        state: Arc<Mutex<LoopState>>,
        config: Arc<Mutex<FrameLoopConfig>>,
        stats: Arc<Mutex<FrameStats>>,
    ) {
        let mut interval_timer = frame_interval(config.lock().fps);
        let mut last_frame: Option<Instant> = None;

        loop {
            tokio::select! {
                // Commands first, so a frame never runs ahead of a queued state change
                biased;

                command = command_receiver.recv() => {
                    match command {
                        Some(FrameCommand::Start) => {
                            *state.lock() = LoopState::Running;
                            last_frame = Some(Instant::now());
                            log::info!("Frame loop started");
                        }
                        Some(FrameCommand::Resume) => {
                            *state.lock() = LoopState::Running;
                            last_frame = Some(Instant::now());
                            log::info!("Frame loop resumed");
                        }
                        Some(FrameCommand::Pause) => {
                            *state.lock() = LoopState::Paused;
                            last_frame = None;
                            log::info!("Frame loop paused");
                        }
                        Some(FrameCommand::SetFps(fps)) => {
                            interval_timer = frame_interval(fps);
                            config.lock().fps = fps;
                            stats.lock().target_fps = fps;
                            log::info!("Frame loop FPS changed to {fps}");
                        }
                        Some(FrameCommand::RequestFrame) => {
                            let current_state = *state.lock();
                            match current_state {
                                LoopState::Running => {
                                    deliver_frame(&scheduler, &mut last_frame, &stats);
                                }
                                // Paused time never reaches the scheduler
                                LoopState::Paused => deliver_frame(&scheduler, &mut None, &stats),
                                LoopState::Stopped => {}
                            }
                        }
                        Some(FrameCommand::Stop) | None => {
                            *state.lock() = LoopState::Stopped;
                            break;
                        }
                    }
                }

                _ = interval_timer.tick() => {
                    if *state.lock() == LoopState::Running {
                        deliver_frame(&scheduler, &mut last_frame, &stats);
                    }
                }
            }
        }

        log::info!("Frame loop task exited");
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        // Ensure the loop task ends with its handle
        let _ = self.send_command(FrameCommand::Stop);
    }
}

fn frame_interval(fps: u32) -> Interval {
    let mut timer = interval(Duration::from_secs_f64(1.0 / fps.max(1) as f64));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

fn deliver_frame(
    scheduler: &FrameScheduler,
    last_frame: &mut Option<Instant>,
    stats: &Mutex<FrameStats>,
) {
    let now = Instant::now();
    let delta_time = last_frame
        .map(|last| now.duration_since(last).as_secs_f64())
        .unwrap_or(0.0);
    *last_frame = Some(now);

    let started = web_time::Instant::now();
    scheduler.tick(delta_time);
    stats.lock().record(delta_time, started.elapsed());
}
