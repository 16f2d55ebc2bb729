//! The local recording / transcription / submission turn cycle.
//!
//! `CaptureTurnController` owns `CaptureState`. Mutual exclusion is purely
//! structural: every operation gates on the current state enum, so a late
//! callback can never double-start the device or submit twice. Each recording
//! is tagged with the `TurnId` it was started for; the orchestrator compares
//! that tag against the live turn before submitting.

use crate::Command;
use crate::error::CaptureError;
use crate::turn::TurnId;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Transcribing,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Answer,
    Clarification,
}

/// Raw audio handed from the recorder to the transcriber.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// The capture device, reduced to start/stop. One owner, never shared.
#[cfg_attr(test, automock)]
pub trait AudioRecorder {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn stop(&mut self) -> Result<AudioClip, CaptureError>;
}

/// External speech-to-text collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, CaptureError>;
}

/// Idle-nudge behavior, from the user's setup.
#[derive(Debug, Clone)]
pub struct NudgeConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub sound: bool,
    pub haptics: bool,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(12),
            sound: false,
            haptics: false,
        }
    }
}

/// What the orchestrator knows about the live turn when capture starts.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    pub protocol_active: bool,
    pub question_live: bool,
    pub live_turn: TurnId,
}

/// A finished transcription, tagged with the turn it was recorded for.
#[derive(Debug, Clone)]
pub struct CapturedUtterance {
    pub text: String,
    pub turn: TurnId,
    pub mode: CaptureMode,
    pub speech: Duration,
}

pub struct CaptureTurnController<R, T> {
    recorder: R,
    transcriber: T,
    state: CaptureState,
    mode: CaptureMode,
    captured_turn: TurnId,
    auto_listen: bool,
    auto_send: bool,
    nudges: NudgeConfig,
    nudge_cancel: Option<Arc<Notify>>,
    commands: mpsc::Sender<Command>,
    last_error: Option<String>,
}

impl<R: AudioRecorder, T: Transcriber> CaptureTurnController<R, T> {
    pub fn new(
        recorder: R,
        transcriber: T,
        nudges: NudgeConfig,
        commands: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            state: CaptureState::Idle,
            mode: CaptureMode::Answer,
            captured_turn: TurnId::default(),
            auto_listen: true,
            auto_send: true,
            nudges,
            nudge_cancel: None,
            commands,
            last_error: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn auto_listen(&self) -> bool {
        self.auto_listen
    }

    pub fn set_auto_listen(&mut self, enabled: bool) {
        self.auto_listen = enabled;
    }

    pub fn auto_send(&self) -> bool {
        self.auto_send
    }

    pub fn set_auto_send(&mut self, enabled: bool) {
        self.auto_send = enabled;
    }

    /// Transient capture/transcription error to surface, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Begins a recording tagged with the live turn. No-op (returns `false`)
    /// unless the protocol is active, capture is idle, and, for answers, a
    /// question is currently live. Device failures surface as errors and
    /// leave the state at `Idle`; they are never retried silently.
    pub fn start_recording(
        &mut self,
        mode: CaptureMode,
        ctx: TurnContext,
    ) -> Result<bool, CaptureError> {
        if !ctx.protocol_active || self.state != CaptureState::Idle {
            return Ok(false);
        }
        if mode == CaptureMode::Answer && !ctx.question_live {
            return Ok(false);
        }

        if let Err(e) = self.recorder.start() {
            self.last_error = Some(e.to_string());
            return Err(e);
        }

        self.state = CaptureState::Recording;
        self.mode = mode;
        self.captured_turn = ctx.live_turn;
        self.last_error = None;
        self.arm_nudge();
        Ok(true)
    }

    /// Stops the device and transcribes the clip. Returns the tagged
    /// utterance and leaves the state at `Transcribing`; the caller decides
    /// between [`Self::begin_submit`] and [`Self::finish_without_submit`].
    /// On failure the state returns to `Idle` with an error signal set.
    pub async fn stop_and_transcribe(
        &mut self,
    ) -> Result<Option<CapturedUtterance>, CaptureError> {
        if self.state != CaptureState::Recording {
            return Ok(None);
        }
        self.clear_nudge();
        self.state = CaptureState::Transcribing;

        let clip = match self.recorder.stop() {
            Ok(clip) => clip,
            Err(e) => {
                self.state = CaptureState::Idle;
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };
        let speech = clip.duration();

        match self.transcriber.transcribe(clip).await {
            Ok(text) => Ok(Some(CapturedUtterance {
                text,
                turn: self.captured_turn,
                mode: self.mode,
                speech,
            })),
            Err(e) => {
                self.state = CaptureState::Idle;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Marks the transcript as in flight to the server.
    pub fn begin_submit(&mut self) {
        if self.state == CaptureState::Transcribing {
            self.state = CaptureState::Submitting;
        }
    }

    /// Returns to idle after server acknowledgment (or a discarded stale
    /// submission).
    pub fn finish_submit(&mut self) {
        if self.state == CaptureState::Submitting {
            self.state = CaptureState::Idle;
        }
    }

    /// Returns to idle without submitting, leaving the transcript to the
    /// caller (auto-send disabled).
    pub fn finish_without_submit(&mut self) {
        if self.state == CaptureState::Transcribing {
            self.state = CaptureState::Idle;
        }
    }

    /// Abandons whatever is in flight. Used on finalize.
    pub fn discard(&mut self) {
        self.clear_nudge();
        if self.state == CaptureState::Recording {
            if let Err(e) = self.recorder.stop() {
                tracing::debug!("recorder stop on discard failed: {e}");
            }
        }
        self.state = CaptureState::Idle;
    }

    // One-shot advisory timer. The task either fires once or is cancelled by
    // the next state transition; it can never fire twice for one recording.
    fn arm_nudge(&mut self) {
        if !self.nudges.enabled {
            return;
        }
        let cancel = Arc::new(Notify::new());
        self.nudge_cancel = Some(cancel.clone());

        let commands = self.commands.clone();
        let interval = self.nudges.interval;
        let sound = self.nudges.sound;
        let haptics = self.nudges.haptics;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let nudge = Command::Nudge {
                        message: "Take your time — stop the recording whenever you're ready."
                            .to_string(),
                        sound,
                        haptics,
                    };
                    if commands.send(nudge).await.is_err() {
                        tracing::debug!("nudge dropped: command channel closed");
                    }
                }
                _ = cancel.notified() => {}
            }
        });
    }

    fn clear_nudge(&mut self) {
        if let Some(cancel) = self.nudge_cancel.take() {
            // notify_one stores a permit, so cancellation lands even if the
            // timer task has not been polled yet.
            cancel.notify_one();
        }
    }
}
