//! Top-level session control.
//!
//! `SessionOrchestrator` owns none of the subsystem states directly. It
//! reacts to their transitions, gates interview start on presence readiness,
//! binds capture submissions to the protocol session, and drives the
//! finalize path exactly once. Side effects the runtime must perform (speak,
//! show a nudge, hand off to review) leave through the `Command` channel.

use crate::Command;
use crate::capture::{
    AudioRecorder, CaptureMode, CaptureState, CaptureTurnController, CapturedUtterance,
    Transcriber, TurnContext,
};
use crate::error::CaptureError;
use crate::protocol::{
    InterviewProtocolSession, ProtocolTransport, SendOutcome, StartRequest, TelemetryReport,
};
use crate::record::{InterviewSetup, SessionRecord, SnapshotStore, Style, unix_millis};
use crate::turn::TurnId;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preparing,
    Starting,
    Running,
    Ending,
}

pub struct SessionOrchestrator<P, R, T, S> {
    phase: Phase,
    setup: InterviewSetup,
    presence_enabled: bool,
    presence_ready: bool,
    // One-shot latch; there is no preemption, so a bool suffices.
    finalizing: bool,
    awaiting_closing_speech: bool,
    question_delivered_at: Option<Instant>,
    protocol: InterviewProtocolSession<P>,
    capture: CaptureTurnController<R, T>,
    store: S,
    commands: mpsc::Sender<Command>,
}

impl<P, R, T, S> SessionOrchestrator<P, R, T, S>
where
    P: ProtocolTransport,
    R: AudioRecorder,
    T: Transcriber,
    S: SnapshotStore,
{
    pub fn new(
        setup: InterviewSetup,
        protocol: InterviewProtocolSession<P>,
        mut capture: CaptureTurnController<R, T>,
        store: S,
        commands: mpsc::Sender<Command>,
    ) -> Self {
        capture.set_auto_listen(setup.auto_listen);
        capture.set_auto_send(setup.auto_send_voice);
        Self {
            phase: Phase::Preparing,
            presence_enabled: setup.presence_enabled,
            presence_ready: false,
            finalizing: false,
            awaiting_closing_speech: false,
            question_delivered_at: None,
            setup,
            protocol,
            capture,
            store,
            commands,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn protocol(&self) -> &InterviewProtocolSession<P> {
        &self.protocol
    }

    pub fn capture(&self) -> &CaptureTurnController<R, T> {
        &self.capture
    }

    pub fn set_auto_listen(&mut self, enabled: bool) {
        self.capture.set_auto_listen(enabled);
    }

    pub fn set_auto_send(&mut self, enabled: bool) {
        self.capture.set_auto_send(enabled);
    }

    /// The presence channel reached `Ready`. Releases a deferred start.
    pub async fn on_presence_ready(&mut self) -> Result<()> {
        self.presence_ready = true;
        if self.phase == Phase::Starting {
            self.start_now().await?;
        }
        Ok(())
    }

    pub fn on_presence_lost(&mut self) {
        self.presence_ready = false;
    }

    /// Explicit start request. With presence enabled and not yet ready, the
    /// actual session start is deferred until the readiness signal; the
    /// protocol session must not even reach `Connecting` before then.
    pub async fn request_start(&mut self) -> Result<()> {
        if self.phase != Phase::Preparing {
            return Ok(());
        }
        self.phase = Phase::Starting;
        if self.presence_enabled && !self.presence_ready {
            tracing::info!("start deferred until presence is ready");
            return Ok(());
        }
        self.start_now().await
    }

    async fn start_now(&mut self) -> Result<()> {
        let request = StartRequest::from_setup(&self.setup);
        if let Err(e) = self.protocol.start(request).await {
            self.phase = Phase::Preparing;
            return Err(e).context("failed to start interview session");
        }
        self.phase = Phase::Running;
        self.deliver_question().await;
        Ok(())
    }

    async fn deliver_question(&mut self) {
        let Some((text, turn)) = self
            .protocol
            .question()
            .map(|q| (q.spoken_text(), q.turn))
        else {
            return;
        };
        self.question_delivered_at = Some(Instant::now());
        self.speak_to_user(text, turn).await;
    }

    /// Routes text to the user prompt and, through the runtime, to the
    /// presence channel. Without a presence renderer there is nothing to
    /// wait for, so completion is reported immediately.
    async fn speak_to_user(&mut self, text: String, turn: TurnId) {
        self.send_command(Command::SpeakText { text, turn }).await;
        if !(self.presence_enabled && self.presence_ready) {
            self.on_speak_finished(turn).await;
        }
    }

    /// An utterance finished rendering (or was skipped). Re-arms capture
    /// when auto-listen is on; during finalize it releases the pending
    /// hand-off instead.
    pub async fn on_speak_finished(&mut self, turn: TurnId) {
        if self.finalizing {
            if self.awaiting_closing_speech {
                self.awaiting_closing_speech = false;
                self.complete_finalize().await;
            }
            return;
        }
        if turn != self.protocol.turn() {
            tracing::debug!("ignoring speak completion for superseded turn {turn}");
            return;
        }
        if self.phase == Phase::Running && self.capture.auto_listen() {
            if let Err(e) = self.start_recording(CaptureMode::Answer) {
                tracing::warn!("auto-listen could not start capture: {e}");
            }
        }
    }

    fn turn_context(&self) -> TurnContext {
        TurnContext {
            protocol_active: self.protocol.is_active(),
            question_live: self.protocol.question().is_some(),
            live_turn: self.protocol.turn(),
        }
    }

    pub fn start_recording(&mut self, mode: CaptureMode) -> Result<bool, CaptureError> {
        let ctx = self.turn_context();
        self.capture.start_recording(mode, ctx)
    }

    /// Stops capture, transcribes, and (when auto-send is on) submits the
    /// transcript against the turn it was recorded for. A transcript whose
    /// turn went stale while transcribing is discarded without a submission.
    pub async fn stop_recording(&mut self) -> Result<()> {
        let utterance = match self.capture.stop_and_transcribe().await {
            Ok(Some(utterance)) => utterance,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e).context("capture failed"),
        };

        if !self.capture.auto_send() {
            self.capture.finish_without_submit();
            self.send_command(Command::TranscriptReady {
                text: utterance.text,
                turn: utterance.turn,
            })
            .await;
            return Ok(());
        }

        self.submit_utterance(utterance).await
    }

    async fn submit_utterance(&mut self, utterance: CapturedUtterance) -> Result<()> {
        self.capture.begin_submit();
        let result = match utterance.mode {
            CaptureMode::Answer => {
                self.protocol
                    .send_answer(&utterance.text, utterance.turn)
                    .await
            }
            CaptureMode::Clarification => {
                self.protocol
                    .send_clarification(&utterance.text, utterance.turn)
                    .await
            }
        };
        self.capture.finish_submit();

        let outcome = result.context("submission failed")?;
        if outcome != SendOutcome::Stale {
            let latency = self.question_delivered_at.map(|at| at.elapsed());
            let report = measure_delivery(&utterance.text, utterance.speech, latency);
            self.protocol.send_telemetry(&report).await;
        }
        self.handle_outcome(outcome).await;
        Ok(())
    }

    /// Submits user-typed text directly against the live turn.
    pub async fn send_draft(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let turn = self.protocol.turn();
        let outcome = self
            .protocol
            .send_answer(text, turn)
            .await
            .context("draft submission failed")?;
        self.handle_outcome(outcome).await;
        Ok(())
    }

    pub async fn send_clarification_draft(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let turn = self.protocol.turn();
        let outcome = self
            .protocol
            .send_clarification(text, turn)
            .await
            .context("clarification submission failed")?;
        self.handle_outcome(outcome).await;
        Ok(())
    }

    async fn handle_outcome(&mut self, outcome: SendOutcome) {
        match outcome {
            // Stale submissions represent races, not failures; nothing to
            // report.
            SendOutcome::Stale => {}
            SendOutcome::NextQuestion => self.deliver_question().await,
            SendOutcome::Clarified => {
                let Some((text, turn)) = self
                    .protocol
                    .last_clarification()
                    .map(|text| (text.to_string(), self.protocol.turn()))
                else {
                    return;
                };
                self.speak_to_user(text, turn).await;
            }
            SendOutcome::Ended => {
                let message = self.protocol.take_ended().and_then(|ended| ended.message);
                self.begin_finalize(message).await;
            }
        }
    }

    pub async fn switch_style(&mut self, style: Style) -> Result<()> {
        self.protocol
            .switch_style(style)
            .await
            .context("style switch failed")
    }

    /// Re-speaks the current question, tagged with the live turn.
    pub async fn replay_question(&mut self) {
        if self.capture.state() != CaptureState::Idle {
            return;
        }
        let Some((text, turn)) = self
            .protocol
            .question()
            .map(|q| (q.spoken_text(), q.turn))
        else {
            return;
        };
        self.speak_to_user(text, turn).await;
    }

    /// Explicit end-session request. Races harmlessly with a server-declared
    /// end: the finalize latch lets whichever lands first run the body.
    pub async fn request_end(&mut self) {
        self.begin_finalize(None).await;
    }

    async fn begin_finalize(&mut self, message: Option<String>) {
        if self.finalizing {
            return;
        }
        self.finalizing = true;
        self.phase = Phase::Ending;

        self.capture.discard();
        self.capture.set_auto_listen(false);

        match message.filter(|m| !m.trim().is_empty()) {
            Some(message) => {
                let turn = self.protocol.turn();
                self.awaiting_closing_speech = true;
                self.speak_to_user(message, turn).await;
            }
            None => self.complete_finalize().await,
        }
    }

    async fn complete_finalize(&mut self) {
        let session_id = self.protocol.session_id().map(str::to_string);
        let record_saved = match &session_id {
            Some(session_id) => {
                let record = SessionRecord {
                    session_id: session_id.clone(),
                    style: self.protocol.style(),
                    group: self.protocol.group(),
                    messages: self.protocol.messages().to_vec(),
                    tips: self.protocol.tips().to_vec(),
                    saved_at: unix_millis(),
                };
                match self.store.save_record(&record) {
                    Ok(()) => true,
                    Err(e) => {
                        // Best-effort: losing the snapshot must not strand
                        // the user on the interview screen.
                        tracing::error!("failed to persist session record: {e}");
                        false
                    }
                }
            }
            None => false,
        };

        self.protocol.stop();
        self.send_command(Command::SessionComplete {
            session_id,
            record_saved,
        })
        .await;
    }

    async fn send_command(&mut self, command: Command) {
        if self.commands.send(command).await.is_err() {
            tracing::warn!("command dropped: runtime channel closed");
        }
    }
}

const FILLER_WORDS: [&str; 4] = ["um", "uh", "erm", "hmm"];

fn measure_delivery(
    text: &str,
    speech: Duration,
    latency: Option<Duration>,
) -> TelemetryReport {
    let words: Vec<&str> = text.split_whitespace().collect();
    let filler_count = words
        .iter()
        .filter(|w| {
            let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            FILLER_WORDS.contains(&w.as_str())
        })
        .count() as u32;
    let speaking_rate_wpm = if speech > Duration::ZERO && !words.is_empty() {
        Some((words.len() as f64 / speech.as_secs_f64() * 60.0).round() as u32)
    } else {
        None
    };
    TelemetryReport {
        speaking_rate_wpm,
        pause_ratio: None,
        filler_count,
        reply_latency_ms: latency.map(|d| d.as_millis() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{AudioClip, MockAudioRecorder, MockTranscriber, NudgeConfig};
    use crate::error::{PersistenceError, ProtocolError};
    use crate::protocol::{ExchangeReply, MockProtocolTransport, Question, SessionOpened};
    use crate::record::MockSnapshotStore;

    fn question(text: &str, turn: u64) -> Question {
        Question {
            text: text.to_string(),
            preface: None,
            turn: TurnId(turn),
        }
    }

    fn opening_transport() -> MockProtocolTransport {
        let mut transport = MockProtocolTransport::new();
        transport.expect_create_session().returning(|_| {
            Ok(SessionOpened {
                session_id: "sess-9".to_string(),
                question: question("First question?", 0),
            })
        });
        transport.expect_send_telemetry().returning(|_, _| Ok(()));
        transport
    }

    fn quiet_setup() -> InterviewSetup {
        InterviewSetup {
            consent: true,
            auto_listen: false,
            auto_send_voice: true,
            nudges_enabled: false,
            ..InterviewSetup::default()
        }
    }

    struct Harness {
        orchestrator: SessionOrchestrator<
            MockProtocolTransport,
            MockAudioRecorder,
            MockTranscriber,
            MockSnapshotStore,
        >,
        commands: mpsc::Receiver<Command>,
    }

    fn harness(
        setup: InterviewSetup,
        transport: MockProtocolTransport,
        recorder: MockAudioRecorder,
        transcriber: MockTranscriber,
        store: MockSnapshotStore,
    ) -> Harness {
        let (tx, rx) = mpsc::channel(32);
        let protocol = InterviewProtocolSession::new(transport);
        let capture = CaptureTurnController::new(
            recorder,
            transcriber,
            NudgeConfig {
                enabled: setup.nudges_enabled,
                ..NudgeConfig::default()
            },
            tx.clone(),
        );
        Harness {
            orchestrator: SessionOrchestrator::new(setup, protocol, capture, store, tx),
            commands: rx,
        }
    }

    fn drain(commands: &mut mpsc::Receiver<Command>) -> Vec<Command> {
        let mut out = Vec::new();
        while let Ok(command) = commands.try_recv() {
            out.push(command);
        }
        out
    }

    #[tokio::test]
    async fn start_waits_for_presence_when_enabled() {
        let mut transport = MockProtocolTransport::new();
        transport.expect_create_session().never();
        let setup = InterviewSetup {
            presence_enabled: true,
            ..quiet_setup()
        };
        let mut h = harness(
            setup,
            transport,
            MockAudioRecorder::new(),
            MockTranscriber::new(),
            MockSnapshotStore::new(),
        );

        h.orchestrator.request_start().await.unwrap();
        assert_eq!(h.orchestrator.phase(), Phase::Starting);
        // The protocol session never advanced to connecting; the mock's
        // never() expectation verifies no create call happened.
        assert!(!h.orchestrator.protocol().is_active());
    }

    #[tokio::test]
    async fn presence_ready_releases_the_deferred_start() {
        let setup = InterviewSetup {
            presence_enabled: true,
            ..quiet_setup()
        };
        let mut h = harness(
            setup,
            opening_transport(),
            MockAudioRecorder::new(),
            MockTranscriber::new(),
            MockSnapshotStore::new(),
        );

        h.orchestrator.request_start().await.unwrap();
        assert_eq!(h.orchestrator.phase(), Phase::Starting);

        h.orchestrator.on_presence_ready().await.unwrap();
        assert_eq!(h.orchestrator.phase(), Phase::Running);

        let commands = drain(&mut h.commands);
        assert!(matches!(
            commands.as_slice(),
            [Command::SpeakText { turn: TurnId(0), .. }]
        ));
    }

    #[tokio::test]
    async fn presence_disabled_starts_immediately_and_auto_listen_arms_capture() {
        let mut recorder = MockAudioRecorder::new();
        recorder.expect_start().times(1).returning(|| Ok(()));
        let setup = InterviewSetup {
            auto_listen: true,
            ..quiet_setup()
        };
        let mut h = harness(
            setup,
            opening_transport(),
            recorder,
            MockTranscriber::new(),
            MockSnapshotStore::new(),
        );

        h.orchestrator.request_start().await.unwrap();
        assert_eq!(h.orchestrator.phase(), Phase::Running);
        assert_eq!(h.orchestrator.capture().state(), CaptureState::Recording);
    }

    #[tokio::test]
    async fn voice_answer_submits_against_the_captured_turn() {
        let mut transport = opening_transport();
        transport
            .expect_send_answer()
            .times(1)
            .withf(|_, turn, text| *turn == TurnId(0) && text == "spoken answer")
            .returning(|_, _, _| {
                Ok(ExchangeReply::Question {
                    question: question("Second question?", 1),
                    tip: None,
                })
            });
        let mut recorder = MockAudioRecorder::new();
        recorder.expect_start().times(1).returning(|| Ok(()));
        recorder.expect_stop().times(1).returning(|| {
            Ok(AudioClip {
                samples: vec![0.0; 32_000],
                sample_rate: 16_000,
            })
        });
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Ok("spoken answer".to_string()));

        let mut h = harness(
            quiet_setup(),
            transport,
            recorder,
            transcriber,
            MockSnapshotStore::new(),
        );
        h.orchestrator.request_start().await.unwrap();

        assert!(h.orchestrator.start_recording(CaptureMode::Answer).unwrap());
        h.orchestrator.stop_recording().await.unwrap();

        assert_eq!(h.orchestrator.protocol().turn(), TurnId(1));
        assert_eq!(h.orchestrator.capture().state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn transcript_resolving_after_turn_advance_is_discarded() {
        let mut transport = opening_transport();
        // The clarification draft advances the server to turn 1 while the
        // recording tagged turn 0 is still open.
        transport
            .expect_send_clarification()
            .times(1)
            .returning(|_, _, _| {
                Ok(ExchangeReply::Question {
                    question: question("Fresh question", 1),
                    tip: None,
                })
            });
        transport.expect_send_answer().never();

        let mut recorder = MockAudioRecorder::new();
        recorder.expect_start().times(1).returning(|| Ok(()));
        recorder.expect_stop().times(1).returning(|| {
            Ok(AudioClip {
                samples: vec![0.0; 16_000],
                sample_rate: 16_000,
            })
        });
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Ok("late transcript".to_string()));

        let mut h = harness(
            quiet_setup(),
            transport,
            recorder,
            transcriber,
            MockSnapshotStore::new(),
        );
        h.orchestrator.request_start().await.unwrap();
        assert!(h.orchestrator.start_recording(CaptureMode::Answer).unwrap());

        h.orchestrator
            .send_clarification_draft("what do you mean?")
            .await
            .unwrap();
        assert_eq!(h.orchestrator.protocol().turn(), TurnId(1));

        // The transcript comes back tagged with turn 0 and is dropped; the
        // never() expectation on send_answer proves no submission happened.
        h.orchestrator.stop_recording().await.unwrap();
        assert_eq!(h.orchestrator.capture().state(), CaptureState::Idle);
        let transcript: Vec<&str> = h
            .orchestrator
            .protocol()
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert!(!transcript.contains(&"late transcript"));
    }

    #[tokio::test]
    async fn auto_send_disabled_hands_transcript_to_the_ui() {
        let mut transport = opening_transport();
        transport.expect_send_answer().never();
        let mut recorder = MockAudioRecorder::new();
        recorder.expect_start().times(1).returning(|| Ok(()));
        recorder.expect_stop().times(1).returning(|| {
            Ok(AudioClip {
                samples: vec![0.0; 16_000],
                sample_rate: 16_000,
            })
        });
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Ok("draft text".to_string()));

        let setup = InterviewSetup {
            auto_send_voice: false,
            ..quiet_setup()
        };
        let mut h = harness(
            setup,
            transport,
            recorder,
            transcriber,
            MockSnapshotStore::new(),
        );
        h.orchestrator.request_start().await.unwrap();
        h.orchestrator.start_recording(CaptureMode::Answer).unwrap();
        h.orchestrator.stop_recording().await.unwrap();

        let commands = drain(&mut h.commands);
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::TranscriptReady { text, .. } if text == "draft text"
        )));
        assert_eq!(h.orchestrator.capture().state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn server_declared_end_finalizes_exactly_once() {
        let mut transport = opening_transport();
        transport.expect_send_answer().times(1).returning(|_, _, _| {
            Ok(ExchangeReply::Ended {
                message: Some("Thanks for your time".to_string()),
            })
        });
        let mut store = MockSnapshotStore::new();
        store
            .expect_save_record()
            .times(1)
            .withf(|record| record.session_id == "sess-9" && !record.messages.is_empty())
            .returning(|_| Ok(()));

        let mut h = harness(
            quiet_setup(),
            transport,
            MockAudioRecorder::new(),
            MockTranscriber::new(),
            store,
        );
        h.orchestrator.request_start().await.unwrap();
        h.orchestrator.send_draft("closing answer").await.unwrap();

        // Auto-listen is disabled and a racing explicit end is absorbed by
        // the latch.
        assert!(!h.orchestrator.capture().auto_listen());
        h.orchestrator.request_end().await;

        let commands = drain(&mut h.commands);
        let completions: Vec<_> = commands
            .iter()
            .filter(|c| matches!(c, Command::SessionComplete { .. }))
            .collect();
        assert_eq!(completions.len(), 1);
        assert!(matches!(
            completions[0],
            Command::SessionComplete { session_id: Some(id), record_saved: true }
                if id.as_str() == "sess-9"
        ));
        // The closing message was shown before the hand-off.
        assert!(commands.iter().any(
            |c| matches!(c, Command::SpeakText { text, .. } if text == "Thanks for your time")
        ));
        assert_eq!(h.orchestrator.phase(), Phase::Ending);
    }

    #[tokio::test]
    async fn explicit_end_twice_persists_once() {
        let mut store = MockSnapshotStore::new();
        store.expect_save_record().times(1).returning(|_| Ok(()));

        let mut h = harness(
            quiet_setup(),
            opening_transport(),
            MockAudioRecorder::new(),
            MockTranscriber::new(),
            store,
        );
        h.orchestrator.request_start().await.unwrap();

        h.orchestrator.request_end().await;
        h.orchestrator.request_end().await;

        let commands = drain(&mut h.commands);
        let completions = commands
            .iter()
            .filter(|c| matches!(c, Command::SessionComplete { .. }))
            .count();
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn persistence_failure_still_ends_the_session() {
        let mut store = MockSnapshotStore::new();
        store.expect_save_record().times(1).returning(|_| {
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        });

        let mut h = harness(
            quiet_setup(),
            opening_transport(),
            MockAudioRecorder::new(),
            MockTranscriber::new(),
            store,
        );
        h.orchestrator.request_start().await.unwrap();
        h.orchestrator.request_end().await;

        let commands = drain(&mut h.commands);
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SessionComplete { record_saved: false, .. }
        )));
        assert!(!h.orchestrator.protocol().is_active());
    }

    #[tokio::test]
    async fn protocol_failure_during_start_returns_to_preparing() {
        let mut transport = MockProtocolTransport::new();
        transport.expect_create_session().times(1).returning(|_| {
            Err(ProtocolError::Rejected {
                message: "500: boom".to_string(),
            })
        });
        let mut h = harness(
            quiet_setup(),
            transport,
            MockAudioRecorder::new(),
            MockTranscriber::new(),
            MockSnapshotStore::new(),
        );

        assert!(h.orchestrator.request_start().await.is_err());
        assert_eq!(h.orchestrator.phase(), Phase::Preparing);
    }

    #[test]
    fn delivery_metrics_count_fillers_and_rate() {
        let report = measure_delivery(
            "um I think uh the answer is twelve",
            Duration::from_secs(4),
            Some(Duration::from_millis(900)),
        );
        assert_eq!(report.filler_count, 2);
        assert_eq!(report.speaking_rate_wpm, Some(120));
        assert_eq!(report.reply_latency_ms, Some(900));
    }

    #[test]
    fn delivery_metrics_handle_empty_speech() {
        let report = measure_delivery("", Duration::ZERO, None);
        assert_eq!(report.speaking_rate_wpm, None);
        assert_eq!(report.filler_count, 0);
    }
}
