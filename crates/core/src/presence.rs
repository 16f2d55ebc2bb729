//! Lifecycle of the remote avatar presence channel.
//!
//! `PresenceSession` owns `PresenceState` and drives the
//! acquire-credential → open-channel → media-ready → speak → teardown cycle
//! against two collaborator traits, so the orchestration layer never touches
//! the concrete streaming SDK. The runtime pumps channel events through
//! [`PresenceSession::apply`] and routes the returned signals.

use crate::error::{ChannelError, CredentialError, PresenceError};
use crate::turn::TurnId;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Uninitialized,
    Loading,
    Ready,
    Speaking,
    Error,
}

/// Lifecycle events emitted by the streaming channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    MediaReady,
    MediaDisconnected,
    SpeakStarted,
    SpeakEnded,
    UserSpeechStarted,
    UserSpeechStopped,
}

/// Signals the orchestration layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSignal {
    ReadyLost,
    SpeakFinished(TurnId),
    UserSpeaking(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakMode {
    Async,
    Sync,
}

/// Issues a short-lived bearer token for the presence streaming service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn issue(&self) -> Result<String, CredentialError>;
}

/// The streaming channel itself, reduced to the operations this layer uses.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PresenceChannel: Send {
    async fn open(&mut self, token: &str) -> Result<mpsc::Receiver<ChannelEvent>, ChannelError>;
    async fn speak(&mut self, text: &str, mode: SpeakMode) -> Result<(), ChannelError>;
    async fn close(&mut self) -> Result<(), ChannelError>;
}

pub struct PresenceSession<C, T> {
    channel: C,
    tokens: T,
    state: PresenceState,
    stabilization: Duration,
    events: Option<mpsc::Receiver<ChannelEvent>>,
    // Tag of the most recently accepted utterance. A newer speak supersedes
    // the previous tag; completions for superseded turns are dropped by the
    // caller's turn check.
    speaking_turn: Option<TurnId>,
}

impl<C: PresenceChannel, T: TokenProvider> PresenceSession<C, T> {
    pub fn new(channel: C, tokens: T, stabilization: Duration) -> Self {
        Self {
            channel,
            tokens,
            state: PresenceState::Uninitialized,
            stabilization,
            events: None,
            speaking_turn: None,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, PresenceState::Ready | PresenceState::Speaking)
    }

    /// Acquires a credential, opens the channel, and waits for the media
    /// track to come up. Resolving `Ok` is the readiness edge; it fires once
    /// per successful call. Failures leave the session in `Error` and are
    /// retried only by calling `initialize` again.
    pub async fn initialize(&mut self) -> Result<(), PresenceError> {
        if self.is_ready() {
            return Ok(());
        }
        self.state = PresenceState::Loading;

        let token = match self.tokens.issue().await {
            Ok(token) => token,
            Err(e) => {
                self.state = PresenceState::Error;
                return Err(e.into());
            }
        };

        let mut events = match self.channel.open(&token).await {
            Ok(events) => events,
            Err(e) => {
                self.state = PresenceState::Error;
                return Err(e.into());
            }
        };

        loop {
            match events.recv().await {
                Some(ChannelEvent::MediaReady) => break,
                Some(ChannelEvent::MediaDisconnected) | None => {
                    self.state = PresenceState::Error;
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => {
                    tracing::debug!("ignoring channel event before media-ready: {other:?}");
                }
            }
        }

        // The media track reports attached before frames decode reliably;
        // hold readiness back for a configurable settle interval.
        tokio::time::sleep(self.stabilization).await;

        self.events = Some(events);
        self.state = PresenceState::Ready;
        tracing::info!("presence channel ready");
        Ok(())
    }

    /// Hands the channel's event receiver to the runtime pump. The session
    /// keeps mutating its state through [`Self::apply`]; the receiver is
    /// moved out so the pump can await events alongside other work.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ChannelEvent>> {
        self.events.take()
    }

    /// Applies one channel event and returns the signal the caller should
    /// react to, if any.
    pub fn apply(&mut self, event: ChannelEvent) -> Option<PresenceSignal> {
        match event {
            ChannelEvent::MediaReady => None,
            ChannelEvent::MediaDisconnected => {
                tracing::warn!("presence media disconnected");
                self.state = PresenceState::Error;
                self.events = None;
                self.speaking_turn = None;
                Some(PresenceSignal::ReadyLost)
            }
            ChannelEvent::SpeakStarted => {
                if self.state == PresenceState::Ready {
                    self.state = PresenceState::Speaking;
                }
                None
            }
            ChannelEvent::SpeakEnded => {
                if self.state == PresenceState::Speaking {
                    self.state = PresenceState::Ready;
                }
                self.speaking_turn.take().map(PresenceSignal::SpeakFinished)
            }
            ChannelEvent::UserSpeechStarted => Some(PresenceSignal::UserSpeaking(true)),
            ChannelEvent::UserSpeechStopped => Some(PresenceSignal::UserSpeaking(false)),
        }
    }

    /// Enqueues an utterance. Resolves once the channel accepts the request,
    /// not once speech finishes; completion arrives as
    /// [`PresenceSignal::SpeakFinished`] tagged with `turn`.
    pub async fn speak(&mut self, text: &str, turn: TurnId) -> Result<(), PresenceError> {
        if !self.is_ready() {
            return Err(PresenceError::NotReady);
        }
        self.channel.speak(text, SpeakMode::Async).await?;
        self.speaking_turn = Some(turn);
        self.state = PresenceState::Speaking;
        Ok(())
    }

    /// Closes the channel when one is up. Safe to call from any state, any
    /// number of times.
    pub async fn teardown(&mut self) {
        if matches!(self.state, PresenceState::Ready | PresenceState::Speaking) {
            if let Err(e) = self.channel.close().await {
                tracing::debug!("presence channel close failed: {e}");
            }
        }
        self.state = PresenceState::Uninitialized;
        self.events = None;
        self.speaking_turn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_channel() -> MockPresenceChannel {
        let mut channel = MockPresenceChannel::new();
        channel.expect_open().returning(|_| {
            let (tx, rx) = mpsc::channel(4);
            tx.try_send(ChannelEvent::MediaReady).unwrap();
            Ok(rx)
        });
        channel
    }

    fn token_provider() -> MockTokenProvider {
        let mut tokens = MockTokenProvider::new();
        tokens.expect_issue().returning(|| Ok("tok".to_string()));
        tokens
    }

    #[tokio::test]
    async fn initialize_reaches_ready_after_media_ready() {
        let mut session =
            PresenceSession::new(ready_channel(), token_provider(), Duration::ZERO);

        session.initialize().await.unwrap();
        assert_eq!(session.state(), PresenceState::Ready);
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn credential_failure_moves_to_error_without_opening_channel() {
        let mut tokens = MockTokenProvider::new();
        tokens.expect_issue().returning(|| {
            Err(CredentialError::Denied {
                status: 500,
                reason: "key missing".to_string(),
            })
        });
        let mut channel = MockPresenceChannel::new();
        channel.expect_open().never();

        let mut session = PresenceSession::new(channel, tokens, Duration::ZERO);
        let err = session.initialize().await.unwrap_err();
        assert!(matches!(err, PresenceError::Credential(_)));
        assert_eq!(session.state(), PresenceState::Error);
    }

    #[tokio::test]
    async fn disconnect_before_media_ready_fails_initialize() {
        let mut channel = MockPresenceChannel::new();
        channel.expect_open().returning(|_| {
            let (tx, rx) = mpsc::channel(4);
            tx.try_send(ChannelEvent::MediaDisconnected).unwrap();
            Ok(rx)
        });

        let mut session = PresenceSession::new(channel, token_provider(), Duration::ZERO);
        assert!(session.initialize().await.is_err());
        assert_eq!(session.state(), PresenceState::Error);
    }

    #[tokio::test]
    async fn disconnect_invalidates_readiness() {
        let mut session =
            PresenceSession::new(ready_channel(), token_provider(), Duration::ZERO);
        session.initialize().await.unwrap();

        let signal = session.apply(ChannelEvent::MediaDisconnected);
        assert_eq!(signal, Some(PresenceSignal::ReadyLost));
        assert!(!session.is_ready());
        assert_eq!(session.state(), PresenceState::Error);
    }

    #[tokio::test]
    async fn speak_is_rejected_unless_ready() {
        let mut channel = MockPresenceChannel::new();
        channel.expect_speak().never();
        let mut session = PresenceSession::new(channel, token_provider(), Duration::ZERO);

        let err = session.speak("hello", TurnId(0)).await.unwrap_err();
        assert!(matches!(err, PresenceError::NotReady));
    }

    #[tokio::test]
    async fn speak_completion_carries_the_issued_turn() {
        let mut channel = ready_channel();
        channel.expect_speak().times(1).returning(|_, _| Ok(()));
        let mut session = PresenceSession::new(channel, token_provider(), Duration::ZERO);
        session.initialize().await.unwrap();

        session.speak("question three", TurnId(3)).await.unwrap();
        assert_eq!(session.state(), PresenceState::Speaking);

        assert_eq!(session.apply(ChannelEvent::SpeakStarted), None);
        assert_eq!(
            session.apply(ChannelEvent::SpeakEnded),
            Some(PresenceSignal::SpeakFinished(TurnId(3)))
        );
        assert_eq!(session.state(), PresenceState::Ready);

        // A second end without a pending utterance yields nothing.
        assert_eq!(session.apply(ChannelEvent::SpeakEnded), None);
    }

    #[tokio::test]
    async fn teardown_closes_once_and_is_idempotent() {
        let mut channel = ready_channel();
        channel.expect_close().times(1).returning(|| Ok(()));
        let mut session = PresenceSession::new(channel, token_provider(), Duration::ZERO);
        session.initialize().await.unwrap();

        session.teardown().await;
        assert_eq!(session.state(), PresenceState::Uninitialized);
        // Second teardown must not close again; the mock enforces times(1).
        session.teardown().await;
    }
}
