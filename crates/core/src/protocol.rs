//! The remote turn-based interview protocol.
//!
//! `InterviewProtocolSession` owns `ProtocolStatus`, the live `TurnId`, and
//! the transcript. It talks to the server through the `ProtocolTransport`
//! trait; `ProtocolClient` is the HTTP implementation. Stale submissions are
//! rejected here as no-ops, which makes the protocol idempotent against
//! duplicate or late completions.

use crate::error::ProtocolError;
use crate::record::{Difficulty, Group, InterviewSetup, LimitMode, Style};
use crate::turn::{ChatMessage, Role, Tip, TurnId};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStatus {
    Idle,
    Connecting,
    Active,
    Error,
}

/// Parameters for session creation, sent verbatim to the server.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    pub style: Style,
    pub group: Group,
    pub consent: bool,
    pub accent: String,
    pub notes: String,
    pub pack: String,
    pub difficulty: Difficulty,
    pub max_questions: Option<u32>,
    pub duration_seconds: Option<u32>,
    pub custom_questions: Vec<String>,
}

impl StartRequest {
    pub fn from_setup(setup: &InterviewSetup) -> Self {
        let (max_questions, duration_seconds) = match setup.limit {
            LimitMode::Open => (None, None),
            LimitMode::Questions { max } => (Some(max), None),
            LimitMode::Time { minutes } => (None, Some(minutes * 60)),
        };
        // The control arm runs neutral-only.
        let style = match setup.group {
            Group::Control => Style::Neutral,
            Group::Treatment => setup.style,
        };
        Self {
            style,
            group: setup.group,
            consent: setup.consent,
            accent: setup.accent.clone(),
            notes: setup.notes.clone(),
            pack: setup.pack.clone(),
            difficulty: setup.difficulty,
            max_questions,
            duration_seconds,
            custom_questions: setup.custom_questions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub preface: Option<String>,
    pub turn: TurnId,
}

impl Question {
    /// The text handed to the speech renderer: preface first when present.
    pub fn spoken_text(&self) -> String {
        match &self.preface {
            Some(preface) => format!("{preface} {}", self.text),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionOpened {
    pub session_id: String,
    pub question: Question,
}

/// Server reply to an answer or clarification submission.
#[derive(Debug, Clone)]
pub enum ExchangeReply {
    Question { question: Question, tip: Option<Tip> },
    Clarification { text: String, tip: Option<Tip> },
    Ended { message: Option<String> },
}

/// Terminal signal from the server, consumed at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEnded {
    pub message: Option<String>,
}

/// Locally computed delivery metrics, shipped best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryReport {
    pub speaking_rate_wpm: Option<u32>,
    pub pause_ratio: Option<f32>,
    pub filler_count: u32,
    pub reply_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The captured turn no longer matches the live turn; nothing was sent.
    Stale,
    NextQuestion,
    Clarified,
    Ended,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProtocolTransport: Send + Sync {
    async fn create_session(&self, request: &StartRequest) -> Result<SessionOpened, ProtocolError>;
    async fn send_answer(
        &self,
        session_id: &str,
        turn: TurnId,
        text: &str,
    ) -> Result<ExchangeReply, ProtocolError>;
    async fn send_clarification(
        &self,
        session_id: &str,
        turn: TurnId,
        text: &str,
    ) -> Result<ExchangeReply, ProtocolError>;
    async fn switch_style(&self, session_id: &str, style: Style) -> Result<(), ProtocolError>;
    async fn send_telemetry(
        &self,
        session_id: &str,
        report: &TelemetryReport,
    ) -> Result<(), ProtocolError>;
}

#[derive(Debug, Clone, Copy)]
enum Submission {
    Answer,
    Clarification,
}

pub struct InterviewProtocolSession<P> {
    transport: P,
    status: ProtocolStatus,
    session_id: Option<String>,
    style: Style,
    group: Group,
    turn: TurnId,
    question: Option<Question>,
    last_clarification: Option<String>,
    messages: Vec<ChatMessage>,
    tips: Vec<Tip>,
    ended: Option<SessionEnded>,
}

impl<P: ProtocolTransport> InterviewProtocolSession<P> {
    pub fn new(transport: P) -> Self {
        Self {
            transport,
            status: ProtocolStatus::Idle,
            session_id: None,
            style: Style::default(),
            group: Group::default(),
            turn: TurnId::default(),
            question: None,
            last_clarification: None,
            messages: Vec::new(),
            tips: Vec::new(),
            ended: None,
        }
    }

    pub fn status(&self) -> ProtocolStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ProtocolStatus::Active
    }

    pub fn turn(&self) -> TurnId {
        self.turn
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn last_clarification(&self) -> Option<&str> {
        self.last_clarification.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn tips(&self) -> &[Tip] {
        &self.tips
    }

    pub fn last_tip(&self) -> Option<&Tip> {
        self.tips.last()
    }

    /// Creates the remote session and fetches the first question.
    pub async fn start(&mut self, request: StartRequest) -> Result<(), ProtocolError> {
        if !request.consent {
            return Err(ProtocolError::ConsentRequired);
        }
        if matches!(self.status, ProtocolStatus::Connecting | ProtocolStatus::Active) {
            return Err(ProtocolError::Rejected {
                message: "session already started".to_string(),
            });
        }

        self.status = ProtocolStatus::Connecting;
        let opened = match self.transport.create_session(&request).await {
            Ok(opened) => opened,
            Err(e) => {
                self.status = ProtocolStatus::Error;
                return Err(e);
            }
        };

        self.session_id = Some(opened.session_id);
        self.style = request.style;
        self.group = request.group;
        self.turn = opened.question.turn;
        self.messages.push(ChatMessage {
            role: Role::Interviewer,
            content: opened.question.text.clone(),
            turn: opened.question.turn,
        });
        self.question = Some(opened.question);
        self.status = ProtocolStatus::Active;
        tracing::info!(session_id = self.session_id.as_deref(), "interview session active");
        Ok(())
    }

    pub async fn send_answer(
        &mut self,
        text: &str,
        turn: TurnId,
    ) -> Result<SendOutcome, ProtocolError> {
        self.submit(Submission::Answer, text, turn).await
    }

    pub async fn send_clarification(
        &mut self,
        text: &str,
        turn: TurnId,
    ) -> Result<SendOutcome, ProtocolError> {
        self.submit(Submission::Clarification, text, turn).await
    }

    async fn submit(
        &mut self,
        kind: Submission,
        text: &str,
        turn: TurnId,
    ) -> Result<SendOutcome, ProtocolError> {
        if self.status != ProtocolStatus::Active {
            return Err(ProtocolError::NotActive);
        }
        let Some(session_id) = self.session_id.clone() else {
            return Err(ProtocolError::NotActive);
        };
        if turn != self.turn {
            tracing::debug!(
                "discarding stale {kind:?} tagged turn {turn}, live turn {}",
                self.turn
            );
            return Ok(SendOutcome::Stale);
        }

        // The session stays Active on transport failure so the same turn can
        // be retried; nothing is appended until the server accepts.
        let reply = match kind {
            Submission::Answer => self.transport.send_answer(&session_id, turn, text).await?,
            Submission::Clarification => {
                self.transport
                    .send_clarification(&session_id, turn, text)
                    .await?
            }
        };

        self.messages.push(ChatMessage {
            role: Role::User,
            content: text.to_string(),
            turn,
        });

        match reply {
            ExchangeReply::Question { question, tip } => {
                self.messages.push(ChatMessage {
                    role: Role::Interviewer,
                    content: question.text.clone(),
                    turn: question.turn,
                });
                if question.turn > self.turn {
                    self.turn = question.turn;
                }
                self.question = Some(question);
                self.last_clarification = None;
                self.tips.extend(tip);
                Ok(SendOutcome::NextQuestion)
            }
            ExchangeReply::Clarification { text, tip } => {
                self.messages.push(ChatMessage {
                    role: Role::Interviewer,
                    content: text.clone(),
                    turn: self.turn,
                });
                self.last_clarification = Some(text);
                self.tips.extend(tip);
                Ok(SendOutcome::Clarified)
            }
            ExchangeReply::Ended { message } => {
                if self.ended.is_none() {
                    self.ended = Some(SessionEnded { message });
                }
                Ok(SendOutcome::Ended)
            }
        }
    }

    /// Changes interviewer tone for subsequent questions. Never touches the
    /// turn counter or the transcript.
    pub async fn switch_style(&mut self, style: Style) -> Result<(), ProtocolError> {
        if self.status != ProtocolStatus::Active {
            return Err(ProtocolError::NotActive);
        }
        let Some(session_id) = self.session_id.clone() else {
            return Err(ProtocolError::NotActive);
        };
        self.transport.switch_style(&session_id, style).await?;
        self.style = style;
        Ok(())
    }

    /// Fire-and-forget delivery metrics. Failures are logged and swallowed.
    pub async fn send_telemetry(&self, report: &TelemetryReport) {
        let Some(session_id) = self.session_id.as_deref() else {
            return;
        };
        if let Err(e) = self.transport.send_telemetry(session_id, report).await {
            tracing::warn!("telemetry dropped: {e}");
        }
    }

    /// Returns the terminal signal once; later calls yield `None`.
    pub fn take_ended(&mut self) -> Option<SessionEnded> {
        self.ended.take()
    }

    /// Ends the session locally. Safe to call multiple times.
    pub fn stop(&mut self) {
        self.status = ProtocolStatus::Idle;
    }
}

// --- HTTP transport -------------------------------------------------------

#[derive(Serialize)]
struct WireSubmission<'a> {
    turn: TurnId,
    text: &'a str,
}

#[derive(Serialize)]
struct WireStyle {
    style: Style,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    question: Option<Question>,
    #[serde(default)]
    clarification: Option<String>,
    #[serde(default)]
    tip: Option<Tip>,
    #[serde(default)]
    ended: bool,
    #[serde(default)]
    message: Option<String>,
}

impl WireReply {
    fn into_reply(self) -> Result<ExchangeReply, ProtocolError> {
        if self.ended {
            Ok(ExchangeReply::Ended {
                message: self.message,
            })
        } else if let Some(question) = self.question {
            Ok(ExchangeReply::Question {
                question,
                tip: self.tip,
            })
        } else if let Some(text) = self.clarification {
            Ok(ExchangeReply::Clarification {
                text,
                tip: self.tip,
            })
        } else {
            Err(ProtocolError::Malformed {
                message: "reply carries neither question, clarification, nor end".to_string(),
            })
        }
    }
}

/// Reqwest-backed implementation of [`ProtocolTransport`].
pub struct ProtocolClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProtocolClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProtocolError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let reason = resp.text().await.unwrap_or_default();
            return Err(ProtocolError::Rejected {
                message: format!("{status}: {reason}"),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ProtocolTransport for ProtocolClient {
    async fn create_session(&self, request: &StartRequest) -> Result<SessionOpened, ProtocolError> {
        let resp = self.post_json("/v1/interviews", request).await?;
        Ok(resp.json::<SessionOpened>().await?)
    }

    async fn send_answer(
        &self,
        session_id: &str,
        turn: TurnId,
        text: &str,
    ) -> Result<ExchangeReply, ProtocolError> {
        let resp = self
            .post_json(
                &format!("/v1/interviews/{session_id}/answers"),
                &WireSubmission { turn, text },
            )
            .await?;
        resp.json::<WireReply>().await?.into_reply()
    }

    async fn send_clarification(
        &self,
        session_id: &str,
        turn: TurnId,
        text: &str,
    ) -> Result<ExchangeReply, ProtocolError> {
        let resp = self
            .post_json(
                &format!("/v1/interviews/{session_id}/clarifications"),
                &WireSubmission { turn, text },
            )
            .await?;
        resp.json::<WireReply>().await?.into_reply()
    }

    async fn switch_style(&self, session_id: &str, style: Style) -> Result<(), ProtocolError> {
        self.post_json(
            &format!("/v1/interviews/{session_id}/style"),
            &WireStyle { style },
        )
        .await?;
        Ok(())
    }

    async fn send_telemetry(
        &self,
        session_id: &str,
        report: &TelemetryReport,
    ) -> Result<(), ProtocolError> {
        self.post_json(&format!("/v1/interviews/{session_id}/telemetry"), report)
            .await?;
        Ok(())
    }
}
