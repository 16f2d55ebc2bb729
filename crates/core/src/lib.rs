pub mod capture;
pub mod error;
pub mod orchestrator;
pub mod presence;
pub mod protocol;
pub mod record;
pub mod turn;

use crate::turn::TurnId;

/// Represents commands the core logic issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (speaking text, showing an
/// advisory, leaving the interview screen).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Render text to the user, spoken through the presence channel when one
    /// is ready, tagged with the turn it was issued for.
    SpeakText { text: String, turn: TurnId },
    /// A transcription finished while auto-send was off; hand it to the UI
    /// as an editable draft.
    TranscriptReady { text: String, turn: TurnId },
    /// One-shot advisory emitted during an idle recording.
    Nudge {
        message: String,
        sound: bool,
        haptics: bool,
    },
    /// The interview is over and finalize ran; hand off to the review
    /// surface.
    SessionComplete {
        session_id: Option<String>,
        record_saved: bool,
    },
}
