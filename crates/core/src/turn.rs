use serde::{Deserialize, Serialize};

/// Server-assigned identity of a single question/answer cycle.
///
/// Every side effect that targets a question (speak, record, submit, nudge)
/// carries the `TurnId` it was issued for. A completion whose captured id no
/// longer matches the live id is discarded instead of applied; that check is
/// the only ordering/cancellation mechanism in the system.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TurnId(pub u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Interviewer,
}

/// One entry of the conversation transcript, in strict submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub turn: TurnId,
}

/// A coaching tip attached to a server reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub summary: String,
    pub detail: String,
}
