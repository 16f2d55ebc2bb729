//! Error taxonomy for the rehearse workspace.

use thiserror::Error;

/// Failure to obtain a short-lived credential for the presence service.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("token endpoint returned {status}: {reason}")]
    Denied { status: u16, reason: String },

    #[error("token response malformed: {message}")]
    Malformed { message: String },

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure on the presence streaming channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to open presence channel: {message}")]
    Connect { message: String },

    #[error("presence channel is not open")]
    NotOpen,

    #[error("presence channel closed")]
    Closed,

    #[error("failed to send on presence channel: {message}")]
    Send { message: String },
}

/// Failure in the presence session lifecycle.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("presence session is not ready")]
    NotReady,
}

/// Failure in local capture or transcription.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio device unavailable: {message}")]
    Device { message: String },

    #[error("transcription failed: {message}")]
    Transcription { message: String },
}

/// Failure in the remote interview protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("consent is required before starting an interview")]
    ConsentRequired,

    #[error("interview session is not active")]
    NotActive,

    #[error("protocol request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("protocol response malformed: {message}")]
    Malformed { message: String },

    #[error("submission rejected: {message}")]
    Rejected { message: String },
}

/// Failure writing or reading the local snapshot store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_denied_display() {
        let error = CredentialError::Denied {
            status: 503,
            reason: "quota exceeded".to_string(),
        };
        assert_eq!(error.to_string(), "token endpoint returned 503: quota exceeded");
    }

    #[test]
    fn presence_error_wraps_channel_transparently() {
        let error = PresenceError::from(ChannelError::Closed);
        assert_eq!(error.to_string(), "presence channel closed");
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CredentialError>();
        assert_send_sync::<ChannelError>();
        assert_send_sync::<CaptureError>();
        assert_send_sync::<ProtocolError>();
        assert_send_sync::<PersistenceError>();
    }
}
