//! Streaming-avatar presence client.
//!
//! Implements `rehearse-core`'s `TokenProvider` and `PresenceChannel` traits
//! against the hosted avatar service: a short-lived credential fetched over
//! HTTP, then a WebSocket channel carrying lifecycle events and speak tasks.

pub mod channel;
pub mod events;
pub mod token;

pub use channel::WsPresenceChannel;
pub use token::TokenClient;
