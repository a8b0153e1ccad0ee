//! Real-time fan-out: a single-loop broadcast hub and the per-connection
//! WebSocket session tasks that feed it.

pub mod connection;
pub mod hub;

pub use hub::{Hub, HubConfig, HubError, HubSnapshot, Registration, SessionId};
