use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SessionId = Uuid;

/// Outbound queue depth per session before the session is considered stalled.
pub const DEFAULT_SESSION_QUEUE: usize = 256;

/// Pending register/unregister/broadcast requests the loop will buffer.
pub const DEFAULT_COMMAND_QUEUE: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    pub session_queue: usize,
    pub command_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            session_queue: DEFAULT_SESSION_QUEUE,
            command_queue: DEFAULT_COMMAND_QUEUE,
        }
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub coordination loop has stopped")]
    Closed,
}

/// Returned to a newly registered session: its id and the receiving end of
/// its outbound queue. The queue closes when the hub drops the session.
pub struct Registration {
    pub session_id: SessionId,
    pub outbound: mpsc::Receiver<Bytes>,
}

/// Point-in-time view of the membership, answered from inside the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    pub sessions: usize,
    /// Identities that currently resolve to a session, sorted.
    pub identities: Vec<String>,
}

enum Command {
    Register {
        session_id: SessionId,
        identity: String,
        outbound: mpsc::Sender<Bytes>,
    },
    Unregister {
        session_id: SessionId,
    },
    Broadcast {
        payload: Bytes,
    },
    SendTo {
        identity: String,
        payload: Bytes,
    },
    Snapshot {
        reply: oneshot::Sender<HubSnapshot>,
    },
}

/// Handle to the hub's coordination loop. Cheap to clone; the loop runs
/// until every handle is dropped.
///
/// Membership lives only inside the loop task. Registration, unregistration
/// and broadcast are handled one at a time in arrival order, so a broadcast
/// never sees a half-registered or half-removed session.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<Command>,
    session_queue: usize,
}

impl Hub {
    /// Start the coordination loop on the current tokio runtime.
    pub fn spawn(config: HubConfig) -> Self {
        let (commands, rx) = mpsc::channel(config.command_queue.max(1));
        tokio::spawn(run(rx));
        info!(
            "Hub started (session queue {}, command queue {})",
            config.session_queue, config.command_queue
        );
        Self {
            commands,
            session_queue: config.session_queue.max(1),
        }
    }

    /// Register a new session under `identity`. A later registration with
    /// the same identity takes over targeted delivery for that name.
    pub async fn register(&self, identity: impl Into<String>) -> Result<Registration, HubError> {
        let session_id = Uuid::new_v4();
        let (outbound, rx) = mpsc::channel(self.session_queue);
        self.commands
            .send(Command::Register {
                session_id,
                identity: identity.into(),
                outbound,
            })
            .await
            .map_err(|_| HubError::Closed)?;
        Ok(Registration {
            session_id,
            outbound: rx,
        })
    }

    /// Remove a session. Unknown or already-dropped ids are ignored.
    pub async fn unregister(&self, session_id: SessionId) {
        self.submit(Command::Unregister { session_id }).await;
    }

    /// Deliver `payload` to every registered session without waiting on any
    /// of them. Sessions whose queue is full are dropped.
    pub async fn broadcast(&self, payload: impl Into<Bytes>) {
        self.submit(Command::Broadcast {
            payload: payload.into(),
        })
        .await;
    }

    /// Deliver `payload` to the session currently registered as `identity`,
    /// if any, under the same non-blocking policy as `broadcast`.
    pub async fn send_to(&self, identity: &str, payload: impl Into<Bytes>) {
        self.submit(Command::SendTo {
            identity: identity.to_string(),
            payload: payload.into(),
        })
        .await;
    }

    pub async fn snapshot(&self) -> HubSnapshot {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Snapshot { reply }).await;
        rx.await.unwrap_or_default()
    }

    async fn submit(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            warn!("Hub loop has stopped, dropping command");
        }
    }
}

async fn run(mut commands: mpsc::Receiver<Command>) {
    let mut registry = Registry::default();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Register {
                session_id,
                identity,
                outbound,
            } => registry.register(session_id, identity, outbound),
            Command::Unregister { session_id } => {
                registry.unregister(session_id);
            }
            Command::Broadcast { payload } => registry.broadcast(&payload),
            Command::SendTo { identity, payload } => registry.send_to(&identity, &payload),
            Command::Snapshot { reply } => {
                let _ = reply.send(registry.snapshot());
            }
        }
    }

    info!("Hub stopped, closing {} sessions", registry.sessions.len());
}

struct Session {
    identity: String,
    outbound: mpsc::Sender<Bytes>,
}

/// Membership state owned by the loop task.
#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, Session>,
    by_identity: HashMap<String, SessionId>,
}

impl Registry {
    fn register(&mut self, session_id: SessionId, identity: String, outbound: mpsc::Sender<Bytes>) {
        if let Some(previous) = self.by_identity.insert(identity.clone(), session_id) {
            debug!("{} re-registered, session {} no longer targeted", identity, previous);
        }
        debug!("Session {} registered as {}", session_id, identity);
        self.sessions.insert(session_id, Session { identity, outbound });
    }

    /// Drop a session and its identity entry. Dropping the session's sender
    /// is what closes its outbound queue, so this happens at most once.
    fn unregister(&mut self, session_id: SessionId) -> bool {
        let Some(session) = self.sessions.remove(&session_id) else {
            return false;
        };
        if self.by_identity.get(&session.identity) == Some(&session_id) {
            self.by_identity.remove(&session.identity);
        }
        debug!("Session {} ({}) unregistered", session_id, session.identity);
        true
    }

    fn broadcast(&mut self, payload: &Bytes) {
        let stalled: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.outbound.try_send(payload.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        for session_id in stalled {
            warn!("Session {} cannot keep up, dropping it", session_id);
            self.unregister(session_id);
        }
    }

    fn send_to(&mut self, identity: &str, payload: &Bytes) {
        let Some(&session_id) = self.by_identity.get(identity) else {
            debug!("No session for {}, targeted payload dropped", identity);
            return;
        };
        let delivered = self
            .sessions
            .get(&session_id)
            .is_some_and(|session| session.outbound.try_send(payload.clone()).is_ok());
        if !delivered {
            warn!("Session {} ({}) cannot keep up, dropping it", session_id, identity);
            self.unregister(session_id);
        }
    }

    fn snapshot(&self) -> HubSnapshot {
        let mut identities: Vec<String> = self.by_identity.keys().cloned().collect();
        identities.sort();
        HubSnapshot {
            sessions: self.sessions.len(),
            identities,
        }
    }
}
