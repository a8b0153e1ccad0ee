//! In-memory social graph: users, subreddits, posts, comment trees, votes,
//! karma and direct messages.
//!
//! The whole graph sits behind one mutex. Every public operation takes the
//! lock once, applies its mutation in full and releases it, so no caller can
//! observe a half-applied vote (tallies updated but karma not yet) or a
//! comment that is attached but not yet counted.

pub mod accounts;
pub mod content;
pub mod error;
pub mod messages;
pub mod queries;

mod graph;
mod records;

use std::sync::{Mutex, PoisonError};

use tracing::info;

pub use error::{Result, StoreError};

use crate::graph::Graph;

pub struct Store {
    graph: Mutex<Graph>,
}

impl Store {
    pub fn new() -> Self {
        info!("Social graph store initialised");
        Self {
            graph: Mutex::new(Graph::default()),
        }
    }

    /// Run `f` with exclusive access to the graph.
    ///
    /// Store closures never panic midway, so a poisoned lock still guards a
    /// consistent graph and is recovered rather than reported.
    fn with_graph<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Graph) -> T,
    {
        let mut graph = self.graph.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut graph)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
