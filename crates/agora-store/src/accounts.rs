use std::collections::BTreeSet;

use tracing::debug;

use agora_types::models::{Subreddit, User};

use crate::error::{Result, StoreError};
use crate::graph::require_key;
use crate::records::{SubredditRecord, UserRecord};
use crate::Store;

impl Store {
    // -- Users --

    pub fn register_user(&self, username: &str) -> Result<User> {
        require_key("username", username)?;
        self.with_graph(|g| {
            if g.users.contains_key(username) {
                return Err(StoreError::exists("user", username));
            }
            let created = g.stamp();
            let record = UserRecord {
                username: username.to_string(),
                karma: 0,
                subreddits: BTreeSet::new(),
                posts: Vec::new(),
                comments: Vec::new(),
                connections: 0,
                created,
            };
            let view = record.view();
            g.users.insert(username.to_string(), record);
            debug!("User {} registered", username);
            Ok(view)
        })
    }

    pub fn user(&self, username: &str) -> Result<User> {
        self.with_graph(|g| g.user(username).map(|u| u.view()))
    }

    /// Count a new real-time session for `username`. Unknown users are ignored.
    pub fn connect(&self, username: &str) {
        self.with_graph(|g| {
            if let Some(user) = g.users.get_mut(username) {
                user.connections += 1;
                debug!("{} has {} live session(s)", username, user.connections);
            }
        })
    }

    /// Drop one real-time session. The user reads as connected until the
    /// last one goes away.
    pub fn disconnect(&self, username: &str) {
        self.with_graph(|g| {
            if let Some(user) = g.users.get_mut(username) {
                user.connections = user.connections.saturating_sub(1);
                debug!("{} has {} live session(s)", username, user.connections);
            }
        })
    }

    // -- Subreddits --

    pub fn create_subreddit(&self, name: &str, description: &str, creator: &str) -> Result<Subreddit> {
        require_key("subreddit name", name)?;
        self.with_graph(|g| {
            g.user(creator)?;
            if g.subreddits.contains_key(name) {
                return Err(StoreError::exists("subreddit", name));
            }
            let created = g.stamp();
            let record = SubredditRecord {
                name: name.to_string(),
                description: description.to_string(),
                creator: creator.to_string(),
                members: BTreeSet::new(),
                posts: Vec::new(),
                created,
            };
            let view = record.view();
            g.subreddits.insert(name.to_string(), record);
            g.subreddit_order.push(name.to_string());
            debug!("Subreddit {} created by {}", name, creator);
            Ok(view)
        })
    }

    pub fn subreddit(&self, name: &str) -> Result<Subreddit> {
        self.with_graph(|g| g.subreddit(name).map(|s| s.view()))
    }

    /// Add `username` to the subreddit. Joining twice is a no-op.
    pub fn join_subreddit(&self, username: &str, name: &str) -> Result<()> {
        self.with_graph(|g| {
            g.user(username)?;
            g.subreddit_mut(name)?.members.insert(username.to_string());
            g.user_mut(username)?.subreddits.insert(name.to_string());
            debug!("{} joined {}", username, name);
            Ok(())
        })
    }

    /// Remove `username` from the subreddit. Leaving as a non-member is a no-op.
    pub fn leave_subreddit(&self, username: &str, name: &str) -> Result<()> {
        self.with_graph(|g| {
            g.user(username)?;
            g.subreddit_mut(name)?.members.remove(username);
            g.user_mut(username)?.subreddits.remove(name);
            debug!("{} left {}", username, name);
            Ok(())
        })
    }
}
