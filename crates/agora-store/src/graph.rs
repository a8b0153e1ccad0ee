use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::records::{
    CommentRecord, MessageRecord, PostRecord, Stamp, SubredditRecord, Tally, UserRecord,
};

/// Flat keyed tables. Only `Store` touches this, and only under its lock.
#[derive(Default)]
pub(crate) struct Graph {
    pub users: HashMap<String, UserRecord>,
    pub subreddits: HashMap<String, SubredditRecord>,
    /// Subreddit names in creation order, for stable popularity ties.
    pub subreddit_order: Vec<String>,
    pub posts: HashMap<Uuid, PostRecord>,
    pub comments: HashMap<Uuid, CommentRecord>,
    /// (voter, target) -> is_upvote. One entry per pair.
    pub votes: HashMap<(String, Uuid), bool>,
    pub messages: HashMap<Uuid, MessageRecord>,
    /// recipient -> message ids in arrival order
    pub inboxes: HashMap<String, Vec<Uuid>>,
    seq: u64,
}

impl Graph {
    pub fn stamp(&mut self) -> Stamp {
        self.seq += 1;
        Stamp {
            at: Utc::now(),
            seq: self.seq,
        }
    }

    pub fn user(&self, username: &str) -> Result<&UserRecord> {
        self.users
            .get(username)
            .ok_or_else(|| StoreError::missing("user", username))
    }

    pub fn user_mut(&mut self, username: &str) -> Result<&mut UserRecord> {
        self.users
            .get_mut(username)
            .ok_or_else(|| StoreError::missing("user", username))
    }

    pub fn subreddit(&self, name: &str) -> Result<&SubredditRecord> {
        self.subreddits
            .get(name)
            .ok_or_else(|| StoreError::missing("subreddit", name))
    }

    pub fn subreddit_mut(&mut self, name: &str) -> Result<&mut SubredditRecord> {
        self.subreddits
            .get_mut(name)
            .ok_or_else(|| StoreError::missing("subreddit", name))
    }

    pub fn post(&self, id: Uuid) -> Result<&PostRecord> {
        self.posts
            .get(&id)
            .ok_or_else(|| StoreError::missing("post", id))
    }

    pub fn post_mut(&mut self, id: Uuid) -> Result<&mut PostRecord> {
        self.posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::missing("post", id))
    }

    pub fn comment(&self, id: Uuid) -> Result<&CommentRecord> {
        self.comments
            .get(&id)
            .ok_or_else(|| StoreError::missing("comment", id))
    }

    /// Author of a vote target, looked up as a post first and then as a
    /// comment.
    pub fn target_author(&self, id: Uuid) -> Option<String> {
        if let Some(post) = self.posts.get(&id) {
            return Some(post.author.clone());
        }
        self.comments.get(&id).map(|comment| comment.author.clone())
    }

    pub fn tally_mut(&mut self, id: Uuid) -> Option<&mut Tally> {
        if let Some(post) = self.posts.get_mut(&id) {
            return Some(&mut post.tally);
        }
        self.comments.get_mut(&id).map(|comment| &mut comment.tally)
    }
}

/// Sort posts newest first.
pub(crate) fn newest_first(posts: &mut [&PostRecord]) {
    posts.sort_by(|a, b| b.created.cmp(&a.created));
}

/// Reject blank keys before they reach a table.
pub(crate) fn require_key(kind: &str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(StoreError::Malformed(format!("{} must not be empty", kind)));
    }
    Ok(())
}
