use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a user account as seen from outside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub karma: i64,
    pub subreddits: Vec<String>,
    pub connected: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subreddit {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub members: Vec<String>,
    pub post_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Subreddit {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    pub subreddit: String,
    pub created_at: DateTime<Utc>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub score: i64,
    pub comments_count: u32,
    pub is_repost: bool,
    pub repost_of: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    /// `None` for top-level comments.
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub score: i64,
    pub reply_ids: Vec<Uuid>,
}

/// A comment together with its nested replies, used to render a whole thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: Uuid,
    pub from_user: String,
    pub to_user: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub reply_to: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTarget {
    Post,
    Comment,
}

/// Tallies after a vote has been applied or revised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub target_id: Uuid,
    pub target: VoteTarget,
    pub upvotes: u32,
    pub downvotes: u32,
    pub score: i64,
    pub author: String,
    pub author_karma: i64,
}
