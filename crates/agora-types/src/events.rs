use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, DirectMessage, Post, VoteOutcome};

/// Notifications pushed to real-time sessions. The hub itself treats payloads
/// as opaque bytes; this is the JSON shape the REST shell publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Notification {
    /// A new community was created
    SubredditCreate { name: String, creator: String },

    /// A post (or repost) was published
    PostCreate { post: Post },

    /// A comment or reply was added to a post
    CommentCreate { comment: Comment },

    /// Vote tallies changed on a post or comment
    VoteUpdate { outcome: VoteOutcome },

    /// A direct message arrived; only delivered to the recipient
    DirectMessage { message: DirectMessage },

    /// A user joined or left a community
    MembershipUpdate {
        subreddit: String,
        username: String,
        joined: bool,
    },
}

impl Notification {
    /// Recipient identity for targeted notifications. `None` means broadcast.
    pub fn recipient(&self) -> Option<&str> {
        match self {
            Self::DirectMessage { message } => Some(&message.to_user),
            _ => None,
        }
    }

    /// Id of the entity this notification is about, when it has one.
    pub fn entity_id(&self) -> Option<Uuid> {
        match self {
            Self::PostCreate { post } => Some(post.id),
            Self::CommentCreate { comment } => Some(comment.id),
            Self::VoteUpdate { outcome } => Some(outcome.target_id),
            Self::DirectMessage { message } => Some(message.id),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
