//! Graph record types. These are what the store actually holds; every
//! relationship is a key into another table, never an embedded copy.
//! Distinct from the `agora-types` views handed out to callers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use agora_types::models::{Comment, DirectMessage, Post, Subreddit, User};

/// Creation instant plus a store-wide sequence number, so two records created
/// within the same clock tick still have a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stamp {
    pub at: DateTime<Utc>,
    pub seq: u64,
}

/// Upvote/downvote counters shared by posts and comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub upvotes: u32,
    pub downvotes: u32,
}

impl Tally {
    pub fn score(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    pub fn add(&mut self, upvote: bool) {
        if upvote {
            self.upvotes += 1;
        } else {
            self.downvotes += 1;
        }
    }

    pub fn retract(&mut self, upvote: bool) {
        if upvote {
            self.upvotes = self.upvotes.saturating_sub(1);
        } else {
            self.downvotes = self.downvotes.saturating_sub(1);
        }
    }
}

pub struct UserRecord {
    pub username: String,
    pub karma: i64,
    pub subreddits: BTreeSet<String>,
    pub posts: Vec<Uuid>,
    pub comments: Vec<Uuid>,
    /// Live real-time sessions; one user may hold several.
    pub connections: u32,
    pub created: Stamp,
}

impl UserRecord {
    pub fn view(&self) -> User {
        User {
            username: self.username.clone(),
            karma: self.karma,
            subreddits: self.subreddits.iter().cloned().collect(),
            connected: self.connections > 0,
            created_at: self.created.at,
        }
    }
}

pub struct SubredditRecord {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub members: BTreeSet<String>,
    pub posts: Vec<Uuid>,
    pub created: Stamp,
}

impl SubredditRecord {
    pub fn view(&self) -> Subreddit {
        Subreddit {
            name: self.name.clone(),
            description: self.description.clone(),
            creator: self.creator.clone(),
            members: self.members.iter().cloned().collect(),
            post_ids: self.posts.clone(),
            created_at: self.created.at,
        }
    }
}

pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    pub subreddit: String,
    pub created: Stamp,
    pub tally: Tally,
    /// Top-level comments only; replies hang off their parent comment.
    pub comments: Vec<Uuid>,
    pub comments_count: u32,
    pub repost_of: Option<Uuid>,
}

impl PostRecord {
    pub fn view(&self) -> Post {
        Post {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            author: self.author.clone(),
            subreddit: self.subreddit.clone(),
            created_at: self.created.at,
            upvotes: self.tally.upvotes,
            downvotes: self.tally.downvotes,
            score: self.tally.score(),
            comments_count: self.comments_count,
            is_repost: self.repost_of.is_some(),
            repost_of: self.repost_of,
        }
    }
}

pub struct CommentRecord {
    pub id: Uuid,
    pub post: Uuid,
    pub parent: Option<Uuid>,
    pub author: String,
    pub content: String,
    pub created: Stamp,
    pub tally: Tally,
    pub replies: Vec<Uuid>,
}

impl CommentRecord {
    pub fn view(&self) -> Comment {
        Comment {
            id: self.id,
            post_id: self.post,
            parent_id: self.parent,
            author: self.author.clone(),
            content: self.content.clone(),
            created_at: self.created.at,
            upvotes: self.tally.upvotes,
            downvotes: self.tally.downvotes,
            score: self.tally.score(),
            reply_ids: self.replies.clone(),
        }
    }
}

pub struct MessageRecord {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub content: String,
    pub created: Stamp,
    pub reply_to: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn view(&self) -> DirectMessage {
        DirectMessage {
            id: self.id,
            from_user: self.from.clone(),
            to_user: self.to.clone(),
            content: self.content.clone(),
            created_at: self.created.at,
            reply_to: self.reply_to,
            read_at: self.read_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_score() {
        let mut tally = Tally::default();
        tally.add(true);
        tally.add(true);
        tally.add(false);
        assert_eq!(tally.score(), 1);

        tally.retract(true);
        assert_eq!((tally.upvotes, tally.downvotes), (1, 1));
        assert_eq!(tally.score(), 0);

        // Never wraps below zero
        tally.retract(false);
        tally.retract(false);
        assert_eq!(tally.downvotes, 0);
    }

    #[test]
    fn test_stamp_orders_by_seq_on_same_instant() {
        let at = Utc::now();
        let a = Stamp { at, seq: 1 };
        let b = Stamp { at, seq: 2 };
        assert!(a < b);
    }
}
