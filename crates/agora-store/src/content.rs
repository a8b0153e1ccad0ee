use tracing::debug;
use uuid::Uuid;

use agora_types::models::{Comment, Post, VoteOutcome, VoteTarget};

use crate::error::{Result, StoreError};
use crate::graph::Graph;
use crate::records::{CommentRecord, PostRecord, Tally};
use crate::Store;

impl Store {
    // -- Posts --

    pub fn create_post(&self, subreddit: &str, author: &str, title: &str, content: &str) -> Result<Post> {
        self.with_graph(|g| {
            g.user(author)?;
            g.subreddit(subreddit)?;
            let post = insert_post(g, subreddit, author, title.to_string(), content.to_string(), None)?;
            debug!("{} posted {} in {}", author, post.id, subreddit);
            Ok(post)
        })
    }

    pub fn post(&self, id: Uuid) -> Result<Post> {
        self.with_graph(|g| g.post(id).map(|p| p.view()))
    }

    /// Publish a copy of an existing post into `subreddit`, pointing back at
    /// the original.
    pub fn repost(&self, original_id: Uuid, username: &str, subreddit: &str) -> Result<Post> {
        self.with_graph(|g| {
            let original = g.post(original_id)?;
            let (title, content) = (original.title.clone(), original.content.clone());
            g.user(username)?;
            g.subreddit(subreddit)?;
            let post = insert_post(g, subreddit, username, title, content, Some(original_id))?;
            debug!("{} reposted {} into {} as {}", username, original_id, subreddit, post.id);
            Ok(post)
        })
    }

    // -- Comments --

    /// Comment on a post, or reply to `parent` when given. The parent must
    /// belong to the same post.
    pub fn create_comment(
        &self,
        post_id: Uuid,
        author: &str,
        content: &str,
        parent: Option<Uuid>,
    ) -> Result<Comment> {
        self.with_graph(|g| {
            g.post(post_id)?;
            g.user(author)?;
            if let Some(parent_id) = parent {
                let parent_comment = g.comment(parent_id)?;
                if parent_comment.post != post_id {
                    return Err(StoreError::missing("comment", parent_id));
                }
            }

            let created = g.stamp();
            let record = CommentRecord {
                id: Uuid::new_v4(),
                post: post_id,
                parent,
                author: author.to_string(),
                content: content.to_string(),
                created,
                tally: Tally::default(),
                replies: Vec::new(),
            };
            let id = record.id;
            let view = record.view();
            g.comments.insert(id, record);

            match parent {
                Some(parent_id) => {
                    if let Some(parent_comment) = g.comments.get_mut(&parent_id) {
                        parent_comment.replies.push(id);
                    }
                }
                None => g.post_mut(post_id)?.comments.push(id),
            }
            g.post_mut(post_id)?.comments_count += 1;
            g.user_mut(author)?.comments.push(id);

            debug!("{} commented {} on post {}", author, id, post_id);
            Ok(view)
        })
    }

    pub fn comment(&self, id: Uuid) -> Result<Comment> {
        self.with_graph(|g| g.comment(id).map(|c| c.view()))
    }

    // -- Votes --

    /// Apply or revise `voter`'s single vote on a post or comment.
    ///
    /// A repeat with the same polarity changes nothing; a flipped polarity
    /// moves the vote between tallies and shifts the author's karma by two.
    /// Votes on one's own content are ignored.
    pub fn vote(&self, voter: &str, target_id: Uuid, is_upvote: bool) -> Result<VoteOutcome> {
        self.with_graph(|g| {
            g.user(voter)?;
            let author = g
                .target_author(target_id)
                .ok_or_else(|| StoreError::missing("post or comment", target_id))?;

            if author != voter {
                let previous = g.votes.insert((voter.to_string(), target_id), is_upvote);
                let karma_delta = match previous {
                    Some(prev) if prev == is_upvote => 0,
                    Some(_) => 2,
                    None => 1,
                };
                if let Some(tally) = g.tally_mut(target_id) {
                    match previous {
                        Some(prev) if prev == is_upvote => {}
                        Some(prev) => {
                            tally.retract(prev);
                            tally.add(is_upvote);
                        }
                        None => tally.add(is_upvote),
                    }
                }
                let author_record = g.user_mut(&author)?;
                author_record.karma += if is_upvote { karma_delta } else { -karma_delta };
            }

            let outcome = vote_outcome(g, target_id, author)?;
            debug!(
                "{} voted {} on {} (score {})",
                voter,
                if is_upvote { "up" } else { "down" },
                target_id,
                outcome.score
            );
            Ok(outcome)
        })
    }

    /// The polarity `voter` currently has on `target_id`, if any.
    pub fn vote_of(&self, voter: &str, target_id: Uuid) -> Option<bool> {
        self.with_graph(|g| g.votes.get(&(voter.to_string(), target_id)).copied())
    }
}

fn insert_post(
    g: &mut Graph,
    subreddit: &str,
    author: &str,
    title: String,
    content: String,
    repost_of: Option<Uuid>,
) -> Result<Post> {
    let created = g.stamp();
    let record = PostRecord {
        id: Uuid::new_v4(),
        title,
        content,
        author: author.to_string(),
        subreddit: subreddit.to_string(),
        created,
        tally: Tally::default(),
        comments: Vec::new(),
        comments_count: 0,
        repost_of,
    };
    let id = record.id;
    let view = record.view();
    g.posts.insert(id, record);
    g.subreddit_mut(subreddit)?.posts.push(id);
    g.user_mut(author)?.posts.push(id);
    Ok(view)
}

fn vote_outcome(g: &Graph, target_id: Uuid, author: String) -> Result<VoteOutcome> {
    let (target, tally) = match g.posts.get(&target_id) {
        Some(post) => (VoteTarget::Post, post.tally),
        None => (VoteTarget::Comment, g.comment(target_id)?.tally),
    };
    let author_karma = g.user(&author)?.karma;
    Ok(VoteOutcome {
        target_id,
        target,
        upvotes: tally.upvotes,
        downvotes: tally.downvotes,
        score: tally.score(),
        author,
        author_karma,
    })
}
