use std::cmp::Reverse;
use std::collections::HashMap;

use uuid::Uuid;

use agora_types::models::{CommentThread, Post, Subreddit};

use crate::error::Result;
use crate::graph::newest_first;
use crate::Store;

impl Store {
    /// Posts from every subreddit `username` belongs to, newest first.
    /// `limit == 0` means no limit. Unknown users get an empty feed.
    pub fn user_feed(&self, username: &str, limit: usize) -> Vec<Post> {
        self.with_graph(|g| {
            let Some(user) = g.users.get(username) else {
                return Vec::new();
            };
            let mut posts: Vec<_> = user
                .subreddits
                .iter()
                .filter_map(|name| g.subreddits.get(name))
                .flat_map(|sub| sub.posts.iter())
                .filter_map(|id| g.posts.get(id))
                .collect();
            newest_first(&mut posts);
            if limit > 0 {
                posts.truncate(limit);
            }
            posts.into_iter().map(|p| p.view()).collect()
        })
    }

    /// Case-insensitive substring search over post title, content and
    /// subreddit name, newest first. A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<Post> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.with_graph(|g| {
            let mut posts: Vec<_> = g
                .posts
                .values()
                .filter(|p| {
                    p.title.to_lowercase().contains(&needle)
                        || p.content.to_lowercase().contains(&needle)
                        || p.subreddit.to_lowercase().contains(&needle)
                })
                .collect();
            newest_first(&mut posts);
            posts.into_iter().map(|p| p.view()).collect()
        })
    }

    /// All subreddits by member count, largest first. Ties keep creation order.
    pub fn popular_subreddits(&self) -> Vec<Subreddit> {
        self.with_graph(|g| {
            let mut subs: Vec<_> = g
                .subreddit_order
                .iter()
                .filter_map(|name| g.subreddits.get(name))
                .collect();
            subs.sort_by_key(|s| Reverse(s.members.len()));
            subs.into_iter().map(|s| s.view()).collect()
        })
    }

    /// Posts authored by `username`, oldest first.
    pub fn user_posts(&self, username: &str) -> Result<Vec<Post>> {
        self.with_graph(|g| {
            let user = g.user(username)?;
            Ok(user
                .posts
                .iter()
                .filter_map(|id| g.posts.get(id))
                .map(|p| p.view())
                .collect())
        })
    }

    /// The full comment tree of a post: top-level comments in creation order,
    /// each with its replies nested beneath it.
    pub fn comment_tree(&self, post_id: Uuid) -> Result<Vec<CommentThread>> {
        self.with_graph(|g| {
            let post = g.post(post_id)?;

            // Pre-order walk with an explicit stack; depth is unbounded.
            let mut order = Vec::new();
            let mut stack: Vec<Uuid> = post.comments.iter().rev().copied().collect();
            while let Some(id) = stack.pop() {
                if let Some(comment) = g.comments.get(&id) {
                    order.push(id);
                    stack.extend(comment.replies.iter().rev().copied());
                }
            }

            // Children always follow their parent in pre-order, so building
            // in reverse finishes every reply before the comment holding it.
            let mut built: HashMap<Uuid, CommentThread> = HashMap::new();
            for id in order.iter().rev() {
                let Some(comment) = g.comments.get(id) else {
                    continue;
                };
                let replies = comment
                    .replies
                    .iter()
                    .filter_map(|reply| built.remove(reply))
                    .collect();
                built.insert(
                    *id,
                    CommentThread {
                        comment: comment.view(),
                        replies,
                    },
                );
            }

            Ok(post
                .comments
                .iter()
                .filter_map(|id| built.remove(id))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;

    fn community() -> Store {
        let store = Store::new();
        for name in ["alice", "bob", "carol"] {
            store.register_user(name).unwrap();
        }
        store.create_subreddit("rust", "Rust talk", "alice").unwrap();
        store.create_subreddit("golang", "Go talk", "alice").unwrap();
        store.create_subreddit("cooking", "Food", "bob").unwrap();
        store
    }

    #[test]
    fn test_feed_newest_first() {
        let store = community();
        store.join_subreddit("bob", "rust").unwrap();
        store.join_subreddit("bob", "golang").unwrap();

        let t1 = store.create_post("rust", "alice", "one", "1").unwrap();
        let t2 = store.create_post("golang", "alice", "two", "2").unwrap();
        let t3 = store.create_post("rust", "carol", "three", "3").unwrap();
        store.create_post("cooking", "carol", "elsewhere", "x").unwrap();

        let ids: Vec<_> = store.user_feed("bob", 0).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![t3.id, t2.id, t1.id]);

        let limited: Vec<_> = store.user_feed("bob", 2).iter().map(|p| p.id).collect();
        assert_eq!(limited, vec![t3.id, t2.id]);
    }

    #[test]
    fn test_feed_unknown_user_is_empty() {
        let store = community();
        store.create_post("rust", "alice", "one", "1").unwrap();
        assert!(store.user_feed("ghost", 10).is_empty());
        // Not a member of anything
        assert!(store.user_feed("carol", 10).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let store = community();
        let a = store.create_post("rust", "alice", "Borrow Checker", "lifetimes").unwrap();
        let b = store.create_post("golang", "bob", "goroutines", "about the BORROW idea").unwrap();
        store.create_post("cooking", "carol", "bread", "flour").unwrap();

        let ids: Vec<_> = store.search("borrow").iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        // Subreddit name matches too
        assert_eq!(store.search("COOK").len(), 1);
        assert!(store.search("   ").is_empty());
    }

    #[test]
    fn test_popular_subreddits_stable() {
        let store = community();
        store.join_subreddit("alice", "cooking").unwrap();
        store.join_subreddit("bob", "cooking").unwrap();
        store.join_subreddit("carol", "golang").unwrap();

        let names: Vec<_> = store
            .popular_subreddits()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["cooking", "golang", "rust"]);

        // rust ties golang on one member; creation order wins
        store.join_subreddit("bob", "rust").unwrap();
        let names: Vec<_> = store
            .popular_subreddits()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["cooking", "rust", "golang"]);
    }

    #[test]
    fn test_user_posts_in_order() {
        let store = community();
        let a = store.create_post("rust", "alice", "a", "").unwrap();
        let b = store.create_post("golang", "alice", "b", "").unwrap();
        let ids: Vec<_> = store.user_posts("alice").unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(store.user_posts("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_deep_comment_tree() {
        let store = community();
        let post = store.create_post("rust", "alice", "thread", "").unwrap();
        let mut parent = None;
        let mut chain = Vec::new();
        for depth in 0..50 {
            let c = store
                .create_comment(post.id, "bob", &format!("depth {}", depth), parent)
                .unwrap();
            parent = Some(c.id);
            chain.push(c.id);
        }
        let sibling = store.create_comment(post.id, "carol", "second root", None).unwrap();

        let tree = store.comment_tree(post.id).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].comment.id, sibling.id);

        let mut node = &tree[0];
        for id in &chain {
            assert_eq!(node.comment.id, *id);
            match node.replies.first() {
                Some(next) => node = next,
                None => break,
            }
        }
        assert_eq!(store.post(post.id).unwrap().comments_count, 51);
    }
}
