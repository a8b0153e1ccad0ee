//! End-to-end walk through the store plus a concurrent voting check.

use std::sync::Arc;
use std::thread;

use agora_store::{Store, StoreError};

#[test]
fn alice_and_bob() {
    let store = Store::new();
    store.register_user("alice").unwrap();
    store.register_user("bob").unwrap();

    store.create_subreddit("golang", "", "alice").unwrap();
    store.join_subreddit("alice", "golang").unwrap();
    let post = store.create_post("golang", "alice", "hello", "hello").unwrap();

    store.join_subreddit("bob", "golang").unwrap();
    let feed = store.user_feed("bob", 0);
    assert!(feed.iter().any(|p| p.id == post.id));

    let outcome = store.vote("bob", post.id, true).unwrap();
    assert_eq!(outcome.score, 1);
    assert_eq!(store.user("alice").unwrap().karma, 1);

    store.create_comment(post.id, "bob", "nice", None).unwrap();
    assert_eq!(store.post(post.id).unwrap().comments_count, 1);

    // Same polarity again from either side leaves the score alone
    store.vote("alice", post.id, true).unwrap();
    store.vote("bob", post.id, true).unwrap();
    let post = store.post(post.id).unwrap();
    assert_eq!(post.score, 1);
    assert_eq!(store.user("alice").unwrap().karma, 1);

    assert!(matches!(
        store.register_user("bob").unwrap_err(),
        StoreError::AlreadyExists { .. }
    ));
}

#[test]
fn concurrent_votes_stay_consistent() {
    let store = Arc::new(Store::new());
    store.register_user("author").unwrap();
    store.create_subreddit("busy", "", "author").unwrap();
    let post = store.create_post("busy", "author", "hot take", "").unwrap();

    let voters: Vec<String> = (0..32).map(|i| format!("voter{}", i)).collect();
    for v in &voters {
        store.register_user(v).unwrap();
        store.join_subreddit(v, "busy").unwrap();
    }

    let handles: Vec<_> = voters
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let store = store.clone();
            let v = v.clone();
            thread::spawn(move || {
                // Flip back and forth, ending on an upvote for even voters
                for round in 0..20 {
                    store.vote(&v, post.id, (round + i) % 2 == 1).unwrap();
                    let snapshot = store.post(post.id).unwrap();
                    assert_eq!(
                        snapshot.score,
                        i64::from(snapshot.upvotes) - i64::from(snapshot.downvotes)
                    );
                    assert!(snapshot.upvotes + snapshot.downvotes <= 32);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let post = store.post(post.id).unwrap();
    assert_eq!(post.upvotes + post.downvotes, 32);
    assert_eq!(post.upvotes, 16);
    assert_eq!(store.user("author").unwrap().karma, post.score);
}
