use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use agora_types::models::DirectMessage;

use crate::error::{Result, StoreError};
use crate::graph::Graph;
use crate::records::MessageRecord;
use crate::Store;

impl Store {
    pub fn send_direct_message(&self, from: &str, to: &str, content: &str) -> Result<DirectMessage> {
        self.with_graph(|g| {
            g.user(from)?;
            g.user(to)?;
            let message = deliver(g, from, to, content, None);
            debug!("Message {} sent from {} to {}", message.id, from, to);
            Ok(message)
        })
    }

    /// Reply to a received message. The reply goes to the original sender,
    /// and only the original recipient may reply.
    pub fn reply_to_direct_message(&self, message_id: Uuid, from: &str, content: &str) -> Result<DirectMessage> {
        self.with_graph(|g| {
            g.user(from)?;
            let original = g
                .messages
                .get(&message_id)
                .ok_or_else(|| StoreError::missing("message", message_id))?;
            if original.to != from {
                return Err(StoreError::Unauthorized(format!(
                    "{} did not receive message {}",
                    from, message_id
                )));
            }
            let to = original.from.clone();
            let message = deliver(g, from, &to, content, Some(message_id));
            debug!("Reply {} to {} sent from {} to {}", message.id, message_id, from, to);
            Ok(message)
        })
    }

    /// Messages received by `username`, oldest first.
    pub fn inbox(&self, username: &str) -> Result<Vec<DirectMessage>> {
        self.with_graph(|g| {
            g.user(username)?;
            let messages = g
                .inboxes
                .get(username)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| g.messages.get(id))
                        .map(|m| m.view())
                        .collect()
                })
                .unwrap_or_default();
            Ok(messages)
        })
    }

    /// Stamp a message as read. Reading twice keeps the first timestamp.
    pub fn mark_read(&self, username: &str, message_id: Uuid) -> Result<DirectMessage> {
        self.with_graph(|g| {
            let message = g
                .messages
                .get_mut(&message_id)
                .filter(|m| m.to == username)
                .ok_or_else(|| StoreError::missing("message", message_id))?;
            message.read_at.get_or_insert_with(Utc::now);
            Ok(message.view())
        })
    }
}

fn deliver(g: &mut Graph, from: &str, to: &str, content: &str, reply_to: Option<Uuid>) -> DirectMessage {
    let created = g.stamp();
    let record = MessageRecord {
        id: Uuid::new_v4(),
        from: from.to_string(),
        to: to.to_string(),
        content: content.to_string(),
        created,
        reply_to,
        read_at: None,
    };
    let id = record.id;
    let view = record.view();
    g.messages.insert(id, record);
    g.inboxes.entry(to.to_string()).or_default().push(id);
    view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Store {
        let store = Store::new();
        store.register_user("alice").unwrap();
        store.register_user("bob").unwrap();
        store
    }

    #[test]
    fn test_send_lands_in_recipient_inbox() {
        let store = pair();
        let sent = store.send_direct_message("alice", "bob", "hi bob").unwrap();
        assert_eq!(store.inbox("bob").unwrap(), vec![sent]);
        assert!(store.inbox("alice").unwrap().is_empty());
    }

    #[test]
    fn test_send_to_unknown_user() {
        let store = pair();
        assert!(store.send_direct_message("alice", "ghost", "?").unwrap_err().is_not_found());
        assert!(store.send_direct_message("ghost", "bob", "?").unwrap_err().is_not_found());
        assert!(store.inbox("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_reply_goes_to_original_sender() {
        let store = pair();
        let sent = store.send_direct_message("alice", "bob", "ping").unwrap();
        let reply = store.reply_to_direct_message(sent.id, "bob", "pong").unwrap();
        assert_eq!(reply.to_user, "alice");
        assert_eq!(reply.reply_to, Some(sent.id));
        assert_eq!(store.inbox("alice").unwrap(), vec![reply]);

        // Alice never received `sent`, so she cannot reply to it
        let err = store.reply_to_direct_message(sent.id, "alice", "x").unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));
        assert!(store
            .reply_to_direct_message(Uuid::new_v4(), "bob", "x")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_mark_read_keeps_first_timestamp() {
        let store = pair();
        let sent = store.send_direct_message("alice", "bob", "ping").unwrap();
        assert!(sent.read_at.is_none());

        let first = store.mark_read("bob", sent.id).unwrap().read_at;
        assert!(first.is_some());
        let second = store.mark_read("bob", sent.id).unwrap().read_at;
        assert_eq!(first, second);

        // Only the recipient sees the message
        assert!(store.mark_read("alice", sent.id).unwrap_err().is_not_found());
    }
}
