//! Messages, bounded by [`Settings::max_messages`].
//!
//! A message references its author, mentioned users, author member and the message it replies
//! to. Replied-to messages are reference counted: once one leaves the bounded table (through
//! eviction or deletion) while a cached reply still points at it, it moves to a separate table
//! until the last reply goes.
//!
//! [`Settings::max_messages`]: super::Settings::max_messages

use tracing::{error, trace};
#[cfg(feature = "tracing_instrument")]
use tracing::instrument;

use super::cell::SharedCell;
use super::data::{DataRecord, MessageData, MessageRefs};
use super::{Cache, CacheComponents, CacheView};
use crate::internal::prelude::*;
use crate::model::id::{ChannelId, MessageId};
use crate::model::message::{Message, MessageUpdate};

impl Cache {
    fn message_cell(&self, message_id: MessageId) -> Option<&SharedCell<MessageData>> {
        self.messages.get(&message_id).or_else(|| self.referenced_messages.get(&message_id))
    }

    fn message_cell_mut(&mut self, message_id: MessageId) -> Option<&mut SharedCell<MessageData>> {
        if self.messages.contains_key(&message_id) {
            self.messages.get_mut(&message_id)
        } else {
            self.referenced_messages.get_mut(&message_id)
        }
    }

    fn message_refs(&self, message: &MessageData) -> Option<MessageRefs> {
        let referenced = message.referenced_message_id.and_then(|message_id| {
            let data = Arc::clone(self.message_cell(message_id)?.value());
            let refs = self.message_refs(&data)?;
            Some(Box::new((data, refs)))
        });

        Some(MessageRefs {
            author: self.user_arc(message.author_id)?,
            member: message.member_key.and_then(|key| self.member_refs(key)),
            mentions: message.mention_ids.iter().filter_map(|user_id| self.user_arc(*user_id)).collect(),
            referenced,
        })
    }

    fn build_message(&self, message: &MessageData) -> Option<Message> {
        Some(message.to_entity(&self.message_refs(message)?))
    }

    /// Retrieves a message, including one only kept because a cached message replies to it.
    pub fn get_message(&self, message_id: MessageId) -> Option<Message> {
        gate!(self, CacheComponents::MESSAGES);

        self.build_message(self.message_cell(message_id)?.value())
    }

    fn messages_view_where(&self, filter: impl Fn(&MessageData) -> bool) -> CacheView<MessageId, Message> {
        CacheView::from_records(
            self.messages
                .iter()
                .chain(&self.referenced_messages)
                .filter(|(_, cell)| filter(cell.value()))
                .filter_map(|(message_id, cell)| {
                    let data = Arc::clone(cell.value());
                    let refs = self.message_refs(&data)?;
                    Some((*message_id, data, refs))
                }),
        )
    }

    /// A view of every cached message.
    pub fn get_messages_view(&self) -> CacheView<MessageId, Message> {
        gate!(self, CacheComponents::MESSAGES, CacheView::empty());

        self.messages_view_where(|_| true)
    }

    /// A view of the cached messages sent in a channel.
    pub fn get_messages_view_for_channel(&self, channel_id: ChannelId) -> CacheView<MessageId, Message> {
        gate!(self, CacheComponents::MESSAGES, CacheView::empty());

        self.messages_view_where(|message| message.channel_id == channel_id)
    }

    /// Stores a message, evicting the oldest one if the cache is at capacity.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self, message), fields(message_id = %message.id)))]
    pub fn set_message(&mut self, message: Message) {
        gate!(self, CacheComponents::MESSAGES, ());

        trace!(message_id = %message.id, channel_id = %message.channel_id, "Setting message");
        self.upsert_message(&message, false);
    }

    /// Inserts or refreshes a message, keeping its reference count.
    ///
    /// With `as_reference`, a message not cached yet goes to the referenced-messages table rather
    /// than the bounded one. Setting a message directly moves it back into the bounded table.
    fn upsert_message(&mut self, message: &Message, as_reference: bool) {
        if let Some(referenced) = &message.referenced_message {
            self.upsert_message(referenced, true);
            if let Some(cell) = self.message_cell_mut(referenced.id) {
                cell.increment(1);
            }
        }

        self.acquire_user(&message.author);
        for user in &message.mentions {
            self.acquire_user(user);
        }
        if let Some(member) = &message.member {
            self.acquire_member(member);
        }

        let message_id = message.id;
        let data = MessageData::from_entity(message);
        let old = if let Some(cell) = self.messages.get_mut(&message_id) {
            let old = Arc::clone(cell.value());
            cell.set(data);
            Some(old)
        } else if let Some(mut cell) = self.referenced_messages.remove(&message_id) {
            let old = Arc::clone(cell.value());
            cell.set(data);
            if as_reference {
                self.referenced_messages.insert(message_id, cell);
            } else {
                self.insert_bounded_message(message_id, cell);
            }

            Some(old)
        } else {
            let cell = SharedCell::wrap(data);
            if as_reference {
                self.referenced_messages.insert(message_id, cell);
            } else {
                self.insert_bounded_message(message_id, cell);
            }

            None
        };

        if let Some(old) = old {
            self.release_message_refs(&old);
        }
    }

    fn insert_bounded_message(&mut self, message_id: MessageId, cell: SharedCell<MessageData>) {
        if let Some((evicted_id, evicted)) = self.messages.insert(message_id, cell) {
            trace!(message_id = %evicted_id, "Evicted message");
            self.expire_message(evicted_id, evicted);
        }
    }

    /// Handles a message leaving the bounded table: kept aside while replies reference it,
    /// otherwise dropped along with its references.
    fn expire_message(&mut self, message_id: MessageId, cell: SharedCell<MessageData>) {
        if cell.ref_count() > 0 {
            self.referenced_messages.insert(message_id, cell);
        } else {
            self.release_message_refs(cell.value());
        }
    }

    fn release_message_users(&mut self, message: &MessageData) {
        self.release_user(message.author_id);
        for user_id in message.mention_ids.iter() {
            self.release_user(*user_id);
        }
        if let Some(key) = message.member_key {
            self.release_member(key);
        }
    }

    fn release_message_refs(&mut self, message: &MessageData) {
        self.release_message_users(message);
        if let Some(message_id) = message.referenced_message_id {
            self.release_message(message_id);
        }
    }

    /// Gives up a reply's reference to the message it replies to.
    fn release_message(&mut self, message_id: MessageId) {
        if let Some(cell) = self.messages.get_mut(&message_id) {
            cell.decrement(1);
            return;
        }

        let Some(cell) = self.referenced_messages.get_mut(&message_id) else {
            error!(%message_id, "Released a reference to an uncached message");
            return;
        };

        if cell.decrement(1) == 0 {
            if let Some(cell) = self.referenced_messages.remove(&message_id) {
                trace!(%message_id, "Removed unreferenced message");
                self.release_message_refs(cell.value());
            }
        }
    }

    /// Replaces a message, returning the old and new copies.
    pub fn update_message(&mut self, message: Message) -> (Option<Message>, Option<Message>) {
        gate!(self, CacheComponents::MESSAGES, (None, None));

        let message_id = message.id;
        let before = self.get_message(message_id);
        self.set_message(message);
        (before, self.get_message(message_id))
    }

    /// Applies a partial edit to a cached message, returning the old and new copies.
    ///
    /// Edits to messages which aren't cached are ignored and return `(None, None)`.
    pub fn update_message_partial(&mut self, update: &MessageUpdate) -> (Option<Message>, Option<Message>) {
        gate!(self, CacheComponents::MESSAGES, (None, None));

        if self.message_cell(update.id).is_none() {
            return (None, None);
        }

        let before = self.get_message(update.id);
        for user in update.mentions.iter().flatten() {
            self.acquire_user(user);
        }

        let Some(cell) = self.message_cell_mut(update.id) else {
            return (before, None);
        };
        let old = Arc::clone(cell.value());
        cell.make_mut().apply_partial(update);

        if update.mentions.is_some() {
            for user_id in old.mention_ids.iter() {
                self.release_user(*user_id);
            }
        }

        (before, self.get_message(update.id))
    }

    /// Removes a message.
    ///
    /// A message still replied to by a cached message stays reachable through
    /// [`Self::get_message`] until the last reply goes.
    pub fn delete_message(&mut self, message_id: MessageId) -> Option<Message> {
        gate!(self, CacheComponents::MESSAGES);

        let cell = self.messages.remove(&message_id)?;
        let built = self.build_message(cell.value());
        self.expire_message(message_id, cell);
        built
    }

    /// Removes every message.
    pub fn clear_messages(&mut self) -> CacheView<MessageId, Message> {
        gate!(self, CacheComponents::MESSAGES, CacheView::empty());

        let view = self.messages_view_where(|_| true);

        let mut removed: Vec<_> = self.messages.take_all();
        removed.extend(self.referenced_messages.drain());
        // Every replied-to message goes too, so only users and members need releasing.
        for (_, cell) in &removed {
            self.release_message_users(cell.value());
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::tests::{member, user};
    use crate::cache::{Cache, Settings};
    use crate::model::id::{ChannelId, GuildId, MessageId, UserId};
    use crate::model::message::{Message, MessageType, MessageUpdate};
    use crate::model::Timestamp;

    fn message(id: u64, author_id: u64) -> Message {
        Message {
            id: MessageId::new(id),
            channel_id: ChannelId::new(10),
            guild_id: Some(GuildId::new(1)),
            author: user(author_id),
            member: Some(Box::new(member(1, author_id))),
            content: format!("message {id}"),
            timestamp: Timestamp::from_unix_timestamp(1_000).unwrap(),
            edited_timestamp: None,
            tts: false,
            mention_everyone: false,
            mentions: Vec::new(),
            mention_roles: Vec::new(),
            attachments: Vec::new(),
            embeds: Vec::new(),
            pinned: false,
            kind: MessageType::Regular,
            referenced_message: None,
        }
    }

    fn reply(id: u64, author_id: u64, to: Message) -> Message {
        Message {
            kind: MessageType::InlineReply,
            referenced_message: Some(Box::new(to)),
            ..message(id, author_id)
        }
    }

    fn cache_with_capacity(max_messages: usize) -> Cache {
        let mut settings = Settings::default();
        settings.max_messages = max_messages;
        Cache::new_with_settings(settings)
    }

    #[test]
    fn messages_reference_authors_and_members() {
        let mut cache = Cache::new();
        cache.set_message(message(1, 7));
        cache.set_message(message(2, 7));
        assert_eq!(cache.get_message(MessageId::new(1)), Some(message(1, 7)));
        // The member is only referenced, so it stays out of member lookups.
        assert_eq!(cache.get_member(GuildId::new(1), UserId::new(7)), None);

        cache.delete_message(MessageId::new(1));
        cache.delete_message(MessageId::new(2));
        assert_eq!(cache.user_count(), 0);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn eviction_keeps_replied_to_messages() {
        let mut cache = cache_with_capacity(2);
        cache.set_message(message(1, 7));
        cache.set_message(reply(2, 8, message(1, 7)));
        cache.set_message(message(3, 9));

        // Message 1 was evicted but message 2 still replies to it.
        assert_eq!(cache.messages.len(), 2);
        assert_eq!(cache.get_message(MessageId::new(1)), Some(message(1, 7)));
        assert_eq!(cache.get_messages_view().len(), 3);

        cache.set_message(message(4, 9));
        assert_eq!(cache.get_message(MessageId::new(2)), None);
        assert_eq!(cache.get_message(MessageId::new(1)), None);
        assert_eq!(cache.get_user(UserId::new(7)), None);
        assert_eq!(cache.get_user(UserId::new(8)), None);
        assert!(cache.referenced_messages.is_empty());
    }

    #[test]
    fn reply_embeds_its_reference() {
        let mut cache = Cache::new();
        cache.set_message(reply(2, 8, message(1, 7)));

        let cached = cache.get_message(MessageId::new(2)).unwrap();
        assert_eq!(cached.referenced_message.as_deref(), Some(&message(1, 7)));
        assert_eq!(cache.referenced_messages.len(), 1);

        // Setting the replied-to message directly moves it into the bounded table.
        cache.set_message(message(1, 7));
        assert!(cache.referenced_messages.is_empty());
        assert_eq!(cache.messages.len(), 2);

        // Deleting it keeps it around for the reply.
        assert_eq!(cache.delete_message(MessageId::new(1)), Some(message(1, 7)));
        assert_eq!(cache.get_message(MessageId::new(1)), Some(message(1, 7)));

        cache.delete_message(MessageId::new(2));
        assert_eq!(cache.get_message(MessageId::new(1)), None);
        assert_eq!(cache.user_count(), 0);
    }

    #[test]
    fn partial_updates() {
        let mut cache = Cache::new();
        let update = MessageUpdate {
            content: Some("edited".to_string()),
            mentions: Some(vec![user(20)]),
            ..MessageUpdate::new(MessageId::new(1), ChannelId::new(10))
        };
        assert_eq!(cache.update_message_partial(&update), (None, None));
        assert_eq!(cache.user_count(), 0);

        cache.set_message(Message {
            mentions: vec![user(21)],
            ..message(1, 7)
        });
        let (before, after) = cache.update_message_partial(&update);
        assert_eq!(before.unwrap().content, "message 1");

        let after = after.unwrap();
        assert_eq!(after.content, "edited");
        assert_eq!(after.mentions, vec![user(20)]);
        assert!(!after.pinned);
        assert_eq!(cache.get_user(UserId::new(21)), None);

        let cleared = cache.clear_messages();
        assert_eq!(cleared.len(), 1);
        assert_eq!(cache.user_count(), 0);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn no_capacity_stores_nothing() {
        let mut cache = cache_with_capacity(0);
        cache.set_message(message(1, 7));
        assert_eq!(cache.get_message(MessageId::new(1)), None);
        assert_eq!(cache.user_count(), 0);
    }
}
