//! Guild channels and threads.

use std::cmp::Reverse;

use tracing::trace;

use super::wrappers::{add_id, remove_id, SnowflakeSet};
use super::{Cache, CacheComponents, CacheView};
use crate::internal::prelude::*;
use crate::model::channel::{ChannelType, GuildChannel};
use crate::model::id::{ChannelId, GuildId};

/// The key channels are listed by within a guild, matching how clients display them: categories
/// in position order, each followed by its text channels and then its voice channels. Channels
/// without a category come first.
fn sort_key(channel: &GuildChannel, channels: &FxHashMap<ChannelId, Arc<GuildChannel>>) -> (i32, u8, i32, ChannelId) {
    if channel.kind == ChannelType::Category {
        return (i32::from(channel.position), 0, -1, channel.id);
    }

    let parent_position = channel
        .parent_id
        .and_then(|parent_id| channels.get(&parent_id))
        .map_or(-1, |parent| i32::from(parent.position));
    let group = if channel.kind.is_voice() { 2 } else { 1 };

    (parent_position, group, i32::from(channel.position), channel.id)
}

impl Cache {
    /// Retrieves a non-thread guild channel.
    pub fn get_guild_channel(&self, channel_id: ChannelId) -> Option<GuildChannel> {
        gate!(self, CacheComponents::GUILD_CHANNELS);

        self.channels.get(&channel_id).map(|channel| GuildChannel::clone(channel))
    }

    /// A view of every cached non-thread guild channel.
    pub fn get_guild_channels_view(&self) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_CHANNELS, CacheView::empty());

        CacheView::from_values(self.channels.iter().map(|(channel_id, channel)| (*channel_id, Arc::clone(channel))))
    }

    /// A view of a guild's non-thread channels in display order.
    pub fn get_guild_channels_view_for_guild(&self, guild_id: GuildId) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_CHANNELS, CacheView::empty());

        let Some(channel_ids) = self.guilds.get(&guild_id).and_then(|record| record.channels.as_ref()) else {
            return CacheView::empty();
        };

        let mut channels: Vec<_> =
            channel_ids.iter().filter_map(|channel_id| self.channels.get(&channel_id)).collect();
        channels.sort_by_cached_key(|channel| sort_key(channel, &self.channels));

        CacheView::from_values(channels.into_iter().map(|channel| (channel.id, Arc::clone(channel))))
    }

    /// Stores a non-thread guild channel.
    pub fn set_guild_channel(&mut self, channel: GuildChannel) {
        gate!(self, CacheComponents::GUILD_CHANNELS, ());

        trace!(channel_id = %channel.id, guild_id = %channel.guild_id, "Setting guild channel");
        add_id(&mut self.guild_record_mut(channel.guild_id).channels, channel.id);
        self.channels.insert(channel.id, Arc::new(channel));
    }

    /// Replaces a non-thread guild channel, returning the old and new copies.
    pub fn update_guild_channel(&mut self, channel: GuildChannel) -> (Option<GuildChannel>, Option<GuildChannel>) {
        gate!(self, CacheComponents::GUILD_CHANNELS, (None, None));

        let channel_id = channel.id;
        let before = self.get_guild_channel(channel_id);
        self.set_guild_channel(channel);
        (before, self.get_guild_channel(channel_id))
    }

    /// Removes a non-thread guild channel.
    ///
    /// This also drops the channel's cached invites and voice states, and the threads started in
    /// it, when those components are enabled.
    pub fn delete_guild_channel(&mut self, channel_id: ChannelId) -> Option<GuildChannel> {
        gate!(self, CacheComponents::GUILD_CHANNELS);

        let channel = self.channels.remove(&channel_id)?;
        let guild_id = channel.guild_id;
        if let Some(record) = self.guilds.get_mut(&guild_id) {
            remove_id(&mut record.channels, channel_id);
        }

        self.clear_invites_for_channel(guild_id, channel_id);
        self.clear_voice_states_for_channel(guild_id, channel_id);
        self.clear_threads_for_channel(guild_id, channel_id);
        self.remove_guild_record_if_empty(guild_id);

        Some(GuildChannel::clone(&channel))
    }

    /// Removes every non-thread guild channel.
    pub fn clear_guild_channels(&mut self) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_CHANNELS, CacheView::empty());

        let channels = std::mem::take(&mut self.channels);
        self.retain_guild_records(|record| record.channels = None, |record| record.channels.is_none());
        CacheView::from_values(channels)
    }

    /// Removes every non-thread channel of a guild.
    pub fn clear_guild_channels_for_guild(&mut self, guild_id: GuildId) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_CHANNELS, CacheView::empty());

        let Some(channel_ids) = self.guilds.get_mut(&guild_id).and_then(|record| record.channels.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.channels.is_none());

        CacheView::from_values(
            channel_ids.iter().filter_map(|channel_id| Some((channel_id, self.channels.remove(&channel_id)?))),
        )
    }

    /// Replaces every non-thread channel of a guild with `channels`.
    pub fn replace_all_guild_channels(&mut self, guild_id: GuildId, channels: impl IntoIterator<Item = GuildChannel>) {
        gate!(self, CacheComponents::GUILD_CHANNELS, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.channels.take());
        for channel_id in old.iter().flat_map(SnowflakeSet::iter) {
            self.channels.remove(&channel_id);
        }

        let mut channel_ids = Vec::new();
        for channel in channels {
            channel_ids.push(channel.id);
            self.channels.insert(channel.id, Arc::new(channel));
        }

        self.guild_record_mut(guild_id).channels = Some(SnowflakeSet::from_ids(channel_ids));
    }

    /// Retrieves a thread.
    pub fn get_thread(&self, thread_id: ChannelId) -> Option<GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS);

        self.threads.get(&thread_id).map(|thread| GuildChannel::clone(thread))
    }

    /// A view of every cached thread.
    pub fn get_threads_view(&self) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS, CacheView::empty());

        CacheView::from_values(self.threads.iter().map(|(thread_id, thread)| (*thread_id, Arc::clone(thread))))
    }

    /// A view of a guild's threads, newest first.
    pub fn get_threads_view_for_guild(&self, guild_id: GuildId) -> CacheView<ChannelId, GuildChannel> {
        self.threads_view_where(guild_id, |_| true)
    }

    /// A view of the threads started in a channel, newest first.
    pub fn get_threads_view_for_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> CacheView<ChannelId, GuildChannel> {
        self.threads_view_where(guild_id, |thread| thread.parent_id == Some(channel_id))
    }

    fn threads_view_where(
        &self,
        guild_id: GuildId,
        filter: impl Fn(&GuildChannel) -> bool,
    ) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS, CacheView::empty());

        let Some(thread_ids) = self.guilds.get(&guild_id).and_then(|record| record.threads.as_ref()) else {
            return CacheView::empty();
        };

        let mut threads: Vec<_> = thread_ids
            .iter()
            .filter_map(|thread_id| self.threads.get(&thread_id))
            .filter(|thread| filter(thread))
            .collect();
        threads.sort_by_key(|thread| Reverse(thread.id));

        CacheView::from_values(threads.into_iter().map(|thread| (thread.id, Arc::clone(thread))))
    }

    /// Stores a thread.
    pub fn set_thread(&mut self, thread: GuildChannel) {
        gate!(self, CacheComponents::GUILD_THREADS, ());

        trace!(thread_id = %thread.id, guild_id = %thread.guild_id, "Setting thread");
        add_id(&mut self.guild_record_mut(thread.guild_id).threads, thread.id);
        self.threads.insert(thread.id, Arc::new(thread));
    }

    /// Replaces a thread, returning the old and new copies.
    pub fn update_thread(&mut self, thread: GuildChannel) -> (Option<GuildChannel>, Option<GuildChannel>) {
        gate!(self, CacheComponents::GUILD_THREADS, (None, None));

        let thread_id = thread.id;
        let before = self.get_thread(thread_id);
        self.set_thread(thread);
        (before, self.get_thread(thread_id))
    }

    /// Removes a thread.
    pub fn delete_thread(&mut self, thread_id: ChannelId) -> Option<GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS);

        let thread = self.threads.remove(&thread_id)?;
        if let Some(record) = self.guilds.get_mut(&thread.guild_id) {
            remove_id(&mut record.threads, thread_id);
        }
        self.remove_guild_record_if_empty(thread.guild_id);

        Some(GuildChannel::clone(&thread))
    }

    /// Removes every thread.
    pub fn clear_threads(&mut self) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS, CacheView::empty());

        let threads = std::mem::take(&mut self.threads);
        self.retain_guild_records(|record| record.threads = None, |record| record.threads.is_none());
        CacheView::from_values(threads)
    }

    /// Removes every thread of a guild.
    pub fn clear_threads_for_guild(&mut self, guild_id: GuildId) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS, CacheView::empty());

        let Some(thread_ids) = self.guilds.get_mut(&guild_id).and_then(|record| record.threads.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.threads.is_none());

        CacheView::from_values(
            thread_ids.iter().filter_map(|thread_id| Some((thread_id, self.threads.remove(&thread_id)?))),
        )
    }

    /// Removes every thread started in a channel.
    pub fn clear_threads_for_channel(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> CacheView<ChannelId, GuildChannel> {
        gate!(self, CacheComponents::GUILD_THREADS, CacheView::empty());

        let Some(record) = self.guilds.get_mut(&guild_id) else {
            return CacheView::empty();
        };
        let Some(thread_ids) = &mut record.threads else {
            return CacheView::empty();
        };

        let mut removed = Vec::new();
        for thread_id in thread_ids.iter().collect::<Vec<_>>() {
            if self.threads.get(&thread_id).is_some_and(|thread| thread.parent_id == Some(channel_id)) {
                thread_ids.remove(thread_id);
                if let Some(thread) = self.threads.remove(&thread_id) {
                    removed.push((thread_id, thread));
                }
            }
        }

        if thread_ids.is_empty() {
            record.threads = None;
        }
        self.remove_guild_record_if_empty(guild_id);

        CacheView::from_values(removed)
    }

    /// Replaces every thread of a guild with `threads`.
    pub fn replace_all_threads(&mut self, guild_id: GuildId, threads: impl IntoIterator<Item = GuildChannel>) {
        gate!(self, CacheComponents::GUILD_THREADS, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.threads.take());
        for thread_id in old.iter().flat_map(SnowflakeSet::iter) {
            self.threads.remove(&thread_id);
        }

        let mut thread_ids = Vec::new();
        for thread in threads {
            thread_ids.push(thread.id);
            self.threads.insert(thread.id, Arc::new(thread));
        }

        self.guild_record_mut(guild_id).threads = Some(SnowflakeSet::from_ids(thread_ids));
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::Cache;
    use crate::model::channel::{ChannelType, GuildChannel};
    use crate::model::id::{ChannelId, GuildId};

    fn channel(guild_id: u64, id: u64, kind: ChannelType, position: u16, parent: Option<u64>) -> GuildChannel {
        GuildChannel {
            id: ChannelId::new(id),
            guild_id: GuildId::new(guild_id),
            kind,
            name: format!("channel{id}"),
            position,
            parent_id: parent.map(ChannelId::new),
            topic: None,
            nsfw: false,
            bitrate: None,
            user_limit: None,
            rate_limit_per_user: None,
            permission_overwrites: Vec::new(),
            last_message_id: None,
            owner_id: None,
            thread_metadata: None,
        }
    }

    #[test]
    fn guild_channels_in_display_order() {
        let mut cache = Cache::new();
        cache.set_guild_channel(channel(1, 10, ChannelType::Category, 1, None));
        cache.set_guild_channel(channel(1, 20, ChannelType::Category, 0, None));
        cache.set_guild_channel(channel(1, 11, ChannelType::Voice, 0, Some(10)));
        cache.set_guild_channel(channel(1, 12, ChannelType::Text, 5, Some(10)));
        cache.set_guild_channel(channel(1, 21, ChannelType::Text, 0, Some(20)));
        cache.set_guild_channel(channel(1, 30, ChannelType::Text, 3, None));
        cache.set_guild_channel(channel(2, 40, ChannelType::Text, 0, None));

        let view = cache.get_guild_channels_view_for_guild(GuildId::new(1));
        let order: Vec<u64> = view.keys().map(|id| id.get()).collect();
        assert_eq!(order, [30, 20, 21, 10, 12, 11]);
        assert_eq!(cache.get_guild_channels_view().len(), 7);
    }

    #[test]
    fn deleting_a_channel_cascades_to_its_threads() {
        let mut cache = Cache::new();
        cache.set_guild_channel(channel(1, 10, ChannelType::Text, 0, None));
        cache.set_thread(channel(1, 100, ChannelType::PublicThread, 0, Some(10)));
        cache.set_thread(channel(1, 101, ChannelType::PublicThread, 0, Some(11)));

        assert!(cache.delete_guild_channel(ChannelId::new(10)).is_some());
        assert!(cache.get_thread(ChannelId::new(100)).is_none());
        assert!(cache.get_thread(ChannelId::new(101)).is_some());
        assert_eq!(cache.guild_record_count(), 1);

        assert!(cache.delete_thread(ChannelId::new(101)).is_some());
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn thread_views() {
        let mut cache = Cache::new();
        cache.set_thread(channel(1, 100, ChannelType::PublicThread, 0, Some(10)));
        cache.set_thread(channel(1, 102, ChannelType::PublicThread, 0, Some(10)));
        cache.set_thread(channel(1, 101, ChannelType::PrivateThread, 0, Some(11)));

        let for_channel = cache.get_threads_view_for_channel(GuildId::new(1), ChannelId::new(10));
        assert_eq!(for_channel.keys().map(|id| id.get()).collect::<Vec<_>>(), [102, 100]);
        assert_eq!(cache.get_threads_view_for_guild(GuildId::new(1)).len(), 3);

        let cleared = cache.clear_threads_for_channel(GuildId::new(1), ChannelId::new(10));
        assert_eq!(cleared.len(), 2);
        assert_eq!(cache.get_threads_view().len(), 1);

        cache.replace_all_threads(GuildId::new(1), [channel(1, 103, ChannelType::PublicThread, 0, Some(10))]);
        assert!(cache.get_thread(ChannelId::new(101)).is_none());
        assert_eq!(cache.clear_threads_for_guild(GuildId::new(1)).len(), 1);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn replace_all_guild_channels() {
        let mut cache = Cache::new();
        cache.set_guild_channel(channel(1, 10, ChannelType::Text, 0, None));
        cache.replace_all_guild_channels(GuildId::new(1), [channel(1, 11, ChannelType::Text, 0, None)]);

        assert!(cache.get_guild_channel(ChannelId::new(10)).is_none());
        let mut renamed = channel(1, 11, ChannelType::Text, 0, None);
        renamed.name = "renamed".to_string();
        let (before, after) = cache.update_guild_channel(renamed.clone());
        assert_eq!(before.map(|c| c.name), Some("channel11".to_string()));
        assert_eq!(after, Some(renamed));

        assert_eq!(cache.clear_guild_channels_for_guild(GuildId::new(1)).len(), 1);
        assert!(cache.clear_guild_channels().is_empty());
    }
}
