//! Users, the current user and DM channels.

use tracing::{debug, trace};
#[cfg(feature = "tracing_instrument")]
use tracing::instrument;

use super::data::{DataRecord, DmChannelData};
use super::{Cache, CacheComponents, CacheView, DmEntry};
use crate::internal::prelude::*;
use crate::model::channel::PrivateChannel;
use crate::model::id::{ChannelId, UserId};
use crate::model::user::{CurrentUser, User};

impl Cache {
    /// Retrieves a [`User`] from the cache.
    ///
    /// Users are stored while anything else in the cache references them (a member, a message
    /// author, an emoji's creator, ...), so there is no component to disable them and no setter.
    pub fn get_user(&self, user_id: UserId) -> Option<User> {
        self.users.get(user_id).map(|cell| cell.read())
    }

    /// A view of every cached user.
    pub fn get_users_view(&self) -> CacheView<UserId, User> {
        CacheView::from_values(self.users.iter().map(|(user_id, cell)| (user_id, Arc::clone(cell.value()))))
    }

    /// The number of cached users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// The number of cached entities currently referencing the user, or `None` if the user isn't
    /// cached.
    pub fn user_ref_count(&self, user_id: UserId) -> Option<usize> {
        self.users.get(user_id).map(|cell| cell.ref_count())
    }

    /// Stores the latest copy of `user` and takes a reference to it.
    pub(crate) fn acquire_user(&mut self, user: &User) {
        self.users.acquire(user.id, user.clone());
    }

    /// Gives up one reference to a user, dropping them if nothing else references them.
    pub(crate) fn release_user(&mut self, user_id: UserId) {
        let exempt = self.dm_channels.contains_key(&user_id);
        if self.users.release(user_id, 1, exempt) {
            trace!(%user_id, "Removed unreferenced user");
        }
    }

    pub(crate) fn user_arc(&self, user_id: UserId) -> Option<Arc<User>> {
        self.users.arc(user_id)
    }

    /// Retrieves the current user.
    pub fn get_me(&self) -> Option<CurrentUser> {
        gate!(self, CacheComponents::ME);

        self.me.as_deref().cloned()
    }

    /// Sets the current user.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self)))]
    pub fn set_me(&mut self, user: CurrentUser) {
        gate!(self, CacheComponents::ME, ());

        debug!(user_id = %user.id, "Setting current user");
        self.me = Some(Arc::new(user));
    }

    /// Replaces the current user, returning the old and new copies.
    pub fn update_me(&mut self, user: CurrentUser) -> (Option<CurrentUser>, Option<CurrentUser>) {
        gate!(self, CacheComponents::ME, (None, None));

        let before = self.get_me();
        self.set_me(user);
        (before, self.get_me())
    }

    /// Removes the current user.
    pub fn delete_me(&mut self) -> Option<CurrentUser> {
        gate!(self, CacheComponents::ME);

        self.me.take().as_deref().cloned()
    }

    /// Records the DM channel used to talk to a user.
    ///
    /// Only the most recent [`Settings::max_dm_channel_ids`] mappings are kept. A cached user
    /// stays cached for as long as a mapping for them exists.
    ///
    /// [`Settings::max_dm_channel_ids`]: super::Settings::max_dm_channel_ids
    pub fn set_dm_channel_id(&mut self, user_id: UserId, channel_id: ChannelId) {
        gate!(self, CacheComponents::DM_CHANNEL_IDS, ());

        if let Some(entry) = self.dm_channels.get_mut(&user_id) {
            entry.channel_id = channel_id;
            // A channel object for another id no longer describes the mapping.
            let stale = entry.channel.as_ref().is_some_and(|channel| channel.id() != channel_id);
            if let Some(channel) = stale.then(|| entry.channel.take()).flatten() {
                self.release_user(channel.recipient_id);
            }

            return;
        }

        let entry = DmEntry {
            channel_id,
            channel: None,
        };
        if let Some((evicted_id, evicted)) = self.dm_channels.insert(user_id, entry) {
            self.release_dm_entry(evicted_id, evicted);
        }
    }

    /// Retrieves the DM channel id for a user.
    pub fn get_dm_channel_id(&self, user_id: UserId) -> Option<ChannelId> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS);

        self.dm_channels.get(&user_id).map(|entry| entry.channel_id)
    }

    /// A view of every user to DM channel id mapping, oldest first.
    pub fn get_dm_channel_ids_view(&self) -> CacheView<UserId, ChannelId> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS, CacheView::empty());

        CacheView::from_values(
            self.dm_channels.iter().map(|(user_id, entry)| (*user_id, Arc::new(entry.channel_id))),
        )
    }

    /// Removes the DM channel mapping for a user, along with the channel object if cached.
    pub fn delete_dm_channel_id(&mut self, user_id: UserId) -> Option<ChannelId> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS);

        let entry = self.dm_channels.remove(&user_id)?;
        let channel_id = entry.channel_id;
        self.release_dm_entry(user_id, entry);
        Some(channel_id)
    }

    /// Removes every DM channel mapping.
    pub fn clear_dm_channel_ids(&mut self) -> CacheView<UserId, ChannelId> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS, CacheView::empty());

        let entries = self.dm_channels.take_all();
        let ids: Vec<_> = entries.iter().map(|(user_id, entry)| (*user_id, Arc::new(entry.channel_id))).collect();
        for (user_id, entry) in entries {
            self.release_dm_entry(user_id, entry);
        }

        CacheView::from_values(ids)
    }

    /// Stores a DM channel along with the mapping from its recipient to it.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self)))]
    pub fn set_dm_channel(&mut self, channel: PrivateChannel) {
        gate!(self, CacheComponents::DM_CHANNEL_IDS, ());

        let user_id = channel.recipient.id;
        self.acquire_user(&channel.recipient);
        let data = Arc::new(DmChannelData::from_entity(&channel));

        if let Some(entry) = self.dm_channels.get_mut(&user_id) {
            entry.channel_id = channel.id;
            if let Some(old) = entry.channel.replace(data) {
                self.release_user(old.recipient_id);
            }

            return;
        }

        let entry = DmEntry {
            channel_id: channel.id,
            channel: Some(data),
        };
        if let Some((evicted_id, evicted)) = self.dm_channels.insert(user_id, entry) {
            self.release_dm_entry(evicted_id, evicted);
        }
    }

    /// Retrieves the DM channel with a user, if the channel object has been received.
    pub fn get_dm_channel(&self, user_id: UserId) -> Option<PrivateChannel> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS);

        let channel = self.dm_channels.get(&user_id)?.channel.as_ref()?;
        Some(channel.to_entity(&self.user_arc(channel.recipient_id)?))
    }

    /// A view of every cached DM channel object, keyed by recipient.
    pub fn get_dm_channels_view(&self) -> CacheView<UserId, PrivateChannel> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS, CacheView::empty());

        CacheView::from_records(self.dm_channels.iter().filter_map(|(user_id, entry)| {
            let channel = entry.channel.as_ref()?;
            Some((*user_id, Arc::clone(channel), self.user_arc(channel.recipient_id)?))
        }))
    }

    /// Removes the DM channel object for a user. The id mapping is kept.
    pub fn delete_dm_channel(&mut self, user_id: UserId) -> Option<PrivateChannel> {
        gate!(self, CacheComponents::DM_CHANNEL_IDS);

        let channel = self.dm_channels.get_mut(&user_id)?.channel.take()?;
        let built = self.user_arc(channel.recipient_id).map(|recipient| channel.to_entity(&recipient));
        self.release_user(channel.recipient_id);
        built
    }

    /// Drops what a removed DM entry held on to. Its user loses the exemption the entry gave it.
    fn release_dm_entry(&mut self, user_id: UserId, entry: DmEntry) {
        let held = usize::from(entry.channel.is_some());
        if self.users.release(user_id, held, false) {
            trace!(%user_id, "Removed unreferenced user after dropping their DM channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::tests::{member, user};
    use crate::cache::{Cache, CacheComponents, Settings};
    use crate::model::channel::PrivateChannel;
    use crate::model::id::{ChannelId, GuildId, UserId};
    use crate::model::user::CurrentUser;

    fn dm(channel_id: u64, user_id: u64) -> PrivateChannel {
        PrivateChannel {
            id: ChannelId::new(channel_id),
            recipient: user(user_id),
            last_message_id: None,
            last_pin_timestamp: None,
        }
    }

    #[test]
    fn me_round_trip() {
        let mut cache = Cache::new();
        let me = CurrentUser {
            user: user(1),
            mfa_enabled: false,
            verified: Some(true),
            email: None,
            locale: None,
        };

        cache.set_me(me.clone());
        assert_eq!(cache.get_me(), Some(me.clone()));

        let mut renamed = me.clone();
        renamed.user.name = "renamed".to_string();
        let (before, after) = cache.update_me(renamed.clone());
        assert_eq!(before, Some(me));
        assert_eq!(after, Some(renamed.clone()));
        assert_eq!(cache.delete_me(), Some(renamed));
        assert_eq!(cache.get_me(), None);
    }

    #[test]
    fn dm_mapping_keeps_user_alive() {
        let mut cache = Cache::new();
        cache.set_member(member(1, 5));
        cache.set_dm_channel_id(UserId::new(5), ChannelId::new(50));

        cache.delete_member(GuildId::new(1), UserId::new(5));
        assert!(cache.get_user(UserId::new(5)).is_some());
        assert_eq!(cache.user_ref_count(UserId::new(5)), Some(0));

        assert_eq!(cache.delete_dm_channel_id(UserId::new(5)), Some(ChannelId::new(50)));
        assert!(cache.get_user(UserId::new(5)).is_none());
    }

    #[test]
    fn dm_mappings_evict_oldest() {
        let mut settings = Settings::default();
        settings.max_dm_channel_ids = 2;
        let mut cache = Cache::new_with_settings(settings);

        cache.set_dm_channel(dm(10, 1));
        cache.set_dm_channel(dm(20, 2));
        cache.set_dm_channel_id(UserId::new(3), ChannelId::new(30));

        assert_eq!(cache.get_dm_channel_id(UserId::new(1)), None);
        assert!(cache.get_user(UserId::new(1)).is_none());
        assert_eq!(cache.get_dm_channel(UserId::new(2)), Some(dm(20, 2)));
        assert_eq!(
            cache.get_dm_channel_ids_view().keys().copied().collect::<Vec<_>>(),
            [UserId::new(2), UserId::new(3)]
        );
    }

    #[test]
    fn dm_channel_objects() {
        let mut cache = Cache::new();
        cache.set_dm_channel(dm(10, 1));
        cache.set_dm_channel(dm(10, 1));
        assert_eq!(cache.user_ref_count(UserId::new(1)), Some(1));
        assert_eq!(cache.get_dm_channels_view().len(), 1);

        assert_eq!(cache.delete_dm_channel(UserId::new(1)), Some(dm(10, 1)));
        assert_eq!(cache.get_dm_channel_id(UserId::new(1)), Some(ChannelId::new(10)));
        // The mapping alone still keeps the user around.
        assert_eq!(cache.user_ref_count(UserId::new(1)), Some(0));

        let cleared = cache.clear_dm_channel_ids();
        assert_eq!(cleared.get(&UserId::new(1)), Some(ChannelId::new(10)));
        assert_eq!(cache.user_count(), 0);
    }

    #[test]
    fn disabled_dm_channels() {
        let mut settings = Settings::default();
        settings.components.remove(CacheComponents::DM_CHANNEL_IDS | CacheComponents::ME);
        let mut cache = Cache::new_with_settings(settings);

        cache.set_dm_channel(dm(10, 1));
        assert_eq!(cache.get_dm_channel_id(UserId::new(1)), None);
        assert_eq!(cache.user_count(), 0);
        assert!(cache.get_dm_channels_view().is_empty());
    }
}
