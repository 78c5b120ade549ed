//! Guilds, their availability and their roles.

use tracing::{debug, trace};
#[cfg(feature = "tracing_instrument")]
use tracing::instrument;

use super::record::{Availability, GuildRecord};
use super::wrappers::{add_id, remove_id, SnowflakeSet};
use super::{Cache, CacheComponents, CacheError, CacheView};
use crate::internal::prelude::*;
use crate::model::guild::{Guild, Role};
use crate::model::id::{GuildId, RoleId};

impl Cache {
    /// Retrieves a guild from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnavailableGuild`] if the guild is known to be unavailable. The error
    /// carries the last guild object received, if any, so that callers which can live with stale
    /// data still have access to it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use guildstate::cache::{Cache, CacheError};
    /// use guildstate::model::id::GuildId;
    ///
    /// let mut cache = Cache::new();
    /// cache.set_initial_unavailable_guilds([GuildId::new(10)]);
    ///
    /// match cache.get_guild(GuildId::new(10)) {
    ///     Err(CacheError::UnavailableGuild { guild_id, .. }) => assert_eq!(guild_id, GuildId::new(10)),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// ```
    pub fn get_guild(&self, guild_id: GuildId) -> Result<Option<Guild>, CacheError> {
        gate!(self, CacheComponents::GUILDS, Ok(None));

        let Some(record) = self.guilds.get(&guild_id) else {
            return Ok(None);
        };

        if record.availability == Availability::Unavailable {
            return Err(CacheError::UnavailableGuild {
                guild_id,
                guild: record.guild.as_deref().cloned().map(Box::new),
            });
        }

        Ok(record.guild.as_deref().cloned())
    }

    /// Retrieves a guild unless it is known to be unavailable.
    pub fn get_available_guild(&self, guild_id: GuildId) -> Option<Guild> {
        gate!(self, CacheComponents::GUILDS);

        self.guilds.get(&guild_id)?.available_guild().map(|guild| Guild::clone(guild))
    }

    /// Retrieves a guild only if it is known to be unavailable.
    pub fn get_unavailable_guild(&self, guild_id: GuildId) -> Option<Guild> {
        gate!(self, CacheComponents::GUILDS);

        self.guilds.get(&guild_id)?.unavailable_guild().map(|guild| Guild::clone(guild))
    }

    /// A view of every cached guild object, regardless of availability.
    pub fn get_guilds_view(&self) -> CacheView<GuildId, Guild> {
        self.guilds_view_by(|record| record.guild.as_ref())
    }

    /// A view of the cached guild objects which aren't known to be unavailable.
    pub fn get_available_guilds_view(&self) -> CacheView<GuildId, Guild> {
        self.guilds_view_by(GuildRecord::available_guild)
    }

    /// A view of the cached guild objects which are known to be unavailable.
    pub fn get_unavailable_guilds_view(&self) -> CacheView<GuildId, Guild> {
        self.guilds_view_by(GuildRecord::unavailable_guild)
    }

    fn guilds_view_by(&self, select: impl Fn(&GuildRecord) -> Option<&Arc<Guild>>) -> CacheView<GuildId, Guild> {
        gate!(self, CacheComponents::GUILDS, CacheView::empty());

        CacheView::from_values(
            self.guilds.iter().filter_map(|(guild_id, record)| Some((*guild_id, Arc::clone(select(record)?)))),
        )
    }

    /// Stores a guild object and marks the guild available.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self, guild), fields(guild_id = %guild.id)))]
    pub fn set_guild(&mut self, guild: Guild) {
        gate!(self, CacheComponents::GUILDS, ());

        debug!(guild_id = %guild.id, "Setting guild");
        let record = self.guild_record_mut(guild.id);
        record.guild = Some(Arc::new(guild));
        record.availability = Availability::Available;
    }

    /// Marks a cached guild as available or unavailable.
    ///
    /// Does nothing unless the guild object itself is cached.
    pub fn set_guild_availability(&mut self, guild_id: GuildId, available: bool) {
        gate!(self, CacheComponents::GUILDS, ());

        if let Some(record) = self.guilds.get_mut(&guild_id).filter(|record| record.guild.is_some()) {
            trace!(%guild_id, available, "Setting guild availability");
            record.availability = if available { Availability::Available } else { Availability::Unavailable };
        }
    }

    /// Marks the guilds listed as unavailable when a session starts.
    ///
    /// Guild objects already cached for these ids are kept; a later [`Self::set_guild`] makes
    /// them available again.
    pub fn set_initial_unavailable_guilds(&mut self, guild_ids: impl IntoIterator<Item = GuildId>) {
        gate!(self, CacheComponents::GUILDS, ());

        for guild_id in guild_ids {
            self.guild_record_mut(guild_id).availability = Availability::Unavailable;
        }
    }

    /// Replaces a guild object, returning the old and new copies.
    ///
    /// Update payloads don't carry the member count, join date or large flag, so those are carried
    /// over from the cached guild whenever it has them.
    pub fn update_guild(&mut self, mut guild: Guild) -> (Option<Guild>, Option<Guild>) {
        gate!(self, CacheComponents::GUILDS, (None, None));

        let cached = self.guilds.get(&guild.id).and_then(|record| record.guild.clone());
        if let Some(cached) = &cached {
            guild.member_count = cached.member_count.or(guild.member_count);
            guild.joined_at = cached.joined_at.or(guild.joined_at);
            guild.large = cached.large.or(guild.large);
        }

        let after = guild.clone();
        self.set_guild(guild);
        (cached.as_deref().cloned(), Some(after))
    }

    /// Removes a guild object, leaving the rest of the guild's cached data alone.
    pub fn delete_guild(&mut self, guild_id: GuildId) -> Option<Guild> {
        gate!(self, CacheComponents::GUILDS);

        let record = self.guilds.get_mut(&guild_id)?;
        let guild = record.guild.take();
        record.availability = Availability::Unknown;
        self.remove_guild_record_if_empty(guild_id);

        debug!(%guild_id, "Deleted guild");
        guild.as_deref().cloned()
    }

    /// Removes every guild object.
    pub fn clear_guilds(&mut self) -> CacheView<GuildId, Guild> {
        gate!(self, CacheComponents::GUILDS, CacheView::empty());

        let mut guilds = Vec::new();
        self.retain_guild_records(
            |record| {
                record.availability = Availability::Unknown;
                if let Some(guild) = record.guild.take() {
                    guilds.push((guild.id, guild));
                }
            },
            |record| record.guild.is_none() && record.availability == Availability::Unknown,
        );

        CacheView::from_values(guilds)
    }

    /// The number of members of cached guilds which haven't been received yet.
    pub fn unknown_members(&self) -> u64 {
        self.guilds
            .values()
            .filter_map(|record| {
                let total = record.guild.as_ref()?.member_count?;
                let known = record.members.as_ref().map_or(0, |members| {
                    members.values().filter(|cell| !cell.value().deleted).count()
                });
                Some(total.saturating_sub(known as u64))
            })
            .sum()
    }

    /// Retrieves a role from the cache.
    pub fn get_role(&self, role_id: RoleId) -> Option<Role> {
        gate!(self, CacheComponents::ROLES);

        self.roles.get(&role_id).map(|role| Role::clone(role))
    }

    /// A view of every cached role.
    pub fn get_roles_view(&self) -> CacheView<RoleId, Role> {
        gate!(self, CacheComponents::ROLES, CacheView::empty());

        CacheView::from_values(self.roles.iter().map(|(role_id, role)| (*role_id, Arc::clone(role))))
    }

    /// A view of a guild's cached roles, ordered by id.
    pub fn get_roles_view_for_guild(&self, guild_id: GuildId) -> CacheView<RoleId, Role> {
        gate!(self, CacheComponents::ROLES, CacheView::empty());

        let Some(role_ids) = self.guilds.get(&guild_id).and_then(|record| record.roles.as_ref()) else {
            return CacheView::empty();
        };

        CacheView::from_values(
            role_ids.iter().filter_map(|role_id| Some((role_id, Arc::clone(self.roles.get(&role_id)?)))),
        )
    }

    /// Stores a role.
    pub fn set_role(&mut self, role: Role) {
        gate!(self, CacheComponents::ROLES, ());

        trace!(role_id = %role.id, guild_id = %role.guild_id, "Setting role");
        add_id(&mut self.guild_record_mut(role.guild_id).roles, role.id);
        self.roles.insert(role.id, Arc::new(role));
    }

    /// Replaces a role, returning the old and new copies.
    pub fn update_role(&mut self, role: Role) -> (Option<Role>, Option<Role>) {
        gate!(self, CacheComponents::ROLES, (None, None));

        let role_id = role.id;
        let before = self.get_role(role_id);
        self.set_role(role);
        (before, self.get_role(role_id))
    }

    /// Removes a role.
    pub fn delete_role(&mut self, role_id: RoleId) -> Option<Role> {
        gate!(self, CacheComponents::ROLES);

        let role = self.roles.remove(&role_id)?;
        if let Some(record) = self.guilds.get_mut(&role.guild_id) {
            remove_id(&mut record.roles, role_id);
        }
        self.remove_guild_record_if_empty(role.guild_id);

        Some(Role::clone(&role))
    }

    /// Removes every role.
    pub fn clear_roles(&mut self) -> CacheView<RoleId, Role> {
        gate!(self, CacheComponents::ROLES, CacheView::empty());

        let roles = std::mem::take(&mut self.roles);
        self.retain_guild_records(|record| record.roles = None, |record| record.roles.is_none());
        CacheView::from_values(roles)
    }

    /// Removes every role of a guild.
    pub fn clear_roles_for_guild(&mut self, guild_id: GuildId) -> CacheView<RoleId, Role> {
        gate!(self, CacheComponents::ROLES, CacheView::empty());

        let Some(role_ids) = self.guilds.get_mut(&guild_id).and_then(|record| record.roles.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.roles.is_none());

        CacheView::from_values(
            role_ids.iter().filter_map(|role_id| Some((role_id, self.roles.remove(&role_id)?))),
        )
    }

    /// Replaces every role of a guild with `roles`.
    ///
    /// An empty `roles` leaves the guild with a known, empty set of roles.
    pub fn replace_all_roles(&mut self, guild_id: GuildId, roles: impl IntoIterator<Item = Role>) {
        gate!(self, CacheComponents::ROLES, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.roles.take());
        for role_id in old.iter().flat_map(SnowflakeSet::iter) {
            self.roles.remove(&role_id);
        }

        let mut role_ids = Vec::new();
        for role in roles {
            role_ids.push(role.id);
            self.roles.insert(role.id, Arc::new(role));
        }

        self.guild_record_mut(guild_id).roles = Some(SnowflakeSet::from_ids(role_ids));
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::tests::{member, role};
    use crate::cache::{Cache, CacheError};
    use crate::model::guild::Guild;
    use crate::model::id::{GuildId, RoleId, UserId};
    use crate::model::Timestamp;

    fn guild(id: u64) -> Guild {
        Guild {
            id: GuildId::new(id),
            name: format!("guild{id}"),
            icon: None,
            description: None,
            owner_id: UserId::new(1),
            afk_channel_id: None,
            afk_timeout: 300,
            system_channel_id: None,
            premium_tier: 0,
            preferred_locale: None,
            features: Vec::new(),
            member_count: None,
            joined_at: None,
            large: None,
        }
    }

    #[test]
    fn availability_lifecycle() {
        let mut cache = Cache::new();
        let id = GuildId::new(1);
        assert!(matches!(cache.get_guild(id), Ok(None)));

        cache.set_guild(guild(1));
        assert_eq!(cache.get_guild(id).unwrap(), Some(guild(1)));

        cache.set_guild_availability(id, false);
        let err = cache.get_guild(id).unwrap_err();
        assert_eq!(err.guild_id(), id);
        assert_eq!(err.into_stale_guild(), Some(guild(1)));
        assert_eq!(cache.get_available_guild(id), None);
        assert_eq!(cache.get_unavailable_guild(id), Some(guild(1)));
        assert_eq!(cache.get_available_guilds_view().len(), 0);
        assert_eq!(cache.get_unavailable_guilds_view().len(), 1);
        assert_eq!(cache.get_guilds_view().len(), 1);

        cache.set_guild_availability(id, true);
        assert_eq!(cache.get_available_guild(id), Some(guild(1)));

        // Unknown guilds aren't created by availability changes.
        cache.set_guild_availability(GuildId::new(2), false);
        assert_eq!(cache.guild_record_count(), 1);
    }

    #[test]
    fn availability_needs_a_cached_guild() {
        let mut cache = Cache::new();
        cache.set_role(role(1, 2));

        cache.set_guild_availability(GuildId::new(1), false);
        assert!(matches!(cache.get_guild(GuildId::new(1)), Ok(None)));
        assert!(cache.get_unavailable_guilds_view().is_empty());

        cache.delete_role(RoleId::new(2));
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn initial_unavailable_guilds_keep_cached_objects() {
        let mut cache = Cache::new();
        cache.set_guild(guild(11));
        cache.set_initial_unavailable_guilds([GuildId::new(10), GuildId::new(11)]);

        assert!(matches!(
            cache.get_guild(GuildId::new(10)),
            Err(CacheError::UnavailableGuild { guild: None, .. })
        ));
        assert_eq!(cache.get_unavailable_guild(GuildId::new(11)), Some(guild(11)));

        cache.set_guild(guild(10));
        assert_eq!(cache.get_guild(GuildId::new(10)).unwrap(), Some(guild(10)));
    }

    #[test]
    fn update_carries_over_gateway_only_fields() {
        let mut cache = Cache::new();
        let mut full = guild(1);
        full.member_count = Some(120);
        full.joined_at = Timestamp::from_unix_timestamp(1_500_000_000).ok();
        full.large = Some(true);
        cache.set_guild(full.clone());

        let mut partial = guild(1);
        partial.name = "renamed".to_string();
        let (before, after) = cache.update_guild(partial);
        assert_eq!(before, Some(full.clone()));

        let after = after.unwrap();
        assert_eq!(after.name, "renamed");
        assert_eq!(after.member_count, Some(120));
        assert_eq!(after.joined_at, full.joined_at);
        assert_eq!(after.large, Some(true));
        assert_eq!(cache.get_guild(GuildId::new(1)).unwrap(), Some(after));
    }

    #[test]
    fn delete_guild_keeps_other_data() {
        let mut cache = Cache::new();
        cache.set_guild(guild(1));
        cache.set_role(role(1, 2));

        assert_eq!(cache.delete_guild(GuildId::new(1)), Some(guild(1)));
        assert_eq!(cache.guild_record_count(), 1);
        assert!(cache.get_role(RoleId::new(2)).is_some());

        cache.delete_role(RoleId::new(2));
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn clear_guilds_drops_records_left_empty() {
        let mut cache = Cache::new();
        cache.set_guild(guild(1));
        cache.set_guild(guild(2));
        cache.set_role(role(2, 3));
        cache.set_initial_unavailable_guilds([GuildId::new(4)]);

        let cleared = cache.clear_guilds();
        assert_eq!(cleared.len(), 2);
        assert_eq!(cache.guild_record_count(), 1);
        assert!(cache.get_guilds_view().is_empty());
    }

    #[test]
    fn unknown_members_counts_missing_members() {
        let mut cache = Cache::new();
        let mut full = guild(1);
        full.member_count = Some(3);
        cache.set_guild(full);
        cache.set_member(member(1, 5));

        assert_eq!(cache.unknown_members(), 2);
    }

    #[test]
    fn roles_per_guild() {
        let mut cache = Cache::new();
        cache.set_role(role(1, 3));
        cache.set_role(role(1, 2));
        cache.set_role(role(2, 4));

        let view = cache.get_roles_view_for_guild(GuildId::new(1));
        assert_eq!(view.keys().copied().collect::<Vec<_>>(), [RoleId::new(2), RoleId::new(3)]);
        assert_eq!(cache.get_roles_view().len(), 3);

        let mut renamed = role(1, 3);
        renamed.name = "renamed".to_string();
        let (before, after) = cache.update_role(renamed.clone());
        assert_eq!(before, Some(role(1, 3)));
        assert_eq!(after, Some(renamed));

        let cleared = cache.clear_roles_for_guild(GuildId::new(1));
        assert_eq!(cleared.len(), 2);
        assert!(cache.get_role(RoleId::new(2)).is_none());
        assert_eq!(cache.guild_record_count(), 1);

        assert_eq!(cache.clear_roles().len(), 1);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn replace_all_roles_drops_stale_roles() {
        let mut cache = Cache::new();
        cache.set_role(role(1, 2));
        cache.set_role(role(1, 3));

        cache.replace_all_roles(GuildId::new(1), [role(1, 3), role(1, 4)]);
        assert!(cache.get_role(RoleId::new(2)).is_none());
        assert_eq!(cache.get_roles_view_for_guild(GuildId::new(1)).len(), 2);

        cache.replace_all_roles(GuildId::new(1), []);
        assert!(cache.get_roles_view_for_guild(GuildId::new(1)).is_empty());
        // A known empty set still keeps the record.
        assert_eq!(cache.guild_record_count(), 1);
    }
}
