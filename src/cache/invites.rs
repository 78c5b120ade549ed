use tracing::trace;

use super::data::{DataRecord, InviteData, InviteRefs};
use super::record::GuildRecord;
use super::{Cache, CacheComponents, CacheView};
use crate::internal::prelude::*;
use crate::model::id::{ChannelId, GuildId};
use crate::model::invite::Invite;

impl Cache {
    fn invite_refs(&self, invite: &InviteData) -> InviteRefs {
        InviteRefs {
            inviter: invite.inviter_id.and_then(|user_id| self.user_arc(user_id)),
            target_user: invite.target_user_id.and_then(|user_id| self.user_arc(user_id)),
        }
    }

    /// Retrieves an invite by its code.
    pub fn get_invite(&self, code: &str) -> Option<Invite> {
        gate!(self, CacheComponents::INVITES);

        let invite = self.invites.get(code)?;
        Some(invite.to_entity(&self.invite_refs(invite)))
    }

    /// A view of every cached invite, keyed by code.
    pub fn get_invites_view(&self) -> CacheView<String, Invite> {
        gate!(self, CacheComponents::INVITES, CacheView::empty());

        CacheView::from_records(
            self.invites.iter().map(|(code, invite)| (code.clone(), Arc::clone(invite), self.invite_refs(invite))),
        )
    }

    fn invites_view_of(&self, record: &GuildRecord, channel_id: Option<ChannelId>) -> CacheView<String, Invite> {
        let Some(codes) = &record.invites else {
            return CacheView::empty();
        };

        CacheView::from_records(
            codes
                .iter()
                .filter_map(|code| Some((code, self.invites.get(code)?)))
                .filter(|(_, invite)| channel_id.is_none() || Some(invite.channel_id) == channel_id)
                .map(|(code, invite)| (code.clone(), Arc::clone(invite), self.invite_refs(invite))),
        )
    }

    /// A view of a guild's invites.
    pub fn get_invites_view_for_guild(&self, guild_id: GuildId) -> CacheView<String, Invite> {
        gate!(self, CacheComponents::INVITES, CacheView::empty());

        self.guilds.get(&guild_id).map_or_else(CacheView::empty, |record| self.invites_view_of(record, None))
    }

    /// A view of the invites leading to a guild channel.
    pub fn get_invites_view_for_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> CacheView<String, Invite> {
        gate!(self, CacheComponents::INVITES, CacheView::empty());

        self.guilds
            .get(&guild_id)
            .map_or_else(CacheView::empty, |record| self.invites_view_of(record, Some(channel_id)))
    }

    /// Stores an invite along with its inviter and target user.
    ///
    /// Invites without a guild are only reachable through [`Self::get_invite`] and
    /// [`Self::get_invites_view`].
    pub fn set_invite(&mut self, invite: Invite) {
        gate!(self, CacheComponents::INVITES, ());

        trace!(code = %invite.code, "Setting invite");
        for user in invite.inviter.iter().chain(&invite.target_user) {
            self.acquire_user(user);
        }

        let data = Arc::new(InviteData::from_entity(&invite));
        if let Some(old) = self.invites.insert(invite.code.clone(), data) {
            self.release_invite_refs(&old);
            if old.guild_id != invite.guild_id {
                self.unlink_invite(old.guild_id, &invite.code);
            }
        }

        if let Some(guild_id) = invite.guild_id {
            let codes = self.guild_record_mut(guild_id).invites.get_or_insert_with(Vec::new);
            if !codes.contains(&invite.code) {
                codes.push(invite.code);
            }
        }
    }

    fn release_invite_refs(&mut self, invite: &InviteData) {
        for user_id in invite.user_ids() {
            self.release_user(user_id);
        }
    }

    /// Drops `code` from its guild's invite list.
    fn unlink_invite(&mut self, guild_id: Option<GuildId>, code: &str) {
        let Some(guild_id) = guild_id else {
            return;
        };
        let Some(record) = self.guilds.get_mut(&guild_id) else {
            return;
        };

        if let Some(codes) = &mut record.invites {
            codes.retain(|cached| cached != code);
            if codes.is_empty() {
                record.invites = None;
            }
        }

        self.remove_guild_record_if_empty(guild_id);
    }

    /// Replaces an invite, returning the old and new copies.
    pub fn update_invite(&mut self, invite: Invite) -> (Option<Invite>, Option<Invite>) {
        gate!(self, CacheComponents::INVITES, (None, None));

        let code = invite.code.clone();
        let before = self.get_invite(&code);
        self.set_invite(invite);
        (before, self.get_invite(&code))
    }

    /// Removes an invite.
    pub fn delete_invite(&mut self, code: &str) -> Option<Invite> {
        gate!(self, CacheComponents::INVITES);

        let invite = self.invites.remove(code)?;
        let built = invite.to_entity(&self.invite_refs(&invite));

        self.release_invite_refs(&invite);
        self.unlink_invite(invite.guild_id, code);
        Some(built)
    }

    /// Removes every invite.
    pub fn clear_invites(&mut self) -> CacheView<String, Invite> {
        gate!(self, CacheComponents::INVITES, CacheView::empty());

        let invites = std::mem::take(&mut self.invites);
        self.retain_guild_records(|record| record.invites = None, |record| record.invites.is_none());

        self.take_invites(invites.into_iter().collect())
    }

    /// Removes every invite of a guild.
    pub fn clear_invites_for_guild(&mut self, guild_id: GuildId) -> CacheView<String, Invite> {
        gate!(self, CacheComponents::INVITES, CacheView::empty());

        let Some(codes) = self.guilds.get_mut(&guild_id).and_then(|record| record.invites.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.invites.is_none());

        let invites = codes.into_iter().filter_map(|code| self.invites.remove_entry(&code)).collect();
        self.take_invites(invites)
    }

    /// Removes the invites leading to a guild channel.
    pub fn clear_invites_for_channel(&mut self, guild_id: GuildId, channel_id: ChannelId) -> CacheView<String, Invite> {
        gate!(self, CacheComponents::INVITES, CacheView::empty());

        let Some(record) = self.guilds.get_mut(&guild_id) else {
            return CacheView::empty();
        };
        let Some(codes) = &mut record.invites else {
            return CacheView::empty();
        };

        let invites = &mut self.invites;
        let mut removed = Vec::new();
        codes.retain(|code| {
            let for_channel = invites.get(code).is_some_and(|invite| invite.channel_id == channel_id);
            if for_channel {
                removed.extend(invites.remove_entry(code));
            }

            !for_channel
        });
        if codes.is_empty() {
            record.invites = None;
        }

        self.remove_guild_record_if_empty(guild_id);
        self.take_invites(removed)
    }

    /// Builds a view of removed invites, then releases the users they referenced.
    fn take_invites(&mut self, invites: Vec<(String, Arc<InviteData>)>) -> CacheView<String, Invite> {
        let entries: Vec<_> = invites
            .into_iter()
            .map(|(code, invite)| {
                let refs = self.invite_refs(&invite);
                (code, invite, refs)
            })
            .collect();
        for (_, invite, _) in &entries {
            self.release_invite_refs(invite);
        }

        CacheView::from_records(entries)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::tests::user;
    use crate::cache::Cache;
    use crate::model::id::{ChannelId, GuildId, UserId};
    use crate::model::invite::Invite;
    use crate::model::Timestamp;

    fn invite(code: &str, guild_id: Option<u64>, channel_id: u64, inviter_id: u64) -> Invite {
        Invite {
            code: code.to_string(),
            guild_id: guild_id.map(GuildId::new),
            channel_id: ChannelId::new(channel_id),
            inviter: Some(user(inviter_id)),
            target_type: None,
            target_user: None,
            uses: 0,
            max_uses: 0,
            max_age: 0,
            temporary: false,
            created_at: Timestamp::from_unix_timestamp(1_000).unwrap(),
        }
    }

    #[test]
    fn invites_reference_their_users() {
        let mut cache = Cache::new();
        cache.set_invite(invite("a", Some(1), 10, 7));
        cache.set_invite(invite("b", Some(1), 11, 7));
        assert_eq!(cache.user_ref_count(UserId::new(7)), Some(2));

        // Refreshing an invite keeps a single reference per user.
        cache.set_invite(invite("a", Some(1), 10, 7));
        assert_eq!(cache.user_ref_count(UserId::new(7)), Some(2));

        assert_eq!(cache.delete_invite("a"), Some(invite("a", Some(1), 10, 7)));
        assert_eq!(cache.delete_invite("a"), None);
        cache.delete_invite("b");
        assert_eq!(cache.get_user(UserId::new(7)), None);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn invites_without_guild() {
        let mut cache = Cache::new();
        cache.set_invite(invite("dm", None, 10, 7));

        assert!(cache.get_invite("dm").is_some());
        assert_eq!(cache.get_invites_view().len(), 1);
        assert_eq!(cache.guild_record_count(), 0);

        assert_eq!(cache.clear_invites().len(), 1);
        assert_eq!(cache.user_count(), 0);
    }

    #[test]
    fn invites_by_channel() {
        let mut cache = Cache::new();
        cache.set_invite(invite("a", Some(1), 10, 7));
        cache.set_invite(invite("b", Some(1), 10, 8));
        cache.set_invite(invite("c", Some(1), 11, 8));

        assert_eq!(cache.get_invites_view_for_channel(GuildId::new(1), ChannelId::new(10)).len(), 2);

        let cleared = cache.clear_invites_for_channel(GuildId::new(1), ChannelId::new(10));
        assert_eq!(cleared.get(&"b".to_string()), Some(invite("b", Some(1), 10, 8)));
        assert_eq!(cache.get_invites_view_for_guild(GuildId::new(1)).len(), 1);
        assert_eq!(cache.get_user(UserId::new(7)), None);
        assert!(cache.get_user(UserId::new(8)).is_some());

        assert_eq!(cache.clear_invites_for_guild(GuildId::new(1)).len(), 1);
        assert_eq!(cache.user_count(), 0);
        assert_eq!(cache.guild_record_count(), 0);
    }
}
