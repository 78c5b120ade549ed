//! Members, presences and voice states: everything keyed by user within a guild.
//!
//! Members are shared cells. Voice states and messages reference the member of their user, which
//! keeps a member around (hidden from lookups) after it has been deleted, until the last
//! reference to it goes away.

use std::collections::hash_map::Entry;

use tracing::{error, trace};
#[cfg(feature = "tracing_instrument")]
use tracing::instrument;

use super::cell::SharedCell;
use super::data::{activity_custom_emoji, DataRecord, MemberData, MemberRefs, PresenceData, VoiceStateData};
use super::record::{collapse_map, GuildRecord};
use super::{Cache, CacheComponents, CacheView};
use crate::internal::prelude::*;
use crate::model::gateway::Presence;
use crate::model::guild::{CustomEmoji, Member};
use crate::model::id::{ChannelId, GuildId, UserId};
use crate::model::voice::VoiceState;

impl Cache {
    pub(crate) fn member_cell(&self, guild_id: GuildId, user_id: UserId) -> Option<&SharedCell<MemberData>> {
        self.guilds.get(&guild_id)?.members.as_ref()?.get(&user_id)
    }

    fn member_cell_mut(&mut self, guild_id: GuildId, user_id: UserId) -> Option<&mut SharedCell<MemberData>> {
        self.guilds.get_mut(&guild_id)?.members.as_mut()?.get_mut(&user_id)
    }

    /// Resolves a member reference, deleted members included.
    pub(crate) fn member_refs(&self, (guild_id, user_id): (GuildId, UserId)) -> Option<MemberRefs> {
        let cell = self.member_cell(guild_id, user_id)?;
        Some((Arc::clone(cell.value()), self.user_arc(user_id)?))
    }

    /// Retrieves a guild member.
    pub fn get_member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member> {
        gate!(self, CacheComponents::MEMBERS);

        let cell = self.member_cell(guild_id, user_id)?;
        if cell.value().deleted {
            return None;
        }

        Some(cell.value().to_entity(&self.user_arc(user_id)?))
    }

    fn members_view_of(&self, record: &GuildRecord) -> CacheView<UserId, Member> {
        let Some(members) = &record.members else {
            return CacheView::empty();
        };

        CacheView::from_records(members.iter().filter(|(_, cell)| !cell.value().deleted).filter_map(
            |(user_id, cell)| Some((*user_id, Arc::clone(cell.value()), self.user_arc(*user_id)?)),
        ))
    }

    /// A view of every guild's members, keyed by guild.
    pub fn get_members_view(&self) -> CacheView<GuildId, CacheView<UserId, Member>> {
        gate!(self, CacheComponents::MEMBERS, CacheView::empty());

        CacheView::from_values(self.guilds.iter().filter_map(|(guild_id, record)| {
            let view = self.members_view_of(record);
            (!view.is_empty()).then(|| (*guild_id, Arc::new(view)))
        }))
    }

    /// A view of a guild's members.
    pub fn get_members_view_for_guild(&self, guild_id: GuildId) -> CacheView<UserId, Member> {
        gate!(self, CacheComponents::MEMBERS, CacheView::empty());

        self.guilds.get(&guild_id).map_or_else(CacheView::empty, |record| self.members_view_of(record))
    }

    /// Stores a guild member and their user.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self, member), fields(guild_id = %member.guild_id)))]
    pub fn set_member(&mut self, member: Member) {
        gate!(self, CacheComponents::MEMBERS, ());

        trace!(guild_id = %member.guild_id, user_id = %member.user.id, "Setting member");
        self.upsert_member(&member, false);
    }

    /// Inserts or refreshes a member cell, keeping its reference count.
    ///
    /// `as_reference` is set when the member only arrives embedded in another entity. A member
    /// first seen that way stays hidden until it is set directly, while a visible member stays
    /// visible.
    fn upsert_member(&mut self, member: &Member, as_reference: bool) {
        let (guild_id, user_id) = (member.guild_id, member.user.id);
        if self.member_cell(guild_id, user_id).is_some() {
            self.users.upsert(user_id, member.user.clone());
        } else {
            self.acquire_user(&member.user);
        }

        let mut data = MemberData::from_entity(member);
        let members = self.guild_record_mut(guild_id).members.get_or_insert_with(FxHashMap::default);
        match members.entry(user_id) {
            Entry::Occupied(entry) => {
                let cell = entry.into_mut();
                data.deleted = as_reference && cell.value().deleted;
                cell.set(data);
            },
            Entry::Vacant(entry) => {
                data.deleted = as_reference;
                entry.insert(SharedCell::wrap(data));
            },
        }
    }

    /// Stores a member embedded in another entity and takes a reference to it.
    pub(crate) fn acquire_member(&mut self, member: &Member) {
        self.upsert_member(member, true);
        if let Some(cell) = self.member_cell_mut(member.guild_id, member.user.id) {
            cell.increment(1);
        }
    }

    /// Gives up a reference to a member, dropping it if it was deleted and nothing else
    /// references it.
    pub(crate) fn release_member(&mut self, (guild_id, user_id): (GuildId, UserId)) {
        let Some(cell) = self.member_cell_mut(guild_id, user_id) else {
            error!(%guild_id, %user_id, "Released a reference to an uncached member");
            return;
        };

        cell.decrement(1);
        self.collect_member(guild_id, user_id);
    }

    /// Removes a member which is deleted and no longer referenced, releasing its user.
    fn collect_member(&mut self, guild_id: GuildId, user_id: UserId) {
        let Some(record) = self.guilds.get_mut(&guild_id) else {
            return;
        };
        let Some(members) = &mut record.members else {
            return;
        };

        let unreferenced = members.get(&user_id).is_some_and(|cell| cell.value().deleted && cell.ref_count() == 0);
        if !unreferenced {
            return;
        }

        members.remove(&user_id);
        collapse_map(&mut record.members);
        trace!(%guild_id, %user_id, "Removed unreferenced member");

        self.release_user(user_id);
        self.remove_guild_record_if_empty(guild_id);
    }

    /// Replaces a guild member, returning the old and new copies.
    pub fn update_member(&mut self, member: Member) -> (Option<Member>, Option<Member>) {
        gate!(self, CacheComponents::MEMBERS, (None, None));

        let (guild_id, user_id) = (member.guild_id, member.user.id);
        let before = self.get_member(guild_id, user_id);
        self.set_member(member);
        (before, self.get_member(guild_id, user_id))
    }

    /// Removes a guild member.
    ///
    /// A member still referenced by a voice state or message is only hidden; it is dropped for
    /// good once those references are gone.
    pub fn delete_member(&mut self, guild_id: GuildId, user_id: UserId) -> Option<Member> {
        gate!(self, CacheComponents::MEMBERS);

        let cell = self.member_cell_mut(guild_id, user_id)?;
        if cell.value().deleted {
            return None;
        }

        let data = Arc::clone(cell.value());
        cell.make_mut().deleted = true;

        let built = self.user_arc(user_id).map(|user| data.to_entity(&user));
        self.collect_member(guild_id, user_id);
        built
    }

    /// Removes every guild member, keyed by guild.
    pub fn clear_members(&mut self) -> CacheView<GuildId, CacheView<UserId, Member>> {
        gate!(self, CacheComponents::MEMBERS, CacheView::empty());

        let guild_ids: Vec<_> =
            self.guilds.iter().filter(|(_, record)| record.members.is_some()).map(|(guild_id, _)| *guild_id).collect();

        CacheView::from_values(guild_ids.into_iter().filter_map(|guild_id| {
            let view = self.clear_members_for_guild(guild_id);
            (!view.is_empty()).then(|| (guild_id, Arc::new(view)))
        }))
    }

    /// Removes every member of a guild.
    pub fn clear_members_for_guild(&mut self, guild_id: GuildId) -> CacheView<UserId, Member> {
        gate!(self, CacheComponents::MEMBERS, CacheView::empty());

        let Some(members) = self.guilds.get_mut(&guild_id).and_then(|record| record.members.as_mut()) else {
            return CacheView::empty();
        };

        let mut cleared = Vec::new();
        for (user_id, cell) in members.iter_mut() {
            if cell.value().deleted {
                continue;
            }

            cleared.push((*user_id, Arc::clone(cell.value())));
            cell.make_mut().deleted = true;
        }

        // Resolve users before collection can drop them.
        let entries: Vec<_> = cleared
            .iter()
            .filter_map(|(user_id, data)| Some((*user_id, Arc::clone(data), self.user_arc(*user_id)?)))
            .collect();
        for (user_id, _) in cleared {
            self.collect_member(guild_id, user_id);
        }

        // Members still referenced elsewhere stay behind, hidden.
        self.remove_cleared_guild_record(guild_id, |record| {
            record.members.as_ref().map_or(true, |members| members.values().all(|cell| cell.value().deleted))
        });
        CacheView::from_records(entries)
    }

    /// Replaces every member of a guild with `members`.
    ///
    /// Members missing from `members` are deleted as if by [`Self::delete_member`]. An empty
    /// `members` leaves the guild with a known, empty member list.
    pub fn replace_all_members(&mut self, guild_id: GuildId, members: impl IntoIterator<Item = Member>) {
        gate!(self, CacheComponents::MEMBERS, ());

        let mut incoming = Vec::new();
        for mut member in members {
            member.guild_id = guild_id;
            incoming.push(member);
        }
        let incoming_ids: FxHashSet<_> = incoming.iter().map(|member| member.user.id).collect();

        let stale: Vec<_> = self
            .guilds
            .get(&guild_id)
            .and_then(|record| record.members.as_ref())
            .map(|members| {
                members
                    .iter()
                    .filter(|(user_id, cell)| !cell.value().deleted && !incoming_ids.contains(*user_id))
                    .map(|(user_id, _)| *user_id)
                    .collect()
            })
            .unwrap_or_default();
        for user_id in stale {
            if let Some(cell) = self.member_cell_mut(guild_id, user_id) {
                cell.make_mut().deleted = true;
            }
            self.collect_member(guild_id, user_id);
        }

        for member in &incoming {
            self.upsert_member(member, false);
        }

        self.guild_record_mut(guild_id).members.get_or_insert_with(FxHashMap::default);
    }

    fn presence_emojis(&self, presence: &PresenceData) -> Vec<Arc<CustomEmoji>> {
        presence.custom_emoji_ids().filter_map(|emoji_id| self.activity_emojis.arc(emoji_id)).collect()
    }

    /// Retrieves a member's presence.
    pub fn get_presence(&self, guild_id: GuildId, user_id: UserId) -> Option<Presence> {
        gate!(self, CacheComponents::PRESENCES);

        let presence = self.guilds.get(&guild_id)?.presences.as_ref()?.get(&user_id)?;
        Some(presence.to_entity(&self.presence_emojis(presence)))
    }

    fn presences_view_of(&self, record: &GuildRecord) -> CacheView<UserId, Presence> {
        let Some(presences) = &record.presences else {
            return CacheView::empty();
        };

        CacheView::from_records(presences.iter().map(|(user_id, presence)| {
            (*user_id, Arc::clone(presence), self.presence_emojis(presence))
        }))
    }

    /// A view of every guild's presences, keyed by guild.
    pub fn get_presences_view(&self) -> CacheView<GuildId, CacheView<UserId, Presence>> {
        gate!(self, CacheComponents::PRESENCES, CacheView::empty());

        CacheView::from_values(self.guilds.iter().filter_map(|(guild_id, record)| {
            let view = self.presences_view_of(record);
            (!view.is_empty()).then(|| (*guild_id, Arc::new(view)))
        }))
    }

    /// A view of a guild's presences.
    pub fn get_presences_view_for_guild(&self, guild_id: GuildId) -> CacheView<UserId, Presence> {
        gate!(self, CacheComponents::PRESENCES, CacheView::empty());

        self.guilds.get(&guild_id).map_or_else(CacheView::empty, |record| self.presences_view_of(record))
    }

    /// Stores a member's presence, along with the custom emojis of its activities.
    pub fn set_presence(&mut self, presence: Presence) {
        gate!(self, CacheComponents::PRESENCES, ());

        trace!(guild_id = %presence.guild_id, user_id = %presence.user_id, "Setting presence");
        self.insert_presence(&presence);
    }

    fn insert_presence(&mut self, presence: &Presence) {
        for activity in &presence.activities {
            if let Some(emoji) = activity_custom_emoji(activity) {
                self.activity_emojis.acquire(emoji.id, emoji);
            }
        }

        let data = Arc::new(PresenceData::from_entity(presence));
        let old = self
            .guild_record_mut(presence.guild_id)
            .presences
            .get_or_insert_with(FxHashMap::default)
            .insert(presence.user_id, data);
        if let Some(old) = old {
            self.release_presence_refs(&old);
        }
    }

    fn release_presence_refs(&mut self, presence: &PresenceData) {
        for emoji_id in presence.custom_emoji_ids() {
            self.activity_emojis.release(emoji_id, 1, false);
        }
    }

    /// Replaces a member's presence, returning the old and new copies.
    pub fn update_presence(&mut self, presence: Presence) -> (Option<Presence>, Option<Presence>) {
        gate!(self, CacheComponents::PRESENCES, (None, None));

        let (guild_id, user_id) = (presence.guild_id, presence.user_id);
        let before = self.get_presence(guild_id, user_id);
        self.set_presence(presence);
        (before, self.get_presence(guild_id, user_id))
    }

    /// Removes a member's presence.
    pub fn delete_presence(&mut self, guild_id: GuildId, user_id: UserId) -> Option<Presence> {
        gate!(self, CacheComponents::PRESENCES);

        let record = self.guilds.get_mut(&guild_id)?;
        let presence = record.presences.as_mut()?.remove(&user_id)?;
        collapse_map(&mut record.presences);

        let built = presence.to_entity(&self.presence_emojis(&presence));
        self.release_presence_refs(&presence);
        self.remove_guild_record_if_empty(guild_id);
        Some(built)
    }

    /// Removes every presence, keyed by guild.
    pub fn clear_presences(&mut self) -> CacheView<GuildId, CacheView<UserId, Presence>> {
        gate!(self, CacheComponents::PRESENCES, CacheView::empty());

        let guild_ids: Vec<_> = self
            .guilds
            .iter()
            .filter(|(_, record)| record.presences.is_some())
            .map(|(guild_id, _)| *guild_id)
            .collect();

        CacheView::from_values(guild_ids.into_iter().filter_map(|guild_id| {
            let view = self.clear_presences_for_guild(guild_id);
            (!view.is_empty()).then(|| (guild_id, Arc::new(view)))
        }))
    }

    /// Removes every presence in a guild.
    pub fn clear_presences_for_guild(&mut self, guild_id: GuildId) -> CacheView<UserId, Presence> {
        gate!(self, CacheComponents::PRESENCES, CacheView::empty());

        let Some(presences) = self.guilds.get_mut(&guild_id).and_then(|record| record.presences.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.presences.is_none());

        let entries: Vec<_> = presences
            .into_iter()
            .map(|(user_id, presence)| {
                let emojis = self.presence_emojis(&presence);
                (user_id, presence, emojis)
            })
            .collect();
        for (_, presence, _) in &entries {
            self.release_presence_refs(presence);
        }

        CacheView::from_records(entries)
    }

    /// Replaces every presence in a guild with `presences`.
    pub fn replace_all_presences(&mut self, guild_id: GuildId, presences: impl IntoIterator<Item = Presence>) {
        gate!(self, CacheComponents::PRESENCES, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.presences.take());
        self.guild_record_mut(guild_id).presences = Some(FxHashMap::default());

        for mut presence in presences {
            presence.guild_id = guild_id;
            self.insert_presence(&presence);
        }

        for presence in old.into_iter().flat_map(FxHashMap::into_values) {
            self.release_presence_refs(&presence);
        }
    }

    /// Retrieves a member's voice state.
    pub fn get_voice_state(&self, guild_id: GuildId, user_id: UserId) -> Option<VoiceState> {
        gate!(self, CacheComponents::VOICE_STATES);

        let state = self.guilds.get(&guild_id)?.voice_states.as_ref()?.get(&user_id)?;
        Some(state.to_entity(&self.member_refs(state.member_key)?))
    }

    fn voice_states_view_of(
        &self,
        record: &GuildRecord,
        channel_id: Option<ChannelId>,
    ) -> CacheView<UserId, VoiceState> {
        let Some(states) = &record.voice_states else {
            return CacheView::empty();
        };

        CacheView::from_records(
            states
                .iter()
                .filter(|(_, state)| channel_id.is_none() || state.channel_id == channel_id)
                .filter_map(|(user_id, state)| Some((*user_id, Arc::clone(state), self.member_refs(state.member_key)?))),
        )
    }

    /// A view of every guild's voice states, keyed by guild.
    pub fn get_voice_states_view(&self) -> CacheView<GuildId, CacheView<UserId, VoiceState>> {
        gate!(self, CacheComponents::VOICE_STATES, CacheView::empty());

        CacheView::from_values(self.guilds.iter().filter_map(|(guild_id, record)| {
            let view = self.voice_states_view_of(record, None);
            (!view.is_empty()).then(|| (*guild_id, Arc::new(view)))
        }))
    }

    /// A view of a guild's voice states.
    pub fn get_voice_states_view_for_guild(&self, guild_id: GuildId) -> CacheView<UserId, VoiceState> {
        gate!(self, CacheComponents::VOICE_STATES, CacheView::empty());

        self.guilds.get(&guild_id).map_or_else(CacheView::empty, |record| self.voice_states_view_of(record, None))
    }

    /// A view of the voice states of the members connected to a channel.
    pub fn get_voice_states_view_for_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> CacheView<UserId, VoiceState> {
        gate!(self, CacheComponents::VOICE_STATES, CacheView::empty());

        self.guilds
            .get(&guild_id)
            .map_or_else(CacheView::empty, |record| self.voice_states_view_of(record, Some(channel_id)))
    }

    /// Stores a member's voice state, along with the member it carries.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self, state), fields(guild_id = %state.guild_id)))]
    pub fn set_voice_state(&mut self, state: VoiceState) {
        gate!(self, CacheComponents::VOICE_STATES, ());

        trace!(guild_id = %state.guild_id, user_id = %state.user_id, "Setting voice state");
        self.insert_voice_state(&state);
    }

    fn insert_voice_state(&mut self, state: &VoiceState) {
        self.acquire_member(&state.member);

        let data = Arc::new(VoiceStateData::from_entity(state));
        let old = self
            .guild_record_mut(state.guild_id)
            .voice_states
            .get_or_insert_with(FxHashMap::default)
            .insert(state.user_id, data);
        if let Some(old) = old {
            self.release_member(old.member_key);
        }
    }

    /// Replaces a member's voice state, returning the old and new copies.
    pub fn update_voice_state(&mut self, state: VoiceState) -> (Option<VoiceState>, Option<VoiceState>) {
        gate!(self, CacheComponents::VOICE_STATES, (None, None));

        let (guild_id, user_id) = (state.guild_id, state.user_id);
        let before = self.get_voice_state(guild_id, user_id);
        self.set_voice_state(state);
        (before, self.get_voice_state(guild_id, user_id))
    }

    /// Removes a member's voice state.
    pub fn delete_voice_state(&mut self, guild_id: GuildId, user_id: UserId) -> Option<VoiceState> {
        gate!(self, CacheComponents::VOICE_STATES);

        let record = self.guilds.get_mut(&guild_id)?;
        let state = record.voice_states.as_mut()?.remove(&user_id)?;
        collapse_map(&mut record.voice_states);

        let built = self.member_refs(state.member_key).map(|refs| state.to_entity(&refs));
        self.release_member(state.member_key);
        self.remove_guild_record_if_empty(guild_id);
        built
    }

    /// Removes every voice state, keyed by guild.
    pub fn clear_voice_states(&mut self) -> CacheView<GuildId, CacheView<UserId, VoiceState>> {
        gate!(self, CacheComponents::VOICE_STATES, CacheView::empty());

        let guild_ids: Vec<_> = self
            .guilds
            .iter()
            .filter(|(_, record)| record.voice_states.is_some())
            .map(|(guild_id, _)| *guild_id)
            .collect();

        CacheView::from_values(guild_ids.into_iter().filter_map(|guild_id| {
            let view = self.clear_voice_states_where(guild_id, None);
            (!view.is_empty()).then(|| (guild_id, Arc::new(view)))
        }))
    }

    /// Removes every voice state in a guild.
    pub fn clear_voice_states_for_guild(&mut self, guild_id: GuildId) -> CacheView<UserId, VoiceState> {
        gate!(self, CacheComponents::VOICE_STATES, CacheView::empty());

        self.clear_voice_states_where(guild_id, None)
    }

    /// Removes the voice states of every member connected to a channel.
    pub fn clear_voice_states_for_channel(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> CacheView<UserId, VoiceState> {
        gate!(self, CacheComponents::VOICE_STATES, CacheView::empty());

        self.clear_voice_states_where(guild_id, Some(channel_id))
    }

    fn clear_voice_states_where(&mut self, guild_id: GuildId, channel_id: Option<ChannelId>) -> CacheView<UserId, VoiceState> {
        let Some(record) = self.guilds.get_mut(&guild_id) else {
            return CacheView::empty();
        };
        let Some(states) = &mut record.voice_states else {
            return CacheView::empty();
        };

        let user_ids: Vec<_> = states
            .iter()
            .filter(|(_, state)| channel_id.is_none() || state.channel_id == channel_id)
            .map(|(user_id, _)| *user_id)
            .collect();
        let removed: Vec<_> =
            user_ids.into_iter().filter_map(|user_id| Some((user_id, states.remove(&user_id)?))).collect();
        collapse_map(&mut record.voice_states);

        // Resolve members before releasing them.
        let mut entries = Vec::with_capacity(removed.len());
        for (user_id, state) in &removed {
            if let Some(refs) = self.member_refs(state.member_key) {
                entries.push((*user_id, Arc::clone(state), refs));
            }
        }
        for (_, state) in removed {
            self.release_member(state.member_key);
        }

        self.remove_cleared_guild_record(guild_id, |record| {
            record.voice_states.as_ref().map_or(true, |states| {
                channel_id.is_some() && states.values().all(|state| state.channel_id != channel_id)
            })
        });
        CacheView::from_records(entries)
    }

    /// Replaces every voice state in a guild with `states`.
    pub fn replace_all_voice_states(&mut self, guild_id: GuildId, states: impl IntoIterator<Item = VoiceState>) {
        gate!(self, CacheComponents::VOICE_STATES, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.voice_states.take());
        self.guild_record_mut(guild_id).voice_states = Some(FxHashMap::default());

        for mut state in states {
            state.guild_id = guild_id;
            self.insert_voice_state(&state);
        }

        for state in old.into_iter().flat_map(FxHashMap::into_values) {
            self.release_member(state.member_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::tests::{member, user};
    use crate::cache::Cache;
    use crate::model::gateway::{Activity, ActivityEmoji, ActivityType, OnlineStatus, Presence};
    use crate::model::id::{ChannelId, EmojiId, GuildId, UserId};
    use crate::model::voice::VoiceState;

    fn voice_state(guild_id: u64, user_id: u64, channel_id: u64) -> VoiceState {
        VoiceState {
            guild_id: GuildId::new(guild_id),
            channel_id: Some(ChannelId::new(channel_id)),
            user_id: UserId::new(user_id),
            member: member(guild_id, user_id),
            session_id: "session".to_string(),
            deaf: false,
            mute: false,
            self_deaf: false,
            self_mute: false,
            self_stream: false,
            self_video: false,
            suppress: false,
            request_to_speak_timestamp: None,
        }
    }

    fn presence(guild_id: u64, user_id: u64, emoji_id: Option<u64>) -> Presence {
        Presence {
            user_id: UserId::new(user_id),
            guild_id: GuildId::new(guild_id),
            status: OnlineStatus::Online,
            activities: vec![Activity {
                name: "Custom Status".to_string(),
                kind: ActivityType::Custom,
                url: None,
                created_at: 0,
                details: None,
                state: Some("busy".to_string()),
                emoji: emoji_id.map(|id| ActivityEmoji {
                    name: "blob".to_string(),
                    id: Some(EmojiId::new(id)),
                    animated: false,
                }),
            }],
            client_status: None,
        }
    }

    #[test]
    fn members_share_users_across_guilds() {
        let mut cache = Cache::new();
        cache.set_member(member(1, 42));
        cache.set_member(member(2, 42));
        assert_eq!(cache.user_count(), 1);
        assert_eq!(cache.user_ref_count(UserId::new(42)), Some(2));

        // Refreshing a member doesn't take another reference.
        cache.set_member(member(1, 42));
        assert_eq!(cache.user_ref_count(UserId::new(42)), Some(2));

        assert_eq!(cache.delete_member(GuildId::new(1), UserId::new(42)), Some(member(1, 42)));
        assert_eq!(cache.user_ref_count(UserId::new(42)), Some(1));
        assert_eq!(cache.delete_member(GuildId::new(1), UserId::new(42)), None);

        cache.delete_member(GuildId::new(2), UserId::new(42));
        assert_eq!(cache.get_user(UserId::new(42)), None);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn voice_state_keeps_deleted_member_alive() {
        let mut cache = Cache::new();
        cache.set_member(member(1, 7));
        cache.set_voice_state(voice_state(1, 7, 100));

        cache.delete_member(GuildId::new(1), UserId::new(7));
        assert_eq!(cache.get_member(GuildId::new(1), UserId::new(7)), None);
        assert!(cache.get_members_view_for_guild(GuildId::new(1)).is_empty());

        let state = cache.get_voice_state(GuildId::new(1), UserId::new(7)).unwrap();
        assert_eq!(state.member, member(1, 7));
        assert!(cache.get_user(UserId::new(7)).is_some());

        cache.delete_voice_state(GuildId::new(1), UserId::new(7));
        assert_eq!(cache.get_user(UserId::new(7)), None);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn members_from_voice_states_stay_hidden() {
        let mut cache = Cache::new();
        cache.set_voice_state(voice_state(1, 7, 100));
        assert_eq!(cache.get_member(GuildId::new(1), UserId::new(7)), None);

        cache.set_member(member(1, 7));
        assert!(cache.get_member(GuildId::new(1), UserId::new(7)).is_some());

        // Updating the voice state keeps the member visible.
        cache.set_voice_state(voice_state(1, 7, 101));
        assert!(cache.get_member(GuildId::new(1), UserId::new(7)).is_some());
        assert_eq!(cache.user_ref_count(UserId::new(7)), Some(1));
    }

    #[test]
    fn voice_states_by_channel() {
        let mut cache = Cache::new();
        cache.set_voice_state(voice_state(1, 7, 100));
        cache.set_voice_state(voice_state(1, 8, 100));
        cache.set_voice_state(voice_state(1, 9, 200));

        let view = cache.get_voice_states_view_for_channel(GuildId::new(1), ChannelId::new(100));
        assert_eq!(view.len(), 2);

        let cleared = cache.clear_voice_states_for_channel(GuildId::new(1), ChannelId::new(100));
        assert_eq!(cleared.len(), 2);
        assert!(cleared.get(&UserId::new(7)).is_some());
        assert_eq!(cache.get_voice_states_view_for_guild(GuildId::new(1)).len(), 1);
        assert_eq!(cache.user_count(), 1);

        assert_eq!(cache.clear_voice_states().len(), 1);
        assert_eq!(cache.user_count(), 0);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn presence_emojis_are_reference_counted() {
        let mut cache = Cache::new();
        cache.set_presence(presence(1, 7, Some(5)));
        cache.set_presence(presence(1, 8, Some(5)));
        assert_eq!(cache.activity_emojis.get(EmojiId::new(5)).unwrap().ref_count(), 2);

        // Replacing a presence releases the emojis of the old one.
        cache.set_presence(presence(1, 7, None));
        assert_eq!(cache.activity_emojis.get(EmojiId::new(5)).unwrap().ref_count(), 1);

        let removed = cache.delete_presence(GuildId::new(1), UserId::new(8)).unwrap();
        assert_eq!(removed, presence(1, 8, Some(5)));
        assert!(cache.activity_emojis.get(EmojiId::new(5)).is_none());

        cache.replace_all_presences(GuildId::new(1), [presence(1, 9, Some(6))]);
        assert!(cache.get_presence(GuildId::new(1), UserId::new(7)).is_none());
        assert_eq!(cache.get_presences_view().len(), 1);

        let cleared = cache.clear_presences();
        assert_eq!(cleared.get(&GuildId::new(1)).unwrap().get(&UserId::new(9)), Some(presence(1, 9, Some(6))));
        assert_eq!(cache.activity_emojis.len(), 0);
    }

    #[test]
    fn clearing_members_keeps_referenced_ones_hidden() {
        let mut cache = Cache::new();
        cache.set_member(member(1, 42));
        cache.set_voice_state(voice_state(1, 42, 100));

        assert_eq!(cache.clear_members_for_guild(GuildId::new(1)).len(), 1);
        assert!(cache.get_member(GuildId::new(1), UserId::new(42)).is_none());
        assert_eq!(cache.guild_record_count(), 1);

        assert_eq!(cache.clear_voice_states_for_guild(GuildId::new(1)).len(), 1);
        assert_eq!(cache.guild_record_count(), 0);
        assert!(cache.get_user(UserId::new(42)).is_none());
    }

    #[test]
    fn replace_all_members_deletes_missing_members() {
        let mut cache = Cache::new();
        cache.set_member(member(1, 7));
        cache.set_member(member(1, 8));
        cache.set_voice_state(voice_state(1, 8, 100));

        cache.replace_all_members(GuildId::new(1), [member(1, 9)]);
        assert!(cache.get_member(GuildId::new(1), UserId::new(7)).is_none());
        assert!(cache.get_member(GuildId::new(1), UserId::new(8)).is_none());
        assert!(cache.get_user(UserId::new(7)).is_none());
        // Still referenced by its voice state.
        assert!(cache.get_user(UserId::new(8)).is_some());
        assert_eq!(cache.get_members_view_for_guild(GuildId::new(1)).len(), 1);

        let cleared = cache.clear_members();
        assert_eq!(cleared.get(&GuildId::new(1)).map(|view| view.len()), Some(1));
        assert_eq!(cache.get_user(UserId::new(9)), None);
        assert_eq!(cache.get_user(UserId::new(8)), Some(user(8)));
    }
}
