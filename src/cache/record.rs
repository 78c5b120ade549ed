use super::cell::SharedCell;
use super::data::{MemberData, PresenceData, VoiceStateData};
use super::wrappers::SnowflakeSet;
use crate::internal::prelude::*;
use crate::model::guild::Guild;
use crate::model::id::{ChannelId, EmojiId, RoleId, StickerId, UserId};

/// What the cache knows about whether a guild can currently be served.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum Availability {
    #[default]
    Unknown,
    Unavailable,
    Available,
}

/// Everything the cache holds for a single guild.
///
/// Entities which can be looked up without knowing their guild (channels, roles, emojis, ...) are
/// stored globally and only tracked here by id. Entities keyed by user within a guild (members,
/// presences, voice states) are stored here directly.
///
/// A collection is `None` until its first entry arrives and goes back to `None` once its last
/// entry is removed. A record with no guild object, no known availability and no collections is
/// removed from the cache.
#[derive(Debug, Default)]
pub(crate) struct GuildRecord {
    pub guild: Option<Arc<Guild>>,
    pub availability: Availability,
    pub channels: Option<SnowflakeSet<ChannelId>>,
    pub threads: Option<SnowflakeSet<ChannelId>>,
    pub emojis: Option<SnowflakeSet<EmojiId>>,
    pub stickers: Option<SnowflakeSet<StickerId>>,
    pub roles: Option<SnowflakeSet<RoleId>>,
    /// Invite codes, in the order they were cached.
    pub invites: Option<Vec<String>>,
    pub members: Option<FxHashMap<UserId, SharedCell<MemberData>>>,
    pub presences: Option<FxHashMap<UserId, Arc<PresenceData>>>,
    pub voice_states: Option<FxHashMap<UserId, Arc<VoiceStateData>>>,
}

impl GuildRecord {
    pub fn is_empty(&self) -> bool {
        self.guild.is_none()
            && self.availability == Availability::Unknown
            && self.channels.is_none()
            && self.threads.is_none()
            && self.emojis.is_none()
            && self.stickers.is_none()
            && self.roles.is_none()
            && self.invites.is_none()
            && self.members.is_none()
            && self.presences.is_none()
            && self.voice_states.is_none()
    }

    /// The guild object, unless the guild is known to be unavailable.
    pub fn available_guild(&self) -> Option<&Arc<Guild>> {
        if self.availability == Availability::Unavailable {
            return None;
        }

        self.guild.as_ref()
    }

    /// The guild object, only if the guild is known to be unavailable.
    pub fn unavailable_guild(&self) -> Option<&Arc<Guild>> {
        if self.availability != Availability::Unavailable {
            return None;
        }

        self.guild.as_ref()
    }
}

/// Drops a per-user map once its last entry is removed.
pub(crate) fn collapse_map<V>(handle: &mut Option<FxHashMap<UserId, V>>) {
    if handle.as_ref().is_some_and(FxHashMap::is_empty) {
        *handle = None;
    }
}
