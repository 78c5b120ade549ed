//! A cache containing data received from the gateway, kept in sync by the host feeding it events.
//!
//! The cache stores every entity kind in its own collection, with per guild bookkeeping in a
//! guild record. Entities referenced from many places (users, members, custom status emojis and
//! messages that are replied to) are stored once and reference counted, so they are dropped as
//! soon as the last entity pointing at them is.
//!
//! Every entity kind can be turned off through [`Settings::components`]. Operations on a disabled
//! kind do nothing and return nothing.
//!
//! Lookups return owned copies; bulk queries return [`CacheView`]s. Neither is ever affected by
//! later changes to the cache.
//!
//! # Use by hosts
//!
//! [`Cache`] is a plain single-threaded structure mutated through `&mut self`. Hosts which
//! process events on several tasks can wrap it in a [`SharedCache`], which runs each operation
//! under one lock.

use tracing::{debug, error};
#[cfg(feature = "tracing_instrument")]
use tracing::instrument;

use crate::internal::prelude::*;
use crate::model::channel::GuildChannel;
use crate::model::guild::{CustomEmoji, Role};
use crate::model::id::{ChannelId, EmojiId, GuildId, MessageId, RoleId, StickerId, UserId};
use crate::model::user::{CurrentUser, User};

mod cell;
mod channels;
mod data;
mod error;
mod expressions;
mod guilds;
mod invites;
mod members;
mod messages;
mod record;
mod settings;
mod shared;
mod users;
mod view;
mod wrappers;

use self::cell::{SharedCell, SharedPool};
use self::data::{DmChannelData, EmojiData, InviteData, MessageData, StickerData};
pub use self::error::CacheError;
use self::record::GuildRecord;
pub use self::settings::{CacheComponents, Settings};
pub use self::shared::SharedCache;
pub use self::view::{CacheView, Iter as CacheViewIter};
use self::wrappers::BoundedMap;

/// A user to DM channel mapping. The channel itself is only known once it has been received.
#[derive(Debug)]
pub(crate) struct DmEntry {
    channel_id: ChannelId,
    channel: Option<Arc<DmChannelData>>,
}

/// A cache containing data received from the gateway.
///
/// # Examples
///
/// ```rust
/// use guildstate::cache::Cache;
/// use guildstate::model::id::{GuildId, RoleId};
/// use guildstate::model::guild::Role;
///
/// let mut cache = Cache::new();
/// cache.set_role(Role {
///     id: RoleId::new(2),
///     guild_id: GuildId::new(1),
///     colour: 0,
///     hoist: false,
///     managed: false,
///     mentionable: false,
///     name: "moderator".to_string(),
///     permissions: "0".to_string(),
///     position: 1,
/// });
///
/// let roles = cache.get_roles_view_for_guild(GuildId::new(1));
/// assert_eq!(roles.get(&RoleId::new(2)).map(|role| role.name), Some("moderator".to_string()));
/// ```
#[derive(Debug)]
pub struct Cache {
    pub(crate) settings: Settings,
    // Guild records, created on first use and dropped once empty.
    pub(crate) guilds: FxHashMap<GuildId, GuildRecord>,
    // Entities addressable without their guild.
    pub(crate) channels: FxHashMap<ChannelId, Arc<GuildChannel>>,
    pub(crate) threads: FxHashMap<ChannelId, Arc<GuildChannel>>,
    pub(crate) roles: FxHashMap<RoleId, Arc<Role>>,
    pub(crate) emojis: FxHashMap<EmojiId, Arc<EmojiData>>,
    pub(crate) stickers: FxHashMap<StickerId, Arc<StickerData>>,
    pub(crate) invites: FxHashMap<String, Arc<InviteData>>,
    // Reference counted shared entities.
    pub(crate) users: SharedPool<UserId, User>,
    pub(crate) activity_emojis: SharedPool<EmojiId, CustomEmoji>,
    pub(crate) dm_channels: BoundedMap<UserId, DmEntry>,
    pub(crate) messages: BoundedMap<MessageId, SharedCell<MessageData>>,
    /// Messages which left `messages` while another cached message still replied to them.
    pub(crate) referenced_messages: FxHashMap<MessageId, SharedCell<MessageData>>,
    pub(crate) me: Option<Arc<CurrentUser>>,
}

impl Cache {
    /// Creates a new cache with the default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new cache instance with settings applied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use guildstate::cache::{Cache, CacheComponents, Settings};
    ///
    /// let mut settings = Settings::default();
    /// settings.max_messages = 10;
    /// settings.components = CacheComponents::GUILDS | CacheComponents::MEMBERS;
    ///
    /// let cache = Cache::new_with_settings(settings);
    /// assert_eq!(cache.settings().max_messages, 10);
    /// ```
    #[cfg_attr(feature = "tracing_instrument", instrument)]
    pub fn new_with_settings(settings: Settings) -> Self {
        Self {
            guilds: FxHashMap::default(),
            channels: FxHashMap::default(),
            threads: FxHashMap::default(),
            roles: FxHashMap::default(),
            emojis: FxHashMap::default(),
            stickers: FxHashMap::default(),
            invites: FxHashMap::default(),
            users: SharedPool::default(),
            activity_emojis: SharedPool::default(),
            dm_channels: BoundedMap::new(settings.max_dm_channel_ids),
            messages: BoundedMap::new(settings.max_messages),
            referenced_messages: FxHashMap::default(),
            me: None,
            settings,
        }
    }

    /// The settings the cache was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Empties every collection, keeping the settings.
    ///
    /// Does nothing when every component is disabled.
    #[cfg_attr(feature = "tracing_instrument", instrument(skip(self)))]
    pub fn clear(&mut self) {
        if self.settings.components.is_empty() {
            return;
        }

        debug!("Clearing every cache collection");
        *self = Self::new_with_settings(self.settings.clone());
    }

    /// The number of guilds the cache holds anything for, including guilds whose object hasn't
    /// been received.
    pub fn guild_record_count(&self) -> usize {
        self.guilds.len()
    }

    /// Gets the guild record for `guild_id`, creating it if needed.
    pub(crate) fn guild_record_mut(&mut self, guild_id: GuildId) -> &mut GuildRecord {
        self.guilds.entry(guild_id).or_default()
    }

    /// Drops the guild record for `guild_id` if it no longer holds anything.
    pub(crate) fn remove_guild_record_if_empty(&mut self, guild_id: GuildId) {
        if self.guilds.get(&guild_id).is_some_and(GuildRecord::is_empty) {
            self.guilds.remove(&guild_id);
        }
    }

    /// Drops the guild record for `guild_id` after one of its collections was cleared.
    ///
    /// `cleared` checks that the collection is really gone from the record.
    pub(crate) fn remove_cleared_guild_record(
        &mut self,
        guild_id: GuildId,
        cleared: impl FnOnce(&GuildRecord) -> bool,
    ) {
        let cleared = self.guilds.get(&guild_id).map_or(true, cleared);
        if !cleared {
            error!(%guild_id, "Guild record kept entries of a cleared collection");
        }

        debug_assert!(cleared, "guild record kept entries of a cleared collection");
        self.remove_guild_record_if_empty(guild_id);
    }

    /// Applies `f` to every guild record, then drops the records it left empty.
    ///
    /// `cleared` checks that `f` removed what it was meant to.
    pub(crate) fn retain_guild_records(
        &mut self,
        mut f: impl FnMut(&mut GuildRecord),
        cleared: impl Fn(&GuildRecord) -> bool,
    ) {
        self.guilds.retain(|guild_id, record| {
            f(record);

            let is_cleared = cleared(record);
            if !is_cleared {
                error!(%guild_id, "Guild record kept entries of a cleared collection");
            }

            debug_assert!(is_cleared, "guild record kept entries of a cleared collection");
            !record.is_empty()
        });
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new_with_settings(Settings::default())
    }
}
