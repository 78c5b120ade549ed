use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_DM_CHANNEL_IDS, DEFAULT_MAX_MESSAGES};
use crate::internal::prelude::*;

bitflags! {
    /// The kinds of entity the [`Cache`] stores.
    ///
    /// Every operation on a kind whose component is disabled is a no-op: setters store nothing,
    /// getters return nothing and views are empty. Users are stored whenever something that
    /// references them is, so there is no component for them.
    ///
    /// In human readable formats such as JSON, the flags (de)serialize as their names joined by
    /// `|`, for example `"GUILDS | MEMBERS"`.
    ///
    /// [`Cache`]: super::Cache
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
    pub struct CacheComponents: u32 {
        /// Guild objects and their availability.
        const GUILDS = 1 << 0;
        /// Non-thread guild channels.
        const GUILD_CHANNELS = 1 << 1;
        /// Thread channels.
        const GUILD_THREADS = 1 << 2;
        /// Guild members.
        const MEMBERS = 1 << 3;
        /// Guild roles.
        const ROLES = 1 << 4;
        /// Guild invites.
        const INVITES = 1 << 5;
        /// Custom guild emojis.
        const EMOJIS = 1 << 6;
        /// Guild stickers.
        const STICKERS = 1 << 7;
        /// Member presences.
        const PRESENCES = 1 << 8;
        /// Member voice states.
        const VOICE_STATES = 1 << 9;
        /// Messages, bounded by [`Settings::max_messages`].
        const MESSAGES = 1 << 10;
        /// The current user.
        const ME = 1 << 11;
        /// The user to DM channel mapping, bounded by [`Settings::max_dm_channel_ids`].
        const DM_CHANNEL_IDS = 1 << 12;

        /// Every component.
        const ALL = Self::GUILDS.bits()
            | Self::GUILD_CHANNELS.bits()
            | Self::GUILD_THREADS.bits()
            | Self::MEMBERS.bits()
            | Self::ROLES.bits()
            | Self::INVITES.bits()
            | Self::EMOJIS.bits()
            | Self::STICKERS.bits()
            | Self::PRESENCES.bits()
            | Self::VOICE_STATES.bits()
            | Self::MESSAGES.bits()
            | Self::ME.bits()
            | Self::DM_CHANNEL_IDS.bits();
    }
}

/// Settings for the cache.
///
/// # Examples
///
/// Create new settings, specifying the maximum number of messages:
///
/// ```rust
/// use guildstate::cache::{CacheComponents, Settings};
///
/// let mut settings = Settings::default();
/// settings.max_messages = 10;
/// settings.components.remove(CacheComponents::PRESENCES);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Settings {
    /// The entity kinds to cache.
    ///
    /// Defaults to [`CacheComponents::ALL`].
    pub components: CacheComponents,
    /// The maximum number of messages to keep before the oldest are evicted.
    ///
    /// Defaults to 300.
    pub max_messages: usize,
    /// The maximum number of user to DM channel mappings to keep before the oldest are evicted.
    ///
    /// Defaults to 50.
    pub max_dm_channel_ids: usize,
}

impl Settings {
    /// Loads settings from a JSON document. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::from)
    }

    /// Whether every component in `components` is enabled.
    #[inline]
    pub fn is_enabled(&self, components: CacheComponents) -> bool {
        self.components.contains(components)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            components: CacheComponents::ALL,
            max_messages: DEFAULT_MAX_MESSAGES,
            max_dm_channel_ids: DEFAULT_MAX_DM_CHANNEL_IDS,
        }
    }
}
