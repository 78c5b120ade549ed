use std::error::Error as StdError;
use std::fmt;

use crate::model::guild::Guild;
use crate::model::id::GuildId;

/// An error returned by a [`Cache`] lookup that could not be answered safely.
///
/// [`Cache`]: super::Cache
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum CacheError {
    /// The guild is known to be unavailable, typically because of an upstream outage.
    ///
    /// The cached guild object, if one is still around, is attached but may be out of date.
    UnavailableGuild {
        /// The Id of the unavailable guild.
        guild_id: GuildId,
        /// The last guild object received before the guild became unavailable.
        guild: Option<Box<Guild>>,
    },
}

impl CacheError {
    /// The Id of the guild the error is about.
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::UnavailableGuild {
                guild_id, ..
            } => *guild_id,
        }
    }

    /// Takes the possibly stale guild object carried by the error.
    pub fn into_stale_guild(self) -> Option<Guild> {
        match self {
            Self::UnavailableGuild {
                guild, ..
            } => guild.map(|guild| *guild),
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnavailableGuild {
                guild_id, ..
            } => write!(f, "Guild {guild_id} is unavailable"),
        }
    }
}

impl StdError for CacheError {}
