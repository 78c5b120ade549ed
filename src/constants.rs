//! A set of constants used by the library.

/// The base URL of the content delivery network avatars, icons and emoji images are served from.
pub const CDN_URL: &str = "https://cdn.discordapp.com";

/// The default maximum number of messages kept in the message cache.
pub const DEFAULT_MAX_MESSAGES: usize = 300;

/// The default maximum number of user to DM channel id mappings kept in the cache.
pub const DEFAULT_MAX_DM_CHANNEL_IDS: usize = 50;

/// Discord's epoch, "2015-01-01T00:00:00+00:00", in milliseconds since the Unix epoch.
pub(crate) const DISCORD_EPOCH: u64 = 1_420_070_400_000;
