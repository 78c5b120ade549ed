//! Models relating to guilds and types that it owns.

use serde::{Deserialize, Serialize};

use super::id::{ChannelId, EmojiId, GuildId, RoleId, UserId};
use super::user::User;
use super::Timestamp;
use crate::constants::CDN_URL;

/// Information about a Discord guild, such as a server.
///
/// Only the guild's own fields live here: channels, roles, members and the other child entities a
/// gateway snapshot carries are cached through their own [`Cache`] methods.
///
/// [Discord docs](https://discord.com/developers/docs/resources/guild#guild-object).
///
/// [`Cache`]: crate::cache::Cache
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Guild {
    /// The unique Id identifying the guild.
    pub id: GuildId,
    /// The name of the guild.
    pub name: String,
    /// The hash of the icon used by the guild.
    #[serde(default)]
    pub icon: Option<String>,
    /// The description of the guild, for community guilds.
    #[serde(default)]
    pub description: Option<String>,
    /// The Id of the [`User`] who owns the guild.
    pub owner_id: UserId,
    /// Id of a voice channel that's considered the AFK channel.
    #[serde(default)]
    pub afk_channel_id: Option<ChannelId>,
    /// The amount of seconds a user can not show any activity in a voice channel before being
    /// moved to an AFK channel.
    #[serde(default)]
    pub afk_timeout: u64,
    /// The channel that system messages are sent to.
    #[serde(default)]
    pub system_channel_id: Option<ChannelId>,
    /// The server's premium boosting level.
    #[serde(default)]
    pub premium_tier: u8,
    /// The preferred locale of the guild.
    #[serde(default)]
    pub preferred_locale: Option<String>,
    /// The features enabled for the guild, such as `COMMUNITY` or `VANITY_URL`.
    #[serde(default)]
    pub features: Vec<String>,
    /// The number of members in the guild.
    ///
    /// Only sent in the initial guild snapshot; later updates omit it.
    #[serde(default)]
    pub member_count: Option<u64>,
    /// The date that the current user joined the guild.
    ///
    /// Only sent in the initial guild snapshot; later updates omit it.
    #[serde(default)]
    pub joined_at: Option<Timestamp>,
    /// Whether the guild is considered large, past the gateway's member threshold.
    ///
    /// Only sent in the initial guild snapshot; later updates omit it.
    #[serde(default)]
    pub large: Option<bool>,
}

impl Guild {
    /// Returns the formatted URL of the guild's icon, if one exists.
    #[must_use]
    pub fn icon_url(&self) -> Option<String> {
        self.icon.as_ref().map(|icon| {
            let ext = if icon.starts_with("a_") { "gif" } else { "webp" };
            format!("{CDN_URL}/icons/{}/{icon}.{ext}", self.id)
        })
    }
}

/// Information about a role within a guild. A role represents a set of permissions, and can be
/// attached to one or multiple users.
///
/// [Discord docs](https://discord.com/developers/docs/topics/permissions#role-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Role {
    /// The Id of the role. Can be used to calculate the role's creation date.
    pub id: RoleId,
    /// The Id of the Guild the Role is in.
    pub guild_id: GuildId,
    /// The colour of the role, as an RGB integer.
    #[serde(default, rename = "color")]
    pub colour: u32,
    /// Indicator of whether the role is pinned above lesser roles.
    #[serde(default)]
    pub hoist: bool,
    /// Indicator of whether the role is managed by an integration service.
    #[serde(default)]
    pub managed: bool,
    /// Indicator of whether the role can be mentioned.
    #[serde(default)]
    pub mentionable: bool,
    /// The name of the role.
    pub name: String,
    /// The permission bitset of the role, as sent by the API.
    #[serde(default)]
    pub permissions: String,
    /// The role's position in the position list.
    #[serde(default)]
    pub position: u16,
}

/// Information about a member of a guild.
///
/// [Discord docs](https://discord.com/developers/docs/resources/guild#guild-member-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Member {
    /// Attached User struct.
    pub user: User,
    /// The unique Id of the guild that the member is a part of.
    pub guild_id: GuildId,
    /// The member's nickname, if present.
    #[serde(default)]
    pub nick: Option<String>,
    /// The guild avatar hash
    #[serde(default)]
    pub avatar: Option<String>,
    /// Vector of Ids of [`Role`]s given to the member.
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// Timestamp representing the date when the member joined.
    #[serde(default)]
    pub joined_at: Option<Timestamp>,
    /// Timestamp representing the date since the member is boosting the guild.
    #[serde(default)]
    pub premium_since: Option<Timestamp>,
    /// Indicator of whether the member can hear in voice channels.
    #[serde(default)]
    pub deaf: bool,
    /// Indicator of whether the member can speak in voice channels.
    #[serde(default)]
    pub mute: bool,
    /// Indicator that the member hasn't accepted the rules of the guild yet.
    #[serde(default)]
    pub pending: bool,
    /// When the user's timeout will expire and the user will be able to communicate in the guild
    /// again.
    #[serde(default)]
    pub communication_disabled_until: Option<Timestamp>,
}

impl Member {
    /// Retrieves the nickname of the user, falling back to their display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.nick {
            Some(nick) => nick.as_str(),
            None => self.user.display_name(),
        }
    }
}

/// Represents a custom guild emoji, which can either be created using the API, or via an
/// integration. Emojis created using the API only work within the guild it was created in.
///
/// [Discord docs](https://discord.com/developers/docs/resources/emoji#emoji-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Emoji {
    /// The Id of the emoji.
    pub id: EmojiId,
    /// The Id of the guild the emoji belongs to.
    pub guild_id: GuildId,
    /// The name of the emoji. It must be at least 2 characters long and can only contain
    /// alphanumeric characters and underscores.
    pub name: String,
    /// A list of [`Role`]s that are allowed to use the emoji. If there are no roles specified,
    /// then usage is unrestricted.
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// The user who created the emoji.
    #[serde(default)]
    pub user: Option<User>,
    /// Whether the emoji must be wrapped in colons.
    #[serde(default)]
    pub require_colons: bool,
    /// Whether the emoji is managed via an [`Integration`] service.
    ///
    /// [`Integration`]: https://discord.com/developers/docs/resources/guild#integration-object
    #[serde(default)]
    pub managed: bool,
    /// Whether the emoji is animated.
    #[serde(default)]
    pub animated: bool,
    /// Whether the emoji can be used. This may be false when the guild loses boosts, reducing the
    /// emoji limit.
    #[serde(default = "default_true")]
    pub available: bool,
}

impl Emoji {
    /// Generates a URL to the emoji's image.
    #[must_use]
    pub fn url(&self) -> String {
        emoji_url(self.id, self.animated)
    }
}

/// A custom emoji known only by its id and name, such as one attached to another user's
/// activity. The guild it belongs to is not necessarily cached.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CustomEmoji {
    /// The Id of the emoji.
    pub id: EmojiId,
    /// The name of the emoji, if known.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the emoji is animated.
    #[serde(default)]
    pub animated: bool,
}

impl CustomEmoji {
    /// Generates a URL to the emoji's image.
    #[must_use]
    pub fn url(&self) -> String {
        emoji_url(self.id, self.animated)
    }
}

fn emoji_url(id: EmojiId, animated: bool) -> String {
    let ext = if animated { "gif" } else { "png" };
    format!("{CDN_URL}/emojis/{id}.{ext}")
}

fn default_true() -> bool {
    true
}
