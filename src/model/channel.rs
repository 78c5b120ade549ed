//! Models relating to channels and types within channels.

use serde::{Deserialize, Serialize};

use super::id::{ChannelId, GenericId, GuildId, MessageId, UserId};
use super::user::User;
use super::Timestamp;

enum_number! {
    /// A representation of a type of channel.
    ///
    /// [Discord docs](https://discord.com/developers/docs/resources/channel#channel-object-channel-types).
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum ChannelType {
        /// An indicator that the channel is a text [`GuildChannel`].
        Text = 0,
        /// An indicator that the channel is a [`PrivateChannel`].
        Private = 1,
        /// An indicator that the channel is a voice [`GuildChannel`].
        Voice = 2,
        /// An indicator that the channel is a group DM.
        GroupDm = 3,
        /// An indicator that the channel is a channel category.
        Category = 4,
        /// An indicator that the channel is a `NewsChannel`.
        News = 5,
        /// An indicator that the channel is a news thread [`GuildChannel`].
        NewsThread = 10,
        /// An indicator that the channel is a public thread [`GuildChannel`].
        PublicThread = 11,
        /// An indicator that the channel is a private thread [`GuildChannel`].
        PrivateThread = 12,
        /// An indicator that the channel is a stage [`GuildChannel`].
        Stage = 13,
        /// An indicator that the channel is a directory [`GuildChannel`] in a hub.
        Directory = 14,
        /// An indicator that the channel is a forum [`GuildChannel`].
        Forum = 15,
        _ => Unknown(u8),
    }
}

impl ChannelType {
    /// Whether channels of this type are threads.
    #[must_use]
    pub fn is_thread(self) -> bool {
        matches!(self, Self::NewsThread | Self::PublicThread | Self::PrivateThread)
    }

    /// Whether channels of this type carry audio.
    #[must_use]
    pub fn is_voice(self) -> bool {
        matches!(self, Self::Voice | Self::Stage)
    }
}

enum_number! {
    /// The type of edit being made to a Channel's permissions.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum PermissionOverwriteType {
        /// A role which is having its permission overwrites altered.
        Role = 0,
        /// A member which is having its permission overwrites altered.
        Member = 1,
        _ => Unknown(u8),
    }
}

/// A channel-specific permission overwrite for a member or role.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#overwrite-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PermissionOverwrite {
    /// The role or member id the overwrite applies to.
    pub id: GenericId,
    #[serde(rename = "type")]
    pub kind: PermissionOverwriteType,
    /// Allowed permission bitset.
    #[serde(default)]
    pub allow: String,
    /// Denied permission bitset.
    #[serde(default)]
    pub deny: String,
}

/// Metadata only present on thread channels.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#thread-metadata-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ThreadMetadata {
    /// Whether the thread is archived.
    #[serde(default)]
    pub archived: bool,
    /// Duration in minutes to automatically archive the thread after recent activity.
    #[serde(default)]
    pub auto_archive_duration: u16,
    /// The last time the thread's archive status was last changed.
    #[serde(default)]
    pub archive_timestamp: Option<Timestamp>,
    /// When a thread is locked, only users with `MANAGE_THREADS` can unarchive it.
    #[serde(default)]
    pub locked: bool,
}

/// Represents a guild's text, news, voice, category, forum or thread channel.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#channel-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GuildChannel {
    /// The unique Id of the channel.
    pub id: ChannelId,
    /// The Id of the guild the channel is located in.
    pub guild_id: GuildId,
    /// The type of the channel.
    #[serde(rename = "type")]
    pub kind: ChannelType,
    /// The name of the channel.
    pub name: String,
    /// The position of the channel.
    ///
    /// The default text channel will _almost always_ have a position of `0`.
    #[serde(default)]
    pub position: u16,
    /// The Id of the parent category for a channel, or of the parent text channel for a thread.
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
    /// The topic of the channel.
    #[serde(default)]
    pub topic: Option<String>,
    /// Indicator of whether the channel is NSFW.
    #[serde(default)]
    pub nsfw: bool,
    /// The bitrate of the channel, for voice channels.
    #[serde(default)]
    pub bitrate: Option<u32>,
    /// The maximum number of members allowed in the channel, for voice channels.
    #[serde(default)]
    pub user_limit: Option<u32>,
    /// Amount of seconds a user has to wait before sending another message.
    #[serde(default)]
    pub rate_limit_per_user: Option<u16>,
    /// Permission overwrites for [`Member`]s and for [`Role`]s.
    ///
    /// [`Member`]: super::guild::Member
    /// [`Role`]: super::guild::Role
    #[serde(default)]
    pub permission_overwrites: Vec<PermissionOverwrite>,
    /// The Id of the last message sent in the channel.
    #[serde(default)]
    pub last_message_id: Option<MessageId>,
    /// The id of the user who created the thread, for threads.
    #[serde(default)]
    pub owner_id: Option<UserId>,
    /// Thread-specific data, for threads.
    #[serde(default)]
    pub thread_metadata: Option<ThreadMetadata>,
}

/// A Direct Message text channel with another user.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#channel-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PrivateChannel {
    /// The unique Id of the private channel.
    pub id: ChannelId,
    /// The recipient to the private channel.
    pub recipient: User,
    /// The Id of the last message sent.
    #[serde(default)]
    pub last_message_id: Option<MessageId>,
    /// Timestamp of the last time a [`Message`] was pinned.
    ///
    /// [`Message`]: super::message::Message
    #[serde(default)]
    pub last_pin_timestamp: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::ChannelType;

    #[test]
    fn channel_type_keeps_unknown_values() {
        let kind: ChannelType = serde_json::from_str("15").unwrap();
        assert_eq!(kind, ChannelType::Forum);

        let kind: ChannelType = serde_json::from_str("99").unwrap();
        assert_eq!(kind, ChannelType::Unknown(99));
        assert_eq!(serde_json::to_string(&kind).unwrap(), "99");
    }

    #[test]
    fn channel_type_groups() {
        assert!(ChannelType::PublicThread.is_thread());
        assert!(!ChannelType::Text.is_thread());
        assert!(ChannelType::Stage.is_voice());
        assert!(!ChannelType::Category.is_voice());
    }
}
