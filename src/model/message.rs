//! Models relating to Discord messages.

use serde::{Deserialize, Serialize};

use super::guild::Member;
use super::id::{AttachmentId, ChannelId, GuildId, MessageId, RoleId};
use super::user::User;
use super::utils::deserialize_some;
use super::Timestamp;

/// A representation of a message over a guild's text channel, a group, or a private channel.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#message-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    /// The unique Id of the message. Can be used to calculate the creation date of the message.
    pub id: MessageId,
    /// The Id of the [`Channel`] that the message was sent to.
    ///
    /// [`Channel`]: super::channel::GuildChannel
    pub channel_id: ChannelId,
    /// The Id of the [`Guild`] that the message was sent in, if it was sent in one.
    ///
    /// [`Guild`]: super::guild::Guild
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// The user that sent the message.
    pub author: User,
    /// A partial amount of data about the user that sent the message, if it was sent in a guild.
    #[serde(default)]
    pub member: Option<Box<Member>>,
    /// The content of the message.
    #[serde(default)]
    pub content: String,
    /// Initial message creation timestamp, calculated from its Id.
    pub timestamp: Timestamp,
    /// The timestamp of the last time the message was updated, if it was.
    #[serde(default)]
    pub edited_timestamp: Option<Timestamp>,
    /// Indicator of whether the command is to be played back via text-to-speech.
    #[serde(default)]
    pub tts: bool,
    /// Indicator of whether the message mentions everyone.
    #[serde(default)]
    pub mention_everyone: bool,
    /// Array of users mentioned in the message.
    #[serde(default)]
    pub mentions: Vec<User>,
    /// Array of [`Role`]s' Ids mentioned in the message.
    ///
    /// [`Role`]: super::guild::Role
    #[serde(default)]
    pub mention_roles: Vec<RoleId>,
    /// An vector of the files attached to a message.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Array of embeds sent with the message.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Indicator of whether the message is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Indicator of the type of message this is, i.e. whether it is a regular message or a system
    /// message.
    #[serde(default, rename = "type")]
    pub kind: MessageType,
    /// The message that was replied to using this message.
    #[serde(default)]
    pub referenced_message: Option<Box<Message>>,
}

/// A file uploaded with a message. Not to be confused with [`Embed`]s.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#attachment-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Attachment {
    /// The unique ID given to this attachment.
    pub id: AttachmentId,
    /// The filename of the file that was uploaded. This is equivalent to what the uploader had
    /// their file named.
    pub filename: String,
    /// The size of the file in bytes.
    pub size: u32,
    /// The URL of the uploaded attachment.
    pub url: String,
    /// The attachment's [media type].
    ///
    /// [media type]: https://en.wikipedia.org/wiki/Media_type
    #[serde(default)]
    pub content_type: Option<String>,
    /// If the attachment is an image, then the height of the image is provided.
    #[serde(default)]
    pub height: Option<u32>,
    /// If the attachment is an image, then the width of the image is provided.
    #[serde(default)]
    pub width: Option<u32>,
}

/// Represents a rich embed which allows using richer markdown, multiple fields and more.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#embed-object).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Embed {
    /// The title of the embed.
    #[serde(default)]
    pub title: Option<String>,
    /// The description of the embed.
    #[serde(default)]
    pub description: Option<String>,
    /// The URL of the embed.
    #[serde(default)]
    pub url: Option<String>,
    /// The colour code of the embed.
    #[serde(default, rename = "color")]
    pub colour: Option<u32>,
    /// The array of fields.
    #[serde(default)]
    pub fields: Vec<EmbedField>,
}

/// A field object in an embed.
///
/// [Discord docs](https://discord.com/developers/docs/resources/channel#embed-object-embed-field-structure).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EmbedField {
    /// The name of the field.
    pub name: String,
    /// The value of the field.
    pub value: String,
    /// Indicator of whether the field should display as inline.
    #[serde(default)]
    pub inline: bool,
}

enum_number! {
    /// Differentiates between regular and different types of system messages.
    ///
    /// [Discord docs](https://discord.com/developers/docs/resources/channel#message-object-message-types).
    #[derive(Clone, Copy, Default, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum MessageType {
        /// A regular message.
        #[default]
        Regular = 0,
        /// An indicator that a recipient was added by the author.
        GroupRecipientAddition = 1,
        /// An indicator that a recipient was removed by the author.
        GroupRecipientRemoval = 2,
        /// An indicator that a call was started by the author.
        GroupCallCreation = 3,
        /// An indicator that the group name was modified by the author.
        GroupNameUpdate = 4,
        /// An indicator that the group icon was modified by the author.
        GroupIconUpdate = 5,
        /// An indicator that a message was pinned by the author.
        PinsAdd = 6,
        /// An indicator that a member joined the guild.
        MemberJoin = 7,
        /// An indicator that someone has boosted the guild.
        NitroBoost = 8,
        /// A thread was created from this message.
        ThreadCreated = 18,
        /// Message is an inline reply.
        InlineReply = 19,
        /// Message is a chat input command.
        ChatInputCommand = 20,
        _ => Unknown(u8),
    }
}

/// A partial edit to a [`Message`], as sent with message update events.
///
/// Fields left as [`None`] were omitted from the payload and mean "unchanged". For fields which
/// are themselves nullable, `Some(None)` means the field was explicitly cleared.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageUpdate {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<Option<Timestamp>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_everyone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<Vec<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_roles: Option<Vec<RoleId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

impl MessageUpdate {
    /// An update for the given message which changes nothing.
    #[must_use]
    pub fn new(id: MessageId, channel_id: ChannelId) -> Self {
        Self {
            id,
            channel_id,
            guild_id: None,
            content: None,
            edited_timestamp: None,
            tts: None,
            mention_everyone: None,
            mentions: None,
            mention_roles: None,
            attachments: None,
            embeds: None,
            pinned: None,
        }
    }
}
