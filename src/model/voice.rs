//! Representations of voice information.

use serde::{Deserialize, Serialize};

use super::guild::Member;
use super::id::{ChannelId, GuildId, UserId};
use super::Timestamp;

/// A user's state within a voice channel.
///
/// [Discord docs](https://discord.com/developers/docs/resources/voice#voice-state-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VoiceState {
    /// The Id of the guild the voice state is in.
    pub guild_id: GuildId,
    /// The Id of the channel the user is connected to, if any.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    /// The Id of the user the voice state belongs to.
    pub user_id: UserId,
    /// The guild member the voice state belongs to.
    pub member: Member,
    /// The session id of the voice connection.
    pub session_id: String,
    /// Whether the user is deafened by the server.
    #[serde(default)]
    pub deaf: bool,
    /// Whether the user is muted by the server.
    #[serde(default)]
    pub mute: bool,
    /// Whether the user has deafened themselves.
    #[serde(default)]
    pub self_deaf: bool,
    /// Whether the user has muted themselves.
    #[serde(default)]
    pub self_mute: bool,
    /// Whether the user is streaming using "Go Live".
    #[serde(default)]
    pub self_stream: bool,
    /// Whether the user's camera is enabled.
    #[serde(default)]
    pub self_video: bool,
    /// Whether the user is muted by the current user.
    #[serde(default)]
    pub suppress: bool,
    /// When unsuppressed, non-bot users will have this set to the current time. Bot users will be
    /// set to [`None`]. When suppressed, the user is asking to speak in a stage channel.
    #[serde(default)]
    pub request_to_speak_timestamp: Option<Timestamp>,
}
