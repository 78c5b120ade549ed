//! Models pertaining to the gateway, such as presences and activities.

use serde::{Deserialize, Serialize};
use url::Url;

use super::id::{EmojiId, GuildId, UserId};

/// Information detailing the current online status of a user in a guild.
///
/// [Discord docs](https://discord.com/developers/docs/topics/gateway-events#presence-update-presence-update-event-fields).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Presence {
    /// The Id of the user the presence belongs to.
    pub user_id: UserId,
    /// The Id of the guild the presence was received in.
    pub guild_id: GuildId,
    /// The user's online status.
    #[serde(default)]
    pub status: OnlineStatus,
    /// The user's current activities.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// The devices a user are currently active on, if available.
    #[serde(default)]
    pub client_status: Option<ClientStatus>,
}

/// Representation of an activity that a user is performing.
///
/// [Discord docs](https://discord.com/developers/docs/topics/gateway-events#activity-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Activity {
    /// The name of the activity.
    pub name: String,
    /// The type of activity being performed
    #[serde(default, rename = "type")]
    pub kind: ActivityType,
    /// The Stream URL if [`Self::kind`] is [`ActivityType::Streaming`].
    #[serde(default)]
    pub url: Option<Url>,
    /// Unix timestamp (in milliseconds) of when the activity was added to the user's session.
    #[serde(default)]
    pub created_at: u64,
    /// What the user is doing.
    #[serde(default)]
    pub details: Option<String>,
    /// The user's current party status.
    #[serde(default)]
    pub state: Option<String>,
    /// Emoji currently used in custom status
    #[serde(default)]
    pub emoji: Option<ActivityEmoji>,
}

/// Representation of an emoji used in a custom status
///
/// [Discord docs](https://discord.com/developers/docs/topics/gateway-events#activity-object-activity-emoji).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ActivityEmoji {
    /// The name of the emoji.
    pub name: String,
    /// The id of the emoji, for custom emojis.
    #[serde(default)]
    pub id: Option<EmojiId>,
    /// Whether this emoji is animated.
    #[serde(default)]
    pub animated: bool,
}

enum_number! {
    /// [Discord docs](https://discord.com/developers/docs/topics/gateway-events#activity-object-activity-types).
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum ActivityType {
        /// An indicator that the user is playing a game.
        #[default]
        Playing = 0,
        /// An indicator that the user is streaming to a service.
        Streaming = 1,
        /// An indicator that the user is listening to something.
        Listening = 2,
        /// An indicator that the user is watching something.
        Watching = 3,
        /// An indicator that the user uses custom statuses
        Custom = 4,
        /// An indicator that the user is competing somewhere.
        Competing = 5,
        _ => Unknown(u8),
    }
}

/// Information detailing the current active status of a user on each platform.
///
/// [Discord docs](https://discord.com/developers/docs/topics/gateway-events#client-status-object).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientStatus {
    #[serde(default)]
    pub desktop: Option<OnlineStatus>,
    #[serde(default)]
    pub mobile: Option<OnlineStatus>,
    #[serde(default)]
    pub web: Option<OnlineStatus>,
}

/// The current user's online status.
///
/// [Discord docs](https://discord.com/developers/docs/topics/gateway-events#update-presence-status-types).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum OnlineStatus {
    #[serde(rename = "dnd")]
    DoNotDisturb,
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "invisible")]
    Invisible,
    #[serde(rename = "offline")]
    Offline,
    #[serde(rename = "online")]
    #[default]
    Online,
}

impl OnlineStatus {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            OnlineStatus::DoNotDisturb => "dnd",
            OnlineStatus::Idle => "idle",
            OnlineStatus::Invisible => "invisible",
            OnlineStatus::Offline => "offline",
            OnlineStatus::Online => "online",
        }
    }
}
