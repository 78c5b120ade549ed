//! Models for server and channel invites.

use dep_time::Duration;
use serde::{Deserialize, Serialize};

use super::id::{ChannelId, GuildId};
use super::user::User;
use super::Timestamp;

/// Information about an invite code, including the metadata only visible to guild managers.
///
/// [Discord docs](https://discord.com/developers/docs/resources/invite#invite-metadata-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Invite {
    /// The unique code for the invite.
    pub code: String,
    /// The Id of the guild the invite is for, if it is a guild invite.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// The Id of the channel the invite is for.
    pub channel_id: ChannelId,
    /// The user that created the invite.
    #[serde(default)]
    pub inviter: Option<User>,
    /// The type of target for a voice channel invite.
    #[serde(default)]
    pub target_type: Option<InviteTargetType>,
    /// The user whose stream to display for a voice channel stream invite.
    #[serde(default)]
    pub target_user: Option<User>,
    /// The number of times the invite has been used.
    #[serde(default)]
    pub uses: u64,
    /// The maximum number of times the invite can be used, `0` meaning unlimited.
    #[serde(default)]
    pub max_uses: u64,
    /// The duration in seconds after which the invite expires, `0` meaning never.
    #[serde(default)]
    pub max_age: u64,
    /// Whether the invite only grants temporary membership.
    #[serde(default)]
    pub temporary: bool,
    /// When the invite was created.
    pub created_at: Timestamp,
}

impl Invite {
    /// Returns a URL to use for the invite.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://discord.gg/{}", self.code)
    }

    /// When the invite stops being valid, if it ever does.
    #[must_use]
    pub fn expires_at(&self) -> Option<Timestamp> {
        if self.max_age == 0 {
            return None;
        }

        let max_age = Duration::seconds(i64::try_from(self.max_age).ok()?);
        self.created_at.checked_add(max_age).map(Timestamp::from)
    }
}

enum_number! {
    /// Type of target for a voice channel invite.
    ///
    /// [Discord docs](https://discord.com/developers/docs/resources/invite#invite-object-invite-target-types).
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum InviteTargetType {
        Stream = 1,
        EmbeddedApplication = 2,
        _ => Unknown(u8),
    }
}
