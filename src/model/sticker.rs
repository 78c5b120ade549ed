//! Models for stickers uploaded to guilds.

use serde::{Deserialize, Serialize};

use super::id::{GuildId, StickerId};
use super::user::User;
use crate::constants::CDN_URL;

/// A sticker uploaded to a guild.
///
/// [Discord docs](https://discord.com/developers/docs/resources/sticker#sticker-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GuildSticker {
    /// The unique ID given to this sticker.
    pub id: StickerId,
    /// Id of the guild that owns this sticker.
    pub guild_id: GuildId,
    /// The name of the sticker.
    pub name: String,
    /// Description of the sticker
    #[serde(default)]
    pub description: Option<String>,
    /// The Discord name of a unicode emoji representing the sticker's expression.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The type of sticker format.
    pub format_type: StickerFormatType,
    /// Whether or not this guild sticker can be used, may be false due to loss of Server Boosts.
    #[serde(default)]
    pub available: bool,
    /// User that uploaded the sticker. This will be `None` if the current user does not have
    /// either the Create Guild Expressions nor the Manage Guild Expressions permission.
    #[serde(default)]
    pub user: Option<User>,
}

impl GuildSticker {
    /// Retrieves the URL to the sticker image.
    ///
    /// **Note**: This will only be `None` if the format_type is unknown.
    #[must_use]
    pub fn image_url(&self) -> Option<String> {
        let ext = match self.format_type {
            StickerFormatType::Png | StickerFormatType::Apng => "png",
            StickerFormatType::Lottie => "json",
            StickerFormatType::Gif => "gif",
            StickerFormatType::Unknown(_) => return None,
        };

        Some(format!("{CDN_URL}/stickers/{}.{ext}", self.id))
    }
}

enum_number! {
    /// Differentiates between sticker formats.
    ///
    /// [Discord docs](https://discord.com/developers/docs/resources/sticker#sticker-object-sticker-format-types).
    #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum StickerFormatType {
        /// A PNG format sticker.
        Png = 1,
        /// An APNG format animated sticker.
        Apng = 2,
        /// A LOTTIE format animated sticker.
        Lottie = 3,
        /// A GIF format animated sticker.
        Gif = 4,
        _ => Unknown(u8),
    }
}
