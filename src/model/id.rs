//! A collection of newtypes defining type-strong IDs.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use nonmax::NonMaxU64;
use serde::de::{Deserializer, Error as DeError, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::Timestamp;

macro_rules! id_u64 {
    ($($(#[$attr:meta])* $name:ident;)*) => {
        $(
            $(#[$attr])*
            #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
            pub struct $name(NonMaxU64);

            impl $name {
                #[doc = concat!("Creates a new ", stringify!($name), " from a u64.")]
                /// # Panics
                /// Panics if `id` is u64::MAX.
                #[inline]
                #[must_use]
                #[track_caller]
                pub const fn new(id: u64) -> Self {
                    match NonMaxU64::new(id) {
                        Some(inner) => Self(inner),
                        None => panic!(concat!("Attempted to call ", stringify!($name), "::new with invalid (u64::MAX) value")),
                    }
                }

                /// Retrieves the inner `id` as a [`u64`].
                #[inline]
                #[must_use]
                pub const fn get(self) -> u64 {
                    self.0.get()
                }

                #[doc = concat!("Retrieves the time that the ", stringify!($name), " was created.")]
                #[must_use]
                pub fn created_at(&self) -> Timestamp {
                    Timestamp::from_snowflake(self.get())
                }
            }

            impl From<u64> for $name {
                fn from(id: u64) -> $name {
                    $name::new(id)
                }
            }

            impl From<$name> for u64 {
                fn from(id: $name) -> u64 {
                    id.get()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.get(), f)
                }
            }

            impl FromStr for $name {
                type Err = ParseIdError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let id = s.parse::<u64>().map_err(ParseIdError::Int)?;
                    NonMaxU64::new(id).map(Self).ok_or(ParseIdError::Max)
                }
            }

            impl Serialize for $name {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(&self.get())
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let id = deserializer.deserialize_any(SnowflakeVisitor)?;
                    NonMaxU64::new(id).map(Self).ok_or_else(|| DeError::custom("snowflake must not be u64::MAX"))
                }
            }
        )*
    }
}

id_u64! {
    /// An identifier for a Channel
    ChannelId;
    /// An identifier for an Emoji
    EmojiId;
    /// An identifier for a Guild
    GuildId;
    /// An identifier for a Message
    MessageId;
    /// An identifier for a Role
    RoleId;
    /// An identifier for a sticker.
    StickerId;
    /// An identifier for a User
    UserId;
    /// An identifier for an Application.
    ApplicationId;
    /// An identifier for an attachment.
    AttachmentId;
    /// An identifier whose kind depends on context, such as a permission overwrite target.
    GenericId;
}

/// Signifies the failure to parse an id from a string.
#[derive(Debug)]
pub enum ParseIdError {
    /// The string was not a base-10 unsigned integer.
    Int(ParseIntError),
    /// The string held `u64::MAX`, which is never a valid snowflake.
    Max,
}

impl std::error::Error for ParseIdError {}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(inner) => fmt::Display::fmt(inner, f),
            Self::Max => f.write_str("snowflake must not be u64::MAX"),
        }
    }
}

/// Snowflakes arrive as strings from the gateway but as integers from some older payloads.
struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string or integer snowflake")
    }

    fn visit_i64<E: DeError>(self, value: i64) -> Result<Self::Value, E> {
        u64::try_from(value).map_err(|_| E::custom("snowflake must not be negative"))
    }

    fn visit_u64<E: DeError>(self, value: u64) -> Result<Self::Value, E> {
        Ok(value)
    }

    fn visit_str<E: DeError>(self, value: &str) -> Result<Self::Value, E> {
        value.parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{GuildId, UserId};

    #[test]
    fn test_created_at() {
        // The id is from discord's snowflake docs
        let id = GuildId::new(175928847299117063);
        assert_eq!(id.created_at().unix_timestamp(), 1462015105);
        assert_eq!(id.created_at().to_string(), "2016-04-30T11:18:25.796Z");
    }

    #[test]
    fn test_id_serde() {
        let id = UserId::new(175928847299117063);
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""175928847299117063""#);

        let from_str: UserId = serde_json::from_str(r#""175928847299117063""#).unwrap();
        let from_int: UserId = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(from_str, id);
        assert_eq!(from_int, id);

        assert!(serde_json::from_str::<UserId>(r#""18446744073709551615""#).is_err());
        assert!(serde_json::from_str::<UserId>("-1").is_err());
    }

    #[test]
    fn test_id_ordering_is_chronological() {
        let older = UserId::new(175928847299117063);
        let newer = UserId::new(175928847299117064);
        assert!(older < newer);
        assert_eq!("42".parse::<UserId>().unwrap(), UserId::new(42));
    }
}
