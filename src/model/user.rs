//! User information-related models.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::id::UserId;
use crate::constants::CDN_URL;

/// Information about a user.
///
/// [Discord docs](https://discord.com/developers/docs/resources/user#user-object).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    /// The unique Id of the user. Can be used to calculate the account's creation date.
    pub id: UserId,
    /// The account's username. Changing username will trigger a discriminator change if the
    /// username+discriminator pair becomes non-unique.
    #[serde(rename = "username")]
    pub name: String,
    /// The account's display name, if it is set.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Optional avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Indicator of whether the user is a bot.
    #[serde(default)]
    pub bot: bool,
    /// Whether the user is an Official Discord System user (part of the urgent message system).
    #[serde(default)]
    pub system: bool,
}

impl User {
    /// Returns the formatted URL of the user's avatar, if one exists.
    ///
    /// Animated avatars (hashes prefixed with `a_`) are returned as GIFs.
    #[must_use]
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|hash| {
            let ext = if hash.starts_with("a_") { "gif" } else { "webp" };
            format!("{CDN_URL}/avatars/{}/{hash}.{ext}", self.id)
        })
    }

    /// The name shown in clients: the global name if set, the username otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.global_name {
            Some(global_name) => global_name.as_str(),
            None => self.name.as_str(),
        }
    }
}

/// Information about the current user.
///
/// This is the user the client is logged in as, carrying a few fields only the owner of the
/// account can see.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    /// Whether the account has two factor authentication enabled.
    #[serde(default)]
    pub mfa_enabled: bool,
    /// Whether the email on the account has been verified.
    #[serde(default)]
    pub verified: Option<bool>,
    /// The account's email address, if the `email` scope was granted.
    #[serde(default)]
    pub email: Option<String>,
    /// The user's chosen language option.
    #[serde(default)]
    pub locale: Option<String>,
}

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(avatar: Option<&str>) -> User {
        User {
            id: UserId::new(210),
            name: "test".to_string(),
            global_name: None,
            avatar: avatar.map(ToString::to_string),
            bot: false,
            system: false,
        }
    }

    #[test]
    fn avatar_url() {
        assert_eq!(user(None).avatar_url(), None);
        assert_eq!(
            user(Some("abc")).avatar_url().as_deref(),
            Some("https://cdn.discordapp.com/avatars/210/abc.webp")
        );
        assert_eq!(
            user(Some("a_abc")).avatar_url().as_deref(),
            Some("https://cdn.discordapp.com/avatars/210/a_abc.gif")
        );
    }

    #[test]
    fn display_name_prefers_global_name() {
        let mut user = user(None);
        assert_eq!(user.display_name(), "test");
        user.global_name = Some("Test Person".to_string());
        assert_eq!(user.display_name(), "Test Person");
    }

    #[test]
    fn current_user_flattens() {
        let json = r#"{"id":"210","username":"me","bot":true,"mfa_enabled":true}"#;
        let me: CurrentUser = serde_json::from_str(json).unwrap();
        assert_eq!(me.id, UserId::new(210));
        assert!(me.bot);
        assert!(me.mfa_enabled);
        assert_eq!(me.email, None);
    }
}
