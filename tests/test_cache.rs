use guildstate::cache::{Cache, CacheComponents, CacheError, Settings};
use guildstate::model::prelude::*;

fn user(id: u64) -> User {
    User {
        id: UserId::new(id),
        name: format!("user{id}"),
        global_name: None,
        avatar: None,
        bot: false,
        system: false,
    }
}

fn member(guild_id: u64, user_id: u64) -> Member {
    Member {
        user: user(user_id),
        guild_id: GuildId::new(guild_id),
        nick: None,
        avatar: None,
        roles: vec![RoleId::new(3)],
        joined_at: None,
        premium_since: None,
        deaf: false,
        mute: false,
        pending: false,
        communication_disabled_until: None,
    }
}

fn guild(id: u64) -> Guild {
    Guild {
        id: GuildId::new(id),
        name: format!("guild{id}"),
        icon: None,
        description: None,
        owner_id: UserId::new(1),
        afk_channel_id: None,
        afk_timeout: 300,
        system_channel_id: None,
        premium_tier: 0,
        preferred_locale: None,
        features: Vec::new(),
        member_count: Some(120),
        joined_at: Some(Timestamp::from_unix_timestamp(1_600_000_000).unwrap()),
        large: Some(false),
    }
}

#[test]
fn users_shared_between_guilds() {
    let mut cache = Cache::new();
    cache.set_member(member(1, 42));
    cache.set_member(member(2, 42));
    assert_eq!(cache.user_ref_count(UserId::new(42)), Some(2));

    cache.delete_member(GuildId::new(1), UserId::new(42));
    assert_eq!(cache.get_user(UserId::new(42)), Some(user(42)));
    assert_eq!(cache.user_ref_count(UserId::new(42)), Some(1));

    cache.delete_member(GuildId::new(2), UserId::new(42));
    assert_eq!(cache.get_user(UserId::new(42)), None);
}

#[test]
fn views_are_snapshots() {
    let mut cache = Cache::new();
    cache.set_member(member(1, 42));
    cache.set_member(member(1, 43));

    let view = cache.get_members_view_for_guild(GuildId::new(1));
    cache.delete_member(GuildId::new(1), UserId::new(42));
    cache.set_member(member(1, 44));

    assert_eq!(view.len(), 2);
    assert_eq!(view.get(&UserId::new(42)), Some(member(1, 42)));
    assert!(view.get(&UserId::new(44)).is_none());
    assert_eq!(cache.get_members_view_for_guild(GuildId::new(1)).len(), 2);
}

#[test]
fn returned_entities_are_copies() {
    let mut cache = Cache::new();
    cache.set_member(member(1, 42));

    let mut copy = cache.get_member(GuildId::new(1), UserId::new(42)).unwrap();
    copy.roles.push(RoleId::new(4));
    copy.user.name = "changed".to_string();

    let cached = cache.get_member(GuildId::new(1), UserId::new(42)).unwrap();
    assert_eq!(cached.roles, vec![RoleId::new(3)]);
    assert_eq!(cached.user.name, "user42");
}

#[test]
fn guild_records_follow_their_contents() {
    let mut cache = Cache::new();
    cache.set_member(member(1, 42));
    assert_eq!(cache.guild_record_count(), 1);

    cache.set_guild(guild(1));
    cache.delete_member(GuildId::new(1), UserId::new(42));
    assert_eq!(cache.guild_record_count(), 1);

    assert_eq!(cache.delete_guild(GuildId::new(1)), Some(guild(1)));
    assert_eq!(cache.guild_record_count(), 0);
}

#[test]
fn unavailable_guilds() {
    let mut cache = Cache::new();
    cache.set_initial_unavailable_guilds([GuildId::new(10), GuildId::new(11)]);

    let err = cache.get_guild(GuildId::new(10)).unwrap_err();
    assert!(matches!(err, CacheError::UnavailableGuild { guild: None, .. }));
    assert_eq!(err.guild_id(), GuildId::new(10));
    assert_eq!(err.to_string(), "Guild 10 is unavailable");
    assert_eq!(cache.get_available_guild(GuildId::new(10)), None);

    cache.set_guild(guild(10));
    assert_eq!(cache.get_guild(GuildId::new(10)).unwrap(), Some(guild(10)));
    assert!(cache.get_guild(GuildId::new(11)).is_err());

    cache.set_guild_availability(GuildId::new(10), false);
    let err = cache.get_guild(GuildId::new(10)).unwrap_err();
    assert_eq!(err.into_stale_guild(), Some(guild(10)));
    assert_eq!(cache.get_unavailable_guild(GuildId::new(10)), Some(guild(10)));
    assert_eq!(cache.get_unavailable_guilds_view().len(), 1);
    assert!(cache.get_available_guilds_view().is_empty());

    assert!(cache.get_guild(GuildId::new(12)).unwrap().is_none());
}

#[test]
fn guild_updates_keep_snapshot_only_fields() {
    let mut cache = Cache::new();
    cache.set_guild(guild(1));

    let update = Guild {
        name: "renamed".to_string(),
        member_count: None,
        joined_at: None,
        large: None,
        ..guild(1)
    };
    let (before, after) = cache.update_guild(update);
    assert_eq!(before, Some(guild(1)));

    let after = after.unwrap();
    assert_eq!(after.name, "renamed");
    assert_eq!(after.member_count, Some(120));
    assert_eq!(after.joined_at, guild(1).joined_at);
    assert_eq!(after.large, Some(false));
    assert_eq!(cache.get_guild(GuildId::new(1)).unwrap(), Some(after));
}

#[test]
fn partial_update_of_uncached_message() {
    let mut cache = Cache::new();
    let update = MessageUpdate {
        content: Some("edited".to_string()),
        ..MessageUpdate::new(MessageId::new(1), ChannelId::new(2))
    };

    assert_eq!(cache.update_message_partial(&update), (None, None));
    assert!(cache.get_messages_view().is_empty());
}

#[test]
fn disabled_components() {
    let mut settings = Settings::default();
    settings.components = CacheComponents::ALL - CacheComponents::MEMBERS;
    let mut cache = Cache::new_with_settings(settings);

    cache.set_member(member(1, 42));
    assert_eq!(cache.get_member(GuildId::new(1), UserId::new(42)), None);
    assert_eq!(cache.get_user(UserId::new(42)), None);
    assert_eq!(cache.guild_record_count(), 0);
    assert_eq!(cache.update_member(member(1, 42)), (None, None));

    cache.set_guild(guild(1));
    assert!(cache.get_guild(GuildId::new(1)).unwrap().is_some());
}

#[test]
fn settings_from_json() {
    let settings = Settings::from_json(r#"{"max_messages": 5}"#).unwrap();
    assert_eq!(settings.max_messages, 5);
    assert_eq!(settings.components, CacheComponents::ALL);
}
