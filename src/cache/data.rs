//! Compact records the cache stores in place of full entities.
//!
//! A record keeps an entity's own scalar fields but only the ids of the shared entities it points
//! at (users, members, custom emojis, other messages). The shared entities live once in the
//! cache's pools, and a record is turned back into a full entity by resolving those ids into
//! [`DataRecord::Refs`].

use url::Url;

use crate::internal::prelude::*;
use crate::model::channel::PrivateChannel;
use crate::model::gateway::{Activity, ActivityEmoji, ActivityType, ClientStatus, OnlineStatus, Presence};
use crate::model::guild::{CustomEmoji, Emoji, Member};
use crate::model::id::{ChannelId, EmojiId, GuildId, MessageId, RoleId, StickerId, UserId};
use crate::model::invite::{Invite, InviteTargetType};
use crate::model::message::{Attachment, Embed, Message, MessageType, MessageUpdate};
use crate::model::sticker::{GuildSticker, StickerFormatType};
use crate::model::user::User;
use crate::model::voice::VoiceState;
use crate::model::Timestamp;

/// A stored form of an entity which can rebuild it once its references are resolved.
pub(crate) trait DataRecord: Send + Sync + 'static {
    /// The entity the record is built from and builds.
    type Entity;
    /// The resolved shared entities needed to rebuild the entity.
    type Refs: Send + Sync + 'static;

    fn from_entity(entity: &Self::Entity) -> Self;

    fn to_entity(&self, refs: &Self::Refs) -> Self::Entity;
}

/// The resolved form of a member reference: the member record and its user.
pub(crate) type MemberRefs = (Arc<MemberData>, Arc<User>);

#[derive(Clone, Debug)]
pub(crate) struct MemberData {
    pub guild_id: GuildId,
    nick: Option<String>,
    avatar: Option<String>,
    role_ids: Box<[RoleId]>,
    joined_at: Option<Timestamp>,
    premium_since: Option<Timestamp>,
    deaf: bool,
    mute: bool,
    pending: bool,
    communication_disabled_until: Option<Timestamp>,
    /// Set once the member left its guild while something still referenced it. Deleted members
    /// are invisible to lookups and views but can still be resolved through references.
    pub deleted: bool,
}

impl DataRecord for MemberData {
    type Entity = Member;
    type Refs = Arc<User>;

    fn from_entity(member: &Member) -> Self {
        Self {
            guild_id: member.guild_id,
            nick: member.nick.clone(),
            avatar: member.avatar.clone(),
            role_ids: member.roles.clone().into_boxed_slice(),
            joined_at: member.joined_at,
            premium_since: member.premium_since,
            deaf: member.deaf,
            mute: member.mute,
            pending: member.pending,
            communication_disabled_until: member.communication_disabled_until,
            deleted: false,
        }
    }

    fn to_entity(&self, user: &Arc<User>) -> Member {
        Member {
            user: User::clone(user),
            guild_id: self.guild_id,
            nick: self.nick.clone(),
            avatar: self.avatar.clone(),
            roles: self.role_ids.to_vec(),
            joined_at: self.joined_at,
            premium_since: self.premium_since,
            deaf: self.deaf,
            mute: self.mute,
            pending: self.pending,
            communication_disabled_until: self.communication_disabled_until,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct EmojiData {
    id: EmojiId,
    pub guild_id: GuildId,
    name: String,
    role_ids: Box<[RoleId]>,
    pub user_id: Option<UserId>,
    require_colons: bool,
    managed: bool,
    animated: bool,
    available: bool,
}

impl DataRecord for EmojiData {
    type Entity = Emoji;
    type Refs = Option<Arc<User>>;

    fn from_entity(emoji: &Emoji) -> Self {
        Self {
            id: emoji.id,
            guild_id: emoji.guild_id,
            name: emoji.name.clone(),
            role_ids: emoji.roles.clone().into_boxed_slice(),
            user_id: emoji.user.as_ref().map(|user| user.id),
            require_colons: emoji.require_colons,
            managed: emoji.managed,
            animated: emoji.animated,
            available: emoji.available,
        }
    }

    fn to_entity(&self, user: &Option<Arc<User>>) -> Emoji {
        Emoji {
            id: self.id,
            guild_id: self.guild_id,
            name: self.name.clone(),
            roles: self.role_ids.to_vec(),
            user: user.as_deref().cloned(),
            require_colons: self.require_colons,
            managed: self.managed,
            animated: self.animated,
            available: self.available,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StickerData {
    id: StickerId,
    pub guild_id: GuildId,
    name: String,
    description: Option<String>,
    tags: Box<[String]>,
    format_type: StickerFormatType,
    available: bool,
    pub user_id: Option<UserId>,
}

impl DataRecord for StickerData {
    type Entity = GuildSticker;
    type Refs = Option<Arc<User>>;

    fn from_entity(sticker: &GuildSticker) -> Self {
        Self {
            id: sticker.id,
            guild_id: sticker.guild_id,
            name: sticker.name.clone(),
            description: sticker.description.clone(),
            tags: sticker.tags.clone().into_boxed_slice(),
            format_type: sticker.format_type,
            available: sticker.available,
            user_id: sticker.user.as_ref().map(|user| user.id),
        }
    }

    fn to_entity(&self, user: &Option<Arc<User>>) -> GuildSticker {
        GuildSticker {
            id: self.id,
            guild_id: self.guild_id,
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.to_vec(),
            format_type: self.format_type,
            available: self.available,
            user: user.as_deref().cloned(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct InviteRefs {
    pub inviter: Option<Arc<User>>,
    pub target_user: Option<Arc<User>>,
}

#[derive(Clone, Debug)]
pub(crate) struct InviteData {
    code: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub inviter_id: Option<UserId>,
    target_type: Option<InviteTargetType>,
    pub target_user_id: Option<UserId>,
    uses: u64,
    max_uses: u64,
    max_age: u64,
    temporary: bool,
    created_at: Timestamp,
}

impl InviteData {
    /// The users the invite references, inviter first.
    pub fn user_ids(&self) -> impl Iterator<Item = UserId> {
        self.inviter_id.into_iter().chain(self.target_user_id)
    }
}

impl DataRecord for InviteData {
    type Entity = Invite;
    type Refs = InviteRefs;

    fn from_entity(invite: &Invite) -> Self {
        Self {
            code: invite.code.clone(),
            guild_id: invite.guild_id,
            channel_id: invite.channel_id,
            inviter_id: invite.inviter.as_ref().map(|user| user.id),
            target_type: invite.target_type,
            target_user_id: invite.target_user.as_ref().map(|user| user.id),
            uses: invite.uses,
            max_uses: invite.max_uses,
            max_age: invite.max_age,
            temporary: invite.temporary,
            created_at: invite.created_at,
        }
    }

    fn to_entity(&self, refs: &InviteRefs) -> Invite {
        Invite {
            code: self.code.clone(),
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            inviter: refs.inviter.as_deref().cloned(),
            target_type: self.target_type,
            target_user: refs.target_user.as_deref().cloned(),
            uses: self.uses,
            max_uses: self.max_uses,
            max_age: self.max_age,
            temporary: self.temporary,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct VoiceStateData {
    guild_id: GuildId,
    pub channel_id: Option<ChannelId>,
    user_id: UserId,
    /// The guild and user the referenced member is stored under.
    pub member_key: (GuildId, UserId),
    session_id: String,
    deaf: bool,
    mute: bool,
    self_deaf: bool,
    self_mute: bool,
    self_stream: bool,
    self_video: bool,
    suppress: bool,
    request_to_speak_timestamp: Option<Timestamp>,
}

impl DataRecord for VoiceStateData {
    type Entity = VoiceState;
    type Refs = MemberRefs;

    fn from_entity(state: &VoiceState) -> Self {
        Self {
            guild_id: state.guild_id,
            channel_id: state.channel_id,
            user_id: state.user_id,
            member_key: (state.member.guild_id, state.member.user.id),
            session_id: state.session_id.clone(),
            deaf: state.deaf,
            mute: state.mute,
            self_deaf: state.self_deaf,
            self_mute: state.self_mute,
            self_stream: state.self_stream,
            self_video: state.self_video,
            suppress: state.suppress,
            request_to_speak_timestamp: state.request_to_speak_timestamp,
        }
    }

    fn to_entity(&self, (member, user): &MemberRefs) -> VoiceState {
        VoiceState {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            member: member.to_entity(user),
            session_id: self.session_id.clone(),
            deaf: self.deaf,
            mute: self.mute,
            self_deaf: self.self_deaf,
            self_mute: self.self_mute,
            self_stream: self.self_stream,
            self_video: self.self_video,
            suppress: self.suppress,
            request_to_speak_timestamp: self.request_to_speak_timestamp,
        }
    }
}

/// The emoji of an activity. Custom emojis are shared between presences and stored by id.
#[derive(Clone, Debug)]
pub(crate) enum ActivityEmojiData {
    Unicode(String),
    Custom(EmojiId),
}

#[derive(Clone, Debug)]
pub(crate) struct ActivityData {
    name: String,
    kind: ActivityType,
    url: Option<Url>,
    created_at: u64,
    details: Option<String>,
    state: Option<String>,
    emoji: Option<ActivityEmojiData>,
}

impl ActivityData {
    fn from_activity(activity: &Activity) -> Self {
        let emoji = activity.emoji.as_ref().map(|emoji| match emoji.id {
            Some(id) => ActivityEmojiData::Custom(id),
            None => ActivityEmojiData::Unicode(emoji.name.clone()),
        });

        Self {
            name: activity.name.clone(),
            kind: activity.kind,
            url: activity.url.clone(),
            created_at: activity.created_at,
            details: activity.details.clone(),
            state: activity.state.clone(),
            emoji,
        }
    }

    fn to_activity(&self, emojis: &[Arc<CustomEmoji>]) -> Activity {
        let emoji = self.emoji.as_ref().map(|emoji| match emoji {
            ActivityEmojiData::Unicode(name) => ActivityEmoji {
                name: name.clone(),
                id: None,
                animated: false,
            },
            ActivityEmojiData::Custom(id) => {
                let custom = emojis.iter().find(|custom| custom.id == *id);
                ActivityEmoji {
                    name: custom.and_then(|custom| custom.name.clone()).unwrap_or_default(),
                    id: Some(*id),
                    animated: custom.is_some_and(|custom| custom.animated),
                }
            },
        });

        Activity {
            name: self.name.clone(),
            kind: self.kind,
            url: self.url.clone(),
            created_at: self.created_at,
            details: self.details.clone(),
            state: self.state.clone(),
            emoji,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PresenceData {
    user_id: UserId,
    guild_id: GuildId,
    status: OnlineStatus,
    activities: Box<[ActivityData]>,
    client_status: Option<ClientStatus>,
}

impl PresenceData {
    /// Ids of the custom emojis used by the activities, one per activity using one.
    pub fn custom_emoji_ids(&self) -> impl Iterator<Item = EmojiId> + '_ {
        self.activities.iter().filter_map(|activity| match activity.emoji {
            Some(ActivityEmojiData::Custom(id)) => Some(id),
            _ => None,
        })
    }
}

impl DataRecord for PresenceData {
    type Entity = Presence;
    type Refs = Vec<Arc<CustomEmoji>>;

    fn from_entity(presence: &Presence) -> Self {
        Self {
            user_id: presence.user_id,
            guild_id: presence.guild_id,
            status: presence.status,
            activities: presence.activities.iter().map(ActivityData::from_activity).collect(),
            client_status: presence.client_status.clone(),
        }
    }

    fn to_entity(&self, emojis: &Self::Refs) -> Presence {
        Presence {
            user_id: self.user_id,
            guild_id: self.guild_id,
            status: self.status,
            activities: self.activities.iter().map(|activity| activity.to_activity(emojis)).collect(),
            client_status: self.client_status.clone(),
        }
    }
}

/// The custom emoji an activity references, built from the activity itself.
pub(crate) fn activity_custom_emoji(activity: &Activity) -> Option<CustomEmoji> {
    let emoji = activity.emoji.as_ref()?;
    Some(CustomEmoji {
        id: emoji.id?,
        name: Some(emoji.name.clone()),
        animated: emoji.animated,
    })
}

#[derive(Debug)]
pub(crate) struct MessageRefs {
    pub author: Arc<User>,
    pub member: Option<MemberRefs>,
    pub mentions: Box<[Arc<User>]>,
    pub referenced: Option<Box<(Arc<MessageData>, MessageRefs)>>,
}

#[derive(Clone, Debug)]
pub(crate) struct MessageData {
    id: MessageId,
    pub channel_id: ChannelId,
    guild_id: Option<GuildId>,
    pub author_id: UserId,
    /// The guild and user the author's member is stored under, for guild messages.
    pub member_key: Option<(GuildId, UserId)>,
    content: String,
    timestamp: Timestamp,
    edited_timestamp: Option<Timestamp>,
    tts: bool,
    mention_everyone: bool,
    pub mention_ids: Box<[UserId]>,
    mention_roles: Box<[RoleId]>,
    attachments: Box<[Attachment]>,
    embeds: Box<[Embed]>,
    pinned: bool,
    kind: MessageType,
    pub referenced_message_id: Option<MessageId>,
}

impl MessageData {
    /// Applies the fields present in a partial update. Mentions are applied by id only, the
    /// caller is responsible for the users themselves.
    pub fn apply_partial(&mut self, update: &MessageUpdate) {
        if let Some(content) = &update.content {
            self.content.clone_from(content);
        }
        if let Some(edited_timestamp) = update.edited_timestamp {
            self.edited_timestamp = edited_timestamp;
        }
        if let Some(tts) = update.tts {
            self.tts = tts;
        }
        if let Some(mention_everyone) = update.mention_everyone {
            self.mention_everyone = mention_everyone;
        }
        if let Some(mentions) = &update.mentions {
            self.mention_ids = mentions.iter().map(|user| user.id).collect();
        }
        if let Some(mention_roles) = &update.mention_roles {
            self.mention_roles = mention_roles.clone().into_boxed_slice();
        }
        if let Some(attachments) = &update.attachments {
            self.attachments = attachments.clone().into_boxed_slice();
        }
        if let Some(embeds) = &update.embeds {
            self.embeds = embeds.clone().into_boxed_slice();
        }
        if let Some(pinned) = update.pinned {
            self.pinned = pinned;
        }
    }
}

impl DataRecord for MessageData {
    type Entity = Message;
    type Refs = MessageRefs;

    fn from_entity(message: &Message) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            guild_id: message.guild_id,
            author_id: message.author.id,
            member_key: message.member.as_ref().map(|member| (member.guild_id, member.user.id)),
            content: message.content.clone(),
            timestamp: message.timestamp,
            edited_timestamp: message.edited_timestamp,
            tts: message.tts,
            mention_everyone: message.mention_everyone,
            mention_ids: message.mentions.iter().map(|user| user.id).collect(),
            mention_roles: message.mention_roles.clone().into_boxed_slice(),
            attachments: message.attachments.clone().into_boxed_slice(),
            embeds: message.embeds.clone().into_boxed_slice(),
            pinned: message.pinned,
            kind: message.kind,
            referenced_message_id: message.referenced_message.as_ref().map(|message| message.id),
        }
    }

    fn to_entity(&self, refs: &MessageRefs) -> Message {
        Message {
            id: self.id,
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            author: User::clone(&refs.author),
            member: refs.member.as_ref().map(|(member, user)| Box::new(member.to_entity(user))),
            content: self.content.clone(),
            timestamp: self.timestamp,
            edited_timestamp: self.edited_timestamp,
            tts: self.tts,
            mention_everyone: self.mention_everyone,
            mentions: refs.mentions.iter().map(|user| User::clone(user)).collect(),
            mention_roles: self.mention_roles.to_vec(),
            attachments: self.attachments.to_vec(),
            embeds: self.embeds.to_vec(),
            pinned: self.pinned,
            kind: self.kind,
            referenced_message: refs
                .referenced
                .as_ref()
                .map(|referenced| Box::new(referenced.0.to_entity(&referenced.1))),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct DmChannelData {
    id: ChannelId,
    pub recipient_id: UserId,
    last_message_id: Option<MessageId>,
    last_pin_timestamp: Option<Timestamp>,
}

impl DmChannelData {
    pub fn id(&self) -> ChannelId {
        self.id
    }
}

impl DataRecord for DmChannelData {
    type Entity = PrivateChannel;
    type Refs = Arc<User>;

    fn from_entity(channel: &PrivateChannel) -> Self {
        Self {
            id: channel.id,
            recipient_id: channel.recipient.id,
            last_message_id: channel.last_message_id,
            last_pin_timestamp: channel.last_pin_timestamp,
        }
    }

    fn to_entity(&self, recipient: &Arc<User>) -> PrivateChannel {
        PrivateChannel {
            id: self.id,
            recipient: User::clone(recipient),
            last_message_id: self.last_message_id,
            last_pin_timestamp: self.last_pin_timestamp,
        }
    }
}
