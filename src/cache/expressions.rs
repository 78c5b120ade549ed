//! Custom guild emojis and stickers.

use tracing::trace;

use super::data::{DataRecord, EmojiData, StickerData};
use super::wrappers::{add_id, remove_id, SnowflakeSet};
use super::{Cache, CacheComponents, CacheView};
use crate::internal::prelude::*;
use crate::model::guild::Emoji;
use crate::model::id::{EmojiId, GuildId, StickerId, UserId};
use crate::model::sticker::GuildSticker;
use crate::model::user::User;

impl Cache {
    fn creator(&self, user_id: Option<UserId>) -> Option<Arc<User>> {
        user_id.and_then(|user_id| self.user_arc(user_id))
    }

    /// Retrieves a custom emoji.
    pub fn get_emoji(&self, emoji_id: EmojiId) -> Option<Emoji> {
        gate!(self, CacheComponents::EMOJIS);

        let emoji = self.emojis.get(&emoji_id)?;
        Some(emoji.to_entity(&self.creator(emoji.user_id)))
    }

    /// A view of every cached custom emoji.
    pub fn get_emojis_view(&self) -> CacheView<EmojiId, Emoji> {
        gate!(self, CacheComponents::EMOJIS, CacheView::empty());

        CacheView::from_records(
            self.emojis.iter().map(|(emoji_id, emoji)| (*emoji_id, Arc::clone(emoji), self.creator(emoji.user_id))),
        )
    }

    /// A view of a guild's custom emojis, ordered by id.
    pub fn get_emojis_view_for_guild(&self, guild_id: GuildId) -> CacheView<EmojiId, Emoji> {
        gate!(self, CacheComponents::EMOJIS, CacheView::empty());

        let Some(emoji_ids) = self.guilds.get(&guild_id).and_then(|record| record.emojis.as_ref()) else {
            return CacheView::empty();
        };

        CacheView::from_records(emoji_ids.iter().filter_map(|emoji_id| {
            let emoji = self.emojis.get(&emoji_id)?;
            Some((emoji_id, Arc::clone(emoji), self.creator(emoji.user_id)))
        }))
    }

    /// Stores a custom emoji, along with its creator if present.
    pub fn set_emoji(&mut self, emoji: Emoji) {
        gate!(self, CacheComponents::EMOJIS, ());

        trace!(emoji_id = %emoji.id, guild_id = %emoji.guild_id, "Setting emoji");
        self.insert_emoji(&emoji);
        add_id(&mut self.guild_record_mut(emoji.guild_id).emojis, emoji.id);
    }

    /// Stores the emoji record only. New references are taken before old ones are released so a
    /// creator shared by both versions is never dropped in between.
    fn insert_emoji(&mut self, emoji: &Emoji) {
        if let Some(user) = &emoji.user {
            self.acquire_user(user);
        }

        if let Some(old) = self.emojis.insert(emoji.id, Arc::new(EmojiData::from_entity(emoji))) {
            self.release_emoji_refs(&old);
        }
    }

    fn release_emoji_refs(&mut self, emoji: &EmojiData) {
        if let Some(user_id) = emoji.user_id {
            self.release_user(user_id);
        }
    }

    /// Replaces a custom emoji, returning the old and new copies.
    pub fn update_emoji(&mut self, emoji: Emoji) -> (Option<Emoji>, Option<Emoji>) {
        gate!(self, CacheComponents::EMOJIS, (None, None));

        let emoji_id = emoji.id;
        let before = self.get_emoji(emoji_id);
        self.set_emoji(emoji);
        (before, self.get_emoji(emoji_id))
    }

    /// Removes a custom emoji.
    pub fn delete_emoji(&mut self, emoji_id: EmojiId) -> Option<Emoji> {
        gate!(self, CacheComponents::EMOJIS);

        let emoji = self.emojis.remove(&emoji_id)?;
        let built = emoji.to_entity(&self.creator(emoji.user_id));
        self.release_emoji_refs(&emoji);

        if let Some(record) = self.guilds.get_mut(&emoji.guild_id) {
            remove_id(&mut record.emojis, emoji_id);
        }
        self.remove_guild_record_if_empty(emoji.guild_id);

        Some(built)
    }

    /// Removes every custom emoji.
    pub fn clear_emojis(&mut self) -> CacheView<EmojiId, Emoji> {
        gate!(self, CacheComponents::EMOJIS, CacheView::empty());

        let emojis = std::mem::take(&mut self.emojis);
        self.retain_guild_records(|record| record.emojis = None, |record| record.emojis.is_none());
        self.release_emojis(emojis)
    }

    /// Removes every custom emoji of a guild.
    pub fn clear_emojis_for_guild(&mut self, guild_id: GuildId) -> CacheView<EmojiId, Emoji> {
        gate!(self, CacheComponents::EMOJIS, CacheView::empty());

        let Some(emoji_ids) = self.guilds.get_mut(&guild_id).and_then(|record| record.emojis.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.emojis.is_none());

        let emojis: Vec<_> =
            emoji_ids.iter().filter_map(|emoji_id| Some((emoji_id, self.emojis.remove(&emoji_id)?))).collect();
        self.release_emojis(emojis)
    }

    /// Builds a view of removed emojis, then releases what they referenced. The view resolves its
    /// users first so they outlive the release.
    fn release_emojis(&mut self, emojis: impl IntoIterator<Item = (EmojiId, Arc<EmojiData>)>) -> CacheView<EmojiId, Emoji> {
        let entries: Vec<_> = emojis
            .into_iter()
            .map(|(emoji_id, emoji)| {
                let creator = self.creator(emoji.user_id);
                (emoji_id, emoji, creator)
            })
            .collect();

        for (_, emoji, _) in &entries {
            self.release_emoji_refs(emoji);
        }

        CacheView::from_records(entries)
    }

    /// Replaces every custom emoji of a guild with `emojis`.
    pub fn replace_all_emojis(&mut self, guild_id: GuildId, emojis: impl IntoIterator<Item = Emoji>) {
        gate!(self, CacheComponents::EMOJIS, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.emojis.take());

        let mut emoji_ids = Vec::new();
        for emoji in emojis {
            emoji_ids.push(emoji.id);
            self.insert_emoji(&emoji);
        }

        let emoji_ids = SnowflakeSet::from_ids(emoji_ids);
        for emoji_id in old.iter().flat_map(SnowflakeSet::iter) {
            if emoji_ids.contains(emoji_id) {
                continue;
            }
            if let Some(emoji) = self.emojis.remove(&emoji_id) {
                self.release_emoji_refs(&emoji);
            }
        }

        self.guild_record_mut(guild_id).emojis = Some(emoji_ids);
    }

    /// Retrieves a guild sticker.
    pub fn get_sticker(&self, sticker_id: StickerId) -> Option<GuildSticker> {
        gate!(self, CacheComponents::STICKERS);

        let sticker = self.stickers.get(&sticker_id)?;
        Some(sticker.to_entity(&self.creator(sticker.user_id)))
    }

    /// A view of every cached guild sticker.
    pub fn get_stickers_view(&self) -> CacheView<StickerId, GuildSticker> {
        gate!(self, CacheComponents::STICKERS, CacheView::empty());

        CacheView::from_records(self.stickers.iter().map(|(sticker_id, sticker)| {
            (*sticker_id, Arc::clone(sticker), self.creator(sticker.user_id))
        }))
    }

    /// A view of a guild's stickers, ordered by id.
    pub fn get_stickers_view_for_guild(&self, guild_id: GuildId) -> CacheView<StickerId, GuildSticker> {
        gate!(self, CacheComponents::STICKERS, CacheView::empty());

        let Some(sticker_ids) = self.guilds.get(&guild_id).and_then(|record| record.stickers.as_ref()) else {
            return CacheView::empty();
        };

        CacheView::from_records(sticker_ids.iter().filter_map(|sticker_id| {
            let sticker = self.stickers.get(&sticker_id)?;
            Some((sticker_id, Arc::clone(sticker), self.creator(sticker.user_id)))
        }))
    }

    /// Stores a guild sticker, along with its creator if present.
    pub fn set_sticker(&mut self, sticker: GuildSticker) {
        gate!(self, CacheComponents::STICKERS, ());

        trace!(sticker_id = %sticker.id, guild_id = %sticker.guild_id, "Setting sticker");
        self.insert_sticker(&sticker);
        add_id(&mut self.guild_record_mut(sticker.guild_id).stickers, sticker.id);
    }

    fn insert_sticker(&mut self, sticker: &GuildSticker) {
        if let Some(user) = &sticker.user {
            self.acquire_user(user);
        }

        if let Some(old) = self.stickers.insert(sticker.id, Arc::new(StickerData::from_entity(sticker))) {
            self.release_sticker_refs(&old);
        }
    }

    fn release_sticker_refs(&mut self, sticker: &StickerData) {
        if let Some(user_id) = sticker.user_id {
            self.release_user(user_id);
        }
    }

    /// Replaces a guild sticker, returning the old and new copies.
    pub fn update_sticker(&mut self, sticker: GuildSticker) -> (Option<GuildSticker>, Option<GuildSticker>) {
        gate!(self, CacheComponents::STICKERS, (None, None));

        let sticker_id = sticker.id;
        let before = self.get_sticker(sticker_id);
        self.set_sticker(sticker);
        (before, self.get_sticker(sticker_id))
    }

    /// Removes a guild sticker.
    pub fn delete_sticker(&mut self, sticker_id: StickerId) -> Option<GuildSticker> {
        gate!(self, CacheComponents::STICKERS);

        let sticker = self.stickers.remove(&sticker_id)?;
        let built = sticker.to_entity(&self.creator(sticker.user_id));
        self.release_sticker_refs(&sticker);

        if let Some(record) = self.guilds.get_mut(&sticker.guild_id) {
            remove_id(&mut record.stickers, sticker_id);
        }
        self.remove_guild_record_if_empty(sticker.guild_id);

        Some(built)
    }

    /// Removes every guild sticker.
    pub fn clear_stickers(&mut self) -> CacheView<StickerId, GuildSticker> {
        gate!(self, CacheComponents::STICKERS, CacheView::empty());

        let stickers = std::mem::take(&mut self.stickers);
        self.retain_guild_records(|record| record.stickers = None, |record| record.stickers.is_none());
        self.release_stickers(stickers)
    }

    /// Removes every sticker of a guild.
    pub fn clear_stickers_for_guild(&mut self, guild_id: GuildId) -> CacheView<StickerId, GuildSticker> {
        gate!(self, CacheComponents::STICKERS, CacheView::empty());

        let Some(sticker_ids) = self.guilds.get_mut(&guild_id).and_then(|record| record.stickers.take()) else {
            return CacheView::empty();
        };
        self.remove_cleared_guild_record(guild_id, |record| record.stickers.is_none());

        let stickers: Vec<_> = sticker_ids
            .iter()
            .filter_map(|sticker_id| Some((sticker_id, self.stickers.remove(&sticker_id)?)))
            .collect();
        self.release_stickers(stickers)
    }

    fn release_stickers(
        &mut self,
        stickers: impl IntoIterator<Item = (StickerId, Arc<StickerData>)>,
    ) -> CacheView<StickerId, GuildSticker> {
        let entries: Vec<_> = stickers
            .into_iter()
            .map(|(sticker_id, sticker)| {
                let creator = self.creator(sticker.user_id);
                (sticker_id, sticker, creator)
            })
            .collect();

        for (_, sticker, _) in &entries {
            self.release_sticker_refs(sticker);
        }

        CacheView::from_records(entries)
    }

    /// Replaces every sticker of a guild with `stickers`.
    pub fn replace_all_stickers(&mut self, guild_id: GuildId, stickers: impl IntoIterator<Item = GuildSticker>) {
        gate!(self, CacheComponents::STICKERS, ());

        let old = self.guilds.get_mut(&guild_id).and_then(|record| record.stickers.take());

        let mut sticker_ids = Vec::new();
        for sticker in stickers {
            sticker_ids.push(sticker.id);
            self.insert_sticker(&sticker);
        }

        let sticker_ids = SnowflakeSet::from_ids(sticker_ids);
        for sticker_id in old.iter().flat_map(SnowflakeSet::iter) {
            if sticker_ids.contains(sticker_id) {
                continue;
            }
            if let Some(sticker) = self.stickers.remove(&sticker_id) {
                self.release_sticker_refs(&sticker);
            }
        }

        self.guild_record_mut(guild_id).stickers = Some(sticker_ids);
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::tests::user;
    use crate::cache::Cache;
    use crate::model::guild::Emoji;
    use crate::model::id::{EmojiId, GuildId, StickerId, UserId};
    use crate::model::sticker::{GuildSticker, StickerFormatType};

    fn emoji(guild_id: u64, id: u64, creator: Option<u64>) -> Emoji {
        Emoji {
            id: EmojiId::new(id),
            guild_id: GuildId::new(guild_id),
            name: format!("emoji{id}"),
            roles: Vec::new(),
            user: creator.map(user),
            require_colons: true,
            managed: false,
            animated: false,
            available: true,
        }
    }

    fn sticker(guild_id: u64, id: u64, creator: Option<u64>) -> GuildSticker {
        GuildSticker {
            id: StickerId::new(id),
            guild_id: GuildId::new(guild_id),
            name: format!("sticker{id}"),
            description: None,
            tags: vec!["tag".to_string()],
            format_type: StickerFormatType::Png,
            available: true,
            user: creator.map(user),
        }
    }

    #[test]
    fn emoji_creators_are_reference_counted() {
        let mut cache = Cache::new();
        cache.set_emoji(emoji(1, 10, Some(5)));
        cache.set_emoji(emoji(1, 11, Some(5)));
        assert_eq!(cache.user_ref_count(UserId::new(5)), Some(2));

        // Replacing an emoji doesn't double count its creator.
        cache.set_emoji(emoji(1, 10, Some(5)));
        assert_eq!(cache.user_ref_count(UserId::new(5)), Some(2));

        assert_eq!(cache.delete_emoji(EmojiId::new(10)), Some(emoji(1, 10, Some(5))));
        assert_eq!(cache.user_ref_count(UserId::new(5)), Some(1));

        let cleared = cache.clear_emojis_for_guild(GuildId::new(1));
        assert_eq!(cleared.get(&EmojiId::new(11)), Some(emoji(1, 11, Some(5))));
        assert_eq!(cache.user_count(), 0);
        assert_eq!(cache.guild_record_count(), 0);
    }

    #[test]
    fn replace_all_emojis_keeps_shared_creators() {
        let mut cache = Cache::new();
        cache.set_emoji(emoji(1, 10, Some(5)));
        cache.set_emoji(emoji(1, 11, None));

        cache.replace_all_emojis(GuildId::new(1), [emoji(1, 12, Some(5))]);
        assert_eq!(cache.user_ref_count(UserId::new(5)), Some(1));
        assert!(cache.get_emoji(EmojiId::new(10)).is_none());
        assert_eq!(
            cache.get_emojis_view_for_guild(GuildId::new(1)).keys().copied().collect::<Vec<_>>(),
            [EmojiId::new(12)]
        );

        assert_eq!(cache.clear_emojis().len(), 1);
        assert_eq!(cache.user_count(), 0);
    }

    #[test]
    fn stickers() {
        let mut cache = Cache::new();
        cache.set_sticker(sticker(1, 20, Some(6)));
        cache.set_sticker(sticker(2, 21, None));
        assert_eq!(cache.get_stickers_view().len(), 2);

        let mut renamed = sticker(1, 20, Some(6));
        renamed.name = "renamed".to_string();
        let (before, after) = cache.update_sticker(renamed.clone());
        assert_eq!(before, Some(sticker(1, 20, Some(6))));
        assert_eq!(after, Some(renamed));
        assert_eq!(cache.user_ref_count(UserId::new(6)), Some(1));

        cache.replace_all_stickers(GuildId::new(1), []);
        assert!(cache.get_sticker(StickerId::new(20)).is_none());
        assert_eq!(cache.user_count(), 0);
        assert!(cache.get_stickers_view_for_guild(GuildId::new(1)).is_empty());

        assert!(cache.delete_sticker(StickerId::new(21)).is_some());
        assert_eq!(cache.clear_stickers_for_guild(GuildId::new(2)).len(), 0);
        assert_eq!(cache.clear_stickers().len(), 0);
    }
}
