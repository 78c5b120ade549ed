use parking_lot::RwLock;

use super::{Cache, Settings};

/// A [`Cache`] behind a single reader-writer lock, for hosts handling events on several threads.
///
/// Every closure passed to [`Self::read`] or [`Self::write`] runs as one atomic operation. The
/// invariants a cache keeps span several of its collections, so there is no finer grained
/// locking. Views returned from the cache don't borrow it and can outlive the lock.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use guildstate::cache::SharedCache;
/// use guildstate::model::id::UserId;
///
/// let cache = Arc::new(SharedCache::default());
/// let users = cache.read(|cache| cache.get_users_view());
/// assert!(users.get(&UserId::new(1)).is_none());
/// ```
#[derive(Debug, Default)]
pub struct SharedCache {
    inner: RwLock<Cache>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_settings(settings: Settings) -> Self {
        Self::from(Cache::new_with_settings(settings))
    }

    /// Runs `f` with shared access to the cache.
    pub fn read<R>(&self, f: impl FnOnce(&Cache) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` with exclusive access to the cache.
    pub fn write<R>(&self, f: impl FnOnce(&mut Cache) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn into_inner(self) -> Cache {
        self.inner.into_inner()
    }
}

impl From<Cache> for SharedCache {
    fn from(cache: Cache) -> Self {
        Self {
            inner: RwLock::new(cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SharedCache;
    use crate::cache::tests::member;
    use crate::model::id::{GuildId, UserId};

    #[test]
    fn concurrent_writers() {
        let cache = SharedCache::new();
        std::thread::scope(|scope| {
            for guild_id in 1..=8 {
                let cache = &cache;
                scope.spawn(move || cache.write(|cache| cache.set_member(member(guild_id, 42))));
            }
        });

        assert_eq!(cache.read(|cache| cache.user_ref_count(UserId::new(42))), Some(8));

        let view = cache.read(|cache| cache.get_members_view());
        cache.write(|cache| cache.clear_members());
        assert_eq!(view.len(), 8);
        assert!(view.get(&GuildId::new(3)).is_some());

        let cache = cache.into_inner();
        assert_eq!(cache.user_count(), 0);
    }
}
