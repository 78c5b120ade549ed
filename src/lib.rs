//! Guildstate is an in-process entity cache for Discord-style chat API clients.
//!
//! The [`Cache`] keeps an eventually-consistent mirror of guilds, members, channels, roles,
//! emojis, stickers, presences, voice states, invites, messages and the current user. It is fed
//! by whatever receives gateway events: each event maps onto one of the cache's `set_*`,
//! `update_*`, `delete_*`, `replace_all_*` or `clear_*` methods, called with an already
//! deserialized [model] type.
//!
//! Lookups never touch the network. Single lookups return owned copies and bulk queries return
//! [`CacheView`]s, which are point-in-time snapshots: later mutations of the cache are never
//! observed through a view that has already been handed out.
//!
//! Users (and a few other entities shared between many parents) are deduplicated and reference
//! counted, so a user who is a member of several guilds is stored once and dropped as soon as the
//! last place referencing them is removed.
//!
//! ```
//! use guildstate::cache::Cache;
//! use guildstate::model::id::GuildId;
//!
//! let cache = Cache::new();
//! assert!(cache.get_guild(GuildId::new(1)).unwrap().is_none());
//! ```
//!
//! For hosts running several tasks at once, [`SharedCache`] puts a single lock around the whole
//! cache so that every operation runs as one critical section.
//!
//! [`Cache`]: crate::cache::Cache
//! [`CacheView`]: crate::cache::CacheView
//! [`SharedCache`]: crate::cache::SharedCache
//! [model]: crate::model
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(
    unused,
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::clone_on_ref_ptr,
    clippy::non_ascii_literal,
    clippy::fallible_impl_from,
    clippy::let_underscore_must_use,
    clippy::format_push_string,
    clippy::pedantic
)]
#![allow(
    // Allowed as they are too pedantic
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions,
    clippy::unreadable_literal,
    clippy::cast_possible_wrap,
    clippy::wildcard_imports,
    clippy::cast_sign_loss,
    clippy::too_many_lines,
    clippy::doc_markdown,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

#[macro_use]
mod internal;

pub mod cache;
pub mod constants;
pub mod model;

mod error;

pub use crate::cache::{Cache, SharedCache};
pub use crate::error::{Error, Result};

/// A prelude of the types most hosts need when wiring events into the cache.
pub mod prelude {
    pub use crate::cache::{Cache, CacheComponents, CacheError, CacheView, Settings, SharedCache};
    pub use crate::error::{Error, Result};
    pub use crate::model::prelude::*;
}
