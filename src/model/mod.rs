//! Mappings of objects received from the API.
//!
//! These are the rich entity types the [`Cache`] is fed with and hands back. They are plain data:
//! every field is public, and every type can be built by hand or deserialized from a gateway
//! payload.
//!
//! [`Cache`]: crate::cache::Cache

mod utils;

pub mod channel;
pub mod gateway;
pub mod guild;
pub mod id;
pub mod invite;
pub mod message;
pub mod sticker;
pub mod timestamp;
pub mod user;
pub mod voice;

pub use self::timestamp::Timestamp;

/// The model prelude re-exports all types in the model sub-modules.
///
/// This allows for quick and easy access to all of the model types.
pub mod prelude {
    pub use super::channel::*;
    pub use super::gateway::*;
    pub use super::guild::*;
    pub use super::id::*;
    pub use super::invite::*;
    pub use super::message::*;
    pub use super::sticker::*;
    pub use super::user::*;
    pub use super::voice::*;
    pub use super::Timestamp;
}
