use std::error::Error as StdError;
use std::fmt;

use serde_json::Error as JsonError;

use crate::cache::CacheError;

/// The common result type between most library functions.
///
/// The library exposes functions which, for a result type, exposes only one type, rather than the
/// usual 2 (`Result<T, Error>`). This is because all functions that return a result return
/// guildstate's [`Error`], so this is implied, and a "simpler" result is used.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A common error enum returned by most of the library's functionality within a custom
/// [`Result`].
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A lookup in the [`Cache`] could not be answered safely.
    ///
    /// [`Cache`]: crate::cache::Cache
    Cache(CacheError),
    /// An error from the `serde_json` crate, such as while loading [`Settings`].
    ///
    /// [`Settings`]: crate::cache::Settings
    Json(JsonError),
}

impl From<CacheError> for Error {
    fn from(e: CacheError) -> Error {
        Error::Cache(e)
    }
}

impl From<JsonError> for Error {
    fn from(e: JsonError) -> Error {
        Error::Json(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache(inner) => fmt::Display::fmt(&inner, f),
            Self::Json(inner) => fmt::Display::fmt(&inner, f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Cache(inner) => Some(inner),
            Self::Json(inner) => Some(inner),
        }
    }
}
