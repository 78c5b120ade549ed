//! These prelude re-exports are a set of exports that are commonly used from within the library.
//!
//! These are not publicly re-exported to the end user, and must stay as a private module.

pub use std::sync::Arc;

pub use fxhash::{FxHashMap, FxHashSet};

pub use crate::error::{Error, Result};
