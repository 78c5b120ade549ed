use serde::de::{Deserialize, Deserializer};

/// Used with `#[serde(deserialize_with = "deserialize_some")]` on `Option<Option<T>>` fields, so
/// that an explicit `null` becomes `Some(None)` while an omitted field stays `None` through
/// `#[serde(default)]`.
pub fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
