use serde::{Deserialize, Deserializer};

/// Deserializes an explicit `null` as the default value of `T`.
///
/// Use together with `#[serde(default)]` so that both missing and `null`
/// members decode to the default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
