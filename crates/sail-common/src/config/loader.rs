use serde::Deserialize;

/// Deserialize an empty string as [`None`].
///
/// The bundled TOML defaults cannot express a missing value, so optional
/// string settings use the empty string as their default.
pub fn deserialize_non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}
