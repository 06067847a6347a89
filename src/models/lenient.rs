//! Deserializers for form fields that browsers post either as JSON numbers
//! or as the raw `<input>` string (`"days": "3"`).

use serde::de::{Deserialize, Deserializer, Error};

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Text(String),
}

impl IntOrString {
    /// A blank string counts as absent.
    fn into_int(self) -> Result<Option<i64>, String> {
        match self {
            IntOrString::Int(n) => Ok(Some(n)),
            IntOrString::Text(text) if text.trim().is_empty() => Ok(None),
            IntOrString::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("expected a whole number, got \"{}\"", text)),
        }
    }
}

/// `Option<i64>` from a number, a numeric string, `""` or `null`.
pub fn optional_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => value.into_int().map_err(D::Error::custom),
    }
}

/// Required non-negative `u32` from a number or a numeric string.
pub fn u32_from_int_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = IntOrString::deserialize(deserializer)?
        .into_int()
        .map_err(D::Error::custom)?
        .ok_or_else(|| D::Error::custom("expected a whole number, got an empty string"))?;

    u32::try_from(value)
        .map_err(|_| D::Error::custom(format!("expected a non-negative whole number, got {}", value)))
}
