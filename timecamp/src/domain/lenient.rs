//! TimeCamp returns several identifiers either as JSON strings or numbers,
//! depending on the endpoint and account age.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => s,
        Some(StringOrNumber::Int(n)) => n.to_string(),
        Some(StringOrNumber::Float(n)) => n.to_string(),
        None => String::new(),
    })
}

pub(crate) fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => Some(s),
        Some(StringOrNumber::Int(n)) => Some(n.to_string()),
        Some(StringOrNumber::Float(n)) => Some(n.to_string()),
        None => None,
    })
}

pub(crate) fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::Int(n)) => Ok(n),
        Some(StringOrNumber::Float(n)) => Ok(n as i64),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(0),
        Some(StringOrNumber::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected integer, got {:?}", s))),
        None => Ok(0),
    }
}
