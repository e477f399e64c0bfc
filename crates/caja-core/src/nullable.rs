//! Serde helper for PATCH bodies that must distinguish an absent field from
//! an explicit `null` (clear the field).

use serde::{Deserialize, Deserializer};

/// Deserialiser for `Option<Option<T>>` fields: an absent field stays `None`
/// via `#[serde(default)]`, while a present field — including `null` —
/// becomes `Some(inner)`.
pub fn explicit<'de, D, T>(
  deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  #[derive(Debug, Deserialize)]
  struct Patch {
    #[serde(default, deserialize_with = "super::explicit")]
    url: Option<Option<String>>,
  }

  #[test]
  fn absent_field_is_none() {
    let p: Patch = serde_json::from_str("{}").unwrap();
    assert!(p.url.is_none());
  }

  #[test]
  fn null_field_is_some_none() {
    let p: Patch = serde_json::from_str(r#"{"url": null}"#).unwrap();
    assert_eq!(p.url, Some(None));
  }

  #[test]
  fn present_field_is_some_some() {
    let p: Patch = serde_json::from_str(r#"{"url": "https://x/y"}"#).unwrap();
    assert_eq!(p.url, Some(Some("https://x/y".to_string())));
  }
}
