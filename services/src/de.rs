use std::time::Duration;

use serde::{
    de::Error,
    Deserialize,
};
use uuid::Uuid;


/// Upper bound for any configured number of seconds
pub const MAX_SECS: u64 = u32::MAX as u64;

/// Whole or fractional seconds; negative values clamp to zero and huge ones
/// to [`MAX_SECS`]
pub fn floored_secs<'de, D>(de: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(de)?;
    if secs.is_nan() {
        return Err(Error::custom("expected a number of seconds"));
    }
    Ok(Duration::try_from_secs_f64(secs.clamp(0.0, MAX_SECS as f64)).unwrap_or(Duration::from_secs(MAX_SECS)))
}

/// Accepts an empty string as "no token" so a blank placeholder in the settings file is not an error
pub fn optional_token<'de, D>(de: D) -> Result<Option<Uuid>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(de)? {
        Some(val) if !val.trim().is_empty() => val.trim().parse().map(Some).map_err(Error::custom),
        _ => Ok(None),
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[derive(Deserialize)]
    struct Secs(#[serde(deserialize_with = "floored_secs")] Duration);

    #[derive(Deserialize)]
    struct Token(#[serde(deserialize_with = "optional_token")] Option<Uuid>);

    #[test]
    fn test_floored_secs() {
        let parse = |s: &str| serde_json::from_str::<Secs>(s).map(|s| s.0);

        assert_eq!(parse("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse("-10").unwrap(), Duration::ZERO);
        assert_eq!(parse("1e300").unwrap(), Duration::from_secs(MAX_SECS));
        assert!(parse(r#""thirty""#).is_err());
    }

    #[test]
    fn test_optional_token() {
        let parse = |s: &str| serde_json::from_str::<Token>(s).map(|t| t.0);

        assert_eq!(parse(r#""""#).unwrap(), None);
        assert_eq!(parse("null").unwrap(), None);
        assert_eq!(
            parse(r#""  2b7a5c1e-0f7f-4c2b-9a36-2a2b1b5a8f10 ""#).unwrap(),
            Some(Uuid::parse_str("2b7a5c1e-0f7f-4c2b-9a36-2a2b1b5a8f10").unwrap())
        );
        assert!(parse(r#""not-a-token""#).is_err());
    }
}
