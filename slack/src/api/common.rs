//! Common types and utilities for the Slack Web API

use serde::{Deserialize, Deserializer};

/// Envelope every Web API method wraps its payload in
#[derive(Debug, Deserialize)]
pub struct SlackResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// Unix seconds; Slack sends these as numbers or as numeric strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonTime(pub i64);

impl JsonTime {
    pub fn unix(&self) -> i64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for JsonTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IntOrString {
            Int(i64),
            Float(f64),
            String(String),
            Null(()),
        }

        match IntOrString::deserialize(deserializer)? {
            IntOrString::Int(secs) => Ok(JsonTime(secs)),
            IntOrString::Float(secs) => Ok(JsonTime(secs.trunc() as i64)),
            IntOrString::String(s) if s.is_empty() => Ok(JsonTime(0)),
            IntOrString::String(s) => {
                let whole = s.split('.').next().unwrap_or_default();
                whole
                    .parse::<i64>()
                    .map(JsonTime)
                    .map_err(|_| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
            }
            IntOrString::Null(()) => Ok(JsonTime(0)),
        }
    }
}

/// Slack returns `null` for some string fields; treat those as empty
pub fn deserialize_null_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(default)]
        created: JsonTime,
    }

    #[test]
    fn json_time_accepts_integers() {
        let parsed: Stamped = serde_json::from_str(r#"{"created": 1449252889}"#).unwrap();
        assert_eq!(parsed.created, JsonTime(1449252889));
    }

    #[test]
    fn json_time_accepts_numeric_strings() {
        let parsed: Stamped = serde_json::from_str(r#"{"created": "1449252889"}"#).unwrap();
        assert_eq!(parsed.created.unix(), 1449252889);

        let parsed: Stamped =
            serde_json::from_str(r#"{"created": "1512085950.000216"}"#).unwrap();
        assert_eq!(parsed.created.unix(), 1512085950);
    }

    #[test]
    fn json_time_defaults_when_missing_or_null() {
        let parsed: Stamped = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(parsed.created, JsonTime(0));

        let parsed: Stamped = serde_json::from_str(r#"{"created": null}"#).unwrap();
        assert_eq!(parsed.created, JsonTime(0));
    }

    #[test]
    fn json_time_rejects_garbage() {
        let parsed = serde_json::from_str::<Stamped>(r#"{"created": "yesterday"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn envelope_carries_error_code() {
        let envelope: SlackResponse =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();

        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("channel_not_found"));
    }

    #[test]
    fn query_params_skip_missing_optionals() {
        let params = ApiQueryParams::new()
            .add("channel", "C024BE91L")
            .add("include_locale", true)
            .add_optional("cursor", None::<String>);

        assert_eq!(
            params.as_pairs(),
            &[
                ("channel".to_string(), "C024BE91L".to_string()),
                ("include_locale".to_string(), "true".to_string()),
            ]
        );
    }
}
