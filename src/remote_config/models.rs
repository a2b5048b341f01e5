use crate::core::Error;
use chrono::{DateTime, Utc};
#[cfg(feature = "remote_config")]
use std::collections::HashMap;

const TRUE_VALUES: [&str; 6] = ["1", "true", "t", "yes", "y", "on"];
const FALSE_VALUES: [&str; 7] = ["0", "false", "f", "no", "n", "off", ""];

/// Which layer a value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// The key exists in no layer; the value is empty.
    Static,
    Default,
    Remote,
}

/// A value read from the config store, kept as the raw text the store holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue {
    raw: String,
    source: ValueSource,
}

impl ConfigValue {
    pub fn new(raw: impl Into<String>, source: ValueSource) -> Self {
        Self {
            raw: raw.into(),
            source,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> ValueSource {
        self.source
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        let lowered = self.raw.trim().to_lowercase();
        if TRUE_VALUES.contains(&lowered.as_str()) {
            Ok(true)
        } else if FALSE_VALUES.contains(&lowered.as_str()) {
            Ok(false)
        } else {
            Err(self.invalid("a boolean"))
        }
    }

    pub fn as_i64(&self) -> Result<i64, Error> {
        self.raw
            .trim()
            .parse()
            .map_err(|_| self.invalid("a 64-bit integer"))
    }

    /// Lenient numeric read: surrounding whitespace is ignored and a single
    /// `,` is accepted as the decimal separator.
    pub fn as_f64(&self) -> Result<f64, Error> {
        let trimmed = self.raw.trim();
        if let Ok(value) = trimmed.parse() {
            return Ok(value);
        }
        if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
            if let Ok(value) = trimmed.replace(',', ".").parse() {
                return Ok(value);
            }
        }
        Err(self.invalid("a 64-bit float"))
    }

    pub fn as_string(&self) -> String {
        self.raw.clone()
    }

    fn invalid(&self, expected: &'static str) -> Error {
        Error::InvalidValue {
            raw: self.raw.clone(),
            expected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastFetchStatus {
    #[default]
    NoFetchYet,
    Success,
    Failure,
}

/// What the store knows about its most recent fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchInfo {
    pub last_fetch_status: LastFetchStatus,
    pub last_successful_fetch: Option<DateTime<Utc>>,
}

impl FetchInfo {
    pub fn succeeded(&self) -> bool {
        self.last_fetch_status == LastFetchStatus::Success
    }
}

#[cfg(feature = "remote_config")]
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FetchRequest<'a> {
    pub(crate) app_instance_id: &'a str,
    pub(crate) app_id: &'a str,
}

/// Template state reported by the fetch endpoint.
#[cfg(feature = "remote_config")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchState {
    Update,
    NoChange,
    NoTemplate,
    EmptyConfig,
    #[serde(other)]
    Unspecified,
}

#[cfg(feature = "remote_config")]
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FetchResponse {
    #[serde(default)]
    pub(crate) entries: HashMap<String, String>,
    pub(crate) state: Option<FetchState>,
}
