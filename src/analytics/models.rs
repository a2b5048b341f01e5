use crate::core::Primitive;
use serde::Serialize;
#[cfg(feature = "analytics")]
use std::collections::BTreeMap;

/// Names longer than this are cut down.
pub const MAX_EVENT_NAME_LENGTH: usize = 31;

/// How many characters of an over-long name are kept.
pub const TRUNCATED_EVENT_NAME_LENGTH: usize = 32;

/// A parameter value in one of the kinds the analytics sink accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Long(i64),
    Double(f64),
    String(String),
}

impl ParameterValue {
    /// Converts a call-site value, or `None` for kinds analytics does not accept.
    pub fn from_primitive(value: Primitive) -> Option<Self> {
        match value {
            Primitive::Int(v) => Some(ParameterValue::Long(i64::from(v))),
            Primitive::Long(v) => Some(ParameterValue::Long(v)),
            Primitive::Float(v) => Some(ParameterValue::Double(f64::from(v))),
            Primitive::Double(v) => Some(ParameterValue::Double(v)),
            Primitive::String(v) => Some(ParameterValue::String(v)),
            Primitive::Bool(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

/// An event ready to be handed to an [`super::AnalyticsSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl AnalyticsEvent {
    /// Normalizes a name and its parameters.
    ///
    /// Returns `None` for an empty name. Parameters of unsupported kinds are
    /// dropped; the rest keep their order.
    pub fn new<I, K>(name: &str, parameters: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, Primitive)>,
        K: AsRef<str>,
    {
        if name.is_empty() {
            return None;
        }

        let parameters = parameters
            .into_iter()
            .filter_map(|(key, value)| {
                ParameterValue::from_primitive(value).map(|value| Parameter {
                    name: key.as_ref().to_lowercase(),
                    value,
                })
            })
            .collect();

        Some(Self {
            name: normalize_event_name(name),
            parameters,
        })
    }
}

pub fn normalize_event_name(name: &str) -> String {
    if name.chars().count() > MAX_EVENT_NAME_LENGTH {
        name.chars()
            .take(TRUNCATED_EVENT_NAME_LENGTH)
            .collect::<String>()
            .to_lowercase()
    } else {
        name.to_lowercase()
    }
}

// Measurement Protocol request body.
#[cfg(feature = "analytics")]
#[derive(Debug, Serialize)]
pub(crate) struct CollectRequest<'a> {
    pub(crate) app_instance_id: &'a str,
    pub(crate) events: Vec<CollectEvent<'a>>,
}

#[cfg(feature = "analytics")]
#[derive(Debug, Serialize)]
pub(crate) struct CollectEvent<'a> {
    pub(crate) name: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) params: BTreeMap<&'a str, &'a ParameterValue>,
}

#[cfg(feature = "analytics")]
impl<'a> CollectEvent<'a> {
    pub(crate) fn new(name: &'a str, parameters: &'a [Parameter]) -> Self {
        let params = parameters
            .iter()
            .map(|p| (p.name.as_str(), &p.value))
            .collect();
        Self { name, params }
    }
}
