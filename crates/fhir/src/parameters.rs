//! FHIR Parameters resource, as sent in operation request bodies.

use serde::Serialize;

/// Value of a single named parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterValue {
    /// Rendered as `valueId`.
    Id(String),
    /// Rendered as `valueString`.
    String(String),
}

/// Builder for a `Parameters` request body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameters {
    parameters: Vec<(String, ParameterValue)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `valueId` parameter.
    pub fn with_id(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.parameters
            .push((name.into(), ParameterValue::Id(id.into())));
        self
    }

    /// Append a `valueString` parameter.
    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .push((name.into(), ParameterValue::String(value.into())));
        self
    }

    /// Render as a FHIR JSON `Parameters` resource.
    pub fn to_json(&self) -> serde_json::Value {
        let wire = ParametersWire {
            resource_type: "Parameters",
            parameter: self
                .parameters
                .iter()
                .map(|(name, value)| match value {
                    ParameterValue::Id(id) => ParameterWire {
                        name: name.as_str(),
                        value_id: Some(id.as_str()),
                        value_string: None,
                    },
                    ParameterValue::String(s) => ParameterWire {
                        name: name.as_str(),
                        value_id: None,
                        value_string: Some(s.as_str()),
                    },
                })
                .collect(),
        };
        // Serialising borrowed strings into a Value cannot fail.
        serde_json::to_value(wire).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Serialize)]
struct ParametersWire<'a> {
    #[serde(rename = "resourceType")]
    resource_type: &'static str,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameter: Vec<ParameterWire<'a>>,
}

#[derive(Serialize)]
struct ParameterWire<'a> {
    name: &'a str,

    #[serde(rename = "valueId", skip_serializing_if = "Option::is_none")]
    value_id: Option<&'a str>,

    #[serde(rename = "valueString", skip_serializing_if = "Option::is_none")]
    value_string: Option<&'a str>,
}
