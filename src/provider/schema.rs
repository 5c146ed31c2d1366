//! Declarative schema for the provider, its resources and data sources.
//!
//! The schema is what the host sees: attribute names, their (string) type,
//! required/optional/computed flags, defaults and enumerated values. It is
//! also used to validate desired state before any remote call is made.

use super::{Diagnostic, ProviderError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute every resource state carries besides its declared attributes.
pub const ID_ATTRIBUTE: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub description: &'static str,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<&'static [&'static str]>,
}

impl Attribute {
    const fn string(description: &'static str) -> Self {
        Self {
            description,
            ty: AttributeType::String,
            required: false,
            optional: false,
            computed: false,
            default: None,
            force_new: false,
            sensitive: false,
            one_of: None,
        }
    }

    #[must_use]
    pub const fn required_string(description: &'static str) -> Self {
        let mut attribute = Self::string(description);
        attribute.required = true;
        attribute
    }

    #[must_use]
    pub const fn optional_string(description: &'static str) -> Self {
        let mut attribute = Self::string(description);
        attribute.optional = true;
        attribute
    }

    #[must_use]
    pub const fn computed_string(description: &'static str) -> Self {
        let mut attribute = Self::string(description);
        attribute.computed = true;
        attribute
    }

    #[must_use]
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Restrict values to an enumerated, case-sensitive set.
    #[must_use]
    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    fn configurable(&self) -> bool {
        self.required || self.optional
    }

    fn validate(&self, name: &str, value: &Value) -> Option<ProviderError> {
        if value.is_null() {
            return self.required.then(|| {
                ProviderError::validation(
                    name,
                    format!("The argument {name:?} is required, but no definition was found."),
                )
            });
        }

        if !self.configurable() {
            return Some(ProviderError::validation(
                name,
                format!("Value for unconfigurable attribute {name:?}"),
            ));
        }

        let Some(text) = value.as_str() else {
            return Some(ProviderError::validation(
                name,
                format!("Inappropriate value for attribute {name:?}: string required."),
            ));
        };

        match self.one_of {
            Some(allowed) if !allowed.contains(&text) => {
                let expected = allowed
                    .iter()
                    .map(|value| format!("'{value}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(ProviderError::validation(
                    name,
                    format!("{name:?} must be one of: {expected}, got: {text}"),
                ))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    #[must_use]
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Fill declared defaults for attributes that are missing or null.
    pub fn apply_defaults(&self, config: &mut Value) {
        let Some(object) = config.as_object_mut() else {
            return;
        };
        for (name, attribute) in &self.attributes {
            if let Some(default) = attribute.default {
                let missing = object.get(*name).map_or(true, Value::is_null);
                if missing {
                    object.insert((*name).to_string(), Value::String(default.to_string()));
                }
            }
        }
    }

    /// Validate a desired-state document against the schema.
    ///
    /// `id` is always accepted; computed attributes are accepted only when null.
    #[must_use]
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let empty = Map::new();
        let Some(object) = config.as_object().or_else(|| config.is_null().then_some(&empty)) else {
            return vec![Diagnostic::error("configuration must be a JSON object")];
        };

        let mut diagnostics: Vec<Diagnostic> = self
            .attributes
            .iter()
            .filter_map(|(name, attribute)| {
                attribute.validate(name, object.get(*name).unwrap_or(&Value::Null))
            })
            .map(Diagnostic::from)
            .collect();

        diagnostics.extend(
            object
                .keys()
                .filter(|key| key.as_str() != ID_ATTRIBUTE && !self.attributes.contains_key(key.as_str()))
                .map(|key| {
                    Diagnostic::from(ProviderError::validation(
                        key.as_str(),
                        format!("An argument named {key:?} is not expected here."),
                    ))
                }),
        );

        diagnostics
    }
}

/// Complete schema exposed to the host.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<&'static str, Schema>,
    pub data_sources: BTreeMap<&'static str, Schema>,
}
