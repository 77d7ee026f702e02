// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property schemas of meta-operations.
//!
//! Nodes only type-check their properties. Ranges, clamping and
//! presentation hints live here, on the public face of a meta-operation.

use crate::value::{Color, FilePath, PropertyError, PropertyKind, PropertyType, PropertyValue, Seed, ValueError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Admissible values of a property
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueRange {
    /// Any value of the property's kind
    #[default]
    Unbounded,
    /// Inclusive numeric interval; values outside are clamped
    Numeric {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Closed set of enumerant nicks
    Enumerated(Vec<String>),
}

/// Presentation hints. They never affect validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiHints {
    /// Suggested slider range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_range: Option<(f64, f64)>,
    /// Small and large step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_steps: Option<(f64, f64)>,
    /// Free-form metadata such as `unit`, `axis` or `role`
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ui_meta: IndexMap<String, String>,
}

impl UiHints {
    /// The `unit` hint
    pub fn unit(&self) -> Option<&str> {
        self.ui_meta.get("unit").map(String::as_str)
    }

    /// The `axis` hint
    pub fn axis(&self) -> Option<&str> {
        self.ui_meta.get("axis").map(String::as_str)
    }

    /// The `role` hint
    pub fn role(&self) -> Option<&str> {
        self.ui_meta.get("role").map(String::as_str)
    }
}

/// One public property of a meta-operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Property name
    pub name: String,
    /// Human-readable label
    pub label: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Value kind
    pub kind: PropertyKind,
    /// Default value
    pub default: PropertyValue,
    /// Admissible values
    #[serde(default)]
    pub range: ValueRange,
    /// Presentation hints
    #[serde(default)]
    pub ui: UiHints,
}

impl PropertySchema {
    fn new(name: &str, kind: PropertyKind, default: PropertyValue) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            description: String::new(),
            kind,
            default,
            range: ValueRange::Unbounded,
            ui: UiHints::default(),
        }
    }

    /// Color property
    pub fn color(name: &str, default: Color) -> Self {
        Self::new(name, PropertyKind::Color, default.into())
    }

    /// Floating point property
    pub fn double(name: &str, default: f64) -> Self {
        Self::new(name, PropertyKind::Double, default.into())
    }

    /// Integer property
    pub fn int(name: &str, default: i64) -> Self {
        Self::new(name, PropertyKind::Integer, default.into())
    }

    /// Random seed property
    pub fn seed(name: &str, default: u32) -> Self {
        Self::new(name, PropertyKind::Seed, Seed(default).into())
    }

    /// File path property
    pub fn file_path(name: &str, default: &str) -> Self {
        Self::new(name, PropertyKind::FilePath, FilePath(default.to_string()).into())
    }

    /// String property
    pub fn string(name: &str, default: &str) -> Self {
        Self::new(name, PropertyKind::String, default.into())
    }

    /// Enumerated property over the given nicks
    pub fn enumeration<I, S>(name: &str, default: &str, domain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::new(name, PropertyKind::Enum, PropertyValue::Enum(default.to_string()));
        schema.range = ValueRange::Enumerated(domain.into_iter().map(Into::into).collect());
        schema
    }

    /// Set the label
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Set the description
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Restrict to `[min, max]`
    pub fn value_range(mut self, min: f64, max: f64) -> Self {
        self.range = ValueRange::Numeric { min, max };
        self
    }

    /// Suggested slider range
    pub fn ui_range(mut self, min: f64, max: f64) -> Self {
        self.ui.ui_range = Some((min, max));
        self
    }

    /// Slider steps
    pub fn ui_steps(mut self, small: f64, large: f64) -> Self {
        self.ui.ui_steps = Some((small, large));
        self
    }

    /// Attach a metadata hint
    pub fn ui_meta(mut self, key: &str, value: &str) -> Self {
        self.ui.ui_meta.insert(key.to_string(), value.to_string());
        self
    }

    /// Bring a value into the property's domain.
    ///
    /// Numeric values outside the range are clamped; a double written to an
    /// integer property is rounded. Colors may be given as strings. An
    /// integer written to an enumerated property is the enumerant's position
    /// in the domain. Anything else that does not fit is rejected.
    pub fn coerce(&self, value: &PropertyValue) -> Result<PropertyValue, PropertyError> {
        let invalid = |reason: ValueError| PropertyError::InvalidValue {
            property: self.name.clone(),
            reason,
        };
        let mismatch = || {
            invalid(ValueError::Mismatch {
                expected: self.kind,
                found: value.kind(),
            })
        };

        let coerced = match self.kind {
            PropertyKind::Double => {
                let v = self.finite(value).ok_or_else(mismatch)?;
                PropertyValue::Double(self.clamp(v))
            }
            PropertyKind::Integer => match value {
                PropertyValue::Int(v) => PropertyValue::Int(self.clamp_int(*v)),
                PropertyValue::Double(_) => {
                    let v = self.finite(value).ok_or_else(mismatch)?;
                    PropertyValue::Int(self.clamp(v.round()) as i64)
                }
                _ => return Err(mismatch()),
            },
            PropertyKind::Seed => {
                let v = match value {
                    PropertyValue::Seed(_) | PropertyValue::Int(_) => self.finite(value),
                    _ => None,
                }
                .ok_or_else(mismatch)?;
                let v = self.clamp(v).clamp(0.0, f64::from(u32::MAX));
                PropertyValue::Seed(Seed(v as u32))
            }
            PropertyKind::Color => PropertyValue::Color(Color::from_value(value).map_err(invalid)?),
            PropertyKind::FilePath => PropertyValue::from(FilePath::from_value(value).map_err(invalid)?),
            PropertyKind::String => PropertyValue::String(String::from_value(value).map_err(invalid)?),
            PropertyKind::Enum => {
                let nick = match (value, &self.range) {
                    (PropertyValue::Enum(s) | PropertyValue::String(s), _) => s.clone(),
                    (PropertyValue::Int(code), ValueRange::Enumerated(domain)) => usize::try_from(*code)
                        .ok()
                        .and_then(|index| domain.get(index))
                        .cloned()
                        .unwrap_or_else(|| code.to_string()),
                    (other, _) => other.to_string(),
                };
                match &self.range {
                    ValueRange::Enumerated(domain) if !domain.contains(&nick) => {
                        return Err(invalid(ValueError::OutOfDomain {
                            value: nick,
                            domain: domain.clone(),
                        }));
                    }
                    ValueRange::Enumerated(_) if matches!(value, PropertyValue::Int(_)) => PropertyValue::Enum(nick),
                    _ if !matches!(value, PropertyValue::Enum(_) | PropertyValue::String(_)) => {
                        return Err(mismatch());
                    }
                    _ => PropertyValue::Enum(nick),
                }
            }
        };

        if value.kind() == coerced.kind() && coerced != *value {
            tracing::debug!(property = %self.name, from = %value, to = %coerced, "Clamped property value");
        }
        Ok(coerced)
    }

    /// Whether the default is admissible without any adjustment
    pub fn check_default(&self) -> Result<(), PropertyError> {
        let coerced = self.coerce(&self.default)?;
        if coerced == self.default {
            return Ok(());
        }
        Err(PropertyError::InvalidValue {
            property: self.name.clone(),
            reason: ValueError::OutOfDomain {
                value: self.default.to_string(),
                domain: vec![self.range_text()],
            },
        })
    }

    fn range_text(&self) -> String {
        match &self.range {
            ValueRange::Unbounded => self.kind.to_string(),
            ValueRange::Numeric { min, max } => format!("[{min}, {max}]"),
            ValueRange::Enumerated(domain) => domain.join(" | "),
        }
    }

    fn finite(&self, value: &PropertyValue) -> Option<f64> {
        value.as_f64().filter(|v| v.is_finite())
    }

    fn clamp_int(&self, v: i64) -> i64 {
        match self.range {
            ValueRange::Numeric { min, max } => v.clamp(min.ceil() as i64, max.floor() as i64),
            _ => v,
        }
    }

    fn clamp(&self, v: f64) -> f64 {
        match self.range {
            ValueRange::Numeric { min, max } => v.clamp(min, max),
            _ => v,
        }
    }
}
