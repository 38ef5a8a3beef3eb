use std::collections::HashSet;
use std::fmt::Write as _;
use serde::Serialize;

use crate::error::{Error, Result};
use super::value::{ParamValue, ParamValues};
use super::Kwargs;

/// Declared type of a parameter field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "variants", rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Bool,
    Enum(&'static [&'static str]),
}

impl FieldType {
    /// Type name as shown in documentation
    pub fn type_name(&self) -> String {
        match self {
            FieldType::Int => "int".to_string(),
            FieldType::Bool => "boolean".to_string(),
            FieldType::Enum(variants) => {
                let quoted: Vec<String> = variants.iter().map(|v| format!("'{}'", v)).collect();
                format!("{{{}}}", quoted.join(", "))
            }
        }
    }
}

/// Domain restriction on an integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    None,
    AtLeast(i64),
    /// Inclusive on both ends
    Range(i64, i64),
}

impl Constraint {
    fn check(&self, value: i64) -> std::result::Result<(), String> {
        match *self {
            Constraint::None => Ok(()),
            Constraint::AtLeast(lo) if value < lo => {
                Err(format!("value must be at least {}", lo))
            }
            Constraint::Range(lo, hi) if value < lo || value > hi => {
                Err(format!("value must be in range [{}, {}]", lo, hi))
            }
            _ => Ok(()),
        }
    }
}

/// One entry of a [`ParamSchema`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub default: Option<ParamValue>,
    pub constraint: Constraint,
    pub description: &'static str,
}

impl FieldSpec {
    fn new(name: &'static str, field_type: FieldType, description: &'static str) -> Self {
        Self {
            name,
            field_type,
            default: None,
            constraint: Constraint::None,
            description,
        }
    }

    pub fn int(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Int, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Bool, description)
    }

    pub fn enumeration(
        name: &'static str,
        variants: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self::new(name, FieldType::Enum(variants), description)
    }

    pub fn with_default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn at_least(mut self, lo: i64) -> Self {
        self.constraint = Constraint::AtLeast(lo);
        self
    }

    pub fn in_range(mut self, lo: i64, hi: i64) -> Self {
        self.constraint = Constraint::Range(lo, hi);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Parse and validate a raw string for this field
    pub fn parse_value(&self, kind: &str, raw: &str) -> Result<ParamValue> {
        let invalid = |reason: String| Error::InvalidParameter {
            kind: kind.to_string(),
            field: self.name.to_string(),
            value: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        match &self.field_type {
            FieldType::Int => {
                let value: i64 = trimmed
                    .parse()
                    .map_err(|_| invalid("expected an integer".to_string()))?;
                self.constraint.check(value).map_err(|reason| invalid(reason))?;
                Ok(ParamValue::Int(value))
            }
            FieldType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(ParamValue::Bool(true)),
                "false" | "0" => Ok(ParamValue::Bool(false)),
                _ => Err(invalid("expected a boolean".to_string())),
            },
            FieldType::Enum(variants) => variants
                .iter()
                .find(|v| **v == trimmed)
                .map(|v| ParamValue::Enum(v.to_string()))
                .ok_or_else(|| invalid(format!("expected one of {}", self.field_type.type_name()))),
        }
    }
}

/// Ordered field list for one operator kind. Drives both parsing and
/// documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSchema {
    pub kind: &'static str,
    fields: Vec<FieldSpec>,
}

impl ParamSchema {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Append a field. Field names must be unique; a repeated name is a
    /// construction bug and panics.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        assert!(
            self.get(spec.name).is_none(),
            "duplicate field '{}' in schema for {}",
            spec.name,
            self.kind
        );
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Parse a string mapping against this schema.
    ///
    /// Unknown keys, missing required fields and out-of-domain values are
    /// all rejected. Omitted optional fields take their defaults.
    pub fn parse(&self, kwargs: &Kwargs) -> Result<ParamValues> {
        let known: HashSet<&str> = self.fields.iter().map(|f| f.name).collect();

        // Sorted so the reported key is deterministic
        let mut unknown: Vec<&String> = kwargs.keys().filter(|k| !known.contains(k.as_str())).collect();
        unknown.sort();
        if let Some(key) = unknown.first() {
            return Err(Error::UnknownParameter {
                kind: self.kind.to_string(),
                key: key.to_string(),
            });
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let value = match (kwargs.get(spec.name), &spec.default) {
                (Some(raw), _) => spec.parse_value(self.kind, raw)?,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(Error::MissingParameter {
                        kind: self.kind.to_string(),
                        field: spec.name.to_string(),
                    })
                }
            };
            values.push((spec.name, value));
        }

        Ok(ParamValues::new(self.kind, values))
    }

    /// Human-readable field listing
    pub fn docstring(&self) -> String {
        let mut doc = String::new();
        for spec in &self.fields {
            let requirement = match &spec.default {
                Some(default) => format!("optional, default={}", default),
                None => "required".to_string(),
            };
            let _ = writeln!(
                doc,
                "{} : {}, {}\n    {}",
                spec.name,
                spec.field_type.type_name(),
                requirement,
                spec.description
            );
        }
        doc
    }

    /// JSON rendering of the schema
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::InvalidConfiguration(format!("Failed to serialize schema for {}: {}", self.kind, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: &[&str] = &["fast", "exact"];

    fn schema() -> ParamSchema {
        ParamSchema::new("Test")
            .field(FieldSpec::int("count", "number of things").at_least(1))
            .field(FieldSpec::boolean("enabled", "switch").with_default(true))
            .field(FieldSpec::enumeration("mode", MODES, "mode").with_default("fast"))
            .field(FieldSpec::int("level", "level").in_range(0, 3).with_default(0))
    }

    fn kwargs(pairs: &[(&str, &str)]) -> Kwargs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_filled() {
        let values = schema().parse(&kwargs(&[("count", "3")])).unwrap();
        assert_eq!(values.int("count").unwrap(), 3);
        assert!(values.bool("enabled").unwrap());
        assert_eq!(values.enumeration("mode").unwrap(), "fast");
        assert_eq!(values.int("level").unwrap(), 0);
    }

    #[test]
    fn test_values_follow_schema_order() {
        let values = schema().parse(&kwargs(&[("level", "2"), ("count", "1")])).unwrap();
        let names: Vec<&str> = values.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["count", "enabled", "mode", "level"]);
    }

    #[test]
    fn test_bool_spellings() {
        let s = schema();
        for (raw, expected) in [("true", true), ("TRUE", true), ("1", true), ("False", false), ("0", false)] {
            let values = s.parse(&kwargs(&[("count", "1"), ("enabled", raw)])).unwrap();
            assert_eq!(values.bool("enabled").unwrap(), expected, "raw = {}", raw);
        }
        assert!(s.parse(&kwargs(&[("count", "1"), ("enabled", "yes")])).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = schema().parse(&kwargs(&[("count", "1"), ("zeta", "1"), ("alpha", "2")])).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownParameter { kind: "Test".to_string(), key: "alpha".to_string() }
        );
    }

    #[test]
    fn test_missing_required() {
        let err = schema().parse(&Kwargs::new()).unwrap_err();
        assert_eq!(
            err,
            Error::MissingParameter { kind: "Test".to_string(), field: "count".to_string() }
        );
    }

    #[test]
    fn test_constraints() {
        let s = schema();
        assert!(matches!(
            s.parse(&kwargs(&[("count", "0")])),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            s.parse(&kwargs(&[("count", "-4")])),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            s.parse(&kwargs(&[("count", "1"), ("level", "4")])),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            s.parse(&kwargs(&[("count", "1.5")])),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(s.parse(&kwargs(&[("count", " 7 ")])).is_ok());
    }

    #[test]
    fn test_enum_must_match_variant() {
        let s = schema();
        assert!(s.parse(&kwargs(&[("count", "1"), ("mode", "exact")])).is_ok());
        let err = s.parse(&kwargs(&[("count", "1"), ("mode", "slow")])).unwrap_err();
        assert!(err.to_string().contains("{'fast', 'exact'}"));
    }

    #[test]
    fn test_docstring_lists_every_field() {
        let doc = schema().docstring();
        assert!(doc.contains("count : int, required"));
        assert!(doc.contains("enabled : boolean, optional, default=true"));
        assert!(doc.contains("mode : {'fast', 'exact'}, optional, default=fast"));
    }

    #[test]
    fn test_to_json() {
        let json: serde_json::Value = serde_json::from_str(&schema().to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "Test");
        assert_eq!(json["fields"][0]["name"], "count");
        assert_eq!(json["fields"][0]["default"], serde_json::Value::Null);
        assert_eq!(json["fields"][1]["default"], true);
        assert_eq!(json["fields"][2]["field_type"]["variants"][1], "exact");
    }

    #[test]
    #[should_panic(expected = "duplicate field")]
    fn test_duplicate_field_panics() {
        let _ = ParamSchema::new("Test")
            .field(FieldSpec::int("a", ""))
            .field(FieldSpec::int("a", ""));
    }
}
