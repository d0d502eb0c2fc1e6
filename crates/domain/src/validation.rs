//! Schema validation for ingress requests and queue messages.
//!
//! A type declares its shape by implementing [`Schema`]. Parsing first
//! checks every rule against the raw JSON and collects all violations;
//! only a fully valid input is turned into the typed value.
//!
//! ```
//! use domain::{CreateIngredientRequest, parse};
//!
//! let err = parse::<CreateIngredientRequest>(Some(br#"{"name": "ab", "stock": 0}"#.as_slice()))
//!     .unwrap_err();
//! assert!(err.has_path("name"));
//! assert!(err.has_path("stock"));
//! ```

use std::ops::RangeInclusive;

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{FieldViolation, ValidationError};

/// A type whose JSON input is checked field by field before deserialization.
pub trait Schema: DeserializeOwned {
    /// Declares the rules for each field of the JSON object.
    fn rules(fields: &mut Fields<'_>);
}

/// Rule checker over one JSON object, recording violations as it goes.
pub struct Fields<'a> {
    object: &'a Map<String, Value>,
    prefix: String,
    violations: &'a mut Vec<FieldViolation>,
}

impl<'a> Fields<'a> {
    fn root(object: &'a Map<String, Value>, violations: &'a mut Vec<FieldViolation>) -> Self {
        Self {
            object,
            prefix: String::new(),
            violations,
        }
    }

    fn path(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.prefix)
        }
    }

    fn violation(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path(field);
        self.violations.push(FieldViolation::new(path, message));
    }

    fn value(&mut self, field: &str) -> Option<&'a Value> {
        let object: &'a Map<String, Value> = self.object;
        match object.get(field) {
            None | Some(Value::Null) => {
                self.violation(field, "Required");
                None
            }
            Some(value) => Some(value),
        }
    }

    /// A string of at least `min_len` characters.
    pub fn string(&mut self, field: &str, min_len: usize) -> &mut Self {
        if let Some(value) = self.value(field) {
            match value.as_str() {
                None => self.violation(field, "Expected string"),
                Some(s) if s.chars().count() < min_len => self.violation(
                    field,
                    format!("Must contain at least {min_len} character(s)"),
                ),
                Some(_) => {}
            }
        }
        self
    }

    /// A hyphenated UUID string.
    pub fn uuid(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            match value.as_str() {
                None => self.violation(field, "Expected string"),
                Some(s) if Uuid::parse_str(s).is_err() => self.violation(field, "Invalid uuid"),
                Some(_) => {}
            }
        }
        self
    }

    /// An integer within `range`.
    pub fn integer(&mut self, field: &str, range: RangeInclusive<i64>) -> &mut Self {
        if let Some(value) = self.value(field) {
            match value.as_i64() {
                None => self.violation(field, "Expected integer"),
                Some(n) if n < *range.start() => self.violation(
                    field,
                    format!("Must be greater than or equal to {}", range.start()),
                ),
                Some(n) if n > *range.end() => self.violation(
                    field,
                    format!("Must be less than or equal to {}", range.end()),
                ),
                Some(_) => {}
            }
        }
        self
    }

    /// A quantity: an integer from `min` up to `u32::MAX`.
    pub fn quantity(&mut self, field: &str, min: u32) -> &mut Self {
        self.integer(field, i64::from(min)..=i64::from(u32::MAX))
    }

    /// An RFC 3339 timestamp.
    pub fn timestamp(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            match value.as_str() {
                None => self.violation(field, "Expected string"),
                Some(s) if DateTime::parse_from_rfc3339(s).is_err() => {
                    self.violation(field, "Invalid datetime")
                }
                Some(_) => {}
            }
        }
        self
    }

    /// One of the `allowed` strings.
    pub fn one_of(&mut self, field: &str, allowed: &[&str]) -> &mut Self {
        if let Some(value) = self.value(field) {
            if !value.as_str().is_some_and(|s| allowed.contains(&s)) {
                let expected = allowed
                    .iter()
                    .map(|a| format!("'{a}'"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                self.violation(field, format!("Invalid enum value. Expected {expected}"));
            }
        }
        self
    }

    /// An array of at least `min_items` objects, each checked by `each`.
    pub fn array(
        &mut self,
        field: &str,
        min_items: usize,
        mut each: impl FnMut(&mut Fields<'_>),
    ) -> &mut Self {
        let Some(value) = self.value(field) else {
            return self;
        };
        let Some(items) = value.as_array() else {
            self.violation(field, "Expected array");
            return self;
        };
        if items.len() < min_items {
            self.violation(
                field,
                format!("Array must contain at least {min_items} element(s)"),
            );
        }

        let base = self.path(field);
        for (index, item) in items.iter().enumerate() {
            let prefix = format!("{base}[{index}]");
            match item.as_object() {
                Some(object) => {
                    let mut nested = Fields {
                        object,
                        prefix,
                        violations: &mut *self.violations,
                    };
                    each(&mut nested);
                }
                None => self
                    .violations
                    .push(FieldViolation::new(prefix, "Expected object")),
            }
        }
        self
    }
}

/// Validates an already-decoded JSON value against `T`'s schema.
pub fn validate<T: Schema>(value: Value) -> Result<T, ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError::single("", "Expected object"));
    };

    let mut violations = Vec::new();
    T::rules(&mut Fields::root(object, &mut violations));
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    serde_json::from_value(value).map_err(|e| ValidationError::single("", e.to_string()))
}

/// Parses a raw body into `T`. An absent or blank body is treated as `{}`,
/// so missing fields are reported individually.
pub fn parse<T: Schema>(body: Option<&[u8]>) -> Result<T, ValidationError> {
    let value = match body {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
            serde_json::from_slice(bytes)
                .map_err(|e| ValidationError::single("", format!("Invalid JSON: {e}")))?
        }
        _ => Value::Object(Map::new()),
    };
    validate(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Line {
        id: String,
        quantity: u32,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Sample {
        name: String,
        kind: String,
        lines: Vec<Line>,
    }

    impl Schema for Sample {
        fn rules(fields: &mut Fields<'_>) {
            fields
                .string("name", 3)
                .one_of("kind", &["A", "B"])
                .array("lines", 1, |line| {
                    line.uuid("id").quantity("quantity", 1);
                });
        }
    }

    const ID: &str = "6f1c5a52-3b8e-4d7e-9a36-2f1f7f0d9c11";

    #[test]
    fn valid_input_is_accepted() {
        let sample: Sample = validate(json!({
            "name": "soup",
            "kind": "A",
            "lines": [{"id": ID, "quantity": 2}]
        }))
        .unwrap();
        assert_eq!(sample.lines[0].quantity, 2);
    }

    #[test]
    fn absent_body_reports_every_required_field() {
        let err = parse::<Sample>(None).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.violations.iter().all(|v| v.message == "Required"));
        assert!(err.has_path("name") && err.has_path("kind") && err.has_path("lines"));
    }

    #[test]
    fn blank_body_is_an_empty_object() {
        let err = parse::<Sample>(Some(b"  \n".as_slice())).unwrap_err();
        assert_eq!(err.violations.len(), 3);
    }

    #[test]
    fn malformed_json_is_one_root_violation() {
        let err = parse::<Sample>(Some(b"{not json".as_slice())).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "");
        assert!(err.violations[0].message.starts_with("Invalid JSON"));
    }

    #[test]
    fn non_object_is_rejected() {
        let err = validate::<Sample>(json!([1, 2])).unwrap_err();
        assert!(err.has_path(""));
    }

    #[test]
    fn nested_violations_carry_indexed_paths() {
        let err = validate::<Sample>(json!({
            "name": "soup",
            "kind": "C",
            "lines": [
                {"id": ID, "quantity": 1},
                {"id": "nope", "quantity": 0},
                7
            ]
        }))
        .unwrap_err();

        assert!(err.has_path("kind"));
        assert!(err.has_path("lines[1].id"));
        assert!(err.has_path("lines[1].quantity"));
        assert!(err.has_path("lines[2]"));
        assert_eq!(err.violations.len(), 4);
    }

    #[test]
    fn empty_array_is_rejected() {
        let err = validate::<Sample>(json!({"name": "soup", "kind": "A", "lines": []}))
            .unwrap_err();
        assert_eq!(
            err.violations,
            vec![FieldViolation::new(
                "lines",
                "Array must contain at least 1 element(s)"
            )]
        );
    }

    #[test]
    fn type_mismatches_are_reported() {
        let err = validate::<Sample>(json!({
            "name": 5,
            "kind": "A",
            "lines": [{"id": ID, "quantity": "two"}]
        }))
        .unwrap_err();
        assert_eq!(err.violations[0], FieldViolation::new("name", "Expected string"));
        assert_eq!(
            err.violations[1],
            FieldViolation::new("lines[0].quantity", "Expected integer")
        );
    }

    #[test]
    fn quantity_above_u32_is_rejected() {
        let err = validate::<Sample>(json!({
            "name": "soup",
            "kind": "B",
            "lines": [{"id": ID, "quantity": 5_000_000_000_i64}]
        }))
        .unwrap_err();
        assert!(err.has_path("lines[0].quantity"));
    }

    #[test]
    fn null_counts_as_missing() {
        let err = validate::<Sample>(json!({"name": null, "kind": "A", "lines": [{"id": ID, "quantity": 1}]}))
            .unwrap_err();
        assert_eq!(err.violations, vec![FieldViolation::new("name", "Required")]);
    }
}
