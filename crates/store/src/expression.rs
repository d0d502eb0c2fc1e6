//! Conditional update expressions with named placeholders.
//!
//! An expression is built from `SET` and `ADD` actions whose attribute names
//! (`#stock`) and operand values (`:qty`) are placeholders resolved through
//! the expression's name and value maps:
//!
//! ```
//! use store::{Condition, UpdateExpression};
//!
//! let decrement = UpdateExpression::new()
//!     .add("#stock", ":delta")
//!     .condition(Condition::at_least("#stock", ":required"))
//!     .name("#stock", "stock")
//!     .value(":delta", -2)
//!     .value(":required", 2);
//!
//! assert_eq!(decrement.render(), "ADD #stock :delta IF #stock >= :required");
//! ```
//!
//! The expression is evaluated as a unit against one item: either the
//! condition holds and every action is applied, or nothing changes.

use std::collections::HashMap;

use serde_json::Value;

/// What an update returns to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnValues {
    /// Nothing.
    #[default]
    None,
    /// The item as it was before the update.
    AllOld,
    /// The item after the update.
    AllNew,
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Set { name: String, value: String },
    Add { name: String, value: String },
}

/// A condition evaluated against the current item before any action runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The attribute is present.
    AttributeExists(String),
    /// The attribute is absent.
    AttributeNotExists(String),
    /// The attribute is an integer greater than or equal to the operand.
    AtLeast { name: String, value: String },
}

impl Condition {
    pub fn attribute_exists(name: impl Into<String>) -> Self {
        Condition::AttributeExists(name.into())
    }

    pub fn attribute_not_exists(name: impl Into<String>) -> Self {
        Condition::AttributeNotExists(name.into())
    }

    pub fn at_least(name: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::AtLeast {
            name: name.into(),
            value: value.into(),
        }
    }

    fn render(&self) -> String {
        match self {
            Condition::AttributeExists(name) => format!("attribute_exists({name})"),
            Condition::AttributeNotExists(name) => format!("attribute_not_exists({name})"),
            Condition::AtLeast { name, value } => format!("{name} >= {value}"),
        }
    }
}

/// Why an expression could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// The condition evaluated to false; the item is unchanged.
    ConditionFailed,
    /// The expression itself is malformed for this item.
    Invalid(String),
}

/// An atomic, optionally conditional, update of a single item.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpression {
    actions: Vec<Action>,
    condition: Option<Condition>,
    names: HashMap<String, String>,
    values: HashMap<String, Value>,
    return_values: ReturnValues,
}

impl UpdateExpression {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `SET name = value` action.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.actions.push(Action::Set {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds an `ADD name value` action. Missing attributes count as zero.
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.actions.push(Action::Add {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Attaches a condition to the update.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Binds an attribute-name placeholder (`#name`) to an attribute.
    pub fn name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), attribute.into());
        self
    }

    /// Binds a value placeholder (`:value`) to a JSON value.
    pub fn value(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// Chooses what the update returns.
    pub fn return_values(mut self, return_values: ReturnValues) -> Self {
        self.return_values = return_values;
        self
    }

    pub fn returns(&self) -> ReturnValues {
        self.return_values
    }

    /// Renders the expression in its placeholder form, for logs.
    pub fn render(&self) -> String {
        let mut sets = Vec::new();
        let mut adds = Vec::new();
        for action in &self.actions {
            match action {
                Action::Set { name, value } => sets.push(format!("{name} = {value}")),
                Action::Add { name, value } => adds.push(format!("{name} {value}")),
            }
        }

        let mut parts = Vec::new();
        if !sets.is_empty() {
            parts.push(format!("SET {}", sets.join(", ")));
        }
        if !adds.is_empty() {
            parts.push(format!("ADD {}", adds.join(", ")));
        }
        if let Some(condition) = &self.condition {
            parts.push(format!("IF {}", condition.render()));
        }
        parts.join(" ")
    }

    fn attribute(&self, placeholder: &str) -> Result<&str, ExpressionError> {
        self.names
            .get(placeholder)
            .map(String::as_str)
            .ok_or_else(|| ExpressionError::Invalid(format!("unbound name {placeholder}")))
    }

    fn operand(&self, placeholder: &str) -> Result<&Value, ExpressionError> {
        self.values
            .get(placeholder)
            .ok_or_else(|| ExpressionError::Invalid(format!("unbound value {placeholder}")))
    }

    fn integer_operand(&self, placeholder: &str) -> Result<i64, ExpressionError> {
        self.operand(placeholder)?.as_i64().ok_or_else(|| {
            ExpressionError::Invalid(format!("value {placeholder} is not an integer"))
        })
    }

    fn check(&self, item: &serde_json::Map<String, Value>) -> Result<bool, ExpressionError> {
        let Some(condition) = &self.condition else {
            return Ok(true);
        };

        match condition {
            Condition::AttributeExists(name) => Ok(item.contains_key(self.attribute(name)?)),
            Condition::AttributeNotExists(name) => Ok(!item.contains_key(self.attribute(name)?)),
            Condition::AtLeast { name, value } => {
                let threshold = self.integer_operand(value)?;
                Ok(item
                    .get(self.attribute(name)?)
                    .and_then(Value::as_i64)
                    .is_some_and(|current| current >= threshold))
            }
        }
    }

    /// Evaluates the condition against `current` and applies every action,
    /// returning the updated item.
    pub fn apply(&self, current: &Value) -> Result<Value, ExpressionError> {
        let mut updated = current.clone();
        let item = updated
            .as_object_mut()
            .ok_or_else(|| ExpressionError::Invalid("item is not a JSON object".to_string()))?;

        if !self.check(item)? {
            return Err(ExpressionError::ConditionFailed);
        }

        for action in &self.actions {
            match action {
                Action::Set { name, value } => {
                    let attribute = self.attribute(name)?.to_string();
                    let value = self.operand(value)?.clone();
                    item.insert(attribute, value);
                }
                Action::Add { name, value } => {
                    let attribute = self.attribute(name)?.to_string();
                    let delta = self.integer_operand(value)?;
                    let existing = match item.get(&attribute) {
                        None => 0,
                        Some(v) => v.as_i64().ok_or_else(|| {
                            ExpressionError::Invalid(format!("attribute {attribute} is not an integer"))
                        })?,
                    };
                    let sum = existing.checked_add(delta).ok_or_else(|| {
                        ExpressionError::Invalid(format!("overflow adding to {attribute}"))
                    })?;
                    item.insert(attribute, Value::from(sum));
                }
            }
        }

        Ok(updated)
    }
}
