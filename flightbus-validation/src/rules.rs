// Validation rules builder

use crate::coerce::{is_truthy, lookup};
use crate::{ValidationError, ValidationErrors};
use serde_json::Value;
use std::sync::Arc;

type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// One check against a whole payload
#[derive(Clone)]
pub struct Rule {
    field: String,
    message: String,
    constraint: &'static str,
    check: CheckFn,
}

impl Rule {
    /// Create a rule from a predicate over the payload
    pub fn new<F>(field: impl Into<String>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: "custom",
            check: Arc::new(check),
        }
    }

    /// Payload must be a JSON object
    pub fn object(field: impl Into<String>) -> Self {
        Self {
            constraint: "object",
            ..Self::new(field, "must be JSON object", Value::is_object)
        }
    }

    /// Value at a dotted path must be truthy
    pub fn required(path: &str) -> Self {
        let owned = path.to_string();
        Self {
            constraint: "required",
            ..Self::new(path, "required", move |payload| {
                is_truthy(lookup(payload, &owned))
            })
        }
    }

    /// Run the check
    pub fn apply(&self, payload: &Value) -> Result<(), ValidationError> {
        if (self.check)(payload) {
            Ok(())
        } else {
            Err(ValidationError::new(&self.field, &self.message).with_constraint(self.constraint))
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("field", &self.field)
            .field("message", &self.message)
            .field("constraint", &self.constraint)
            .finish()
    }
}

/// Ordered rules for one payload shape.
///
/// Every rule runs; failures are collected in rule order so callers get the
/// complete error set.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    rules: Vec<Rule>,
}

impl ValidationRules {
    /// Create an empty rule list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate a payload against all rules
    pub fn validate(&self, payload: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        for rule in &self.rules {
            if let Err(error) = rule.apply(payload) {
                errors.add(error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
