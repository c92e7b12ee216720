//! Declarative request validation.
//!
//! Per-field rules are declared with `validator` attributes on each request
//! type; cross-field rules are added through [`RequestSchema::rules`]. Both
//! are evaluated by [`RequestSchema::check`] into one field-keyed list.

use std::borrow::Cow;

use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub trait RequestSchema: Validate {
    /// Cross-field rules that cannot be expressed per field
    fn rules(&self, _errors: &mut ValidationErrors) {}

    fn check(&self) -> Result<(), DomainError> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => e,
        };
        self.rules(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(field_errors(&errors)))
        }
    }
}

pub fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Flatten nested validator output into `address.city` / `items[0].name` keys.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, "", &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} tidak valid ({})", path, error.code));
                    out.push(FieldError { field: path.clone(), message });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

/// Request fields are reported under their wire (camelCase) names
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Inner {
        #[validate(length(min = 2, message = "Kota wajib diisi"))]
        city: String,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Outer {
        #[validate(length(min = 3, message = "Nama terlalu pendek"))]
        name: String,
        #[validate(nested)]
        inner: Inner,
        start: i64,
        end: i64,
    }

    impl RequestSchema for Outer {
        fn rules(&self, errors: &mut ValidationErrors) {
            if self.end <= self.start {
                errors.add("end", rule_error("order", "Akhir harus setelah awal"));
            }
        }
    }

    #[test]
    fn test_collects_field_nested_and_rule_errors() {
        let req = Outer {
            name: "ab".into(),
            inner: Inner { city: "x".into() },
            start: 5,
            end: 5,
        };
        let Err(DomainError::Validation(errors)) = req.check() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["end", "inner.city", "name"]);
        assert_eq!(errors[0].message, "Akhir harus setelah awal");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("total_units"), "totalUnits");
        assert_eq!(camel_case("schedule.endDate"), "schedule.endDate");
        assert_eq!(camel_case("name"), "name");
    }

    #[test]
    fn test_valid_request_passes() {
        let req = Outer {
            name: "abc".into(),
            inner: Inner { city: "Bandung".into() },
            start: 1,
            end: 2,
        };
        assert!(req.check().is_ok());
    }
}
