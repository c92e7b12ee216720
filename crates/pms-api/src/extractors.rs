//! Request body extractors.
//!
//! [`ValidJson`] decodes and validates a JSON body. [`Payload`] accepts
//! either JSON or `multipart/form-data`; in the multipart case a `data`
//! part may carry the whole JSON object, other text parts are merged in by
//! (dotted) name and file parts are collected for the attachment storage.
//! Multipart bodies decode through [`crate::form`], so a text part takes the
//! type of the field it lands in.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use pms_core::attachment::UploadedFile;
use pms_core::validation::{FieldError, RequestSchema};

use crate::error::ApiError;
use crate::form::from_form;

/// Deserialize into a request type. Missing fields become field errors.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    decode_error(serde_json::from_value(value))
}

fn decode_error<T>(result: Result<T, serde_json::Error>) -> Result<T, ApiError> {
    result.map_err(|e| {
        let message = e.to_string();
        match missing_field(&message) {
            Some(field) => ApiError::Validation(vec![FieldError::new(
                field,
                format!("{} wajib diisi", field),
            )]),
            None => ApiError::BadRequest(format!("Format data tidak valid: {}", message)),
        }
    })
}

fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}

pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + RequestSchema,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let value = parse_json_body(&bytes)?;
        let parsed: T = decode(value)?;
        parsed.check()?;
        Ok(Self(parsed))
    }
}

fn parse_json_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError::BadRequest(format!("JSON tidak valid: {}", e)))
}

/// JSON or multipart body plus uploaded files
#[derive(Debug, Default)]
pub struct Payload {
    pub body: Value,
    pub files: Vec<UploadedFile>,
    /// Body came from form fields rather than a JSON document
    pub form: bool,
}

impl Payload {
    /// Decode and validate the non-file part
    pub fn parse<T: DeserializeOwned + RequestSchema>(&self) -> Result<T, ApiError> {
        let parsed: T = if self.form {
            decode_error(from_form(self.body.clone()))?
        } else {
            decode(self.body.clone())?
        };
        parsed.check()?;
        Ok(parsed)
    }

    pub fn has_file(&self, field: &str) -> bool {
        self.files.iter().any(|f| f.field == field)
    }
}

impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(Self {
                body: parse_json_body(&bytes)?,
                files: Vec::new(),
                form: false,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let mut body = Map::new();
        let mut files = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Gagal membaca form: {}", e)))?
        {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Gagal membaca file: {}", e)))?;
                if !bytes.is_empty() {
                    files.push(UploadedFile {
                        field: name,
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Gagal membaca form: {}", e)))?;
            if name == "data" {
                if let Value::Object(data) = parse_json_body(text.as_bytes())? {
                    for (key, value) in data {
                        body.insert(key, value);
                    }
                }
                continue;
            }
            insert_path(&mut body, &name, coerce(&text));
        }

        Ok(Self {
            body: Value::Object(body),
            files,
            form: true,
        })
    }
}

/// Text parts stay strings unless they hold a JSON object or array
fn coerce(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    Value::String(text.to_string())
}

/// Insert at a dotted path; repeated keys collect into an array
fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
        None => match target.get_mut(path) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                target.insert(path.to_string(), value);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "Nama terlalu pendek"))]
        name: String,
    }

    impl RequestSchema for Sample {}

    #[test]
    fn test_insert_path_nests_and_collects() {
        let mut body = Map::new();
        insert_path(&mut body, "address.city", json!("Bandung"));
        insert_path(&mut body, "address.street", json!("Jl. Merdeka"));
        insert_path(&mut body, "amenities", json!("wifi"));
        insert_path(&mut body, "amenities", json!("pool"));
        insert_path(&mut body, "amenities", json!("gym"));
        assert_eq!(
            Value::Object(body),
            json!({
                "address": {"city": "Bandung", "street": "Jl. Merdeka"},
                "amenities": ["wifi", "pool", "gym"],
            })
        );
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce("101"), json!("101"));
        assert_eq!(coerce("true"), json!("true"));
        assert_eq!(coerce("Jl. Merdeka 1"), json!("Jl. Merdeka 1"));
        assert_eq!(coerce("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(coerce("[\"wifi\",\"pool\"]"), json!(["wifi", "pool"]));
        assert_eq!(coerce("[lantai 2"), json!("[lantai 2"));
    }

    #[test]
    fn test_missing_field_becomes_field_error() {
        let Err(ApiError::Validation(errors)) = decode::<Sample>(json!({})) else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn test_payload_parse_runs_rules() {
        let payload = Payload {
            body: json!({"name": "a"}),
            files: Vec::new(),
            form: false,
        };
        assert!(matches!(payload.parse::<Sample>(), Err(ApiError::Validation(_))));
    }
}
