//! In-process application for handler tests: memory store, memory cache,
//! recording mailer and a throwaway upload directory.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use pms_infrastructure::{LocalAttachmentStorage, LogMailer, MailRenderer, MemoryCache, MemoryDocumentStore};
use pms_shared::config::{AppConfig, StorageSettings};

use crate::routes::build_router;
use crate::state::AppState;

pub const PASSWORD: &str = "rahasia123";
const BOUNDARY: &str = "pms-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<LogMailer>,
    pub cache: Arc<MemoryCache>,
    pub upload_dir: PathBuf,
}

/// A tenant created through onboarding, with its admin signed in
pub struct Seeded {
    pub tenant_id: String,
    pub admin_id: String,
    pub admin_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::default_settings().unwrap();
        let upload_dir = std::env::temp_dir().join(format!("pms-api-test-{}", Uuid::new_v4()));
        config.storage = StorageSettings {
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            public_path: "/uploads".to_string(),
            max_file_size: config.storage.max_file_size,
        };

        let renderer = MailRenderer::new(&config.app.name, &config.frontend.base_url).unwrap();
        let mailer = Arc::new(LogMailer::new(renderer));
        let cache = Arc::new(MemoryCache::new());
        let storage = Arc::new(LocalAttachmentStorage::new(&config.storage));

        let state = AppState::new(
            config,
            Arc::new(MemoryDocumentStore::new()),
            cache.clone(),
            mailer.clone(),
            storage,
        );
        Self {
            router: build_router(state.clone()),
            state,
            mailer,
            cache,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, text) = self.raw(method, uri, token, body).await;
        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, value)
    }

    /// `multipart/form-data` request with text fields and `(field, file name, bytes)` files
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, Vec<u8>)],
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, text) = self.send(request).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    pub async fn onboard(&self, code: &str) -> Seeded {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/tenants/onboard",
                None,
                Some(json!({
                    "name": format!("Tenant {}", code),
                    "code": code,
                    "contact": { "email": format!("kontak@{}.test", code) },
                    "admin": {
                        "name": "Admin Utama",
                        "email": format!("admin@{}.test", code),
                        "password": PASSWORD
                    }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        Seeded {
            tenant_id: body["data"]["tenant"]["id"].as_str().unwrap().to_string(),
            admin_id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            admin_token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    /// Admin-created account, returned as `(id, token)`
    pub async fn add_user(&self, admin_token: &str, email: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/users",
                Some(admin_token),
                Some(json!({
                    "name": "Pengguna Uji",
                    "email": email,
                    "password": PASSWORD,
                    "role": role
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["id"].as_str().unwrap().to_string();
        (id, self.login(email).await)
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn create_property(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/properties",
                Some(token),
                Some(property_body(name)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_unit(&self, token: &str, property_id: &str, number: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/units",
                Some(token),
                Some(json!({
                    "propertyId": property_id,
                    "unitNumber": number,
                    "type": "studio",
                    "rent": 2500000
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Files currently in the upload directory
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub fn property_body(name: &str) -> Value {
    json!({
        "name": name,
        "address": { "street": "Jl. Sudirman No. 1", "city": "Jakarta" },
        "totalUnits": 12,
        "price": 1500000000,
        "type": "apartment"
    })
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
